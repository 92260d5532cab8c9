//! Integration tests for lesson plan persistence and ownership scoping.

use topicmark_db::models::FlatTopicRecord;
use topicmark_db::queries::lesson_plans::{self, LessonPlanFields};
use topicmark_test_utils::{create_test_db, drop_test_db};

fn sample_topics() -> Vec<FlatTopicRecord> {
    vec![
        FlatTopicRecord::root("Intro", "# Intro")
            .with_main_topic("Intro")
            .with_order(0),
        FlatTopicRecord::child("History", "Intro", "Long ago")
            .with_main_topic("Intro")
            .with_order(1),
    ]
}

#[tokio::test]
async fn insert_and_fetch_roundtrip() {
    let (pool, db_name) = create_test_db().await;
    let topics = sample_topics();

    let created = lesson_plans::insert_lesson_plan(
        &pool,
        "alice",
        &LessonPlanFields {
            name: "Physics 101",
            main_topic: "Intro",
            topics: &topics,
            is_public: false,
        },
    )
    .await
    .unwrap();

    assert_eq!(created.user_id, "alice");
    assert_eq!(created.name, "Physics 101");
    assert!(!created.is_public);
    assert_eq!(created.topics.0, topics);
    assert_eq!(created.created_at, created.updated_at);

    let fetched = lesson_plans::get_lesson_plan_for_user(&pool, created.id, "alice")
        .await
        .unwrap()
        .expect("owner should see the plan");
    assert_eq!(fetched.topics.0, topics);

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn other_users_cannot_read_update_or_delete() {
    let (pool, db_name) = create_test_db().await;
    let topics = sample_topics();
    let fields = LessonPlanFields {
        name: "Private",
        main_topic: "Intro",
        topics: &topics,
        is_public: false,
    };

    let plan = lesson_plans::insert_lesson_plan(&pool, "alice", &fields)
        .await
        .unwrap();

    assert!(
        lesson_plans::get_lesson_plan_for_user(&pool, plan.id, "bob")
            .await
            .unwrap()
            .is_none()
    );
    assert!(
        lesson_plans::update_lesson_plan(&pool, plan.id, "bob", &fields)
            .await
            .unwrap()
            .is_none()
    );
    assert!(
        !lesson_plans::delete_lesson_plan(&pool, plan.id, "bob")
            .await
            .unwrap()
    );
    assert!(
        lesson_plans::get_public_lesson_plan(&pool, plan.id)
            .await
            .unwrap()
            .is_none(),
        "private plans are not served publicly"
    );

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn update_replaces_fields_and_bumps_timestamp() {
    let (pool, db_name) = create_test_db().await;
    let topics = sample_topics();

    let plan = lesson_plans::insert_lesson_plan(
        &pool,
        "alice",
        &LessonPlanFields {
            name: "Draft",
            main_topic: "Intro",
            topics: &topics,
            is_public: false,
        },
    )
    .await
    .unwrap();

    let new_topics = vec![FlatTopicRecord::root("Mechanics", "")];
    let updated = lesson_plans::update_lesson_plan(
        &pool,
        plan.id,
        "alice",
        &LessonPlanFields {
            name: "Final",
            main_topic: "Mechanics",
            topics: &new_topics,
            is_public: true,
        },
    )
    .await
    .unwrap()
    .expect("owner update should succeed");

    assert_eq!(updated.name, "Final");
    assert_eq!(updated.main_topic, "Mechanics");
    assert!(updated.is_public);
    assert_eq!(updated.topics.0, new_topics);
    assert!(updated.updated_at >= plan.updated_at);
    assert_eq!(updated.created_at, plan.created_at);

    assert_eq!(
        lesson_plans::get_public_flag(&pool, plan.id).await.unwrap(),
        Some(true)
    );

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn public_flag_of_missing_plan_is_none() {
    let (pool, db_name) = create_test_db().await;

    assert_eq!(lesson_plans::get_public_flag(&pool, 4242).await.unwrap(), None);

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn listings_are_scoped_and_newest_first() {
    let (pool, db_name) = create_test_db().await;
    let topics = sample_topics();

    for (owner, name, is_public) in [
        ("alice", "A1", false),
        ("alice", "A2", true),
        ("bob", "B1", true),
    ] {
        lesson_plans::insert_lesson_plan(
            &pool,
            owner,
            &LessonPlanFields {
                name,
                main_topic: "Intro",
                topics: &topics,
                is_public,
            },
        )
        .await
        .unwrap();
    }

    let mine = lesson_plans::list_lesson_plans_for_user(&pool, "alice")
        .await
        .unwrap();
    let names: Vec<&str> = mine.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["A2", "A1"]);

    let public = lesson_plans::list_public_lesson_plans(&pool).await.unwrap();
    let names: Vec<&str> = public.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["B1", "A2"]);

    let all = lesson_plans::list_all_lesson_plans(&pool).await.unwrap();
    assert_eq!(all.len(), 3);

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn delete_removes_plan_once() {
    let (pool, db_name) = create_test_db().await;
    let topics = sample_topics();

    let plan = lesson_plans::insert_lesson_plan(
        &pool,
        "alice",
        &LessonPlanFields {
            name: "Doomed",
            main_topic: "Intro",
            topics: &topics,
            is_public: false,
        },
    )
    .await
    .unwrap();

    assert!(lesson_plans::delete_lesson_plan(&pool, plan.id, "alice").await.unwrap());
    assert!(!lesson_plans::delete_lesson_plan(&pool, plan.id, "alice").await.unwrap());
    assert!(lesson_plans::get_lesson_plan(&pool, plan.id).await.unwrap().is_none());

    pool.close().await;
    drop_test_db(&db_name).await;
}
