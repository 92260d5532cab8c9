//! `HttpGateway` and `RagClient` against throwaway axum servers bound to an
//! ephemeral local port.

use std::time::Duration;

use axum::extract::Path;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};

use topicmark_core::gateway::{GatewayError, HttpGateway, LessonPlanGateway, SavedTopicLookup};
use topicmark_core::generation::request::{LlmOnlyRequest, SearchTopicsRequest, SingleTopicRequest};
use topicmark_core::generation::{Endpoint, GenerationError, RagClient, RagReply, TopicsResponse, mdx_content};
use topicmark_core::identity::{Identity, USER_ID_HEADER};
use topicmark_core::plan::LessonPlan;

// ===========================================================================
// Harness
// ===========================================================================

async fn spawn(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

fn plan_json(id: i32, owner: &str, is_public: bool) -> Value {
    json!({
        "id": id,
        "userId": owner,
        "name": "Physics",
        "mainTopic": "Physics",
        "topics": [
            {"topic": "Intro", "mdxContent": "# Intro", "isSubtopic": false, "parentTopic": "Intro", "order": 0}
        ],
        "isPublic": is_public,
        "createdAt": "2025-03-01T10:00:00Z",
        "updatedAt": "2025-03-01T10:00:00Z"
    })
}

fn caller(headers: &HeaderMap) -> Option<String> {
    headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
}

/// Minimal lesson-plan API: plan 1 belongs to `kp_alice` and is private,
/// plan 2 belongs to `kp_bob` and is public, plan 3 makes the server fail.
fn plan_api() -> Router {
    let own = get(|headers: HeaderMap, Path(id): Path<i32>| async move {
        let Some(user) = caller(&headers) else {
            return (StatusCode::UNAUTHORIZED, Json(json!({"error": "Authentication required"})))
                .into_response();
        };
        match id {
            1 if user == "kp_alice" => Json(plan_json(1, "kp_alice", false)).into_response(),
            3 => (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": "Failed to fetch lesson plan"})))
                .into_response(),
            _ => (StatusCode::NOT_FOUND, Json(json!({"error": "Lesson plan not found"}))).into_response(),
        }
    })
    .put(|headers: HeaderMap, Path(id): Path<i32>, Json(body): Json<Value>| async move {
        let mut plan = plan_json(id, &caller(&headers).unwrap_or_default(), false);
        plan["topics"] = body["topics"].clone();
        plan["name"] = body["name"].clone();
        Json(plan)
    });

    Router::new()
        .route(
            "/api/lessonPlans",
            get(|headers: HeaderMap| async move {
                match caller(&headers).as_deref() {
                    Some("kp_alice") => Json(json!({"lessonPlans": [plan_json(1, "kp_alice", false)]}))
                        .into_response(),
                    _ => StatusCode::UNAUTHORIZED.into_response(),
                }
            })
            .post(|headers: HeaderMap, Json(body): Json<Value>| async move {
                let mut plan = plan_json(9, &caller(&headers).unwrap_or_default(), false);
                plan["name"] = body["name"].clone();
                plan["topics"] = body["topics"].clone();
                (StatusCode::CREATED, Json(plan))
            }),
        )
        .route("/api/lessonPlans/{id}", own)
        .route(
            "/api/lessonPlans/public/{id}",
            get(|Path(id): Path<i32>| async move {
                match id {
                    2 => Json(plan_json(2, "kp_bob", true)).into_response(),
                    _ => StatusCode::NOT_FOUND.into_response(),
                }
            }),
        )
        .route(
            "/api/lessonPlans/check-public/{id}",
            get(|Path(id): Path<i32>| async move {
                Json(json!({"exists": id == 1 || id == 2, "isPublic": id == 2}))
            }),
        )
        .route(
            "/api/topics",
            get(|| async {
                Json(json!({"topics": [{
                    "id": 4,
                    "userId": "kp_alice",
                    "axiosWing": "Science",
                    "topic": "Optics",
                    "difficulty": "Beginner",
                    "mdxContent": "# Optics\n\nLight bends.",
                    "mainTopic": null,
                    "parentTopic": null,
                    "isSubtopic": false,
                    "createdAt": "2025-03-01T10:00:00Z",
                    "updatedAt": "2025-03-01T10:00:00Z"
                }]}))
            }),
        )
}

async fn gateway_as(user: Option<&str>) -> HttpGateway {
    let base = spawn(plan_api()).await;
    let gateway = HttpGateway::new(format!("{base}/api/"));
    match user {
        Some(user) => gateway.with_identity(Identity::new(user)),
        None => gateway,
    }
}

// ===========================================================================
// HttpGateway
// ===========================================================================

#[tokio::test]
async fn gateway_fetches_own_plan_with_identity() {
    let gateway = gateway_as(Some("kp_alice")).await;
    let plan = gateway.get_by_id(1).await.unwrap();
    assert_eq!(plan.id, Some(1));
    assert_eq!(plan.user_id.as_deref(), Some("kp_alice"));
    assert_eq!(plan.record("Intro").and_then(|r| r.order), Some(0));
}

#[tokio::test]
async fn gateway_maps_statuses_to_errors() {
    let anonymous = gateway_as(None).await;
    assert!(matches!(anonymous.get_by_id(1).await, Err(GatewayError::Unauthorized)));

    let bob = gateway_as(Some("kp_bob")).await;
    assert!(matches!(bob.get_by_id(1).await, Err(GatewayError::NotFound)));

    match bob.get_by_id(3).await {
        Err(GatewayError::Status { status, message }) => {
            assert_eq!(status, 500);
            assert_eq!(message, "Failed to fetch lesson plan");
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn gateway_lists_and_checks_public() {
    let gateway = gateway_as(Some("kp_alice")).await;
    let mine = gateway.list_mine().await.unwrap();
    assert_eq!(mine.len(), 1);

    let public = gateway.get_public_by_id(2).await.unwrap();
    assert!(public.is_public);

    let status = gateway.check_public(2).await.unwrap();
    assert!(status.exists && status.is_public);
    let status = gateway.check_public(5).await.unwrap();
    assert!(!status.exists);
}

#[tokio::test]
async fn gateway_create_and_update_send_payload() {
    let gateway = gateway_as(Some("kp_alice")).await;
    let input = LessonPlan::draft("Optics", "Light").to_input(Vec::new());

    let created = gateway.create(&input).await.unwrap();
    assert_eq!(created.id, Some(9));
    assert_eq!(created.name, "Optics");
    assert!(created.topics.is_empty());

    let updated = gateway.update(1, &input).await.unwrap();
    assert_eq!(updated.id, Some(1));
    assert_eq!(updated.name, "Optics");
}

#[tokio::test]
async fn gateway_looks_up_saved_topics_by_name() {
    let gateway = gateway_as(Some("kp_alice")).await;
    assert_eq!(
        gateway.saved_content("Optics").await.unwrap().as_deref(),
        Some("# Optics\n\nLight bends.")
    );
    assert_eq!(gateway.saved_content("Acoustics").await.unwrap(), None);
}

#[tokio::test]
async fn gateway_reports_unreachable_server() {
    // Nothing listens on the discard port.
    let gateway = HttpGateway::new("http://127.0.0.1:9/api");
    assert!(matches!(gateway.list_public().await, Err(GatewayError::Transport(_))));
}

// ===========================================================================
// RagClient
// ===========================================================================

fn rag_api() -> Router {
    Router::new()
        .route(
            "/rag/search-topics",
            post(|Json(body): Json<Value>| async move {
                let query = body["query"].as_str().unwrap_or_default().to_owned();
                let topics = format!(
                    "Outline for {query}:\n```json\n[{{\"topic\":\"Intro\",\"subtopics\":[\"History\"]}}]\n```"
                );
                Json(json!({"status": "success", "data": {"topics": topics}}))
            }),
        )
        .route(
            "/rag/single-topic-raw",
            post(|Json(body): Json<Value>| async move {
                // Echo the resolved topic so the test can see defaulting.
                format!("# {}", body["topic"].as_str().unwrap_or("missing"))
            }),
        )
        .route(
            "/rag/generate-mdx-llm-only",
            post(|| async { (StatusCode::UNPROCESSABLE_ENTITY, Json(json!({"detail": "bad topic"}))) }),
        )
        .route(
            "/rag/refine",
            post(|| async { (StatusCode::BAD_GATEWAY, "model offline") }),
        )
}

#[tokio::test]
async fn rag_search_returns_embedded_hierarchy() {
    let base = spawn(rag_api()).await;
    let client = RagClient::new(base, Duration::from_secs(5)).unwrap();

    let reply = client
        .search_topics(&SearchTopicsRequest {
            query: "Physics".into(),
            limit: None,
        })
        .await
        .unwrap();
    let parsed: TopicsResponse = serde_json::from_value(reply).unwrap();
    let hierarchy = parsed.hierarchy().unwrap();
    assert_eq!(hierarchy[0].name, "Intro");
    assert_eq!(hierarchy[0].subtopics, vec!["History"]);
}

#[tokio::test]
async fn rag_single_topic_defaults_topic() {
    let base = spawn(rag_api()).await;
    let client = RagClient::new(base, Duration::from_secs(5)).unwrap();

    let mdx = client
        .single_topic_raw(&SingleTopicRequest {
            selected_topic: "Waves".into(),
            main_topic: "Physics".into(),
            topic: None,
            num_results: None,
        })
        .await
        .unwrap();
    assert_eq!(mdx, "# Waves");
}

#[tokio::test]
async fn rag_llm_only_falls_back_on_rejection() {
    let base = spawn(rag_api()).await;
    let client = RagClient::new(base, Duration::from_secs(5)).unwrap();

    let reply = client
        .generate_llm_only(&LlmOnlyRequest {
            selected_topic: "Waves".into(),
            main_topic: "Physics".into(),
            topic: None,
        })
        .await
        .unwrap();
    assert_eq!(reply["status"], "success");
    let mdx = mdx_content(&reply).unwrap();
    assert!(mdx.starts_with("# Waves\n\n## Content Generation Error"));
    assert!(mdx.contains("bad topic"));
}

#[tokio::test]
async fn rag_llm_only_raw_falls_back_when_unreachable() {
    let client = RagClient::new("http://127.0.0.1:9", Duration::from_secs(5)).unwrap();
    let mdx = client
        .generate_llm_only_raw(&LlmOnlyRequest {
            selected_topic: "Waves".into(),
            main_topic: "Physics".into(),
            topic: None,
        })
        .await
        .unwrap();
    assert!(mdx.contains("## Connection Error"));
}

#[tokio::test]
async fn rag_upstream_errors_surface_for_other_endpoints() {
    let base = spawn(rag_api()).await;
    let client = RagClient::new(base, Duration::from_secs(5)).unwrap();

    let err = client
        .dispatch(Endpoint::Refine, json!({"mdx": "# Doc", "question": "shorter"}))
        .await
        .unwrap_err();
    match err {
        GenerationError::Upstream { endpoint, status, body } => {
            assert_eq!(endpoint, "refine");
            assert_eq!(status, 502);
            assert_eq!(body, "model offline");
        }
        other => panic!("expected upstream error, got {other:?}"),
    }
}

#[tokio::test]
async fn rag_dispatch_routes_raw_endpoints_to_text() {
    let base = spawn(rag_api()).await;
    let client = RagClient::new(base, Duration::from_secs(5)).unwrap();

    let reply = client
        .dispatch(
            Endpoint::SingleTopicRaw,
            json!({"selected_topic": "Sound", "main_topic": "Physics", "topic": "Acoustics"}),
        )
        .await
        .unwrap();
    assert_eq!(reply, RagReply::Text("# Acoustics".into()));

    let err = client
        .dispatch(Endpoint::SingleTopic, json!({"main_topic": "Physics"}))
        .await
        .unwrap_err();
    assert!(err.is_client_error());
}
