use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;

use topicmark_core::validate::{self, Validate, ValidationError};
use topicmark_db::models::Difficulty;
use topicmark_db::queries::topics::{self as queries, TopicFields};

use super::{AppError, AppState, Caller, parse_id};

const INVALID_ID: &str = "Invalid topic ID";
const NOT_FOUND: &str = "Topic not found";

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/topics", get(list).post(create))
        .route("/topics/by-difficulty/{difficulty}", get(by_difficulty))
        .route("/topics/by-wing/{wing}", get(by_wing))
        .route("/topics/{id}", get(get_one).put(update).delete(remove))
}

/// Body of `POST /api/topics` and `PUT /api/topics/{id}`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TopicInput {
    axios_wing: String,
    topic: String,
    #[serde(default)]
    difficulty: Difficulty,
    mdx_content: String,
    #[serde(default)]
    main_topic: Option<String>,
    #[serde(default)]
    parent_topic: Option<String>,
    #[serde(default)]
    is_subtopic: bool,
}

impl Validate for TopicInput {
    fn validate(&self) -> Result<(), ValidationError> {
        validate::min_chars("axiosWing", self.axios_wing.trim(), 1)?;
        validate::min_chars("topic", self.topic.trim(), 3)?;
        validate::min_chars("mdxContent", &self.mdx_content, 10)
    }
}

impl TopicInput {
    fn fields(&self) -> TopicFields<'_> {
        TopicFields {
            axios_wing: self.axios_wing.trim(),
            topic: self.topic.trim(),
            difficulty: self.difficulty,
            mdx_content: &self.mdx_content,
            main_topic: self.main_topic.as_deref(),
            parent_topic: self.parent_topic.as_deref(),
            is_subtopic: self.is_subtopic,
        }
    }
}

async fn list(State(state): State<AppState>, Caller(user): Caller) -> Result<impl IntoResponse, AppError> {
    let topics = queries::list_topics_for_user(&state.pool, &user.id)
        .await
        .map_err(|e| AppError::internal("Failed to fetch topics", e))?;
    Ok(Json(json!({ "topics": topics })))
}

async fn create(
    State(state): State<AppState>,
    Caller(user): Caller,
    body: Result<Json<TopicInput>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(input) = body?;
    input.validate()?;

    let topic = queries::insert_topic(&state.pool, &user.id, &input.fields())
        .await
        .map_err(|e| AppError::internal("Failed to create topic", e))?;
    tracing::info!(id = topic.id, user = %user.id, "saved topic");
    Ok((StatusCode::CREATED, Json(topic)))
}

async fn get_one(
    State(state): State<AppState>,
    Caller(user): Caller,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id, INVALID_ID)?;
    let topic = queries::get_topic_for_user(&state.pool, id, &user.id)
        .await
        .map_err(|e| AppError::internal("Failed to fetch topic", e))?
        .ok_or_else(|| AppError::not_found(NOT_FOUND))?;
    Ok(Json(json!({ "topic": topic })))
}

async fn update(
    State(state): State<AppState>,
    Caller(user): Caller,
    Path(id): Path<String>,
    body: Result<Json<TopicInput>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id, INVALID_ID)?;
    let Json(input) = body?;
    input.validate()?;

    let topic = queries::update_topic(&state.pool, id, &user.id, &input.fields())
        .await
        .map_err(|e| AppError::internal("Failed to update topic", e))?
        .ok_or_else(|| AppError::not_found(NOT_FOUND))?;
    Ok(Json(json!({ "topic": topic })))
}

async fn remove(
    State(state): State<AppState>,
    Caller(user): Caller,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id, INVALID_ID)?;
    let topic = queries::delete_topic(&state.pool, id, &user.id)
        .await
        .map_err(|e| AppError::internal("Failed to delete topic", e))?
        .ok_or_else(|| AppError::not_found(NOT_FOUND))?;
    Ok(Json(json!({ "topic": topic })))
}

async fn by_difficulty(
    State(state): State<AppState>,
    Caller(user): Caller,
    Path(difficulty): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let difficulty: Difficulty = difficulty
        .parse()
        .map_err(|_| AppError::bad_request("Invalid difficulty level"))?;
    let topics = queries::list_topics_by_difficulty(&state.pool, &user.id, difficulty)
        .await
        .map_err(|e| AppError::internal("Failed to fetch topics", e))?;
    Ok(Json(json!({ "topics": topics })))
}

async fn by_wing(
    State(state): State<AppState>,
    Caller(user): Caller,
    Path(wing): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let topics = queries::list_topics_by_wing(&state.pool, &user.id, &wing)
        .await
        .map_err(|e| AppError::internal("Failed to fetch topics", e))?;
    Ok(Json(json!({ "topics": topics })))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use super::super::test_support::{body_json, send, state};
    use super::*;
    use topicmark_test_utils::{create_test_db, drop_test_db};

    fn waves(difficulty: &str) -> serde_json::Value {
        json!({
            "axiosWing": "Science",
            "topic": "Waves",
            "difficulty": difficulty,
            "mdxContent": "# Waves\n\nOscillations.",
            "mainTopic": "Physics",
        })
    }

    #[test]
    fn topic_input_enforces_minimum_lengths() {
        let input: TopicInput = serde_json::from_value(waves("Beginner")).unwrap();
        assert!(input.validate().is_ok());

        let mut short: TopicInput = serde_json::from_value(waves("Beginner")).unwrap();
        short.topic = "ab".into();
        assert_eq!(short.validate().unwrap_err().field, "topic");

        short.topic = "Waves".into();
        short.mdx_content = "tiny".into();
        assert_eq!(short.validate().unwrap_err().field, "mdxContent");

        short.mdx_content = "long enough body".into();
        short.axios_wing = " ".into();
        assert_eq!(short.validate().unwrap_err().field, "axiosWing");
    }

    #[tokio::test]
    async fn topic_crud_through_the_router() {
        let (pool, db_name) = create_test_db().await;
        let st = state(pool.clone());

        let resp = send(st.clone(), Method::POST, "/api/topics", Some("alice"), Some(waves("Intermediate"))).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let created = body_json(resp).await;
        let uri = format!("/api/topics/{}", created["id"]);
        assert_eq!(created["difficulty"], "Intermediate");

        let resp = send(st.clone(), Method::GET, &uri, Some("alice"), None).await;
        assert_eq!(body_json(resp).await["topic"]["topic"], "Waves");

        let mut edited = waves("Advanced");
        edited["mdxContent"] = json!("# Waves\n\nRewritten body.");
        let resp = send(st.clone(), Method::PUT, &uri, Some("alice"), Some(edited)).await;
        assert_eq!(body_json(resp).await["topic"]["difficulty"], "Advanced");

        let resp = send(st.clone(), Method::GET, &uri, Some("bob"), None).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = send(st.clone(), Method::DELETE, &uri, Some("alice"), None).await;
        assert_eq!(body_json(resp).await["topic"]["topic"], "Waves");

        let resp = send(st, Method::GET, "/api/topics", Some("alice"), None).await;
        assert!(body_json(resp).await["topics"].as_array().unwrap().is_empty());

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn filters_by_difficulty_and_wing() {
        let (pool, db_name) = create_test_db().await;
        let st = state(pool.clone());

        send(st.clone(), Method::POST, "/api/topics", Some("alice"), Some(waves("Beginner"))).await;
        send(st.clone(), Method::POST, "/api/topics", Some("alice"), Some(waves("Advanced"))).await;

        let resp = send(st.clone(), Method::GET, "/api/topics/by-difficulty/Advanced", Some("alice"), None).await;
        assert_eq!(body_json(resp).await["topics"].as_array().unwrap().len(), 1);

        let resp = send(st.clone(), Method::GET, "/api/topics/by-difficulty/Expert", Some("alice"), None).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(resp).await["error"], "Invalid difficulty level");

        let resp = send(st.clone(), Method::GET, "/api/topics/by-wing/Science", Some("alice"), None).await;
        assert_eq!(body_json(resp).await["topics"].as_array().unwrap().len(), 2);

        let resp = send(st, Method::GET, "/api/topics/by-wing/Arts", Some("alice"), None).await;
        assert!(body_json(resp).await["topics"].as_array().unwrap().is_empty());

        pool.close().await;
        drop_test_db(&db_name).await;
    }
}
