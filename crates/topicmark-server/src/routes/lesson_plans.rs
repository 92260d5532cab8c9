use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;

use topicmark_core::plan::{LessonPlan, LessonPlanInput, PublicStatus};
use topicmark_core::validate::Validate;
use topicmark_db::queries::lesson_plans::{self as queries, LessonPlanFields};

use super::{AppError, AppState, Caller, parse_id};

const INVALID_ID: &str = "Invalid lesson plan ID";
const NOT_FOUND: &str = "Lesson plan not found";

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/lessonPlans", get(list_mine).post(create))
        .route("/lessonPlans/public", get(list_public))
        .route("/lessonPlans/public/{id}", get(get_public))
        .route("/lessonPlans/check-public/{id}", get(check_public))
        .route("/lessonPlans/{id}", get(get_one).put(update).delete(remove))
}

fn fields(input: &LessonPlanInput) -> LessonPlanFields<'_> {
    LessonPlanFields {
        name: input.name.trim(),
        main_topic: input.main_topic.trim(),
        topics: &input.topics,
        is_public: input.is_public,
    }
}

fn plan_list(rows: Vec<topicmark_db::models::LessonPlanRow>) -> Json<serde_json::Value> {
    let plans: Vec<LessonPlan> = rows.into_iter().map(LessonPlan::from).collect();
    Json(json!({ "lessonPlans": plans }))
}

async fn list_mine(
    State(state): State<AppState>,
    Caller(user): Caller,
) -> Result<impl IntoResponse, AppError> {
    let rows = queries::list_lesson_plans_for_user(&state.pool, &user.id)
        .await
        .map_err(|e| AppError::internal("Failed to fetch lesson plans", e))?;
    Ok(plan_list(rows))
}

async fn list_public(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let rows = queries::list_public_lesson_plans(&state.pool)
        .await
        .map_err(|e| AppError::internal("Failed to fetch public lesson plans", e))?;
    Ok(plan_list(rows))
}

async fn create(
    State(state): State<AppState>,
    Caller(user): Caller,
    body: Result<Json<LessonPlanInput>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(input) = body?;
    input.validate()?;

    let row = queries::insert_lesson_plan(&state.pool, &user.id, &fields(&input))
        .await
        .map_err(|e| AppError::internal("Failed to create lesson plan", e))?;
    tracing::info!(id = row.id, user = %user.id, "created lesson plan");
    Ok((StatusCode::CREATED, Json(LessonPlan::from(row))))
}

async fn get_one(
    State(state): State<AppState>,
    Caller(user): Caller,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id, INVALID_ID)?;
    let row = queries::get_lesson_plan_for_user(&state.pool, id, &user.id)
        .await
        .map_err(|e| AppError::internal("Failed to fetch lesson plan", e))?
        .ok_or_else(|| AppError::not_found(NOT_FOUND))?;
    Ok(Json(LessonPlan::from(row)))
}

async fn get_public(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id, INVALID_ID)?;
    let row = queries::get_public_lesson_plan(&state.pool, id)
        .await
        .map_err(|e| AppError::internal("Failed to fetch public lesson plan", e))?
        .ok_or_else(|| AppError::not_found("Public lesson plan not found"))?;
    Ok(Json(LessonPlan::from(row)))
}

async fn check_public(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id, INVALID_ID)?;
    let flag = queries::get_public_flag(&state.pool, id)
        .await
        .map_err(|e| AppError::internal("Failed to check lesson plan", e))?;
    Ok(Json(PublicStatus {
        exists: flag.is_some(),
        is_public: flag.unwrap_or(false),
    }))
}

async fn update(
    State(state): State<AppState>,
    Caller(user): Caller,
    Path(id): Path<String>,
    body: Result<Json<LessonPlanInput>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id, INVALID_ID)?;
    let Json(input) = body?;
    input.validate()?;

    let row = queries::update_lesson_plan(&state.pool, id, &user.id, &fields(&input))
        .await
        .map_err(|e| AppError::internal("Failed to update lesson plan", e))?
        .ok_or_else(|| AppError::not_found(NOT_FOUND))?;
    tracing::info!(id, user = %user.id, topics = input.topics.len(), "updated lesson plan");
    Ok(Json(LessonPlan::from(row)))
}

async fn remove(
    State(state): State<AppState>,
    Caller(user): Caller,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id = parse_id(&id, INVALID_ID)?;
    let removed = queries::delete_lesson_plan(&state.pool, id, &user.id)
        .await
        .map_err(|e| AppError::internal("Failed to delete lesson plan", e))?;
    if !removed {
        return Err(AppError::not_found(NOT_FOUND));
    }
    tracing::info!(id, user = %user.id, "deleted lesson plan");
    Ok(StatusCode::NO_CONTENT)
}
