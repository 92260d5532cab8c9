use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;

use topicmark_db::queries::users::{self as queries, UserProfile};

use super::{AppError, AppState, Caller};

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/me", get(me))
        .route("/user/{id}", get(public_profile))
}

/// The caller as the proxy describes them. The profile is cached in
/// `users` on the way through; a cache failure does not fail the request.
async fn me(State(state): State<AppState>, Caller(user): Caller) -> impl IntoResponse {
    let profile = UserProfile {
        given_name: user.given_name.as_deref(),
        family_name: user.family_name.as_deref(),
        email: user.email.as_deref(),
    };
    if let Err(e) = queries::upsert_user(&state.pool, &user.id, &profile).await {
        tracing::warn!(user = %user.id, error = format!("{e:#}"), "failed to cache user");
    }
    Json(json!({ "user": user }))
}

async fn public_profile(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let user = queries::get_user(&state.pool, &id)
        .await
        .map_err(|e| AppError::internal("Failed to fetch user", e))?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    Ok(Json(json!({
        "user": {
            "id": user.id,
            "given_name": user.given_name,
            "family_name": user.family_name,
        }
    })))
}
