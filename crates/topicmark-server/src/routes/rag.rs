//! Proxy to the RAG generation service.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::Value;

use topicmark_core::generation::{Endpoint, GenerationError, RagReply};

use super::{AppError, AppState, Caller};

pub(super) fn routes() -> Router<AppState> {
    Router::new().route("/rag/{endpoint}", post(proxy))
}

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

/// Failure of a proxied call. Raw endpoints answer in plain text, the rest
/// in the usual JSON error shape.
fn failure(endpoint: Endpoint, err: GenerationError) -> Response {
    let (status, message) = if err.is_client_error() {
        (StatusCode::BAD_REQUEST, err.to_string())
    } else {
        tracing::error!(endpoint = endpoint.name(), error = %err, "generation request failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to call {}", endpoint.name()),
        )
    };
    if endpoint.is_raw() {
        (status, [(CONTENT_TYPE, TEXT_PLAIN)], message).into_response()
    } else {
        AppError::new(status, message).into_response()
    }
}

async fn proxy(
    State(state): State<AppState>,
    Caller(user): Caller,
    Path(name): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Response, AppError> {
    let endpoint = Endpoint::from_name(&name)
        .ok_or_else(|| AppError::not_found(format!("Unknown generation endpoint: {name}")))?;
    let Json(body) = body?;

    tracing::debug!(endpoint = endpoint.name(), user = %user.id, "proxying generation request");
    let response = match state.rag.dispatch(endpoint, body).await {
        Ok(RagReply::Json(value)) => Json(value).into_response(),
        Ok(RagReply::Text(text)) => ([(CONTENT_TYPE, TEXT_PLAIN)], text).into_response(),
        Err(err) => failure(endpoint, err),
    };
    Ok(response)
}
