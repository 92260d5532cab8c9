//! HTTP API served under `/api`.

mod lesson_plans;
mod rag;
mod topics;
mod users;

use axum::extract::rejection::JsonRejection;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::{Json, Router};
use sqlx::PgPool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use topicmark_core::generation::RagClient;
use topicmark_core::identity::{EMAIL_HEADER, FAMILY_NAME_HEADER, GIVEN_NAME_HEADER, Identity, USER_ID_HEADER};
use topicmark_core::validate::ValidationError;

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub rag: RagClient,
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
}

impl AppError {
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }

    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "Unauthorized")
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, msg)
    }

    /// Log the full error chain and answer with `msg`.
    pub fn internal(msg: &str, err: anyhow::Error) -> Self {
        tracing::error!(error = format!("{err:#}"), "{msg}");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        Self::bad_request(err.to_string())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(rejection.status(), rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let body = serde_json::json!({ "error": self.message });
        (self.status, Json(body)).into_response()
    }
}

/// Parse a numeric path id; anything else is a 400 with `invalid` as the
/// message.
pub(crate) fn parse_id(raw: &str, invalid: &str) -> Result<i32, AppError> {
    raw.parse::<i32>().map_err(|_| AppError::bad_request(invalid))
}

// ---------------------------------------------------------------------------
// Caller identity
// ---------------------------------------------------------------------------

/// The authenticated caller, read from the headers set by the
/// authenticating proxy. Rejects with 401 when `x-user-id` is missing.
#[derive(Debug, Clone)]
pub struct Caller(pub Identity);

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}

impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = header(&parts.headers, USER_ID_HEADER).ok_or_else(AppError::unauthorized)?;
        Ok(Caller(Identity {
            id,
            given_name: header(&parts.headers, GIVEN_NAME_HEADER),
            family_name: header(&parts.headers, FAMILY_NAME_HEADER),
            email: header(&parts.headers, EMAIL_HEADER),
        }))
    }
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .merge(lesson_plans::routes())
        .merge(topics::routes())
        .merge(users::routes())
        .merge(rag::routes());

    Router::new()
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod test_support {
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{Method, Request};
    use sqlx::PgPool;
    use tower::ServiceExt;

    use super::*;

    /// State whose generation client points at a port nothing listens on.
    pub fn state(pool: PgPool) -> AppState {
        AppState {
            pool,
            rag: RagClient::new("http://127.0.0.1:9", Duration::from_secs(2)).unwrap(),
        }
    }

    pub async fn send(
        state: AppState,
        method: Method,
        uri: &str,
        user: Option<&str>,
        body: Option<serde_json::Value>,
    ) -> axum::response::Response {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            req = req.header(USER_ID_HEADER, user);
        }
        let req = match body {
            Some(json) => req
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => req.body(Body::empty()).unwrap(),
        };
        build_router(state).oneshot(req).await.unwrap()
    }

    pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), 1_048_576)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use axum::http::Method;

    use super::test_support::{body_json, send, state};
    use super::*;
    use topicmark_test_utils::{create_test_db, drop_test_db};

    #[test]
    fn parse_id_rejects_non_numeric() {
        assert_eq!(parse_id("42", "bad").unwrap(), 42);
        let err = parse_id("forty-two", "Invalid lesson plan ID").unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.message, "Invalid lesson plan ID");
    }

    #[tokio::test]
    async fn missing_identity_is_unauthorized() {
        let (pool, db_name) = create_test_db().await;

        let resp = send(state(pool.clone()), Method::GET, "/api/lessonPlans", None, None).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(resp).await["error"], "Unauthorized");

        pool.close().await;
        drop_test_db(&db_name).await;
    }
}
