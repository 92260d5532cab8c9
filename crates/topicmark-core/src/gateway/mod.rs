//! Persistence boundary for lesson plans.
//!
//! The session talks to storage only through [`LessonPlanGateway`]. The
//! production implementation is [`HttpGateway`]; tests substitute an
//! in-memory one.

pub mod http;

use async_trait::async_trait;
use thiserror::Error;

use crate::plan::{LessonPlan, LessonPlanInput, PublicStatus};

pub use http::HttpGateway;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("lesson plan not found")]
    NotFound,

    #[error("not authorized")]
    Unauthorized,

    #[error("server returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("unexpected response body: {0}")]
    Decode(#[source] reqwest::Error),
}

impl GatewayError {
    /// Not-found and permission failures, after which a loaded session
    /// should be cleared rather than left half-populated.
    pub fn is_missing_or_forbidden(&self) -> bool {
        matches!(self, Self::NotFound | Self::Unauthorized)
    }
}

/// CRUD over lesson plans, scoped to the caller the gateway was built for.
#[async_trait]
pub trait LessonPlanGateway: Send + Sync {
    async fn create(&self, plan: &LessonPlanInput) -> Result<LessonPlan, GatewayError>;

    async fn update(&self, id: i32, plan: &LessonPlanInput) -> Result<LessonPlan, GatewayError>;

    /// Fetch one of the caller's own plans.
    async fn get_by_id(&self, id: i32) -> Result<LessonPlan, GatewayError>;

    /// Fetch any public plan.
    async fn get_public_by_id(&self, id: i32) -> Result<LessonPlan, GatewayError>;

    async fn list_mine(&self) -> Result<Vec<LessonPlan>, GatewayError>;

    async fn list_public(&self) -> Result<Vec<LessonPlan>, GatewayError>;

    async fn delete(&self, id: i32) -> Result<(), GatewayError>;

    async fn check_public(&self, id: i32) -> Result<PublicStatus, GatewayError>;
}

/// Lookup of standalone saved topics, consulted when selecting a node
/// while no lesson plan is loaded.
#[async_trait]
pub trait SavedTopicLookup: Send + Sync {
    /// MDX content of the caller's saved topic named `name`, if any.
    async fn saved_content(&self, name: &str) -> Result<Option<String>, GatewayError>;
}

// Both traits must stay usable as trait objects.
const _: () = {
    fn _assert_object_safe(_: &dyn LessonPlanGateway, _: &dyn SavedTopicLookup) {}
};
