use thiserror::Error;

use crate::gateway::GatewayError;
use crate::generation::refine::RefineError;

/// Why a session operation was refused. No variant is raised after state
/// has changed, with one exception: `open` clears the session before
/// returning a not-found or permission error.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("topic name cannot be empty")]
    EmptyName,

    #[error("topic {0:?} already exists")]
    DuplicateTopic(String),

    #[error("parent topic {0:?} not found")]
    ParentNotFound(String),

    #[error("subtopic {name:?} already exists under {parent:?}")]
    DuplicateSubtopic { name: String, parent: String },

    #[error("topic {0:?} not found")]
    TopicNotFound(String),

    #[error("new order is not a permutation of the current names")]
    NotAPermutation,

    #[error("lesson plan is read-only")]
    ReadOnly,

    #[error("no topic or subtopic is selected")]
    NothingSelected,

    #[error("no main topic; search for a topic first")]
    NoMainTopic,

    #[error("cannot save empty content")]
    EmptyContent,

    #[error("lesson plan has no topics to save")]
    NothingToSave,

    #[error(transparent)]
    Refine(#[from] RefineError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}
