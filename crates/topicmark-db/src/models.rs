use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use sqlx::types::Json;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Difficulty of a saved topic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text")]
pub enum Difficulty {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Beginner => "Beginner",
            Self::Intermediate => "Intermediate",
            Self::Advanced => "Advanced",
        };
        f.write_str(s)
    }
}

impl FromStr for Difficulty {
    type Err = DifficultyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Beginner" => Ok(Self::Beginner),
            "Intermediate" => Ok(Self::Intermediate),
            "Advanced" => Ok(Self::Advanced),
            other => Err(DifficultyParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`Difficulty`] string.
#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid difficulty level: {0:?}")]
pub struct DifficultyParseError(pub String);

// ---------------------------------------------------------------------------
// Flat topic records
// ---------------------------------------------------------------------------

/// One node of a lesson plan's topic tree, in the flat form stored in the
/// `lesson_plans.topics` JSON array.
///
/// A root record points at itself through `parent_topic`; use
/// [`FlatTopicRecord::role`] rather than comparing the strings directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlatTopicRecord {
    pub topic: String,
    #[serde(default)]
    pub mdx_content: String,
    #[serde(default)]
    pub is_subtopic: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_topic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_topic: Option<String>,
    /// Position hint used when re-serializing. `None` means "append".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
}

/// Where a [`FlatTopicRecord`] sits in the two-level hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicRole<'a> {
    /// A main topic.
    Root,
    /// A subtopic of `parent`.
    Child { parent: &'a str },
    /// A subtopic whose parent was never recorded.
    Orphan,
}

impl FlatTopicRecord {
    /// A main-topic record. Its parent is itself.
    pub fn root(topic: impl Into<String>, mdx_content: impl Into<String>) -> Self {
        let topic = topic.into();
        Self {
            parent_topic: Some(topic.clone()),
            topic,
            mdx_content: mdx_content.into(),
            is_subtopic: false,
            main_topic: None,
            order: None,
        }
    }

    /// A subtopic record under `parent`.
    pub fn child(
        topic: impl Into<String>,
        parent: impl Into<String>,
        mdx_content: impl Into<String>,
    ) -> Self {
        Self {
            topic: topic.into(),
            mdx_content: mdx_content.into(),
            is_subtopic: true,
            parent_topic: Some(parent.into()),
            main_topic: None,
            order: None,
        }
    }

    pub fn with_main_topic(mut self, main_topic: impl Into<String>) -> Self {
        self.main_topic = Some(main_topic.into());
        self
    }

    pub fn with_order(mut self, order: i64) -> Self {
        self.order = Some(order);
        self
    }

    /// Classify the record. A record whose `parent_topic` equals its own
    /// name is a root even when `is_subtopic` is set.
    pub fn role(&self) -> TopicRole<'_> {
        match self.parent_topic.as_deref() {
            Some(parent) if parent == self.topic => TopicRole::Root,
            _ if !self.is_subtopic => TopicRole::Root,
            Some(parent) => TopicRole::Child { parent },
            None => TopicRole::Orphan,
        }
    }

    /// True when the record holds content worth highlighting.
    pub fn has_content(&self) -> bool {
        !self.mdx_content.trim().is_empty()
    }
}

// ---------------------------------------------------------------------------
// Row structs
// ---------------------------------------------------------------------------

/// A persisted lesson plan.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct LessonPlanRow {
    pub id: i32,
    pub user_id: String,
    pub name: String,
    pub main_topic: String,
    pub topics: Json<Vec<FlatTopicRecord>>,
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A standalone saved topic.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Topic {
    pub id: i32,
    pub user_id: String,
    pub axios_wing: String,
    pub topic: String,
    pub difficulty: Difficulty,
    pub mdx_content: String,
    pub main_topic: Option<String>,
    pub parent_topic: Option<String>,
    pub is_subtopic: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A cached identity, written on `GET /api/me`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
