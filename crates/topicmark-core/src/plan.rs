//! Client-side view of a lesson plan and the payload used to save one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use topicmark_db::models::{FlatTopicRecord, LessonPlanRow};

use crate::validate::{self, Validate, ValidationError};

/// A lesson plan as the client holds it. `id`, `user_id` and the timestamps
/// are assigned by the server and stay `None` until the first save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonPlan {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub name: String,
    pub main_topic: String,
    #[serde(default)]
    pub topics: Vec<FlatTopicRecord>,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl LessonPlan {
    /// An unsaved plan with no topics.
    pub fn draft(name: impl Into<String>, main_topic: impl Into<String>) -> Self {
        Self {
            id: None,
            user_id: None,
            name: name.into(),
            main_topic: main_topic.into(),
            topics: Vec::new(),
            is_public: false,
            created_at: None,
            updated_at: None,
        }
    }

    pub fn record(&self, topic: &str) -> Option<&FlatTopicRecord> {
        self.topics.iter().find(|r| r.topic == topic)
    }

    /// Payload for `create`/`update` with the given topics.
    pub fn to_input(&self, topics: Vec<FlatTopicRecord>) -> LessonPlanInput {
        LessonPlanInput {
            name: self.name.clone(),
            main_topic: self.main_topic.clone(),
            topics,
            is_public: self.is_public,
        }
    }
}

impl From<LessonPlanRow> for LessonPlan {
    fn from(row: LessonPlanRow) -> Self {
        Self {
            id: Some(row.id),
            user_id: Some(row.user_id),
            name: row.name,
            main_topic: row.main_topic,
            topics: row.topics.0,
            is_public: row.is_public,
            created_at: Some(row.created_at),
            updated_at: Some(row.updated_at),
        }
    }
}

/// Body of `POST /api/lessonPlans` and `PUT /api/lessonPlans/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonPlanInput {
    pub name: String,
    pub main_topic: String,
    #[serde(default)]
    pub topics: Vec<FlatTopicRecord>,
    #[serde(default)]
    pub is_public: bool,
}

impl Validate for LessonPlanInput {
    fn validate(&self) -> Result<(), ValidationError> {
        validate::non_empty("name", &self.name)?;
        validate::non_empty("mainTopic", &self.main_topic)?;
        for record in &self.topics {
            validate::non_empty("topics.topic", &record.topic)?;
        }
        Ok(())
    }
}

/// Reply of `GET /api/lessonPlans/check-public/{id}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicStatus {
    pub exists: bool,
    pub is_public: bool,
}
