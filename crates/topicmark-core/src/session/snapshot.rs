//! Serializable copy of a session, so an editing session can be resumed.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{Cursor, LessonSession};
use crate::hierarchy::{ContentMap, TopicNode};
use crate::plan::LessonPlan;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("failed to access snapshot {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("snapshot {path} is not valid: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    #[serde(default)]
    pub search_query: String,
    #[serde(default)]
    pub main_topic: Option<String>,
    #[serde(default)]
    pub hierarchy: Vec<TopicNode>,
    #[serde(default)]
    pub plan: Option<LessonPlan>,
    #[serde(default)]
    pub content: ContentMap,
    #[serde(default)]
    pub has_content: BTreeSet<String>,
    #[serde(default)]
    pub editor: String,
    #[serde(default)]
    pub cursor: Option<Cursor>,
    #[serde(default)]
    pub dirty: bool,
    #[serde(default)]
    pub read_only: bool,
}

impl SessionSnapshot {
    pub fn read_from(path: &Path) -> Result<Self, SnapshotError> {
        let bytes = fs::read(path).map_err(|source| SnapshotError::Io {
            path: path.to_owned(),
            source,
        })?;
        serde_json::from_slice(&bytes).map_err(|source| SnapshotError::Json {
            path: path.to_owned(),
            source,
        })
    }

    pub fn write_to(&self, path: &Path) -> Result<(), SnapshotError> {
        let json = serde_json::to_vec_pretty(self).map_err(|source| SnapshotError::Json {
            path: path.to_owned(),
            source,
        })?;
        fs::write(path, json).map_err(|source| SnapshotError::Io {
            path: path.to_owned(),
            source,
        })
    }
}

impl LessonSession {
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            search_query: self.search_query.clone(),
            main_topic: self.main_topic.clone(),
            hierarchy: self.hierarchy.clone(),
            plan: self.plan.clone(),
            content: self.content.clone(),
            has_content: self.has_content.clone(),
            editor: self.editor.clone(),
            cursor: self.cursor.clone(),
            dirty: self.dirty,
            read_only: self.read_only,
        }
    }

    /// Rebuild a session from a snapshot. The restored session is a new
    /// instance, so generation tickets issued before the snapshot never
    /// apply to it.
    pub fn restore(snapshot: SessionSnapshot) -> Self {
        Self {
            search_query: snapshot.search_query,
            main_topic: snapshot.main_topic,
            hierarchy: snapshot.hierarchy,
            plan: snapshot.plan,
            content: snapshot.content,
            has_content: snapshot.has_content,
            editor: snapshot.editor,
            cursor: snapshot.cursor,
            dirty: snapshot.dirty,
            read_only: snapshot.read_only,
            epoch: super::next_epoch(),
            generation_seq: 0,
        }
    }
}
