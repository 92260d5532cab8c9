//! The lesson plan being edited.
//!
//! [`LessonSession`] owns the hierarchy, the in-memory plan, the selection
//! cursor and the editor buffer. Its methods are the only way to change
//! them; every method that fails leaves the session untouched.

mod error;
mod guard;
mod persist;
mod snapshot;

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use topicmark_db::models::FlatTopicRecord;

use crate::hierarchy::model::{self, TopicNode};
use crate::hierarchy::{ContentMap, extract_hierarchy, reconstruct_hierarchy, strip_frontmatter};
use crate::plan::LessonPlan;

pub use error::SessionError;
pub use guard::{GenerationOutcome, GenerationTicket};
pub use snapshot::{SessionSnapshot, SnapshotError};

/// Name given to a plan created implicitly without a main topic.
const UNTITLED_PLAN: &str = "New Lesson Plan";

static NEXT_EPOCH: AtomicU64 = AtomicU64::new(1);

/// Identifies one session instance; tickets from another instance never
/// match.
fn next_epoch() -> u64 {
    NEXT_EPOCH.fetch_add(1, Ordering::Relaxed)
}

/// The selected node. Exactly one topic or subtopic is active at a time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Cursor {
    Topic { name: String },
    Subtopic { name: String, parent: String },
}

impl Cursor {
    pub fn name(&self) -> &str {
        match self {
            Self::Topic { name } | Self::Subtopic { name, .. } => name,
        }
    }

    pub fn parent(&self) -> Option<&str> {
        match self {
            Self::Topic { .. } => None,
            Self::Subtopic { parent, .. } => Some(parent),
        }
    }

    pub fn is_subtopic(&self) -> bool {
        matches!(self, Self::Subtopic { .. })
    }
}

/// Whether a freshly selected node already had content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentState {
    /// Saved content was loaded into the editor.
    Saved,
    /// Nothing saved yet; the editor was cleared.
    NotGenerated,
}

/// Coarse progress of a session, derived from its state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Empty,
    HierarchyLoaded,
    NodeSelected,
    ContentGenerated,
}

#[derive(Debug, Clone, Default)]
pub struct LessonSession {
    search_query: String,
    main_topic: Option<String>,
    hierarchy: Vec<TopicNode>,
    plan: Option<LessonPlan>,
    content: ContentMap,
    has_content: BTreeSet<String>,
    editor: String,
    cursor: Option<Cursor>,
    dirty: bool,
    read_only: bool,
    epoch: u64,
    generation_seq: u64,
}

impl LessonSession {
    pub fn new() -> Self {
        Self {
            epoch: next_epoch(),
            ..Self::default()
        }
    }

    // -- accessors ----------------------------------------------------------

    pub fn search_query(&self) -> &str {
        &self.search_query
    }

    pub fn main_topic(&self) -> Option<&str> {
        self.main_topic.as_deref()
    }

    pub fn hierarchy(&self) -> &[TopicNode] {
        &self.hierarchy
    }

    pub fn plan(&self) -> Option<&LessonPlan> {
        self.plan.as_ref()
    }

    pub fn cursor(&self) -> Option<&Cursor> {
        self.cursor.as_ref()
    }

    pub fn editor(&self) -> &str {
        &self.editor
    }

    /// Content held for `topic` in this session, if any.
    pub fn content_of(&self, topic: &str) -> Option<&str> {
        self.content.get(topic).map(String::as_str)
    }

    /// Whether `topic` has non-blank content (used for highlighting).
    pub fn has_content(&self, topic: &str) -> bool {
        self.has_content.contains(topic)
    }

    pub fn topics_with_content(&self) -> impl Iterator<Item = &str> {
        self.has_content.iter().map(String::as_str)
    }

    /// Changes not yet sent to the server.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn phase(&self) -> SessionPhase {
        if self.hierarchy.is_empty() && self.plan.is_none() {
            return SessionPhase::Empty;
        }
        match &self.cursor {
            None => SessionPhase::HierarchyLoaded,
            Some(_) if self.editor.trim().is_empty() => SessionPhase::NodeSelected,
            Some(_) => SessionPhase::ContentGenerated,
        }
    }

    fn ensure_writable(&self) -> Result<(), SessionError> {
        if self.read_only {
            return Err(SessionError::ReadOnly);
        }
        Ok(())
    }

    // -- loading ------------------------------------------------------------

    /// Install a hierarchy produced by a topic search. An empty hierarchy is
    /// ignored. The main topic defaults to the query.
    pub fn load_hierarchy(&mut self, query: &str, hierarchy: Vec<TopicNode>) -> Result<(), SessionError> {
        self.ensure_writable()?;
        self.search_query = query.to_owned();
        if hierarchy.is_empty() {
            warn!(query, "topic search returned no topics; keeping previous hierarchy");
            return Ok(());
        }
        if self.main_topic.is_none() {
            self.main_topic = Some(query.to_owned());
        }
        self.hierarchy = hierarchy;
        Ok(())
    }

    /// Parse a topic-search response and install its hierarchy. Returns
    /// `false` and keeps the previous hierarchy when nothing usable was found.
    pub fn load_search_response(&mut self, query: &str, text: &str) -> Result<bool, SessionError> {
        self.ensure_writable()?;
        match extract_hierarchy(text) {
            Ok(hierarchy) => {
                self.load_hierarchy(query, hierarchy)?;
                Ok(true)
            }
            Err(e) => {
                warn!(query, error = %e, "no hierarchy in topic search response");
                Ok(false)
            }
        }
    }

    /// Replace the session with a stored plan. The selection and editor are
    /// cleared and the session is clean afterwards.
    pub fn load_plan(&mut self, plan: LessonPlan, read_only: bool) {
        self.cursor = None;
        self.editor.clear();
        self.generation_seq += 1;
        self.search_query = plan.main_topic.clone();
        self.main_topic = Some(plan.main_topic.clone());
        self.read_only = read_only;
        self.adopt_plan(plan);
    }

    /// Take `plan` as the authoritative copy, rebuilding everything derived
    /// from it but keeping the selection.
    fn adopt_plan(&mut self, plan: LessonPlan) {
        self.hierarchy = reconstruct_hierarchy(&plan.topics);
        self.content = plan
            .topics
            .iter()
            .map(|r| (r.topic.clone(), r.mdx_content.clone()))
            .collect();
        self.has_content = plan
            .topics
            .iter()
            .filter(|r| r.has_content())
            .map(|r| r.topic.clone())
            .collect();
        self.plan = Some(plan);
        self.dirty = false;
    }

    /// Back to an empty session.
    pub fn reset(&mut self) {
        // Keep the counter moving so tickets from before the reset stay stale.
        let generation_seq = self.generation_seq + 1;
        *self = Self {
            epoch: self.epoch,
            generation_seq,
            ..Self::default()
        };
    }

    // -- selection ----------------------------------------------------------

    pub fn select_topic(&mut self, name: &str) -> ContentState {
        self.select(Cursor::Topic {
            name: name.to_owned(),
        })
    }

    pub fn select_subtopic(&mut self, name: &str, parent: &str) -> ContentState {
        self.select(Cursor::Subtopic {
            name: name.to_owned(),
            parent: parent.to_owned(),
        })
    }

    fn select(&mut self, cursor: Cursor) -> ContentState {
        self.generation_seq += 1;
        let saved = self
            .plan
            .as_ref()
            .and_then(|p| p.record(cursor.name()))
            .filter(|r| r.has_content())
            .map(|r| strip_frontmatter(&r.mdx_content).to_owned());
        debug!(topic = cursor.name(), found = saved.is_some(), "node selected");
        self.cursor = Some(cursor);
        match saved {
            Some(text) => {
                self.editor = text;
                ContentState::Saved
            }
            None => {
                self.editor.clear();
                ContentState::NotGenerated
            }
        }
    }

    // -- structure ----------------------------------------------------------

    pub fn add_topic(&mut self, name: &str) -> Result<(), SessionError> {
        self.ensure_writable()?;
        let name = name.trim();
        if name.is_empty() {
            return Err(SessionError::EmptyName);
        }
        if model::find_topic(&self.hierarchy, name).is_some() {
            return Err(SessionError::DuplicateTopic(name.to_owned()));
        }
        self.hierarchy.push(TopicNode::new(name));
        self.touch();
        Ok(())
    }

    pub fn add_subtopic(&mut self, parent: &str, name: &str) -> Result<(), SessionError> {
        self.ensure_writable()?;
        let name = name.trim();
        if name.is_empty() {
            return Err(SessionError::EmptyName);
        }
        let node = model::find_topic_mut(&mut self.hierarchy, parent)
            .ok_or_else(|| SessionError::ParentNotFound(parent.to_owned()))?;
        if node.has_subtopic(name) {
            return Err(SessionError::DuplicateSubtopic {
                name: name.to_owned(),
                parent: parent.to_owned(),
            });
        }
        node.subtopics.push(name.to_owned());
        self.touch();
        Ok(())
    }

    /// Remove a main topic and all of its subtopics, along with their
    /// content.
    pub fn delete_topic(&mut self, name: &str) -> Result<(), SessionError> {
        self.ensure_writable()?;
        let idx = self
            .hierarchy
            .iter()
            .position(|n| n.name == name)
            .ok_or_else(|| SessionError::TopicNotFound(name.to_owned()))?;
        let node = self.hierarchy.remove(idx);

        self.forget(&node.name);
        for sub in &node.subtopics {
            self.forget(sub);
        }
        if self
            .cursor
            .as_ref()
            .is_some_and(|c| c.name() == node.name || c.parent() == Some(node.name.as_str()))
        {
            self.clear_selection();
        }
        self.touch();
        Ok(())
    }

    pub fn delete_subtopic(&mut self, name: &str, parent: &str) -> Result<(), SessionError> {
        self.ensure_writable()?;
        let node = model::find_topic_mut(&mut self.hierarchy, parent)
            .ok_or_else(|| SessionError::ParentNotFound(parent.to_owned()))?;
        let idx = node
            .subtopics
            .iter()
            .position(|s| s == name)
            .ok_or_else(|| SessionError::TopicNotFound(name.to_owned()))?;
        node.subtopics.remove(idx);

        self.forget(name);
        if self.cursor.as_ref().is_some_and(|c| c.name() == name) {
            self.clear_selection();
        }
        self.touch();
        Ok(())
    }

    /// Reorder main topics. `new_order` must name every current topic
    /// exactly once.
    pub fn reorder_topics<S: AsRef<str>>(&mut self, new_order: &[S]) -> Result<(), SessionError> {
        self.ensure_writable()?;
        let current: Vec<&str> = self.hierarchy.iter().map(|n| n.name.as_str()).collect();
        let perm = permutation(&current, new_order).ok_or(SessionError::NotAPermutation)?;

        let mut slots: Vec<Option<TopicNode>> = self.hierarchy.drain(..).map(Some).collect();
        self.hierarchy = perm.into_iter().filter_map(|i| slots[i].take()).collect();
        self.touch();
        Ok(())
    }

    pub fn reorder_subtopics<S: AsRef<str>>(&mut self, parent: &str, new_order: &[S]) -> Result<(), SessionError> {
        self.ensure_writable()?;
        let node = model::find_topic_mut(&mut self.hierarchy, parent)
            .ok_or_else(|| SessionError::ParentNotFound(parent.to_owned()))?;
        let current: Vec<&str> = node.subtopics.iter().map(String::as_str).collect();
        let perm = permutation(&current, new_order).ok_or(SessionError::NotAPermutation)?;

        node.subtopics = perm.into_iter().map(|i| node.subtopics[i].clone()).collect();
        self.touch();
        Ok(())
    }

    // -- content ------------------------------------------------------------

    /// Write `content` for `topic` into the in-memory plan, creating the plan
    /// or the record as needed.
    ///
    /// A subtopic saved without a parent is filed under the main topic. A
    /// main topic is its own parent.
    pub fn save_content(
        &mut self,
        topic: &str,
        content: &str,
        is_subtopic: bool,
        parent: Option<&str>,
    ) -> Result<(), SessionError> {
        self.ensure_writable()?;
        if topic.trim().is_empty() {
            return Err(SessionError::EmptyName);
        }
        let main = self.main_topic.clone().unwrap_or_default();
        let parent = if is_subtopic {
            parent.filter(|p| !p.is_empty()).unwrap_or(main.as_str()).to_owned()
        } else {
            topic.to_owned()
        };

        let plan = self.plan.get_or_insert_with(|| {
            let name = if main.is_empty() { UNTITLED_PLAN } else { main.as_str() };
            LessonPlan::draft(name, main.as_str())
        });
        match plan.topics.iter_mut().find(|r| r.topic == topic) {
            Some(record) => {
                record.mdx_content = content.to_owned();
                record.is_subtopic = is_subtopic;
                record.parent_topic = Some(parent);
                record.main_topic = Some(main);
            }
            None => plan.topics.push(FlatTopicRecord {
                topic: topic.to_owned(),
                mdx_content: content.to_owned(),
                is_subtopic,
                parent_topic: Some(parent),
                main_topic: Some(main),
                order: None,
            }),
        }

        self.content.insert(topic.to_owned(), content.to_owned());
        if content.trim().is_empty() {
            self.has_content.remove(topic);
        } else {
            self.has_content.insert(topic.to_owned());
        }
        self.dirty = true;
        Ok(())
    }

    /// Save the editor buffer as the content of the selected node.
    pub fn commit_editor(&mut self) -> Result<(), SessionError> {
        self.ensure_writable()?;
        if self.editor.trim().is_empty() {
            return Err(SessionError::EmptyContent);
        }
        let cursor = self.cursor.clone().ok_or(SessionError::NothingSelected)?;
        if self.main_topic.is_none() {
            return Err(SessionError::NoMainTopic);
        }
        let content = self.editor.clone();
        self.save_content(cursor.name(), &content, cursor.is_subtopic(), cursor.parent())
    }

    /// Replace the editor buffer. Marks the session dirty once a plan exists.
    pub fn set_editor_content(&mut self, text: &str) -> Result<(), SessionError> {
        self.ensure_writable()?;
        self.editor = text.to_owned();
        if self.plan.is_some() {
            self.dirty = true;
        }
        Ok(())
    }

    /// Change the plan's visibility. Without a plan there is nothing to do.
    pub fn set_public(&mut self, is_public: bool) -> Result<(), SessionError> {
        self.ensure_writable()?;
        if let Some(plan) = self.plan.as_mut() {
            plan.is_public = is_public;
            self.dirty = true;
        }
        Ok(())
    }

    pub fn rename_plan(&mut self, name: &str) -> Result<(), SessionError> {
        self.ensure_writable()?;
        let name = name.trim();
        if name.is_empty() {
            return Err(SessionError::EmptyName);
        }
        if let Some(plan) = self.plan.as_mut() {
            plan.name = name.to_owned();
            self.dirty = true;
        }
        Ok(())
    }

    fn clear_selection(&mut self) {
        self.cursor = None;
        self.editor.clear();
        self.generation_seq += 1;
    }

    fn forget(&mut self, topic: &str) {
        self.has_content.remove(topic);
        self.content.remove(topic);
        if let Some(plan) = self.plan.as_mut() {
            plan.topics.retain(|r| r.topic != topic);
        }
    }

    fn touch(&mut self) {
        if self.plan.is_some() {
            self.dirty = true;
        }
    }
}

/// Indices into `current` in the order `new_order` names them, or `None`
/// when `new_order` is not a permutation of `current`.
fn permutation<S: AsRef<str>>(current: &[&str], new_order: &[S]) -> Option<Vec<usize>> {
    if current.len() != new_order.len() {
        return None;
    }
    let mut used = vec![false; current.len()];
    new_order
        .iter()
        .map(|name| {
            let idx = current
                .iter()
                .enumerate()
                .position(|(i, c)| !used[i] && *c == name.as_ref())?;
            used[idx] = true;
            Some(idx)
        })
        .collect()
}
