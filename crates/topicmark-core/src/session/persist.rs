//! Session operations that go through the persistence gateway.
//!
//! Nothing here mutates the session until the gateway has answered, so a
//! failed request leaves it exactly as it was.

use tracing::{info, warn};

use topicmark_db::models::FlatTopicRecord;

use super::{ContentState, Cursor, LessonSession, SessionError};
use crate::access::{Access, access_mode};
use crate::gateway::{GatewayError, LessonPlanGateway, SavedTopicLookup};
use crate::hierarchy::{flatten_for_save, strip_frontmatter};
use crate::plan::LessonPlan;

impl LessonSession {
    /// Records that [`save`](Self::save) would send, with the editor buffer
    /// standing in for the selected node's content.
    pub fn pending_records(&self) -> Result<Vec<FlatTopicRecord>, SessionError> {
        let main_topic = self.main_topic.as_deref().ok_or(SessionError::NoMainTopic)?;

        let mut content = self.content.clone();
        if let Some(cursor) = self.cursor.as_ref().filter(|_| !self.editor.trim().is_empty()) {
            content.insert(cursor.name().to_owned(), self.editor.clone());
        }

        let existing = self.plan.as_ref().map(|p| p.topics.as_slice());
        let records = flatten_for_save(&self.hierarchy, &content, existing, main_topic);
        if records.is_empty() {
            return Err(SessionError::NothingToSave);
        }
        Ok(records)
    }

    /// Create or update the plan on the server and adopt the server's copy.
    /// The selection and editor are kept.
    pub async fn save<G>(&mut self, gateway: &G) -> Result<(), SessionError>
    where
        G: LessonPlanGateway + ?Sized,
    {
        self.ensure_writable()?;
        let records = self.pending_records()?;
        let main_topic = self.main_topic.as_deref().unwrap_or_default();

        let input = match &self.plan {
            Some(plan) => plan.to_input(records),
            None => LessonPlan::draft(main_topic, main_topic).to_input(records),
        };
        let saved = match self.plan.as_ref().and_then(|p| p.id) {
            Some(id) => gateway.update(id, &input).await?,
            None => gateway.create(&input).await?,
        };

        info!(id = ?saved.id, topics = saved.topics.len(), "lesson plan saved");
        self.adopt_plan(saved);
        Ok(())
    }

    /// Load plan `id`, first as the caller's own, then as a public plan.
    ///
    /// If neither is available the session is cleared. Other failures leave
    /// it untouched.
    pub async fn open<G>(&mut self, gateway: &G, id: i32, viewer: Option<&str>) -> Result<Access, SessionError>
    where
        G: LessonPlanGateway + ?Sized,
    {
        let plan = match gateway.get_by_id(id).await {
            Ok(plan) => plan,
            Err(e) if e.is_missing_or_forbidden() => match gateway.get_public_by_id(id).await {
                Ok(plan) => plan,
                Err(e) if e.is_missing_or_forbidden() => {
                    warn!(id, error = %e, "lesson plan unavailable; clearing session");
                    self.reset();
                    return Err(e.into());
                }
                Err(e) => return Err(e.into()),
            },
            Err(e) => return Err(e.into()),
        };

        let access = access_mode(viewer, plan.user_id.as_deref(), plan.is_public);
        if access == Access::Denied {
            warn!(id, "lesson plan is neither owned nor public; clearing session");
            self.reset();
            return Err(GatewayError::Unauthorized.into());
        }

        info!(id, ?access, "lesson plan opened");
        self.load_plan(plan, access != Access::Owner);
        Ok(access)
    }

    /// Like [`select_topic`](Self::select_topic), but with no plan loaded
    /// falls back to the caller's saved topics. The lookup runs before the
    /// selection moves, so a failed lookup leaves the session as it was.
    pub async fn select_topic_with_lookup<L>(&mut self, lookup: &L, name: &str) -> Result<ContentState, SessionError>
    where
        L: SavedTopicLookup + ?Sized,
    {
        let saved = self.saved_content_for(lookup, name).await?;
        let state = self.select_topic(name);
        Ok(self.fill_from_saved(state, saved))
    }

    pub async fn select_subtopic_with_lookup<L>(
        &mut self,
        lookup: &L,
        name: &str,
        parent: &str,
    ) -> Result<ContentState, SessionError>
    where
        L: SavedTopicLookup + ?Sized,
    {
        let saved = self.saved_content_for(lookup, name).await?;
        let state = self.select_subtopic(name, parent);
        Ok(self.fill_from_saved(state, saved))
    }

    /// Saved content for `name`, fetched only when no plan is loaded.
    async fn saved_content_for<L>(&self, lookup: &L, name: &str) -> Result<Option<String>, SessionError>
    where
        L: SavedTopicLookup + ?Sized,
    {
        if self.plan.is_some() || name.trim().is_empty() {
            return Ok(None);
        }
        let mdx = lookup.saved_content(name).await?;
        Ok(mdx.filter(|m| !m.trim().is_empty()))
    }

    fn fill_from_saved(&mut self, state: ContentState, saved: Option<String>) -> ContentState {
        let (Some(mdx), Some(cursor)) = (saved, self.cursor.clone()) else {
            return state;
        };
        if state == ContentState::Saved {
            return state;
        }

        self.editor = strip_frontmatter(&mdx).to_owned();
        if !self.read_only {
            let (is_subtopic, parent) = match &cursor {
                Cursor::Topic { .. } => (false, None),
                Cursor::Subtopic { parent, .. } => (true, Some(parent.as_str())),
            };
            if let Err(e) = self.save_content(cursor.name(), &mdx, is_subtopic, parent) {
                warn!(topic = cursor.name(), error = %e, "saved topic not recorded");
            }
        }
        ContentState::Saved
    }
}
