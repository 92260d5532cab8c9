//! Matching generation results to the node they were requested for.
//!
//! A ticket is issued when a request goes out. Selecting another node,
//! clearing the selection or loading a plan advances the session's sequence
//! number, so a ticket whose result arrives late no longer matches and its
//! result is dropped.

use std::ops::Range;

use tracing::debug;

use super::{Cursor, LessonSession, SessionError};
use crate::generation::refine::splice_refinement;
use crate::hierarchy::strip_frontmatter;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationTicket {
    epoch: u64,
    seq: u64,
    cursor: Cursor,
    main_topic: String,
    editor: String,
}

impl GenerationTicket {
    /// The node the request is about.
    pub fn topic(&self) -> &str {
        self.cursor.name()
    }

    pub fn parent(&self) -> Option<&str> {
        self.cursor.parent()
    }

    pub fn main_topic(&self) -> &str {
        &self.main_topic
    }

    /// Editor buffer at the time the ticket was issued.
    pub fn editor(&self) -> &str {
        &self.editor
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationOutcome {
    Applied,
    /// The session moved on; the result was discarded.
    Stale,
}

impl LessonSession {
    pub fn begin_generation(&mut self) -> Result<GenerationTicket, SessionError> {
        self.ensure_writable()?;
        let cursor = self.cursor.clone().ok_or(SessionError::NothingSelected)?;
        let main_topic = self.main_topic.clone().ok_or(SessionError::NoMainTopic)?;
        self.generation_seq += 1;
        Ok(GenerationTicket {
            epoch: self.epoch,
            seq: self.generation_seq,
            cursor,
            main_topic,
            editor: self.editor.clone(),
        })
    }

    /// Whether a result for `ticket` would still be applied.
    pub fn is_current(&self, ticket: &GenerationTicket) -> bool {
        ticket.epoch == self.epoch
            && ticket.seq == self.generation_seq
            && self.cursor.as_ref() == Some(&ticket.cursor)
    }

    /// Put generated content into the editor if `ticket` is still current.
    pub fn apply_generation(
        &mut self,
        ticket: &GenerationTicket,
        mdx: &str,
    ) -> Result<GenerationOutcome, SessionError> {
        if !self.is_current(ticket) {
            debug!(topic = ticket.topic(), "dropping stale generation result");
            return Ok(GenerationOutcome::Stale);
        }
        self.set_editor_content(strip_frontmatter(mdx))?;
        Ok(GenerationOutcome::Applied)
    }

    /// Splice a refined span into the editor. The selection is in bytes of
    /// the buffer captured by the ticket; if the buffer has been edited since,
    /// the result is stale.
    pub fn apply_refinement(
        &mut self,
        ticket: &GenerationTicket,
        selection: Range<usize>,
        response: &str,
    ) -> Result<GenerationOutcome, SessionError> {
        if !self.is_current(ticket) || self.editor != ticket.editor {
            debug!(topic = ticket.topic(), "dropping stale refinement");
            return Ok(GenerationOutcome::Stale);
        }
        let spliced = splice_refinement(&ticket.editor, selection, response)?;
        self.set_editor_content(&spliced.document)?;
        Ok(GenerationOutcome::Applied)
    }
}
