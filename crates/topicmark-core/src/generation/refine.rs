//! Substituting a refined span back into the editor buffer.
//!
//! Raw refinement endpoints return the whole document with the selected span
//! rewritten. When the response wraps the rewritten span in
//! [`REFINED_START`] / [`REFINED_END`] markers it is taken verbatim;
//! otherwise it is recovered by length arithmetic against the original
//! buffer, which assumes the text outside the selection came back untouched.

use std::ops::Range;

use thiserror::Error;

use crate::hierarchy::strip_frontmatter;

pub const REFINED_START: &str = "<!-- refined:start -->";
pub const REFINED_END: &str = "<!-- refined:end -->";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RefineError {
    #[error("selection {start}..{end} is outside the {len}-byte document")]
    SelectionOutOfBounds { start: usize, end: usize, len: usize },

    #[error("selection {start}..{end} does not fall on character boundaries")]
    SelectionNotOnCharBoundary { start: usize, end: usize },

    #[error("refined document ({response_len} bytes) is shorter than the unchanged text around the selection ({context_len} bytes)")]
    ResponseTooShort { response_len: usize, context_len: usize },

    #[error("refined span does not fall on character boundaries")]
    ResponseNotOnCharBoundary,
}

/// Result of [`splice_refinement`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spliced {
    /// The rewritten span alone.
    pub refined: String,
    /// `original` with the selection replaced by `refined`.
    pub document: String,
}

/// Replace `selection` (byte offsets into `original`) with the refined span
/// found in `response`.
pub fn splice_refinement(
    original: &str,
    selection: Range<usize>,
    response: &str,
) -> Result<Spliced, RefineError> {
    let Range { start, end } = selection;
    if start > end || end > original.len() {
        return Err(RefineError::SelectionOutOfBounds {
            start,
            end,
            len: original.len(),
        });
    }
    if !original.is_char_boundary(start) || !original.is_char_boundary(end) {
        return Err(RefineError::SelectionNotOnCharBoundary { start, end });
    }

    let response = strip_frontmatter(response);
    let refined = match between_markers(response) {
        Some(span) => span,
        None => by_position(original.len(), start, end, response)?,
    };

    let mut document = String::with_capacity(original.len() - (end - start) + refined.len());
    document.push_str(&original[..start]);
    document.push_str(refined);
    document.push_str(&original[end..]);

    Ok(Spliced {
        refined: refined.to_owned(),
        document,
    })
}

fn between_markers(response: &str) -> Option<&str> {
    let open = response.find(REFINED_START)? + REFINED_START.len();
    let close = response[open..].find(REFINED_END)? + open;
    Some(&response[open..close])
}

fn by_position(original_len: usize, start: usize, end: usize, response: &str) -> Result<&str, RefineError> {
    let suffix_len = original_len - end;
    let context_len = start + suffix_len;
    if response.len() < context_len {
        return Err(RefineError::ResponseTooShort {
            response_len: response.len(),
            context_len,
        });
    }
    response
        .get(start..response.len() - suffix_len)
        .ok_or(RefineError::ResponseNotOnCharBoundary)
}

/// Replace the first occurrence of `selected` in `mdx`.
pub fn direct_replace(mdx: &str, selected: &str, replacement: &str) -> String {
    mdx.replacen(selected, replacement, 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = "Intro line.\nThe sky is blue.\nOutro line.";

    fn selection_of(doc: &str, needle: &str) -> Range<usize> {
        let start = doc.find(needle).unwrap();
        start..start + needle.len()
    }

    #[test]
    fn splices_by_position() {
        let sel = selection_of(DOC, "The sky is blue.");
        let response = "Intro line.\nThe sky appears blue due to Rayleigh scattering.\nOutro line.";
        let out = splice_refinement(DOC, sel, response).unwrap();
        assert_eq!(out.refined, "The sky appears blue due to Rayleigh scattering.");
        assert_eq!(out.document, response);
    }

    #[test]
    fn prefers_markers_when_present() {
        let sel = selection_of(DOC, "The sky is blue.");
        let response = format!(
            "Intro line, reworded.\n{REFINED_START}Sky: blue.{REFINED_END}\nOutro line."
        );
        let out = splice_refinement(DOC, sel, &response).unwrap();
        assert_eq!(out.refined, "Sky: blue.");
        assert_eq!(out.document, "Intro line.\nSky: blue.\nOutro line.");
    }

    #[test]
    fn frontmatter_in_response_is_ignored() {
        let sel = selection_of(DOC, "blue");
        let response = "---\ntitle: x\n---\nIntro line.\nThe sky is azure.\nOutro line.";
        let out = splice_refinement(DOC, sel, response).unwrap();
        assert_eq!(out.refined, "azure");
    }

    #[test]
    fn short_response_is_rejected() {
        let sel = selection_of(DOC, "The sky is blue.");
        let err = splice_refinement(DOC, sel, "tiny").unwrap_err();
        assert!(matches!(err, RefineError::ResponseTooShort { .. }));
    }

    #[test]
    fn bad_selections_are_rejected() {
        assert!(matches!(
            splice_refinement(DOC, 5..500, DOC),
            Err(RefineError::SelectionOutOfBounds { .. })
        ));
        let doc = "héllo";
        assert!(matches!(
            splice_refinement(doc, 2..3, doc),
            Err(RefineError::SelectionNotOnCharBoundary { .. })
        ));
    }

    #[test]
    fn empty_selection_inserts() {
        let out = splice_refinement("ab", 1..1, "aXb").unwrap();
        assert_eq!(out.refined, "X");
        assert_eq!(out.document, "aXb");
    }

    #[test]
    fn direct_replace_touches_first_match_only() {
        assert_eq!(direct_replace("a b a", "a", "z"), "z b a");
        assert_eq!(direct_replace("abc", "q", "z"), "abc");
    }
}
