//! Pulling structured data out of generated text.

use thiserror::Error;

use super::model::TopicNode;

const FENCE_OPEN: &str = "```json";
const FENCE_CLOSE: &str = "```";

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("no ```json block found in topic search response")]
    MissingBlock,

    #[error("topic hierarchy is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("topic hierarchy is empty")]
    Empty,
}

/// Parse the first fenced ```` ```json ```` block of a topic-search
/// response into a hierarchy.
pub fn extract_hierarchy(text: &str) -> Result<Vec<TopicNode>, ExtractError> {
    let start = text.find(FENCE_OPEN).ok_or(ExtractError::MissingBlock)?;
    let after_fence = &text[start + FENCE_OPEN.len()..];
    let body_start = after_fence.find('\n').ok_or(ExtractError::MissingBlock)? + 1;
    let body = &after_fence[body_start..];
    let end = body.find(FENCE_CLOSE).ok_or(ExtractError::MissingBlock)?;

    let nodes: Vec<TopicNode> = serde_json::from_str(body[..end].trim())?;
    if nodes.is_empty() {
        return Err(ExtractError::Empty);
    }
    Ok(nodes)
}

/// Drop a leading `---` frontmatter block and the whitespace after it.
/// Content without a closing `---` is returned unchanged.
pub fn strip_frontmatter(mdx: &str) -> &str {
    let trimmed = mdx.trim_start();
    let Some(rest) = trimmed.strip_prefix("---") else {
        return mdx;
    };
    match rest.find("---") {
        Some(end) => rest[end + 3..].trim(),
        None => mdx,
    }
}
