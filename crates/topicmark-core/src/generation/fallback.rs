//! Placeholder documents served when LLM-only generation fails.

use std::fmt::Write as _;

/// Why the upstream call did not produce content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackReason {
    /// The endpoint does not exist upstream.
    EndpointMissing,
    /// Upstream rejected the request; carries its error body.
    Rejected { details: String },
    /// Any other non-success status.
    Status { code: u16, reason: String },
    /// The service could not be reached.
    Unreachable,
}

impl FallbackReason {
    pub fn from_status(code: u16, reason: &str, body: &str) -> Self {
        match code {
            404 => Self::EndpointMissing,
            422 => Self::Rejected {
                details: pretty_details(body),
            },
            _ => Self::Status {
                code,
                reason: reason.to_owned(),
            },
        }
    }
}

fn pretty_details(body: &str) -> String {
    if body.trim().is_empty() {
        return "Unknown validation error".to_owned();
    }
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| serde_json::to_string_pretty(&v).ok())
        .unwrap_or_else(|| body.to_owned())
}

/// Render a placeholder MDX document for `selected_topic`.
pub fn fallback_mdx(
    selected_topic: &str,
    main_topic: &str,
    reason: &FallbackReason,
    service_url: &str,
    endpoint: &str,
) -> String {
    let mut out = format!("# {selected_topic}\n\n");
    // Writing to a String cannot fail.
    let _ = match reason {
        FallbackReason::EndpointMissing => write!(
            out,
            "## Overview\n\n\
             Content for \"{selected_topic}\" in the context of \"{main_topic}\" could not be generated \
             because the generation endpoint is unavailable.\n\n\
             1. Check that the generation service is running at {service_url}\n\
             2. Check that it serves {endpoint}\n\
             3. Try the URL-based or crawling generation methods instead\n"
        ),
        FallbackReason::Rejected { details } => write!(
            out,
            "## Content Generation Error\n\n\
             The generation service rejected the request for \"{selected_topic}\" in the context of \
             \"{main_topic}\" (422 Unprocessable Entity).\n\n\
             ### Error Details\n\n```\n{details}\n```\n\n\
             Try the URL-based or crawling generation methods instead.\n"
        ),
        FallbackReason::Status { code, reason } => write!(
            out,
            "## Error Generating Content\n\n\
             The generation service answered {code} {reason} for \"{selected_topic}\" in the context of \
             \"{main_topic}\".\n\n\
             ### Try Alternative Methods\n\n\
             - Use the URL-based generation method\n\
             - Use the crawling generation method\n\
             - Select the topic again later\n"
        ),
        FallbackReason::Unreachable => write!(
            out,
            "## Connection Error\n\n\
             Unable to connect to the generation service at {service_url}.\n\n\
             - Start the service if it is not running\n\
             - Check network connectivity\n\
             - Check the configured service URL\n"
        ),
    };
    out
}
