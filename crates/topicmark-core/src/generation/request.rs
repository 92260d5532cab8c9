//! Request bodies accepted by the generation endpoints.
//!
//! Field names are the snake_case names the RAG service uses, so the same
//! types deserialize incoming API calls and serialize outgoing ones.

use serde::{Deserialize, Serialize};

use crate::validate::{self, Validate, ValidationError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchTopicsRequest {
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

impl Validate for SearchTopicsRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        validate::non_empty("query", &self.query)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SingleTopicRequest {
    pub selected_topic: String,
    pub main_topic: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_results: Option<u32>,
}

impl SingleTopicRequest {
    /// Copy with `topic` defaulted to `selected_topic`, as upstream expects.
    pub(crate) fn resolved(&self) -> Self {
        let mut out = self.clone();
        if out.topic.as_deref().is_none_or(str::is_empty) {
            out.topic = Some(out.selected_topic.clone());
        }
        out
    }
}

impl Validate for SingleTopicRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        validate::non_empty("selected_topic", &self.selected_topic)?;
        validate::non_empty("main_topic", &self.main_topic)
    }
}

/// LLM-only generation. Upstream only accepts the two topic fields, so
/// `topic` is accepted but never forwarded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LlmOnlyRequest {
    pub selected_topic: String,
    pub main_topic: String,
    #[serde(default, skip_serializing)]
    pub topic: Option<String>,
}

impl Validate for LlmOnlyRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        validate::non_empty("selected_topic", &self.selected_topic)?;
        validate::non_empty("main_topic", &self.main_topic)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlMdxRequest {
    pub url: String,
    pub selected_topic: String,
    pub main_topic: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_llm_knowledge: Option<bool>,
}

impl Validate for UrlMdxRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        validate::url("url", &self.url)?;
        validate::non_empty("selected_topic", &self.selected_topic)?;
        validate::non_empty("main_topic", &self.main_topic)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlsMdxRequest {
    pub urls: Vec<String>,
    pub selected_topic: String,
    pub main_topic: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_llm_knowledge: Option<bool>,
}

impl Validate for UrlsMdxRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        for url in &self.urls {
            validate::url("urls", url)?;
        }
        validate::non_empty("selected_topic", &self.selected_topic)?;
        validate::non_empty("main_topic", &self.main_topic)
    }
}

/// Whole-document refinement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefineRequest {
    pub mdx: String,
    pub question: String,
}

impl Validate for RefineRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        validate::non_empty("question", &self.question)
    }
}

/// Refinement of a selected span. With `direct_replacement` set the span is
/// replaced locally and upstream is never called.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionRefineRequest {
    pub mdx: String,
    pub question: String,
    pub selected_text: String,
    pub topic: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direct_replacement: Option<String>,
}

impl Validate for SelectionRefineRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        validate::non_empty("question", &self.question)?;
        validate::non_empty("topic", &self.topic)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlRefineRequest {
    pub mdx: String,
    pub question: String,
    pub selected_text: String,
    pub topic: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_results: Option<u32>,
}

impl Validate for CrawlRefineRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        validate::non_empty("question", &self.question)?;
        validate::non_empty("topic", &self.topic)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlsRefineRequest {
    pub mdx: String,
    pub question: String,
    pub selected_text: String,
    pub topic: String,
    pub urls: Vec<String>,
}

impl Validate for UrlsRefineRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        validate::non_empty("question", &self.question)?;
        validate::non_empty("topic", &self.topic)?;
        for url in &self.urls {
            validate::url("urls", url)?;
        }
        Ok(())
    }
}

/// Body sent upstream for the span-refinement endpoints. Upstream wants the
/// topic under both `selected_topic` and `main_topic`.
#[derive(Debug, Serialize)]
pub(crate) struct SpanRefineUpstream<'a> {
    pub mdx: &'a str,
    pub question: &'a str,
    pub selected_text: &'a str,
    pub selected_topic: &'a str,
    pub main_topic: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_results: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub urls: Option<&'a [String]>,
}

impl<'a> SpanRefineUpstream<'a> {
    fn new(mdx: &'a str, question: &'a str, selected_text: &'a str, topic: &'a str) -> Self {
        Self {
            mdx,
            question,
            selected_text,
            selected_topic: topic,
            main_topic: topic,
            num_results: None,
            urls: None,
        }
    }
}

impl<'a> From<&'a SelectionRefineRequest> for SpanRefineUpstream<'a> {
    fn from(r: &'a SelectionRefineRequest) -> Self {
        Self::new(&r.mdx, &r.question, &r.selected_text, &r.topic)
    }
}

impl<'a> From<&'a CrawlRefineRequest> for SpanRefineUpstream<'a> {
    fn from(r: &'a CrawlRefineRequest) -> Self {
        Self {
            num_results: r.num_results,
            ..Self::new(&r.mdx, &r.question, &r.selected_text, &r.topic)
        }
    }
}

impl<'a> From<&'a UrlsRefineRequest> for SpanRefineUpstream<'a> {
    fn from(r: &'a UrlsRefineRequest) -> Self {
        Self {
            urls: Some(&r.urls),
            ..Self::new(&r.mdx, &r.question, &r.selected_text, &r.topic)
        }
    }
}
