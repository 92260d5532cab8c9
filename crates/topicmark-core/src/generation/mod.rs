//! Client for the external RAG content-generation service.
//!
//! Every endpoint has a JSON variant and most have a `-raw` variant that
//! returns the MDX document as plain text. [`RagClient::dispatch`] routes an
//! untyped request body to the matching typed call, which is what the HTTP
//! proxy uses.

pub mod fallback;
pub mod refine;
pub mod request;

use std::time::Duration;

use reqwest::header::ACCEPT;
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{debug, warn};

use crate::hierarchy::{ExtractError, TopicNode, extract_hierarchy};
use crate::validate::{Validate, ValidationError};

use fallback::{FallbackReason, fallback_mdx};
use request::{
    CrawlRefineRequest, LlmOnlyRequest, RefineRequest, SearchTopicsRequest, SelectionRefineRequest,
    SingleTopicRequest, SpanRefineUpstream, UrlMdxRequest, UrlsMdxRequest, UrlsRefineRequest,
};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("malformed request body: {0}")]
    Body(#[from] serde_json::Error),

    #[error("invalid request: {0}")]
    Invalid(#[from] ValidationError),

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("generation service unreachable: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("generation service returned {status} for {endpoint}: {body}")]
    Upstream {
        endpoint: &'static str,
        status: u16,
        body: String,
    },

    #[error("invalid response from {endpoint}: {source}")]
    Decode {
        endpoint: &'static str,
        #[source]
        source: reqwest::Error,
    },
}

impl GenerationError {
    /// Caller-side problems, as opposed to upstream failures.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Body(_) | Self::Invalid(_))
    }
}

/// One generation endpoint, named by its path segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    SearchTopics,
    SingleTopic,
    SingleTopicRaw,
    LlmOnly,
    LlmOnlyRaw,
    FromUrl,
    FromUrlRaw,
    FromUrls,
    FromUrlsRaw,
    Refine,
    RefineWithSelection,
    RefineWithSelectionRaw,
    RefineWithCrawling,
    RefineWithCrawlingRaw,
    RefineWithUrls,
    RefineWithUrlsRaw,
}

impl Endpoint {
    pub const ALL: [Endpoint; 16] = [
        Self::SearchTopics,
        Self::SingleTopic,
        Self::SingleTopicRaw,
        Self::LlmOnly,
        Self::LlmOnlyRaw,
        Self::FromUrl,
        Self::FromUrlRaw,
        Self::FromUrls,
        Self::FromUrlsRaw,
        Self::Refine,
        Self::RefineWithSelection,
        Self::RefineWithSelectionRaw,
        Self::RefineWithCrawling,
        Self::RefineWithCrawlingRaw,
        Self::RefineWithUrls,
        Self::RefineWithUrlsRaw,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Self::SearchTopics => "search-topics",
            Self::SingleTopic => "single-topic",
            Self::SingleTopicRaw => "single-topic-raw",
            Self::LlmOnly => "generate-mdx-llm-only",
            Self::LlmOnlyRaw => "generate-mdx-llm-only-raw",
            Self::FromUrl => "generate-mdx-from-url",
            Self::FromUrlRaw => "generate-mdx-from-url-raw",
            Self::FromUrls => "generate-mdx-from-urls",
            Self::FromUrlsRaw => "generate-mdx-from-urls-raw",
            Self::Refine => "refine",
            Self::RefineWithSelection => "refine-with-selection",
            Self::RefineWithSelectionRaw => "refine-with-selection-raw",
            Self::RefineWithCrawling => "refine-with-crawling",
            Self::RefineWithCrawlingRaw => "refine-with-crawling-raw",
            Self::RefineWithUrls => "refine-with-urls",
            Self::RefineWithUrlsRaw => "refine-with-urls-raw",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|e| e.name() == name)
    }

    /// Raw endpoints answer with `text/plain` MDX.
    pub fn is_raw(self) -> bool {
        self.name().ends_with("-raw")
    }

    /// Path on the RAG service.
    pub fn upstream_path(self) -> String {
        format!("/rag/{}", self.name())
    }
}

/// Reply of [`RagClient::dispatch`].
#[derive(Debug, Clone, PartialEq)]
pub enum RagReply {
    Json(Value),
    Text(String),
}

/// Reply shape of `search-topics`. The hierarchy is embedded in `topics` as
/// a fenced JSON block.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TopicsResponse {
    pub status: String,
    pub data: TopicsData,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TopicsData {
    pub topics: String,
}

impl TopicsResponse {
    pub fn hierarchy(&self) -> Result<Vec<TopicNode>, ExtractError> {
        extract_hierarchy(&self.data.topics)
    }
}

/// The `data.mdx_content` field of a JSON generation reply.
pub fn mdx_content(reply: &Value) -> Option<&str> {
    reply.pointer("/data/mdx_content").and_then(Value::as_str)
}

fn success_envelope(mdx: String) -> Value {
    json!({ "status": "success", "data": { "mdx_content": mdx } })
}

/// HTTP client for the RAG service.
#[derive(Debug, Clone)]
pub struct RagClient {
    http: reqwest::Client,
    base_url: String,
}

impl RagClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, GenerationError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(GenerationError::Client)?;
        let base_url: String = base_url.into();
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_owned(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Parse `body` as the request type of `endpoint`, validate it, and
    /// perform the call.
    pub async fn dispatch(&self, endpoint: Endpoint, body: Value) -> Result<RagReply, GenerationError> {
        use Endpoint::*;
        let reply = match endpoint {
            SearchTopics => RagReply::Json(self.search_topics(&parse(body)?).await?),
            SingleTopic => RagReply::Json(self.single_topic(&parse(body)?).await?),
            SingleTopicRaw => RagReply::Text(self.single_topic_raw(&parse(body)?).await?),
            LlmOnly => RagReply::Json(self.generate_llm_only(&parse(body)?).await?),
            LlmOnlyRaw => RagReply::Text(self.generate_llm_only_raw(&parse(body)?).await?),
            FromUrl => RagReply::Json(self.generate_from_url(&parse(body)?).await?),
            FromUrlRaw => RagReply::Text(self.generate_from_url_raw(&parse(body)?).await?),
            FromUrls => RagReply::Json(self.generate_from_urls(&parse(body)?).await?),
            FromUrlsRaw => RagReply::Text(self.generate_from_urls_raw(&parse(body)?).await?),
            Refine => RagReply::Json(self.refine(&parse(body)?).await?),
            RefineWithSelection => RagReply::Json(self.refine_with_selection(&parse(body)?).await?),
            RefineWithSelectionRaw => {
                RagReply::Text(self.refine_with_selection_raw(&parse(body)?).await?)
            }
            RefineWithCrawling => RagReply::Json(self.refine_with_crawling(&parse(body)?).await?),
            RefineWithCrawlingRaw => {
                RagReply::Text(self.refine_with_crawling_raw(&parse(body)?).await?)
            }
            RefineWithUrls => RagReply::Json(self.refine_with_urls(&parse(body)?).await?),
            RefineWithUrlsRaw => RagReply::Text(self.refine_with_urls_raw(&parse(body)?).await?),
        };
        Ok(reply)
    }

    pub async fn search_topics(&self, req: &SearchTopicsRequest) -> Result<Value, GenerationError> {
        req.validate()?;
        self.post_json(Endpoint::SearchTopics, req).await
    }

    pub async fn single_topic(&self, req: &SingleTopicRequest) -> Result<Value, GenerationError> {
        req.validate()?;
        self.post_json(Endpoint::SingleTopic, &req.resolved()).await
    }

    pub async fn single_topic_raw(&self, req: &SingleTopicRequest) -> Result<String, GenerationError> {
        req.validate()?;
        self.post_text(Endpoint::SingleTopicRaw, &req.resolved()).await
    }

    /// LLM-only generation. Upstream failures other than local I/O errors
    /// yield a placeholder document instead of an error.
    pub async fn generate_llm_only(&self, req: &LlmOnlyRequest) -> Result<Value, GenerationError> {
        req.validate()?;
        let endpoint = Endpoint::LlmOnly;
        match self.llm_only_call(endpoint, req, "application/json").await? {
            Ok(response) => decode_json(endpoint, response).await,
            Err(reason) => Ok(success_envelope(self.fallback(endpoint, req, &reason))),
        }
    }

    pub async fn generate_llm_only_raw(&self, req: &LlmOnlyRequest) -> Result<String, GenerationError> {
        req.validate()?;
        let endpoint = Endpoint::LlmOnlyRaw;
        match self.llm_only_call(endpoint, req, "text/plain").await? {
            Ok(response) => decode_text(endpoint, response).await,
            Err(reason) => Ok(self.fallback(endpoint, req, &reason)),
        }
    }

    pub async fn generate_from_url(&self, req: &UrlMdxRequest) -> Result<Value, GenerationError> {
        req.validate()?;
        self.post_json(Endpoint::FromUrl, req).await
    }

    pub async fn generate_from_url_raw(&self, req: &UrlMdxRequest) -> Result<String, GenerationError> {
        req.validate()?;
        self.post_text(Endpoint::FromUrlRaw, req).await
    }

    pub async fn generate_from_urls(&self, req: &UrlsMdxRequest) -> Result<Value, GenerationError> {
        req.validate()?;
        self.post_json(Endpoint::FromUrls, req).await
    }

    pub async fn generate_from_urls_raw(&self, req: &UrlsMdxRequest) -> Result<String, GenerationError> {
        req.validate()?;
        self.post_text(Endpoint::FromUrlsRaw, req).await
    }

    pub async fn refine(&self, req: &RefineRequest) -> Result<Value, GenerationError> {
        req.validate()?;
        self.post_json(Endpoint::Refine, req).await
    }

    pub async fn refine_with_selection(&self, req: &SelectionRefineRequest) -> Result<Value, GenerationError> {
        req.validate()?;
        if let Some(replacement) = direct_replacement(req) {
            return Ok(success_envelope(replacement));
        }
        self.post_json(Endpoint::RefineWithSelection, &SpanRefineUpstream::from(req))
            .await
    }

    pub async fn refine_with_selection_raw(
        &self,
        req: &SelectionRefineRequest,
    ) -> Result<String, GenerationError> {
        req.validate()?;
        if let Some(replacement) = direct_replacement(req) {
            return Ok(replacement);
        }
        self.post_text(Endpoint::RefineWithSelectionRaw, &SpanRefineUpstream::from(req))
            .await
    }

    pub async fn refine_with_crawling(&self, req: &CrawlRefineRequest) -> Result<Value, GenerationError> {
        req.validate()?;
        self.post_json(Endpoint::RefineWithCrawling, &SpanRefineUpstream::from(req))
            .await
    }

    pub async fn refine_with_crawling_raw(&self, req: &CrawlRefineRequest) -> Result<String, GenerationError> {
        req.validate()?;
        self.post_text(Endpoint::RefineWithCrawlingRaw, &SpanRefineUpstream::from(req))
            .await
    }

    pub async fn refine_with_urls(&self, req: &UrlsRefineRequest) -> Result<Value, GenerationError> {
        req.validate()?;
        self.post_json(Endpoint::RefineWithUrls, &SpanRefineUpstream::from(req))
            .await
    }

    pub async fn refine_with_urls_raw(&self, req: &UrlsRefineRequest) -> Result<String, GenerationError> {
        req.validate()?;
        self.post_text(Endpoint::RefineWithUrlsRaw, &SpanRefineUpstream::from(req))
            .await
    }

    fn post(&self, endpoint: Endpoint) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, endpoint.upstream_path());
        debug!(endpoint = endpoint.name(), %url, "calling generation service");
        self.http.post(url)
    }

    async fn post_json<B: Serialize + ?Sized>(&self, endpoint: Endpoint, body: &B) -> Result<Value, GenerationError> {
        let response = self
            .post(endpoint)
            .json(body)
            .send()
            .await
            .map_err(GenerationError::Transport)?;
        decode_json(endpoint, ensure_success(endpoint, response).await?).await
    }

    async fn post_text<B: Serialize + ?Sized>(&self, endpoint: Endpoint, body: &B) -> Result<String, GenerationError> {
        let response = self
            .post(endpoint)
            .json(body)
            .send()
            .await
            .map_err(GenerationError::Transport)?;
        decode_text(endpoint, ensure_success(endpoint, response).await?).await
    }

    /// `Ok(Err(reason))` when the caller should fall back to a placeholder.
    async fn llm_only_call(
        &self,
        endpoint: Endpoint,
        req: &LlmOnlyRequest,
        accept: &'static str,
    ) -> Result<Result<Response, FallbackReason>, GenerationError> {
        let sent = self
            .post(endpoint)
            .header(ACCEPT, accept)
            .json(req)
            .send()
            .await;
        let response = match sent {
            Ok(response) => response,
            Err(e) if e.is_connect() || e.is_timeout() => {
                warn!(endpoint = endpoint.name(), error = %e, "generation service unreachable; serving fallback");
                return Ok(Err(FallbackReason::Unreachable));
            }
            Err(e) => return Err(GenerationError::Transport(e)),
        };

        let status = response.status();
        if status.is_success() {
            return Ok(Ok(response));
        }
        let body = response.text().await.unwrap_or_default();
        warn!(endpoint = endpoint.name(), status = status.as_u16(), %body, "generation failed; serving fallback");
        Ok(Err(FallbackReason::from_status(
            status.as_u16(),
            status.canonical_reason().unwrap_or(""),
            &body,
        )))
    }

    fn fallback(&self, endpoint: Endpoint, req: &LlmOnlyRequest, reason: &FallbackReason) -> String {
        fallback_mdx(
            &req.selected_topic,
            &req.main_topic,
            reason,
            &self.base_url,
            &endpoint.upstream_path(),
        )
    }
}

fn parse<T: DeserializeOwned>(body: Value) -> Result<T, GenerationError> {
    Ok(serde_json::from_value(body)?)
}

fn direct_replacement(req: &SelectionRefineRequest) -> Option<String> {
    let replacement = req.direct_replacement.as_deref().filter(|r| !r.is_empty())?;
    debug!(topic = %req.topic, "applying direct replacement without calling upstream");
    Some(refine::direct_replace(&req.mdx, &req.selected_text, replacement))
}

async fn ensure_success(endpoint: Endpoint, response: Response) -> Result<Response, GenerationError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    warn!(endpoint = endpoint.name(), status = status.as_u16(), %body, "generation service error");
    Err(GenerationError::Upstream {
        endpoint: endpoint.name(),
        status: status.as_u16(),
        body,
    })
}

async fn decode_json(endpoint: Endpoint, response: Response) -> Result<Value, GenerationError> {
    response
        .json::<Value>()
        .await
        .map_err(|source| GenerationError::Decode {
            endpoint: endpoint.name(),
            source,
        })
}

async fn decode_text(endpoint: Endpoint, response: Response) -> Result<String, GenerationError> {
    response.text().await.map_err(|source| GenerationError::Decode {
        endpoint: endpoint.name(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_names_round_trip() {
        for endpoint in Endpoint::ALL {
            assert_eq!(Endpoint::from_name(endpoint.name()), Some(endpoint));
        }
        assert_eq!(Endpoint::from_name("nope"), None);
    }

    #[test]
    fn raw_endpoints() {
        assert!(Endpoint::SingleTopicRaw.is_raw());
        assert!(!Endpoint::Refine.is_raw());
        assert_eq!(
            Endpoint::LlmOnlyRaw.upstream_path(),
            "/rag/generate-mdx-llm-only-raw"
        );
    }

    #[test]
    fn topics_response_yields_hierarchy() {
        let reply: TopicsResponse = serde_json::from_value(json!({
            "status": "success",
            "data": { "topics": "```json\n[{\"topic\":\"Intro\",\"subtopics\":[]}]\n```" }
        }))
        .unwrap();
        assert_eq!(reply.hierarchy().unwrap(), vec![TopicNode::new("Intro")]);
    }

    #[test]
    fn mdx_content_reads_envelope() {
        let reply = success_envelope("# Hi".into());
        assert_eq!(mdx_content(&reply), Some("# Hi"));
        assert_eq!(mdx_content(&json!({})), None);
    }

    #[tokio::test]
    async fn direct_replacement_skips_upstream() {
        // Port 9 is discard; a network call would fail loudly.
        let client = RagClient::new("http://127.0.0.1:9", Duration::from_secs(1)).unwrap();
        let req = SelectionRefineRequest {
            mdx: "The sky is blue.".into(),
            question: "shorter".into(),
            selected_text: "is blue".into(),
            topic: "Sky".into(),
            direct_replacement: Some("glows".into()),
        };
        let text = client.refine_with_selection_raw(&req).await.unwrap();
        assert_eq!(text, "The sky glows.");
    }

    #[tokio::test]
    async fn invalid_request_is_rejected_before_sending() {
        let client = RagClient::new("http://127.0.0.1:9", Duration::from_secs(1)).unwrap();
        let err = client
            .dispatch(Endpoint::SearchTopics, json!({ "query": "" }))
            .await
            .unwrap_err();
        assert!(err.is_client_error());

        let err = client
            .dispatch(Endpoint::SearchTopics, json!({ "limit": 3 }))
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::Body(_)));
    }
}
