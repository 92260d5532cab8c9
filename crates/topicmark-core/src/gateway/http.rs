use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use topicmark_db::models::Topic;

use super::{GatewayError, LessonPlanGateway, SavedTopicLookup};
use crate::identity::Identity;
use crate::plan::{LessonPlan, LessonPlanInput, PublicStatus};

/// [`LessonPlanGateway`] over the topicmark HTTP API.
///
/// `base_url` points at the API root, e.g. `http://localhost:3000/api`.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: reqwest::Client,
    base_url: String,
    identity: Option<Identity>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlanList {
    lesson_plans: Vec<LessonPlan>,
}

#[derive(Deserialize)]
struct TopicList {
    topics: Vec<Topic>,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

impl HttpGateway {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_owned(),
            identity: None,
        }
    }

    /// Send identity headers with every request.
    pub fn with_identity(mut self, identity: Identity) -> Self {
        self.identity = Some(identity);
        self
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/{}", self.base_url, path);
        debug!(%method, %url, "gateway request");
        let mut builder = self.client.request(method, url);
        if let Some(identity) = &self.identity {
            for (name, value) in identity.headers() {
                builder = builder.header(name, value);
            }
        }
        builder
    }

    async fn send(builder: RequestBuilder) -> Result<Response, GatewayError> {
        let response = builder.send().await.map_err(GatewayError::Transport)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        match status {
            StatusCode::NOT_FOUND => Err(GatewayError::NotFound),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(GatewayError::Unauthorized),
            _ => {
                let body = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<ErrorBody>(&body)
                    .map(|e| e.error)
                    .unwrap_or(body);
                Err(GatewayError::Status {
                    status: status.as_u16(),
                    message,
                })
            }
        }
    }

    async fn fetch<T: DeserializeOwned>(builder: RequestBuilder) -> Result<T, GatewayError> {
        Self::send(builder)
            .await?
            .json::<T>()
            .await
            .map_err(GatewayError::Decode)
    }
}

#[async_trait]
impl LessonPlanGateway for HttpGateway {
    async fn create(&self, plan: &LessonPlanInput) -> Result<LessonPlan, GatewayError> {
        Self::fetch(self.request(Method::POST, "lessonPlans").json(plan)).await
    }

    async fn update(&self, id: i32, plan: &LessonPlanInput) -> Result<LessonPlan, GatewayError> {
        Self::fetch(self.request(Method::PUT, &format!("lessonPlans/{id}")).json(plan)).await
    }

    async fn get_by_id(&self, id: i32) -> Result<LessonPlan, GatewayError> {
        Self::fetch(self.request(Method::GET, &format!("lessonPlans/{id}"))).await
    }

    async fn get_public_by_id(&self, id: i32) -> Result<LessonPlan, GatewayError> {
        Self::fetch(self.request(Method::GET, &format!("lessonPlans/public/{id}"))).await
    }

    async fn list_mine(&self) -> Result<Vec<LessonPlan>, GatewayError> {
        let list: PlanList = Self::fetch(self.request(Method::GET, "lessonPlans")).await?;
        Ok(list.lesson_plans)
    }

    async fn list_public(&self) -> Result<Vec<LessonPlan>, GatewayError> {
        let list: PlanList = Self::fetch(self.request(Method::GET, "lessonPlans/public")).await?;
        Ok(list.lesson_plans)
    }

    async fn delete(&self, id: i32) -> Result<(), GatewayError> {
        Self::send(self.request(Method::DELETE, &format!("lessonPlans/{id}"))).await?;
        Ok(())
    }

    async fn check_public(&self, id: i32) -> Result<PublicStatus, GatewayError> {
        Self::fetch(self.request(Method::GET, &format!("lessonPlans/check-public/{id}"))).await
    }
}

#[async_trait]
impl SavedTopicLookup for HttpGateway {
    async fn saved_content(&self, name: &str) -> Result<Option<String>, GatewayError> {
        let list: TopicList = Self::fetch(self.request(Method::GET, "topics")).await?;
        Ok(list
            .topics
            .into_iter()
            .find(|t| t.topic == name)
            .map(|t| t.mdx_content))
    }
}
