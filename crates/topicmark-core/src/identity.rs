//! Caller identity as forwarded by the authenticating proxy.

use serde::{Deserialize, Serialize};

pub const USER_ID_HEADER: &str = "x-user-id";
pub const GIVEN_NAME_HEADER: &str = "x-user-given-name";
pub const FAMILY_NAME_HEADER: &str = "x-user-family-name";
pub const EMAIL_HEADER: &str = "x-user-email";

/// The authenticated user behind a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl Identity {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            given_name: None,
            family_name: None,
            email: None,
        }
    }

    /// Header pairs to attach to an outgoing request.
    pub fn headers(&self) -> Vec<(&'static str, &str)> {
        let mut headers = vec![(USER_ID_HEADER, self.id.as_str())];
        if let Some(v) = &self.given_name {
            headers.push((GIVEN_NAME_HEADER, v));
        }
        if let Some(v) = &self.family_name {
            headers.push((FAMILY_NAME_HEADER, v));
        }
        if let Some(v) = &self.email {
            headers.push((EMAIL_HEADER, v));
        }
        headers
    }
}
