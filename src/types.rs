use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialRequest {
    pub to_number: String,
}

impl DialRequest {
    pub fn new(to_number: impl Into<String>) -> Self {
        Self {
            to_number: to_number.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRequest {
    pub to_number: String,
    pub message: String,
}

/// JSON body returned by both `/crm/util/*` endpoints.
///
/// Every field is optional on the wire; an absent field reads as falsy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub rc_login_needed: bool,
}

impl ServerResponse {
    pub fn succeeded(message: impl Into<String>) -> Self {
        Self {
            success: Some(true),
            message: Some(message.into()),
            ..Default::default()
        }
    }

    pub fn failed(message: impl Into<String>, step: impl Into<String>) -> Self {
        Self {
            success: Some(false),
            message: Some(message.into()),
            step: Some(step.into()),
            ..Default::default()
        }
    }

    /// The redirect URL, if the server sent a non-empty one.
    pub fn redirect_target(&self) -> Option<&str> {
        self.redirect.as_deref().filter(|url| !url.is_empty())
    }

    pub fn is_success(&self) -> bool {
        self.success.unwrap_or(false)
    }
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}
