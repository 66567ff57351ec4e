use std::fmt;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use log::{debug, info, warn};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::config::RingCentralConfig;

const TOKEN_ENDPOINT: &str = "/restapi/oauth/token";
const RING_OUT_ENDPOINT: &str = "/restapi/v1.0/account/~/extension/~/ring-out";
const SMS_ENDPOINT: &str = "/restapi/v1.0/account/~/extension/~/sms";

/// Tokens are refreshed this long before the provider says they expire.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Login,
    RingOut,
    Sms,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Step::Login => "Logging in to platform",
            Step::RingOut => "Connecting to Ring-Out end point",
            Step::Sms => "Connecting to SMS end point",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum ProviderError {
    /// Credentials were rejected, or a cached token stopped working.
    #[error("login required ({reason})")]
    LoginRequired { step: Step, reason: String },

    #[error("{source}")]
    Request {
        step: Step,
        #[source]
        source: reqwest::Error,
    },

    #[error("provider answered {status}: {body}")]
    Rejected {
        step: Step,
        status: StatusCode,
        body: String,
    },
}

impl ProviderError {
    pub fn step(&self) -> Step {
        match self {
            ProviderError::LoginRequired { step, .. }
            | ProviderError::Request { step, .. }
            | ProviderError::Rejected { step, .. } => *step,
        }
    }

    pub fn login_needed(&self) -> bool {
        matches!(self, ProviderError::LoginRequired { .. })
    }
}

/// Places calls and sends texts on behalf of the CRM user.
#[async_trait]
pub trait Telephony: Send + Sync {
    async fn ring_out(&self, to_number: &str) -> Result<(), ProviderError>;

    async fn send_sms(&self, to_number: &str, text: &str) -> Result<(), ProviderError>;
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

/// RingCentral REST backend using the password grant.
pub struct RingCentral {
    client: reqwest::Client,
    config: RingCentralConfig,
    token: Mutex<Option<CachedToken>>,
}

impl RingCentral {
    pub fn new(config: RingCentralConfig) -> Self {
        Self::with_client(reqwest::Client::new(), config)
    }

    pub fn with_client(client: reqwest::Client, config: RingCentralConfig) -> Self {
        Self {
            client,
            config,
            token: Mutex::new(None),
        }
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.config.server.trim_end_matches('/'), endpoint)
    }

    async fn access_token(&self) -> Result<String, ProviderError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.expires_at {
                return Ok(token.access_token.clone());
            }
            debug!("Cached access token expired");
        }

        info!("Logging in to RingCentral as {}", self.config.username);
        let response = self
            .client
            .post(self.url(TOKEN_ENDPOINT))
            .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
            .form(&[
                ("grant_type", "password"),
                ("username", self.config.username.as_str()),
                ("extension", self.config.extension.as_str()),
                ("password", self.config.password.as_str()),
            ])
            .send()
            .await
            .map_err(|source| ProviderError::Request {
                step: Step::Login,
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("RingCentral login failed ({}): {}", status, body);
            // Only a credential problem is fixed by logging in again.
            return Err(match status {
                StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED => {
                    ProviderError::LoginRequired {
                        step: Step::Login,
                        reason: format!("{status}: {body}"),
                    }
                }
                _ => ProviderError::Rejected {
                    step: Step::Login,
                    status,
                    body,
                },
            });
        }

        let token: TokenResponse =
            response
                .json()
                .await
                .map_err(|source| ProviderError::Request {
                    step: Step::Login,
                    source,
                })?;

        let lifetime = Duration::from_secs(token.expires_in.unwrap_or(0));
        *cached = Some(CachedToken {
            access_token: token.access_token.clone(),
            expires_at: Instant::now() + lifetime.saturating_sub(TOKEN_EXPIRY_MARGIN),
        });
        Ok(token.access_token)
    }

    async fn post(
        &self,
        step: Step,
        endpoint: &str,
        body: serde_json::Value,
    ) -> Result<(), ProviderError> {
        let token = self.access_token().await?;

        let response = self
            .client
            .post(self.url(endpoint))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(|source| ProviderError::Request { step, source })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            self.token.lock().await.take();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::LoginRequired { step, reason: body });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Rejected { step, status, body });
        }

        debug!(
            "{} response: {}",
            step,
            response.text().await.unwrap_or_default()
        );
        Ok(())
    }
}

#[async_trait]
impl Telephony for RingCentral {
    async fn ring_out(&self, to_number: &str) -> Result<(), ProviderError> {
        self.post(
            Step::RingOut,
            RING_OUT_ENDPOINT,
            json!({
                "from": {"phoneNumber": self.config.username},
                "to": {"phoneNumber": to_number},
                "playPrompt": self.config.play_prompt,
            }),
        )
        .await
    }

    async fn send_sms(&self, to_number: &str, text: &str) -> Result<(), ProviderError> {
        self.post(
            Step::Sms,
            SMS_ENDPOINT,
            json!({
                "from": {"phoneNumber": self.config.username},
                "to": [{"phoneNumber": to_number}],
                "text": text,
            }),
        )
        .await
    }
}
