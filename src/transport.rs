use async_trait::async_trait;
use log::debug;
use reqwest::Url;

use crate::error::DialerError;
use crate::types::ServerResponse;

/// Issues a GET for a server-relative path and parses the JSON body.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get_json(&self, path: &str) -> Result<ServerResponse, DialerError>;
}

/// `reqwest` transport rooted at the CRM server's base URL.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpTransport {
    pub fn new(base_url: &str) -> Result<Self, DialerError> {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: &str) -> Result<Self, DialerError> {
        let base_url = Url::parse(base_url).map_err(|source| DialerError::InvalidBaseUrl {
            url: base_url.to_string(),
            source,
        })?;
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get_json(&self, path: &str) -> Result<ServerResponse, DialerError> {
        let url = self
            .base_url
            .join(path)
            .map_err(|source| DialerError::InvalidBaseUrl {
                url: format!("{}{}", self.base_url, path),
                source,
            })?;
        debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| DialerError::Transport {
                path: path.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(DialerError::Status {
                path: path.to_string(),
                status,
            });
        }

        response
            .json::<ServerResponse>()
            .await
            .map_err(|source| DialerError::Decode {
                path: path.to_string(),
                source,
            })
    }
}
