use reqwest::StatusCode;
use thiserror::Error;

/// Failures of the request itself, as opposed to failures the server reports
/// inside a well-formed response.
#[derive(Debug, Error)]
pub enum DialerError {
    #[error("invalid server url {url}: {source}")]
    InvalidBaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("request to {path} failed: {source}")]
    Transport {
        path: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("server answered {status} for {path}")]
    Status { path: String, status: StatusCode },

    #[error("malformed response from {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: reqwest::Error,
    },
}
