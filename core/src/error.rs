//! Error types for the REST client.
//!
//! # Design
//! Only configuration mistakes surface as `Err` from execution. Transport
//! failures are absorbed into the `RestResponse` envelope, so `TransportError`
//! travels between the engine and a `Transport` implementation and never
//! reaches the caller of `RestClient::execute`.

use std::time::Duration;

use thiserror::Error;

/// Programmer errors detected before any network activity.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// The request timeout is outside the accepted `[1, 300]` second range.
    #[error("timeout must be between 1s and 300s, got {timeout:?}")]
    InvalidTimeout { timeout: Duration },

    /// Only GET and POST are supported.
    #[error("unsupported HTTP method: {0}")]
    UnsupportedMethod(String),

    /// A structured value could not be flattened into parameters.
    #[error("invalid parameter source: {0}")]
    InvalidParams(String),
}

/// Failures reported by a `Transport` while sending a request.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// DNS failure, refused or reset connection, broken body stream.
    #[error("network failure: {0}")]
    Network(String),

    /// The transport observed its own deadline or the cancellation signal.
    #[error("request timed out")]
    Timeout,

    /// Anything the transport could not classify.
    #[error("{0}")]
    Other(String),
}

/// Errors returned by `RestResponse::json`.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The response carries no body (transport failure).
    #[error("response has no body")]
    MissingBody,

    /// The body is not valid JSON for the requested type.
    #[error("deserialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout
        } else if err.is_builder() {
            TransportError::Other(err.to_string())
        } else {
            TransportError::Network(err.to_string())
        }
    }
}
