//! Transport abstraction and the default reqwest-backed implementation.
//!
//! # Design
//! The engine never talks to reqwest directly. It hands a `WireRequest` and a
//! `CancellationToken` to a `Transport`; the token is cancelled when the
//! per-request timeout elapses and implementations are expected to observe it
//! at their own suspension points. Tests substitute simulated transports.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONNECTION};
use reqwest::multipart::{Form, Part};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::TransportError;
use crate::http::{HttpMethod, WireBody, WirePart, WireRequest, WireResponse};

/// Environment variable overriding `TransportConfig::idle_timeout`, in seconds.
pub const ENV_IDLE_TIMEOUT_SECS: &str = "REST_CLIENT_IDLE_TIMEOUT_SECS";

/// Environment variable setting `TransportConfig::user_agent`.
pub const ENV_USER_AGENT: &str = "REST_CLIENT_USER_AGENT";

/// Backstop ceiling for a whole exchange, independent of per-request timeouts.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// Sends wire requests over the network.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(
        &self,
        request: WireRequest,
        cancel: CancellationToken,
    ) -> Result<WireResponse, TransportError>;
}

/// Settings for the default transport created by the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    pub keep_alive: bool,
    pub idle_timeout: Duration,
    pub user_agent: Option<String>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            keep_alive: true,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            user_agent: None,
        }
    }
}

impl TransportConfig {
    /// Defaults, overridden by `REST_CLIENT_IDLE_TIMEOUT_SECS` and
    /// `REST_CLIENT_USER_AGENT` when set.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(raw) = std::env::var(ENV_IDLE_TIMEOUT_SECS) {
            match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => config.idle_timeout = Duration::from_secs(secs),
                _ => warn!(value = %raw, "ignoring invalid {ENV_IDLE_TIMEOUT_SECS}"),
            }
        }
        if let Ok(agent) = std::env::var(ENV_USER_AGENT) {
            if !agent.is_empty() {
                config.user_agent = Some(agent);
            }
        }

        config
    }
}

/// `Transport` backed by a pooled `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(config: &TransportConfig) -> Result<Self, TransportError> {
        let mut headers = HeaderMap::new();
        if config.keep_alive {
            headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
        }

        let mut builder = reqwest::Client::builder()
            .default_headers(headers)
            .pool_idle_timeout(Some(config.idle_timeout))
            .timeout(config.idle_timeout);
        if config.keep_alive {
            builder = builder.tcp_keepalive(Some(Duration::from_secs(60)));
        }
        if let Some(agent) = &config.user_agent {
            builder = builder.user_agent(agent.as_str());
        }

        let client = builder.build().map_err(|e| TransportError::Other(e.to_string()))?;
        debug!(idle_timeout_secs = config.idle_timeout.as_secs(), "created reqwest transport");
        Ok(Self { client })
    }

    fn build(&self, request: WireRequest) -> Result<reqwest::RequestBuilder, TransportError> {
        let mut builder = match request.method {
            HttpMethod::Get => self.client.get(&request.url),
            HttpMethod::Post => self.client.post(&request.url),
        };

        for (key, values) in &request.headers {
            for value in values {
                builder = builder.header(key.as_str(), value.as_str());
            }
        }

        builder = match request.body {
            WireBody::Empty => builder,
            WireBody::FormUrlEncoded(fields) => builder.form(&fields),
            WireBody::Multipart(parts) => builder.multipart(multipart_form(parts)?),
        };

        Ok(builder)
    }
}

fn multipart_form(parts: Vec<WirePart>) -> Result<Form, TransportError> {
    let mut form = Form::new();
    for wire in parts {
        let mut part = Part::bytes(wire.data.to_vec());
        if let Some(file_name) = wire.file_name {
            part = part.file_name(file_name);
        }
        if let Some(content_type) = &wire.content_type {
            part = part
                .mime_str(content_type)
                .map_err(|e| TransportError::Other(e.to_string()))?;
        }
        form = form.part(wire.name.unwrap_or_default(), part);
    }
    Ok(form)
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(
        &self,
        request: WireRequest,
        cancel: CancellationToken,
    ) -> Result<WireResponse, TransportError> {
        let builder = self.build(request)?;

        let exchange = async {
            let response = builder.send().await?;
            let status = response.status().as_u16();
            let body = response.bytes().await?;
            Ok::<_, TransportError>(WireResponse { status, body })
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(TransportError::Timeout),
            result = exchange => result,
        }
    }
}
