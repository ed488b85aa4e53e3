//! Request execution: validation, wire assembly, timeout race and outcome
//! classification.
//!
//! # Design
//! `execute` fails only for configuration mistakes, which are checked before
//! anything is sent. Every I/O outcome (network failure, timeout, unexpected
//! error, any HTTP status) becomes exactly one `RestResponse`.
//!
//! The per-request timeout is cooperative: when it elapses the engine cancels
//! the transport's token and takes the timeout branch without waiting for the
//! transport to acknowledge.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{ConfigError, TransportError};
use crate::http::{HttpMethod, WireBody, WirePart, WireRequest, WireResponse};
use crate::request::RestRequest;
use crate::response::RestResponse;
use crate::transport::Transport;

pub const MIN_TIMEOUT_SECS: u64 = 1;
pub const MAX_TIMEOUT_SECS: u64 = 300;

/// Status recorded on responses that never reached the server.
pub const TRANSPORT_FAILURE_STATUS: u16 = 500;

pub const NETWORK_ERROR_MESSAGE: &str = "request failed: network error";
pub const TIMEOUT_ERROR_MESSAGE: &str = "request failed: request timed out";
pub const GENERIC_ERROR_MESSAGE: &str = "request failed: unexpected error";

/// Check that `timeout` is within `[1s, 300s]`, fractions included.
pub fn validate_timeout(timeout: Duration) -> Result<(), ConfigError> {
    let min = Duration::from_secs(MIN_TIMEOUT_SECS);
    let max = Duration::from_secs(MAX_TIMEOUT_SECS);
    if timeout < min || timeout > max {
        return Err(ConfigError::InvalidTimeout { timeout });
    }
    Ok(())
}

/// Append query entries to `url`, joined with `&`, after `?` or `&`
/// depending on whether the URL already has a query. Entries with an empty
/// value are dropped.
pub fn build_url(url: &str, query: &[(String, String)]) -> String {
    let query_string = query
        .iter()
        .filter(|(_, value)| !value.is_empty())
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&");

    if query_string.is_empty() {
        return url.to_string();
    }

    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{url}{separator}{query_string}")
}

/// Choose the POST body. Url-encoded fields with a value are sent as a form,
/// unless multipart parts exist, in which case they are appended to the parts
/// as text and the body is multipart.
pub fn build_body(form: &[(String, String)], mut parts: Vec<WirePart>) -> WireBody {
    let fields: Vec<(String, String)> = form
        .iter()
        .filter(|(_, value)| !value.is_empty())
        .cloned()
        .collect();

    if parts.is_empty() {
        return if fields.is_empty() {
            WireBody::Empty
        } else {
            WireBody::FormUrlEncoded(fields)
        };
    }

    parts.extend(fields.into_iter().map(|(name, value)| WirePart {
        name: Some(name),
        data: value.into(),
        file_name: None,
        content_type: None,
    }));
    WireBody::Multipart(parts)
}

/// Execute `request` through `transport`.
///
/// Returns `Err` only when the request is misconfigured. `client` names the
/// registry entry and is used for logging.
pub async fn execute(
    client: &str,
    transport: &dyn Transport,
    mut request: RestRequest,
) -> Result<RestResponse, ConfigError> {
    validate_timeout(request.timeout())?;

    let request_id = Uuid::new_v4();
    let timeout = request.timeout();
    let method = request.method();
    let url = build_url(request.url(), request.query());
    let cancel = CancellationToken::new();

    debug!(
        %client,
        %request_id,
        %method,
        %url,
        timeout_secs = timeout.as_secs(),
        "sending request"
    );

    let send = async {
        let body = match method {
            HttpMethod::Get => WireBody::Empty,
            HttpMethod::Post => {
                let parts = request
                    .drain_parts()
                    .await
                    .map_err(|e| TransportError::Other(format!("reading part stream: {e}")))?;
                build_body(request.form(), parts)
            }
        };
        let wire = WireRequest {
            method,
            url: url.clone(),
            headers: request.headers().to_vec(),
            body,
        };
        transport.send(wire, cancel.clone()).await
    };

    let outcome = match tokio::time::timeout(timeout, send).await {
        Ok(result) => result,
        Err(_) => {
            cancel.cancel();
            Err(TransportError::Timeout)
        }
    };

    let request = Arc::new(request);
    let response = match outcome {
        Ok(WireResponse { status, body }) => {
            debug!(%client, %request_id, status, bytes = body.len(), "request completed");
            RestResponse::new(request, status, body)
        }
        Err(TransportError::Network(reason)) => {
            warn!(%client, %request_id, %url, %reason, "network failure");
            RestResponse::failed(request, TRANSPORT_FAILURE_STATUS, NETWORK_ERROR_MESSAGE)
        }
        Err(TransportError::Timeout) => {
            warn!(
                %client,
                %request_id,
                %url,
                timeout_secs = timeout.as_secs(),
                "request timed out"
            );
            RestResponse::failed(request, TRANSPORT_FAILURE_STATUS, TIMEOUT_ERROR_MESSAGE)
        }
        Err(TransportError::Other(reason)) => {
            warn!(%client, %request_id, %url, %reason, "request failed");
            RestResponse::failed(request, TRANSPORT_FAILURE_STATUS, GENERIC_ERROR_MESSAGE)
        }
    };

    Ok(response)
}
