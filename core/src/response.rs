//! Response envelope returned by every execution.
//!
//! # Design
//! A `RestResponse` is built exactly once per call and never mutated, except
//! for the decoded-text cache. `is_error` is a strict `status != 200` check:
//! a 201 or 204 is reported as an error. Callers that want 2xx semantics
//! should look at `status()` directly.

use std::sync::{Arc, OnceLock};

use bytes::Bytes;
use serde::de::DeserializeOwned;

use crate::error::DecodeError;
use crate::request::RestRequest;

/// The only status treated as success.
pub const SUCCESS_STATUS: u16 = 200;

/// Result of executing a `RestRequest`.
#[derive(Debug)]
pub struct RestResponse {
    request: Arc<RestRequest>,
    status: u16,
    body: Option<Bytes>,
    text: OnceLock<Option<String>>,
    error_message: Option<String>,
}

impl RestResponse {
    /// Response for a completed HTTP exchange.
    pub fn new(request: Arc<RestRequest>, status: u16, body: Bytes) -> Self {
        Self {
            request,
            status,
            body: Some(body),
            text: OnceLock::new(),
            error_message: None,
        }
    }

    /// Response for a transport failure: no body, explanatory message.
    pub fn failed(request: Arc<RestRequest>, status: u16, message: &str) -> Self {
        Self {
            request,
            status,
            body: None,
            text: OnceLock::new(),
            error_message: Some(message.to_string()),
        }
    }

    pub fn request(&self) -> &RestRequest {
        &self.request
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn is_error(&self) -> bool {
        self.status != SUCCESS_STATUS
    }

    /// The server answered, but not with 200.
    pub fn is_http_error(&self) -> bool {
        self.is_error() && self.error_message.is_none()
    }

    /// Set only when the request never produced an HTTP response.
    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn bytes(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// Body decoded as UTF-8, replacing invalid sequences. Decoded on first
    /// call and cached.
    pub fn text(&self) -> Option<&str> {
        self.text
            .get_or_init(|| {
                self.body
                    .as_ref()
                    .map(|body| String::from_utf8_lossy(body).into_owned())
            })
            .as_deref()
    }

    /// Deserialize the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, DecodeError> {
        let body = self.body.as_ref().ok_or(DecodeError::MissingBody)?;
        Ok(serde_json::from_slice(body)?)
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    fn request() -> Arc<RestRequest> {
        Arc::new(RestRequest::get("http://h/api"))
    }

    #[test]
    fn status_200_is_success() {
        let resp = RestResponse::new(request(), 200, Bytes::from_static(b"ok"));
        assert!(!resp.is_error());
        assert!(!resp.is_http_error());
        assert_eq!(resp.text(), Some("ok"));
        assert!(resp.error_message().is_none());
        assert_eq!(resp.request().url(), "http://h/api");
    }

    #[test]
    fn other_2xx_is_error() {
        for status in [201, 204, 299] {
            let resp = RestResponse::new(request(), status, Bytes::new());
            assert!(resp.is_error(), "{status} should be an error");
            assert!(resp.is_http_error());
        }
    }

    #[test]
    fn failed_response_has_message_and_no_body() {
        let resp = RestResponse::failed(request(), 500, "boom");
        assert!(resp.is_error());
        assert!(!resp.is_http_error());
        assert_eq!(resp.error_message(), Some("boom"));
        assert!(resp.bytes().is_none());
        assert!(resp.text().is_none());
    }

    #[test]
    fn text_is_cached() {
        let resp = RestResponse::new(request(), 200, Bytes::from_static(b"cached"));
        let first = resp.text().unwrap();
        let second = resp.text().unwrap();
        assert!(std::ptr::eq(first, second));
    }

    #[test]
    fn invalid_utf8_is_replaced() {
        let resp = RestResponse::new(request(), 200, Bytes::from_static(&[b'a', 0xff, b'b']));
        assert_eq!(resp.text(), Some("a\u{fffd}b"));
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Item {
        id: u32,
    }

    #[test]
    fn json_decodes_body() {
        let resp = RestResponse::new(request(), 200, Bytes::from_static(br#"{"id":7}"#));
        assert_eq!(resp.json::<Item>().unwrap(), Item { id: 7 });

        let bad = RestResponse::new(request(), 200, Bytes::from_static(b"nope"));
        assert!(matches!(bad.json::<Item>(), Err(DecodeError::Json(_))));

        let missing = RestResponse::failed(request(), 500, "x");
        assert!(matches!(missing.json::<Item>(), Err(DecodeError::MissingBody)));
    }
}
