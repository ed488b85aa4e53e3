//! Wire-level HTTP types handed to a `Transport`.
//!
//! # Design
//! These types describe a fully resolved request and its raw response as
//! plain data. The engine turns a `RestRequest` into a `WireRequest` (final
//! URL, chosen body encoding, headers) and a transport turns it into bytes on
//! the network. Keeping them as data lets tests drive the engine with a
//! simulated transport and inspect exactly what would have been sent.

use std::fmt;
use std::str::FromStr;

use bytes::Bytes;

use crate::error::ConfigError;

/// HTTP method for a request. Only GET and POST are supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("GET") {
            Ok(HttpMethod::Get)
        } else if s.eq_ignore_ascii_case("POST") {
            Ok(HttpMethod::Post)
        } else {
            Err(ConfigError::UnsupportedMethod(s.to_string()))
        }
    }
}

/// One part of a multipart body after stream payloads have been drained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WirePart {
    pub name: Option<String>,
    pub data: Bytes,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
}

/// Request body as it goes on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum WireBody {
    #[default]
    Empty,
    /// `application/x-www-form-urlencoded`; values are not yet encoded.
    FormUrlEncoded(Vec<(String, String)>),
    /// `multipart/form-data`.
    Multipart(Vec<WirePart>),
}

/// A fully resolved HTTP request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, Vec<String>)>,
    pub body: WireBody,
}

/// Raw status and body returned by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireResponse {
    pub status: u16,
    pub body: Bytes,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_supported_methods_case_insensitively() {
        assert_eq!("GET".parse::<HttpMethod>().unwrap(), HttpMethod::Get);
        assert_eq!("post".parse::<HttpMethod>().unwrap(), HttpMethod::Post);
    }

    #[test]
    fn rejects_other_methods() {
        for method in ["PUT", "DELETE", "PATCH", "HEAD", ""] {
            let err = method.parse::<HttpMethod>().unwrap_err();
            assert_eq!(err, ConfigError::UnsupportedMethod(method.to_string()));
        }
    }

    #[test]
    fn default_method_is_get() {
        assert_eq!(HttpMethod::default(), HttpMethod::Get);
        assert_eq!(HttpMethod::Post.to_string(), "POST");
    }
}
