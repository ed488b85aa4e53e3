//! Fluent HTTP request builder over a pooled transport.
//!
//! # Overview
//! Callers configure a `RestRequest`, fetch a named `RestClient` from a
//! `ClientRegistry`, and execute. Every I/O outcome comes back as a
//! `RestResponse`; only configuration mistakes (timeout out of range,
//! unsupported method, unusable parameter source) are returned as `Err`.
//!
//! # Design
//! - `RestRequest` accumulates intent and performs no I/O.
//! - `engine` resolves the URL and body into a `WireRequest`, races the send
//!   against the per-request timeout and classifies the outcome.
//! - `Transport` is the seam to the network; `ReqwestTransport` is the
//!   default, tests plug in simulated transports.
//! - `ClientRegistry` maps a logical name to one long-lived client.
//! - Only GET and POST are supported, and only status 200 counts as success.

pub mod engine;
pub mod error;
pub mod http;
pub mod params;
pub mod registry;
pub mod request;
pub mod response;
pub mod transport;

pub use error::{ConfigError, DecodeError, TransportError};
pub use http::{HttpMethod, WireBody, WirePart, WireRequest, WireResponse};
pub use registry::{get_client, ClientRegistry, RestClient};
pub use request::RestRequest;
pub use response::RestResponse;
pub use transport::{ReqwestTransport, Transport, TransportConfig};
