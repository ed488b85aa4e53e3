//! Fluent request builder.
//!
//! # Design
//! `RestRequest` only accumulates intent: nothing here touches the network.
//! Every setter takes `&mut self` and returns `&mut Self`, so a request can be
//! configured with a method chain or inside a closure passed to
//! `RestClient::execute_with`. Execution takes the request by value, which
//! rules out mutation while a send is in flight.
//!
//! Multipart adders are forgiving: a missing name or payload skips the part
//! instead of failing.

use std::fmt;
use std::time::Duration;

use bytes::Bytes;
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::ConfigError;
use crate::http::{HttpMethod, WirePart};
use crate::params;

/// Timeout applied when the caller does not set one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Reader accepted as a multipart stream payload.
pub type PartStream = Box<dyn AsyncRead + Send + Sync + Unpin>;

/// Payload of a multipart part.
pub enum PartPayload {
    Bytes(Bytes),
    /// Read to the end when the request is executed.
    Stream(PartStream),
}

impl fmt::Debug for PartPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartPayload::Bytes(data) => f.debug_tuple("Bytes").field(&data.len()).finish(),
            PartPayload::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// A named (or anonymous) multipart part.
#[derive(Debug)]
pub struct FormPart {
    pub name: Option<String>,
    pub payload: PartPayload,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
}

impl FormPart {
    fn new(name: Option<&str>, payload: PartPayload) -> Self {
        Self {
            name: name.map(str::to_string),
            payload,
            file_name: None,
            content_type: None,
        }
    }
}

/// An HTTP request under construction.
#[derive(Debug)]
pub struct RestRequest {
    url: String,
    method: HttpMethod,
    timeout: Duration,
    query: Vec<(String, String)>,
    form: Vec<(String, String)>,
    parts: Vec<FormPart>,
    headers: Vec<(String, Vec<String>)>,
}

impl Default for RestRequest {
    fn default() -> Self {
        Self {
            url: String::new(),
            method: HttpMethod::Get,
            timeout: DEFAULT_TIMEOUT,
            query: Vec::new(),
            form: Vec::new(),
            parts: Vec::new(),
            headers: Vec::new(),
        }
    }
}

impl RestRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(method: HttpMethod, url: &str) -> Self {
        Self {
            url: url.to_string(),
            method,
            ..Self::default()
        }
    }

    pub fn get(url: &str) -> Self {
        Self::with(HttpMethod::Get, url)
    }

    pub fn post(url: &str) -> Self {
        Self::with(HttpMethod::Post, url)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Query entries as `(key, url-encoded value)`.
    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }

    pub fn form(&self) -> &[(String, String)] {
        &self.form
    }

    pub fn parts(&self) -> &[FormPart] {
        &self.parts
    }

    pub fn headers(&self) -> &[(String, Vec<String>)] {
        &self.headers
    }

    pub fn set_url(&mut self, url: &str) -> &mut Self {
        self.url = url.to_string();
        self
    }

    pub fn set_method(&mut self, method: HttpMethod) -> &mut Self {
        self.method = method;
        self
    }

    /// Set the per-request timeout. Must be within 1..=300 seconds; checked at
    /// execution time.
    pub fn set_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.timeout = timeout;
        self
    }

    // --- query string ---

    pub fn add_query_value(&mut self, key: &str, value: &str) -> &mut Self {
        if !key.is_empty() {
            self.query.push((key.to_string(), urlencoding::encode(value).into_owned()));
        }
        self
    }

    /// Replace every entry for `key` with a single one.
    pub fn set_query_value(&mut self, key: &str, value: &str) -> &mut Self {
        if !key.is_empty() {
            self.remove_query_value(key);
            self.add_query_value(key, value);
        }
        self
    }

    pub fn remove_query_value(&mut self, key: &str) -> &mut Self {
        self.query.retain(|(k, _)| k != key);
        self
    }

    /// Append every field of `source` as query entries.
    pub fn add_query_from<T: Serialize + ?Sized>(
        &mut self,
        source: &T,
    ) -> Result<&mut Self, ConfigError> {
        for (key, value) in params::flatten(source)? {
            self.query.push((key, urlencoding::encode(&value).into_owned()));
        }
        Ok(self)
    }

    // --- url-encoded form ---

    pub fn add_form_value(&mut self, key: &str, value: &str) -> &mut Self {
        if !key.is_empty() {
            self.form.push((key.to_string(), value.to_string()));
        }
        self
    }

    pub fn remove_form_value(&mut self, key: &str) -> &mut Self {
        self.form.retain(|(k, _)| k != key);
        self
    }

    pub fn add_form_from<T: Serialize + ?Sized>(
        &mut self,
        source: &T,
    ) -> Result<&mut Self, ConfigError> {
        self.form.extend(params::flatten(source)?);
        Ok(self)
    }

    // --- headers ---

    pub fn add_header(&mut self, key: &str, value: &str) -> &mut Self {
        if !key.is_empty() {
            self.headers.push((key.to_string(), vec![value.to_string()]));
        }
        self
    }

    pub fn add_header_values<I, S>(&mut self, key: &str, values: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if !key.is_empty() {
            self.headers
                .push((key.to_string(), values.into_iter().map(Into::into).collect()));
        }
        self
    }

    // --- multipart ---

    /// Text part. Skipped when the name or value is blank.
    pub fn add_form_text(&mut self, name: &str, value: &str) -> &mut Self {
        if !name.trim().is_empty() && !value.trim().is_empty() {
            let payload = PartPayload::Bytes(Bytes::copy_from_slice(value.as_bytes()));
            self.parts.push(FormPart::new(Some(name), payload));
        }
        self
    }

    pub fn add_form_bytes(&mut self, name: &str, data: impl Into<Bytes>) -> &mut Self {
        if !name.is_empty() {
            self.parts
                .push(FormPart::new(Some(name), PartPayload::Bytes(data.into())));
        }
        self
    }

    pub fn add_form_bytes_unnamed(&mut self, data: impl Into<Bytes>) -> &mut Self {
        self.parts.push(FormPart::new(None, PartPayload::Bytes(data.into())));
        self
    }

    pub fn add_form_file(
        &mut self,
        name: &str,
        data: impl Into<Bytes>,
        file_name: &str,
    ) -> &mut Self {
        if !name.is_empty() {
            let mut part = FormPart::new(Some(name), PartPayload::Bytes(data.into()));
            part.file_name = Some(file_name.to_string());
            self.parts.push(part);
        }
        self
    }

    pub fn add_form_stream<R>(&mut self, name: &str, reader: R) -> &mut Self
    where
        R: AsyncRead + Send + Sync + Unpin + 'static,
    {
        if !name.is_empty() {
            self.parts
                .push(FormPart::new(Some(name), PartPayload::Stream(Box::new(reader))));
        }
        self
    }

    pub fn add_form_stream_unnamed<R>(&mut self, reader: R) -> &mut Self
    where
        R: AsyncRead + Send + Sync + Unpin + 'static,
    {
        self.parts
            .push(FormPart::new(None, PartPayload::Stream(Box::new(reader))));
        self
    }

    /// Stream part with a file name. The file name is percent-encoded;
    /// `content_type` is applied only if it parses as a media type.
    pub fn add_form_stream_file<R>(
        &mut self,
        name: &str,
        reader: R,
        file_name: &str,
        content_type: Option<&str>,
    ) -> &mut Self
    where
        R: AsyncRead + Send + Sync + Unpin + 'static,
    {
        if !name.is_empty() {
            let mut part = FormPart::new(Some(name), PartPayload::Stream(Box::new(reader)));
            part.file_name = Some(urlencoding::encode(file_name).into_owned());
            part.content_type = content_type
                .filter(|ct| ct.parse::<mime::Mime>().is_ok())
                .map(str::to_string);
            self.parts.push(part);
        }
        self
    }

    /// Read every stream payload to the end and keep the bytes in its place,
    /// then return the parts in wire form.
    pub(crate) async fn drain_parts(&mut self) -> std::io::Result<Vec<WirePart>> {
        let mut wire = Vec::with_capacity(self.parts.len());
        for part in &mut self.parts {
            let data = match &mut part.payload {
                PartPayload::Bytes(data) => data.clone(),
                PartPayload::Stream(reader) => {
                    let mut buf = Vec::new();
                    reader.read_to_end(&mut buf).await?;
                    Bytes::from(buf)
                }
            };
            part.payload = PartPayload::Bytes(data.clone());
            wire.push(WirePart {
                name: part.name.clone(),
                data,
                file_name: part.file_name.clone(),
                content_type: part.content_type.clone(),
            });
        }
        Ok(wire)
    }
}
