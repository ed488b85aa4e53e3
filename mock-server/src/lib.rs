use std::time::Duration;

use axum::{
    extract::{FromRequest, Multipart, Path, Query, Request},
    http::{header, HeaderMap, Method, StatusCode},
    routing::get,
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tracing::debug;

/// One multipart field as received by `/echo`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct EchoPart {
    pub name: Option<String>,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub text: String,
}

/// Everything `/echo` saw about the incoming request.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EchoReport {
    pub method: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub content_type: Option<String>,
    pub form: Vec<(String, String)>,
    pub parts: Vec<EchoPart>,
}

impl EchoReport {
    /// All values received for header `name`, in order.
    pub fn header_values(&self, name: &str) -> Vec<&str> {
        self.headers
            .iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
            .collect()
    }
}

/// Raw body served by `/bytes`; not valid UTF-8.
pub const RAW_BYTES: &[u8] = &[b'h', b'i', 0xff];

pub fn app() -> Router {
    Router::new()
        .route("/echo", get(echo).post(echo))
        .route("/status/{code}", get(status).post(status))
        .route("/slow/{ms}", get(slow))
        .route("/bytes", get(raw_bytes))
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

type Rejection = (StatusCode, String);

async fn echo(
    method: Method,
    headers: HeaderMap,
    Query(query): Query<Vec<(String, String)>>,
    request: Request,
) -> Result<Json<EchoReport>, Rejection> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let mut report = EchoReport {
        method: method.to_string(),
        query,
        headers: headers
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.to_string(), v.to_string())))
            .collect(),
        content_type: content_type.clone(),
        ..EchoReport::default()
    };

    match content_type.as_deref() {
        Some(ct) if ct.starts_with("multipart/form-data") => {
            let mut multipart = Multipart::from_request(request, &())
                .await
                .map_err(|e| (StatusCode::BAD_REQUEST, e.body_text()))?;
            while let Some(field) = multipart
                .next_field()
                .await
                .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?
            {
                let name = field.name().filter(|n| !n.is_empty()).map(str::to_string);
                let file_name = field.file_name().map(str::to_string);
                let content_type = field.content_type().map(str::to_string);
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
                report.parts.push(EchoPart {
                    name,
                    file_name,
                    content_type,
                    text: String::from_utf8_lossy(&data).into_owned(),
                });
            }
        }
        Some(ct) if ct.starts_with("application/x-www-form-urlencoded") => {
            let Form(form) = Form::<Vec<(String, String)>>::from_request(request, &())
                .await
                .map_err(|e| (StatusCode::BAD_REQUEST, e.body_text()))?;
            report.form = form;
        }
        _ => {}
    }

    debug!(method = %report.method, parts = report.parts.len(), "echo");
    Ok(Json(report))
}

async fn status(Path(code): Path<u16>) -> Result<(StatusCode, String), Rejection> {
    let status = StatusCode::from_u16(code)
        .map_err(|_| (StatusCode::BAD_REQUEST, format!("invalid status {code}")))?;
    Ok((status, format!("status {code}")))
}

async fn slow(Path(ms): Path<u64>) -> &'static str {
    tokio::time::sleep(Duration::from_millis(ms)).await;
    "slow done"
}

async fn raw_bytes() -> ([(header::HeaderName, &'static str); 1], &'static [u8]) {
    ([(header::CONTENT_TYPE, "application/octet-stream")], RAW_BYTES)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_values_match_case_insensitively() {
        let report = EchoReport {
            headers: vec![
                ("x-tag".to_string(), "a".to_string()),
                ("X-Tag".to_string(), "b".to_string()),
                ("other".to_string(), "c".to_string()),
            ],
            ..EchoReport::default()
        };
        assert_eq!(report.header_values("X-TAG"), vec!["a", "b"]);
        assert!(report.header_values("missing").is_empty());
    }

    #[test]
    fn report_roundtrips_through_json() {
        let report = EchoReport {
            method: "POST".to_string(),
            parts: vec![EchoPart {
                name: Some("file".to_string()),
                file_name: Some("a.txt".to_string()),
                content_type: None,
                text: "hello".to_string(),
            }],
            ..EchoReport::default()
        };
        let json = serde_json::to_string(&report).unwrap();
        let back: EchoReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back.method, "POST");
        assert_eq!(back.parts, report.parts);
    }
}
