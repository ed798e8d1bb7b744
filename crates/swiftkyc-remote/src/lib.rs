#![warn(missing_docs)]
//! # swiftkyc-remote
//!
//! ## Purpose
//! Issues requests against the KYC backend and normalizes every response into
//! either a parsed body or a classified failure.
//!
//! ## Responsibilities
//! - Build request URLs from a validated API base.
//! - Execute requests through an injectable [`HttpTransport`].
//! - Interpret bodies as JSON when declared or parseable, else as text.
//! - Turn non-success statuses into [`RequestError`] with a display message.
//! - Classify failures as retriable or permanent.
//!
//! ## Data flow
//! Caller builds [`CallOptions`] -> [`RemoteClient::call`] -> transport returns
//! [`HttpResponse`] -> [`ResponseBody`] on success or [`RemoteError::Status`].
//! The typed [`api::KycApi`] wrapper decodes bodies into strict structs once.
//!
//! ## Ownership and lifetimes
//! Requests and responses own their buffers so transports can be swapped for
//! scripted in-memory fakes without lifetime coupling.
//!
//! ## Error model
//! No retries happen here. Every failure is returned as [`RemoteError`]; the
//! retry policy belongs to the caller.
//!
//! ## Security and privacy notes
//! Request bodies are never logged. Only method, path and status are traced.

pub mod api;
mod multipart;
mod ureq_transport;

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

pub use multipart::{FormPart, MultipartForm, random_boundary};
pub use ureq_transport::UreqTransport;

/// HTTP methods used by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// `GET`.
    Get,
    /// `POST`.
    Post,
}

impl Method {
    /// Upper-case method token.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

/// Request payload.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// No body.
    Empty,
    /// JSON document.
    Json(Value),
    /// Binary multipart form.
    Form(MultipartForm),
}

/// Per-call options passed to [`RemoteClient::call`].
#[derive(Debug, Clone, PartialEq)]
pub struct CallOptions {
    /// HTTP method.
    pub method: Method,
    /// Query pairs appended to the URL in order.
    pub query: Vec<(String, String)>,
    /// Request payload.
    pub body: RequestBody,
}

impl CallOptions {
    /// Plain `GET`.
    pub fn get() -> Self {
        Self {
            method: Method::Get,
            query: Vec::new(),
            body: RequestBody::Empty,
        }
    }

    /// Body-less `POST`.
    pub fn post() -> Self {
        Self {
            method: Method::Post,
            query: Vec::new(),
            body: RequestBody::Empty,
        }
    }

    /// `POST` with a JSON body.
    pub fn post_json(body: Value) -> Self {
        Self {
            method: Method::Post,
            query: Vec::new(),
            body: RequestBody::Json(body),
        }
    }

    /// `POST` with a multipart form body.
    pub fn post_form(form: MultipartForm) -> Self {
        Self {
            method: Method::Post,
            query: Vec::new(),
            body: RequestBody::Form(form),
        }
    }

    /// Appends query pairs.
    pub fn with_query<K, V>(mut self, pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.query
            .extend(pairs.into_iter().map(|(key, value)| (key.into(), value.into())));
        self
    }
}

/// Fully resolved request handed to a transport.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    /// HTTP method.
    pub method: Method,
    /// Absolute URL including query.
    pub url: String,
    /// Payload.
    pub body: RequestBody,
}

/// Raw response returned by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Declared `Content-Type`, if any.
    pub content_type: Option<String>,
    /// Raw body bytes.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// JSON response with the given status.
    pub fn json(status: u16, body: &Value) -> Self {
        Self {
            status,
            content_type: Some("application/json".to_string()),
            body: body.to_string().into_bytes(),
        }
    }

    /// Plain-text response with the given status.
    pub fn text(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            content_type: Some("text/plain; charset=utf-8".to_string()),
            body: body.into().into_bytes(),
        }
    }
}

/// Abstract transport used by [`RemoteClient`].
///
/// Implementations return `Ok` for every response that arrived, whatever its
/// status; `Err` is reserved for failures where no response exists.
pub trait HttpTransport: Send + Sync {
    /// Executes one request.
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, RemoteError>;
}

/// Parsed response body.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    /// Empty body.
    Empty,
    /// Structured body.
    Json(Value),
    /// Body that is not valid JSON.
    Text(String),
}

impl ResponseBody {
    /// Interprets raw bytes.
    ///
    /// Declared JSON is parsed as JSON; anything else is parsed best effort and
    /// falls back to raw text.
    pub fn parse(content_type: Option<&str>, raw: &[u8]) -> Self {
        let text = String::from_utf8_lossy(raw);
        if text.trim().is_empty() {
            return ResponseBody::Empty;
        }

        let declared_json = content_type
            .map(|value| value.to_ascii_lowercase().contains("json"))
            .unwrap_or(false);
        match serde_json::from_str::<Value>(&text) {
            Ok(value) => ResponseBody::Json(value),
            Err(error) => {
                if declared_json {
                    debug!(
                        stage = "remote",
                        action = "json_fallback",
                        "declared JSON body failed to parse: {error}"
                    );
                }
                ResponseBody::Text(text.into_owned())
            }
        }
    }

    /// Returns the JSON value, if structured.
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            ResponseBody::Json(value) => Some(value),
            _ => None,
        }
    }
}

/// Non-success HTTP response.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestError {
    /// HTTP status code.
    pub status: u16,
    /// Parsed response body.
    pub body: ResponseBody,
    /// Display message derived from the body.
    pub message: String,
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP {}: {}", self.status, self.message)
    }
}

impl std::error::Error for RequestError {}

impl RequestError {
    /// Reason supplied by the response body, if it carried one.
    pub fn reason(&self) -> Option<String> {
        body_reason(&self.body)
    }
}

/// Derives a display message from an error body.
///
/// Preference order: `detail` (string, `{message}` object, or validation list
/// with `msg`), then `message`, then raw text, then `HTTP <status>`.
pub fn extract_error_message(status: u16, body: &ResponseBody) -> String {
    body_reason(body).unwrap_or_else(|| generic_status_message(status))
}

/// Reason text carried by an error body; `None` when the body is empty.
///
/// JSON bodies without a recognized field yield their own text.
pub fn body_reason(body: &ResponseBody) -> Option<String> {
    match body {
        ResponseBody::Json(value) => value
            .get("detail")
            .and_then(detail_message)
            .or_else(|| value.get("message").and_then(non_blank_str))
            .or_else(|| Some(value.to_string())),
        ResponseBody::Text(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
        _ => None,
    }
}

fn detail_message(detail: &Value) -> Option<String> {
    match detail {
        Value::String(_) => non_blank_str(detail),
        Value::Object(_) => detail.get("message").and_then(non_blank_str),
        Value::Array(entries) => entries
            .iter()
            .find_map(|entry| entry.get("msg").and_then(non_blank_str)),
        _ => None,
    }
}

fn non_blank_str(value: &Value) -> Option<String> {
    value
        .as_str()
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

fn generic_status_message(status: u16) -> String {
    format!("HTTP {status}")
}

/// Remote layer error type.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// API base URL is unusable.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),
    /// Server answered with a non-success status.
    #[error("{0}")]
    Status(RequestError),
    /// No response was received.
    #[error("transport failure: {0}")]
    Transport(String),
    /// Response did not match the expected schema.
    #[error("unexpected response: {0}")]
    Decode(String),
}

impl RemoteError {
    /// HTTP status for [`RemoteError::Status`].
    pub fn status(&self) -> Option<u16> {
        match self {
            RemoteError::Status(error) => Some(error.status),
            _ => None,
        }
    }

    /// Server-provided reason for a status failure.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            RemoteError::Status(error) => Some(&error.message),
            _ => None,
        }
    }
}

/// Failure class for caller retry decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Worth retrying later.
    Retriable,
    /// Retrying the same request will fail again.
    Permanent,
}

/// Classifies an HTTP status.
pub fn classify_status(status: u16) -> FailureClass {
    match status {
        408 | 429 => FailureClass::Retriable,
        500..=599 => FailureClass::Retriable,
        _ => FailureClass::Permanent,
    }
}

/// Classifies a remote failure.
pub fn classify_remote_error(error: &RemoteError) -> FailureClass {
    match error {
        RemoteError::Status(request) => classify_status(request.status),
        RemoteError::Transport(_) => FailureClass::Retriable,
        RemoteError::InvalidEndpoint(_) | RemoteError::Decode(_) => FailureClass::Permanent,
    }
}

/// Validates the API base URL.
///
/// # Errors
/// Returns [`RemoteError::InvalidEndpoint`] unless the URL parses, uses
/// `http`/`https`, and carries no query or fragment.
pub fn validate_api_base(endpoint: &str) -> Result<Url, RemoteError> {
    let parsed = Url::parse(endpoint)
        .map_err(|error| RemoteError::InvalidEndpoint(format!("invalid api url: {error}")))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(RemoteError::InvalidEndpoint(
            "api base must use http or https".to_string(),
        ));
    }

    if parsed.query().is_some() || parsed.fragment().is_some() {
        return Err(RemoteError::InvalidEndpoint(
            "api base must not carry a query or fragment".to_string(),
        ));
    }

    Ok(parsed)
}

/// Client bound to one API base and transport.
#[derive(Clone)]
pub struct RemoteClient {
    base: Url,
    transport: Arc<dyn HttpTransport>,
}

impl RemoteClient {
    /// Creates a client with a validated API base.
    ///
    /// # Errors
    /// Returns [`RemoteError::InvalidEndpoint`] for an unusable base URL.
    pub fn new(base: &str, transport: Arc<dyn HttpTransport>) -> Result<Self, RemoteError> {
        let base = validate_api_base(base)?;
        Ok(Self { base, transport })
    }

    /// Returns the configured API base.
    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Resolves `path` and `query` against the API base.
    ///
    /// # Errors
    /// Returns [`RemoteError::InvalidEndpoint`] if the base cannot take path
    /// segments.
    pub fn url_for(&self, path: &str, query: &[(String, String)]) -> Result<Url, RemoteError> {
        let mut url = self.base.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                RemoteError::InvalidEndpoint("api base cannot be a base url".to_string())
            })?;
            segments
                .pop_if_empty()
                .extend(path.split('/').filter(|segment| !segment.is_empty()));
        }

        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }

        Ok(url)
    }

    /// Executes one call and returns the parsed body.
    ///
    /// # Errors
    /// - [`RemoteError::Status`] whenever the status is not 2xx.
    /// - Transport errors are propagated as-is.
    pub fn call(&self, path: &str, options: CallOptions) -> Result<ResponseBody, RemoteError> {
        let url = self.url_for(path, &options.query)?;
        let request = HttpRequest {
            method: options.method,
            url: url.to_string(),
            body: options.body,
        };

        debug!(
            stage = "remote",
            action = "request",
            method = request.method.as_str(),
            path = url.path()
        );
        let response = self.transport.execute(&request).inspect_err(|error| {
            warn!(stage = "remote", action = "transport_failed", path = url.path(), "{error}");
        })?;

        let body = ResponseBody::parse(response.content_type.as_deref(), &response.body);
        if !(200..300).contains(&response.status) {
            let message = extract_error_message(response.status, &body);
            warn!(
                stage = "remote",
                action = "status_failed",
                path = url.path(),
                status = response.status
            );
            return Err(RemoteError::Status(RequestError {
                status: response.status,
                body,
                message,
            }));
        }

        debug!(
            stage = "remote",
            action = "response",
            path = url.path(),
            status = response.status
        );
        Ok(body)
    }

    /// Executes one call and decodes the JSON body into `T`.
    ///
    /// # Errors
    /// Returns [`RemoteError::Decode`] when the body is not JSON or misses
    /// required fields, plus everything [`RemoteClient::call`] returns.
    pub fn call_json<T: DeserializeOwned>(
        &self,
        path: &str,
        options: CallOptions,
    ) -> Result<T, RemoteError> {
        match self.call(path, options)? {
            ResponseBody::Json(value) => serde_json::from_value(value)
                .map_err(|error| RemoteError::Decode(format!("{path}: {error}"))),
            ResponseBody::Text(_) => Err(RemoteError::Decode(format!(
                "{path}: expected JSON body, got text"
            ))),
            ResponseBody::Empty => Err(RemoteError::Decode(format!(
                "{path}: expected JSON body, got nothing"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for body interpretation and failure classification.

    use serde_json::json;

    use super::*;

    #[test]
    fn prefers_detail_then_message_then_text() {
        let detail = ResponseBody::Json(json!({"detail": "KYC session not found", "message": "x"}));
        assert_eq!(extract_error_message(404, &detail), "KYC session not found");

        let nested = ResponseBody::Json(json!({
            "detail": {"error_code": "INVALID_PAN_FORMAT", "message": "PAN format invalid."}
        }));
        assert_eq!(extract_error_message(422, &nested), "PAN format invalid.");

        let listed = ResponseBody::Json(json!({"detail": [{"loc": ["body"], "msg": "field required"}]}));
        assert_eq!(extract_error_message(422, &listed), "field required");

        let message = ResponseBody::Json(json!({"message": "bad file"}));
        assert_eq!(extract_error_message(400, &message), "bad file");

        let text = ResponseBody::Text("Internal Server Error".to_string());
        assert_eq!(extract_error_message(500, &text), "Internal Server Error");

        assert_eq!(extract_error_message(502, &ResponseBody::Empty), "HTTP 502");
        assert_eq!(
            extract_error_message(500, &ResponseBody::Json(json!({"other": 1}))),
            r#"{"other":1}"#
        );
    }

    #[test]
    fn body_reason_is_absent_only_for_empty_bodies() {
        assert_eq!(body_reason(&ResponseBody::Empty), None);
        assert_eq!(body_reason(&ResponseBody::Text("   ".to_string())), None);
        assert_eq!(
            body_reason(&ResponseBody::Json(json!({"error": "ocr engine crashed"}))).as_deref(),
            Some(r#"{"error":"ocr engine crashed"}"#)
        );
    }

    #[test]
    fn undeclared_json_is_parsed_best_effort() {
        assert_eq!(
            ResponseBody::parse(Some("text/plain"), br#"{"a":1}"#),
            ResponseBody::Json(json!({"a": 1}))
        );
        assert_eq!(
            ResponseBody::parse(Some("application/json"), b"not json"),
            ResponseBody::Text("not json".to_string())
        );
        assert_eq!(ResponseBody::parse(None, b"  "), ResponseBody::Empty);
    }

    #[test]
    fn classifies_statuses() {
        assert_eq!(classify_status(503), FailureClass::Retriable);
        assert_eq!(classify_status(429), FailureClass::Retriable);
        assert_eq!(classify_status(400), FailureClass::Permanent);
        assert_eq!(classify_status(422), FailureClass::Permanent);
    }

    #[test]
    fn classifies_remote_errors() {
        let unavailable = RemoteError::Status(RequestError {
            status: 503,
            body: ResponseBody::Empty,
            message: "HTTP 503".to_string(),
        });
        assert_eq!(classify_remote_error(&unavailable), FailureClass::Retriable);
        assert_eq!(
            classify_remote_error(&RemoteError::Transport("connection reset".to_string())),
            FailureClass::Retriable
        );
        assert_eq!(
            classify_remote_error(&RemoteError::Decode("missing next_step".to_string())),
            FailureClass::Permanent
        );
    }

    #[test]
    fn validates_api_base() {
        validate_api_base("http://localhost:8000/api/v1").expect("http base should pass");
        validate_api_base("https://kyc.example.test/api/v1").expect("https base should pass");
        assert!(validate_api_base("ftp://kyc.example.test").is_err());
        assert!(validate_api_base("https://kyc.example.test/api?x=1").is_err());
    }
}
