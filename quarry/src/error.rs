//! Error types for the client

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Errors returned by the client and its services
#[derive(Error, Debug)]
pub enum Error {
    /// No node in the pool is able to take the request
    #[error("no Elasticsearch node available: {0}")]
    NoClient(String),

    /// The retrier gave up
    #[error("cannot connect after several retries: {0}")]
    Retry(String),

    /// A wait operation (e.g. waiting for cluster status) ran out of time
    #[error("timeout: {0}")]
    Timeout(String),

    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("plugin {0} not found")]
    PluginNotFound(String),

    /// A scroll cursor has no more hits
    #[error("end of scroll")]
    EndOfScroll,

    /// The server answered with a non-2xx status
    #[error("{0}")]
    Api(ApiError),
}

impl Error {
    /// Get the error type as a string for metrics labeling
    pub fn error_type(&self) -> &'static str {
        match self {
            Error::NoClient(_) => "no_client",
            Error::Retry(_) => "retry",
            Error::Timeout(_) => "timeout",
            Error::Transport(_) => "transport",
            Error::Json(_) => "json",
            Error::Url(_) => "url",
            Error::Io(_) => "io",
            Error::Config(_) => "config",
            Error::InvalidArgument(_) => "invalid_argument",
            Error::PluginNotFound(_) => "plugin_not_found",
            Error::EndOfScroll => "end_of_scroll",
            Error::Api(_) => "api",
        }
    }

    /// HTTP status attached to the error, if the server produced one
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api(e) => Some(e.status),
            Error::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    pub fn is_conflict(&self) -> bool {
        self.status() == Some(409)
    }

    pub fn is_timeout(&self) -> bool {
        match self {
            Error::Timeout(_) => true,
            Error::Transport(e) => e.is_timeout(),
            other => other.status() == Some(408),
        }
    }

    /// Server-side error details, if any
    pub fn details(&self) -> Option<&ErrorDetails> {
        match self {
            Error::Api(e) => e.details.as_ref(),
            _ => None,
        }
    }
}

/// Error returned by the server as `{"error": ..., "status": N}`
#[derive(Debug, Clone, PartialEq)]
pub struct ApiError {
    pub status: u16,
    pub details: Option<ErrorDetails>,
}

impl ApiError {
    /// Decode an error body. Bodies that are not JSON still produce an error
    /// carrying the status.
    pub fn from_body(status: u16, body: &[u8]) -> Self {
        let details = serde_json::from_slice::<ErrorBody>(body)
            .ok()
            .and_then(|b| b.error)
            .map(|e| match e {
                ErrorField::Details(d) => *d,
                ErrorField::Message(reason) => ErrorDetails {
                    reason,
                    ..Default::default()
                },
            });
        Self { status, details }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = StatusCode::from_u16(self.status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("Unknown");
        match &self.details {
            Some(d) if !d.error_type.is_empty() => write!(
                f,
                "elastic: Error {} ({}): {} [type={}]",
                self.status, text, d.reason, d.error_type
            ),
            Some(d) if !d.reason.is_empty() => {
                write!(f, "elastic: Error {} ({}): {}", self.status, text, d.reason)
            }
            _ => write!(f, "elastic: Error {} ({})", self.status, text),
        }
    }
}

impl std::error::Error for ApiError {}

/// Structured error details
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorDetails {
    #[serde(rename = "type", default)]
    pub error_type: String,
    #[serde(default)]
    pub reason: String,
    #[serde(rename = "resource.type", default, skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
    #[serde(rename = "resource.id", default, skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_uuid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grouped: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caused_by: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub root_cause: Vec<ErrorDetails>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed_shards: Vec<Value>,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<ErrorField>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ErrorField {
    Details(Box<ErrorDetails>),
    Message(String),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_structured_error() {
        let body = br#"{
            "error": {
                "root_cause": [{"type": "index_not_found_exception", "reason": "no such index", "index": "missing"}],
                "type": "index_not_found_exception",
                "reason": "no such index",
                "resource.type": "index_or_alias",
                "resource.id": "missing",
                "index": "missing"
            },
            "status": 404
        }"#;
        let err = ApiError::from_body(404, body);
        let details = err.details.clone().unwrap();
        assert_eq!(details.error_type, "index_not_found_exception");
        assert_eq!(details.resource_id.as_deref(), Some("missing"));
        assert_eq!(details.root_cause.len(), 1);
        assert_eq!(
            err.to_string(),
            "elastic: Error 404 (Not Found): no such index [type=index_not_found_exception]"
        );
    }

    #[test]
    fn test_parse_string_error() {
        let err = ApiError::from_body(400, br#"{"error": "IndexMissingException[[x] missing]", "status": 400}"#);
        assert_eq!(
            err.details.as_ref().map(|d| d.reason.as_str()),
            Some("IndexMissingException[[x] missing]")
        );
        assert!(err.to_string().starts_with("elastic: Error 400 (Bad Request)"));
    }

    #[test]
    fn test_parse_garbage_body() {
        let err = ApiError::from_body(502, b"<html>bad gateway</html>");
        assert!(err.details.is_none());
        assert_eq!(err.to_string(), "elastic: Error 502 (Bad Gateway)");
    }

    #[test]
    fn test_status_helpers() {
        let not_found = Error::Api(ApiError { status: 404, details: None });
        assert!(not_found.is_not_found());
        assert!(!not_found.is_conflict());

        let conflict = Error::Api(ApiError { status: 409, details: None });
        assert!(conflict.is_conflict());
        assert_eq!(conflict.error_type(), "api");

        assert!(Error::Timeout("cluster health".into()).is_timeout());
        assert!(Error::NoClient("x".into()).status().is_none());
    }
}
