//! Raw HTTP responses and request bodies

use crate::error::{ApiError, Error, Result};
use bytes::Bytes;
use reqwest::header::HeaderMap;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Body of an outgoing request
#[derive(Debug, Clone)]
pub enum Body {
    /// Serialized as JSON
    Json(Value),
    /// Sent as-is, e.g. pre-encoded NDJSON
    Text(String),
    Bytes(Bytes),
}

impl Body {
    pub(crate) fn into_bytes(self) -> Result<Vec<u8>> {
        match self {
            Body::Json(value) => Ok(serde_json::to_vec(&value)?),
            Body::Text(text) => Ok(text.into_bytes()),
            Body::Bytes(bytes) => Ok(bytes.to_vec()),
        }
    }
}

impl From<Value> for Body {
    fn from(value: Value) -> Self {
        Body::Json(value)
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Body::Text(text)
    }
}

impl From<&str> for Body {
    fn from(text: &str) -> Self {
        Body::Text(text.to_string())
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        Body::Bytes(bytes)
    }
}

/// Response returned from the cluster
#[derive(Debug, Clone)]
pub struct Response {
    pub status_code: u16,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Response {
    /// Decode the body into `T`
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }
}

/// Turn a non-2xx status into an error unless it is explicitly ignored
pub(crate) fn check_response(status: u16, body: &[u8], ignore_errors: &[u16]) -> Result<()> {
    if (200..300).contains(&status) || ignore_errors.contains(&status) {
        return Ok(());
    }
    Err(Error::Api(ApiError::from_body(status, body)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_check_response_success_and_ignored() {
        assert!(check_response(200, b"{}", &[]).is_ok());
        assert!(check_response(201, b"{}", &[]).is_ok());
        assert!(check_response(404, b"{}", &[404]).is_ok());
    }

    #[test]
    fn test_check_response_error() {
        let err = check_response(
            409,
            br#"{"error":{"type":"version_conflict_engine_exception","reason":"conflict"},"status":409}"#,
            &[404],
        )
        .unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(
            err.details().map(|d| d.error_type.as_str()),
            Some("version_conflict_engine_exception")
        );
    }

    #[test]
    fn test_body_encoding() {
        let bytes = Body::from(json!({"query": {"match_all": {}}})).into_bytes().unwrap();
        assert_eq!(bytes, br#"{"query":{"match_all":{}}}"#.to_vec());
        let raw = Body::from("{\"index\":{}}\n").into_bytes().unwrap();
        assert_eq!(raw, b"{\"index\":{}}\n".to_vec());
    }
}
