//! API response type
//!
//! Holds what came back from the backend together with the helpers the
//! client needs to read the `{code, message, data}` envelope used by most
//! endpoints.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{DomainError, DomainResult};

/// HTTP status code with semantic helpers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct StatusCode(pub u16);

impl StatusCode {
    /// 401 Unauthorized.
    pub const UNAUTHORIZED: Self = Self(401);

    /// Returns the numeric status code.
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self.0
    }

    /// Returns true for a 2xx status.
    #[must_use]
    pub const fn is_success(self) -> bool {
        self.0 >= 200 && self.0 < 300
    }

    /// Returns true for a 5xx status.
    #[must_use]
    pub const fn is_server_error(self) -> bool {
        self.0 >= 500 && self.0 < 600
    }

    /// Returns the canonical reason phrase for the statuses the API uses.
    #[must_use]
    pub const fn reason_phrase(self) -> &'static str {
        match self.0 {
            200 => "OK",
            201 => "Created",
            204 => "No Content",
            400 => "Bad Request",
            401 => "Unauthorized",
            403 => "Forbidden",
            404 => "Not Found",
            405 => "Method Not Allowed",
            413 => "Payload Too Large",
            415 => "Unsupported Media Type",
            429 => "Too Many Requests",
            500 => "Internal Server Error",
            502 => "Bad Gateway",
            503 => "Service Unavailable",
            504 => "Gateway Timeout",
            _ => "Unknown",
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.0, self.reason_phrase())
    }
}

impl From<u16> for StatusCode {
    fn from(code: u16) -> Self {
        Self(code)
    }
}

/// A response received from the backend.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ApiResponse {
    /// HTTP status.
    pub status: StatusCode,
    /// Response headers, names lower-cased by the transport.
    pub headers: HashMap<String, String>,
    /// Raw body bytes.
    pub body: Vec<u8>,
    /// Time from send to last body byte.
    pub duration: Duration,
}

impl ApiResponse {
    /// Creates a response from raw parts.
    #[must_use]
    pub fn new(
        status: impl Into<StatusCode>,
        headers: HashMap<String, String>,
        body: Vec<u8>,
        duration: Duration,
    ) -> Self {
        Self {
            status: status.into(),
            headers,
            body,
            duration,
        }
    }

    /// Creates a response with a JSON body and no headers.
    #[must_use]
    pub fn json_body(status: impl Into<StatusCode>, value: &Value) -> Self {
        Self::new(
            status,
            HashMap::from([("content-type".to_string(), "application/json".to_string())]),
            value.to_string().into_bytes(),
            Duration::ZERO,
        )
    }

    /// Returns true if the status is 2xx.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Returns true if the status is 401.
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        self.status == StatusCode::UNAUTHORIZED
    }

    /// Gets a header value by name (case-insensitive).
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Returns the body as a lossy UTF-8 string.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Parses the body as a JSON value. An empty body decodes to `null`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::UnexpectedFormat` if the body is not JSON.
    pub fn json_value(&self) -> DomainResult<Value> {
        if self.body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&self.body)
            .map_err(|e| DomainError::UnexpectedFormat(format!("body is not JSON: {e}")))
    }

    /// Deserializes the body.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::UnexpectedFormat` if the body does not match `T`.
    pub fn json<T: DeserializeOwned>(&self) -> DomainResult<T> {
        serde_json::from_slice(&self.body)
            .map_err(|e| DomainError::UnexpectedFormat(e.to_string()))
    }

    /// Returns the payload with the `{code, message, data}` envelope removed.
    ///
    /// Bodies that are not enveloped are returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::UnexpectedFormat` if the body is not JSON.
    pub fn data(&self) -> DomainResult<Value> {
        Ok(unwrap_envelope(self.json_value()?))
    }
}

/// Strips a `{code, data}` envelope, leaving other values untouched.
#[must_use]
pub fn unwrap_envelope(value: Value) -> Value {
    match value {
        Value::Object(mut map) if map.contains_key("code") && map.contains_key("data") => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_status_classes() {
        assert!(StatusCode(204).is_success());
        assert!(!StatusCode(404).is_success());
        assert!(StatusCode(503).is_server_error());
        assert_eq!(StatusCode(401).to_string(), "401 Unauthorized");
    }

    #[test]
    fn test_data_unwraps_envelope() {
        let response = ApiResponse::json_body(
            200,
            &json!({"code": 0, "message": "ok", "data": {"id": 7}}),
        );
        assert_eq!(response.data().unwrap(), json!({"id": 7}));
    }

    #[test]
    fn test_data_passes_bare_payload_through() {
        let response = ApiResponse::json_body(200, &json!({"count": 0, "results": []}));
        assert_eq!(
            response.data().unwrap(),
            json!({"count": 0, "results": []})
        );
    }

    #[test]
    fn test_empty_body_is_null() {
        let response = ApiResponse::new(204, HashMap::new(), Vec::new(), Duration::ZERO);
        assert_eq!(response.json_value().unwrap(), Value::Null);
    }

    #[test]
    fn test_non_json_body() {
        let response = ApiResponse::new(
            502,
            HashMap::new(),
            b"<html>bad gateway</html>".to_vec(),
            Duration::ZERO,
        );
        assert!(matches!(
            response.json_value(),
            Err(DomainError::UnexpectedFormat(_))
        ));
        assert_eq!(response.text(), "<html>bad gateway</html>");
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let response = ApiResponse::json_body(200, &json!({}));
        assert_eq!(response.header("Content-Type"), Some("application/json"));
    }
}
