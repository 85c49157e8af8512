//! API request descriptor

use crate::error::{DomainError, DomainResult};
use crate::id::generate_id_v7;

use super::{HttpMethod, RequestBody};

const AUTHORIZATION: &str = "Authorization";

/// A replayable description of a call against the album API.
///
/// `path` is relative to the configured API root (`/images/`), or an
/// absolute URL such as a next-page link handed back by the backend, which
/// transports pass through untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    /// Correlation id for logging.
    pub id: String,
    /// HTTP method.
    pub method: HttpMethod,
    /// Path relative to the API root, or an absolute URL.
    pub path: String,
    /// Query string pairs, in order.
    pub query: Vec<(String, String)>,
    /// Extra headers, in order.
    pub headers: Vec<(String, String)>,
    /// Request body.
    pub body: RequestBody,
}

impl ApiRequest {
    /// Creates a request with no body.
    #[must_use]
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            id: generate_id_v7(),
            method,
            path: path.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: RequestBody::None,
        }
    }

    /// Creates a GET request.
    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    /// Creates a POST request.
    #[must_use]
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, path)
    }

    /// Creates a PUT request.
    #[must_use]
    pub fn put(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Put, path)
    }

    /// Creates a DELETE request.
    #[must_use]
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, path)
    }

    /// Sets a JSON body.
    #[must_use]
    pub fn json(mut self, value: serde_json::Value) -> Self {
        self.body = RequestBody::Json(value);
        self
    }

    /// Sets the body.
    #[must_use]
    pub fn body(mut self, body: RequestBody) -> Self {
        self.body = body;
        self
    }

    /// Appends a query pair.
    #[must_use]
    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    /// Appends a header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Returns a copy carrying `Authorization: Bearer <token>`, replacing
    /// any authorization header already present.
    #[must_use]
    pub fn with_bearer(&self, token: &str) -> Self {
        let mut request = self.without_authorization();
        request
            .headers
            .push((AUTHORIZATION.to_string(), format!("Bearer {token}")));
        request
    }

    /// Returns a copy with every authorization header removed.
    #[must_use]
    pub fn without_authorization(&self) -> Self {
        let mut request = self.clone();
        request
            .headers
            .retain(|(name, _)| !name.eq_ignore_ascii_case(AUTHORIZATION));
        request
    }

    /// Returns the value of the `Authorization` header, if any.
    #[must_use]
    pub fn authorization(&self) -> Option<&str> {
        self.headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(AUTHORIZATION))
            .map(|(_, value)| value.as_str())
    }

    /// Returns the bearer token carried by this request, if any.
    #[must_use]
    pub fn bearer_token(&self) -> Option<&str> {
        self.authorization()
            .and_then(|value| value.strip_prefix("Bearer "))
    }

    /// Returns whether the path is an absolute URL.
    #[must_use]
    pub fn is_absolute(&self) -> bool {
        self.path.starts_with("http://") || self.path.starts_with("https://")
    }

    /// Checks that the request can be sent.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidPath` for an empty path or a relative
    /// path that does not start with `/`.
    pub fn validate(&self) -> DomainResult<()> {
        let path = self.path.trim();
        if path.is_empty() {
            return Err(DomainError::InvalidPath("path is required".to_string()));
        }
        if !self.is_absolute() && !path.starts_with('/') {
            return Err(DomainError::InvalidPath(format!(
                "relative path must start with '/': {path}"
            )));
        }
        Ok(())
    }
}
