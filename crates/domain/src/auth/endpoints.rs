//! Fixed authentication endpoints.

use serde::{Deserialize, Serialize};

/// Default login path, relative to the API root.
pub const LOGIN_PATH: &str = "/users/login/";

/// Default token refresh path, relative to the API root.
pub const REFRESH_PATH: &str = "/users/token/refresh/";

/// Paths of the two endpoints the interceptor treats specially.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthEndpoints {
    /// Login endpoint.
    pub login: String,
    /// Token refresh endpoint.
    pub refresh: String,
}

impl Default for AuthEndpoints {
    fn default() -> Self {
        Self {
            login: LOGIN_PATH.to_string(),
            refresh: REFRESH_PATH.to_string(),
        }
    }
}

impl AuthEndpoints {
    /// Returns true if `path` addresses the login endpoint.
    #[must_use]
    pub fn is_login(&self, path: &str) -> bool {
        same_endpoint(&self.login, path)
    }

    /// Returns true if `path` addresses the refresh endpoint.
    #[must_use]
    pub fn is_refresh(&self, path: &str) -> bool {
        same_endpoint(&self.refresh, path)
    }
}

/// Compares paths ignoring query string and trailing slashes. Absolute URLs
/// match when their path ends with the endpoint.
fn same_endpoint(endpoint: &str, path: &str) -> bool {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    let endpoint = endpoint.trim_end_matches('/');
    let path = path.trim_end_matches('/');
    if path.starts_with("http://") || path.starts_with("https://") {
        path.ends_with(endpoint)
    } else {
        path == endpoint
    }
}
