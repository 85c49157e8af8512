//! Session and token types, and the token response shapes the backend uses.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{DomainError, DomainResult};

/// The client's credentials.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Short-lived token attached to API requests.
    pub access_token: Option<String>,
    /// Long-lived token used only to obtain a new access token.
    pub refresh_token: Option<String>,
}

impl Session {
    /// Returns an empty session.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            access_token: None,
            refresh_token: None,
        }
    }

    /// Returns true if an access token is present.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }

    /// Returns true if neither token is present.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.refresh_token.is_none()
    }
}

impl From<TokenPair> for Session {
    fn from(pair: TokenPair) -> Self {
        Self {
            access_token: Some(pair.access),
            refresh_token: Some(pair.refresh),
        }
    }
}

/// Access and refresh token issued by a login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    /// Access token.
    pub access: String,
    /// Refresh token.
    pub refresh: String,
}

/// Result of a token refresh.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RefreshedToken {
    /// New access token.
    pub access: String,
    /// Replacement refresh token, when the backend rotates them.
    #[serde(default)]
    pub refresh: Option<String>,
}

#[derive(Deserialize)]
struct Envelope<T> {
    #[allow(dead_code)]
    code: Value,
    data: T,
}

impl TokenPair {
    /// Extracts tokens from a login response body.
    ///
    /// Exactly two shapes are accepted: a flat `{access, refresh}` object and
    /// a `{code, data: {access, refresh}}` envelope.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::UnexpectedFormat` for any other shape, or when a
    /// token is empty.
    pub fn from_login_response(body: &Value) -> DomainResult<Self> {
        let pair: Self = flat_or_enveloped(body, "login")?;
        if pair.access.is_empty() || pair.refresh.is_empty() {
            return Err(DomainError::UnexpectedFormat(
                "login response contains an empty token".to_string(),
            ));
        }
        Ok(pair)
    }
}

impl RefreshedToken {
    /// Extracts the new access token from a refresh response body, flat or
    /// enveloped.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::UnexpectedFormat` when no access token is found.
    pub fn from_refresh_response(body: &Value) -> DomainResult<Self> {
        let token: Self = flat_or_enveloped(body, "refresh")?;
        if token.access.is_empty() {
            return Err(DomainError::UnexpectedFormat(
                "refresh response contains an empty access token".to_string(),
            ));
        }
        Ok(token)
    }
}

fn flat_or_enveloped<T: DeserializeOwned>(body: &Value, what: &str) -> DomainResult<T> {
    if let Ok(flat) = T::deserialize(body) {
        return Ok(flat);
    }
    Envelope::<T>::deserialize(body)
        .map(|envelope| envelope.data)
        .map_err(|_| {
            DomainError::UnexpectedFormat(format!(
                "{what} response has neither {{access, refresh}} nor {{code, data}} shape"
            ))
        })
}
