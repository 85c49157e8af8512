//! User account endpoints.

use photox_domain::ApiRequest;
use serde_json::Value;
use tracing::{info, warn};

use crate::client::ApiClient;
use crate::error::ClientResult;

const REGISTER_PATH: &str = "/users/register/";
const ME_PATH: &str = "/users/me/";

/// Registration and profile operations.
#[derive(Debug, Clone)]
pub struct AuthService {
    client: ApiClient,
}

impl AuthService {
    /// Creates the service.
    #[must_use]
    pub const fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Registers a new account. Does not log in.
    ///
    /// # Errors
    ///
    /// Returns the client error, e.g. `ClientError::Http` with status 400
    /// when the backend rejects the payload.
    pub async fn register(&self, payload: Value) -> ClientResult<Value> {
        let response = self
            .client
            .request(ApiRequest::post(REGISTER_PATH).json(payload))
            .await?;
        Ok(response.data()?)
    }

    /// Fetches the logged-in user's profile and stores it in the session.
    ///
    /// # Errors
    ///
    /// Returns the client error if the request fails.
    pub async fn current_user(&self) -> ClientResult<Value> {
        let user = self
            .client
            .request(ApiRequest::get(ME_PATH))
            .await?
            .data()?;
        self.client.session_store().set_user(&user).await?;
        Ok(user)
    }

    /// Updates the logged-in user's profile.
    ///
    /// # Errors
    ///
    /// Returns the client error if the request fails.
    pub async fn update_user(&self, payload: Value) -> ClientResult<Value> {
        let user = self
            .client
            .request(ApiRequest::put(ME_PATH).json(payload))
            .await?
            .data()?;
        self.client.session_store().set_user(&user).await?;
        Ok(user)
    }

    /// Restores the session on startup.
    ///
    /// Returns `None` when there is no stored token, or when the stored
    /// token could not be validated; in that case the session is cleared.
    ///
    /// # Errors
    ///
    /// Only storage failures are returned.
    pub async fn initialize(&self) -> ClientResult<Option<Value>> {
        if !self.client.is_authenticated() {
            return Ok(None);
        }

        match self.current_user().await {
            Ok(user) => {
                info!("session restored");
                Ok(Some(user))
            }
            Err(e) => {
                warn!(error = %e, "stored session could not be validated, logging out");
                self.client.logout().await?;
                Ok(None)
            }
        }
    }
}
