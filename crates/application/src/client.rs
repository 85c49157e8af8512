//! Authenticated API client.
//!
//! Attaches the stored bearer token to every request and recovers from
//! expired access tokens:
//!
//! - 401 on the login endpoint: the session is cleared and the error is
//!   returned as `InvalidCredentials`. No refresh, no event.
//! - 401 on the refresh endpoint: the session is cleared and a single
//!   `SessionEvent::Invalidated` is broadcast.
//! - 401 anywhere else: one refresh runs; the triggering request and every
//!   request that failed meanwhile are replayed with the new token, in that
//!   order, or all rejected together if the refresh fails.
//!
//! Every other status is classified and returned without retry.

use std::sync::Arc;

use photox_domain::{
    ApiRequest, ApiResponse, AuthEndpoints, AuthError, RefreshedToken, Session, SessionEvent,
    TokenPair, error_message,
};
use serde_json::json;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::auth::{Admission, RefreshCoordinator, RefreshGuard, RefreshTurn, SessionStore};
use crate::error::{ClientError, ClientResult};
use crate::ports::HttpTransport;

/// Capacity of the session event channel.
const EVENT_CAPACITY: usize = 16;

struct Inner {
    transport: Arc<dyn HttpTransport>,
    session: SessionStore,
    coordinator: RefreshCoordinator,
    endpoints: AuthEndpoints,
    events: broadcast::Sender<SessionEvent>,
}

/// Client for the album API.
///
/// Cheap to clone; clones share the session and the refresh state.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("session", &self.inner.session)
            .field("endpoints", &self.inner.endpoints)
            .field("refreshing", &self.inner.coordinator.is_refreshing())
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Creates a client using the default login and refresh paths.
    #[must_use]
    pub fn new(transport: Arc<dyn HttpTransport>, session: SessionStore) -> Self {
        Self::with_endpoints(transport, session, AuthEndpoints::default())
    }

    /// Creates a client with custom login and refresh paths.
    #[must_use]
    pub fn with_endpoints(
        transport: Arc<dyn HttpTransport>,
        session: SessionStore,
        endpoints: AuthEndpoints,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                transport,
                session,
                coordinator: RefreshCoordinator::new(),
                endpoints,
                events,
            }),
        }
    }

    /// Subscribes to session events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    /// Returns a snapshot of the current session.
    #[must_use]
    pub fn session(&self) -> Session {
        self.inner.session.session()
    }

    /// Returns the session store.
    #[must_use]
    pub fn session_store(&self) -> &SessionStore {
        &self.inner.session
    }

    /// Returns true if an access token is stored.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.inner.session.session().is_authenticated()
    }

    /// Returns true while a token refresh is in flight.
    #[must_use]
    pub fn is_refreshing(&self) -> bool {
        self.inner.coordinator.is_refreshing()
    }

    /// Number of requests queued behind the current refresh.
    #[must_use]
    pub fn pending_requests(&self) -> usize {
        self.inner.coordinator.pending_len()
    }

    /// Sends a request with the stored bearer token.
    ///
    /// # Errors
    ///
    /// - `ClientError::Network` if no response was received
    /// - `ClientError::Auth` if the session could not be recovered
    /// - `ClientError::Http` for other non-2xx statuses
    pub async fn request(&self, request: ApiRequest) -> ClientResult<ApiResponse> {
        request.validate()?;

        let sent = match self.inner.session.access_token() {
            Some(token) => request.with_bearer(&token),
            None => request.without_authorization(),
        };

        let response = self.dispatch(&sent).await?;
        if !response.is_unauthorized() {
            return classify(response);
        }
        self.recover_unauthorized(sent, &response).await
    }

    /// Logs in and stores the issued tokens.
    ///
    /// # Errors
    ///
    /// - `AuthError::InvalidCredentials` when the backend answers 401
    /// - `ClientError::Format` when the response carries no token pair
    pub async fn login(&self, username: &str, password: &str) -> ClientResult<Session> {
        let request = ApiRequest::post(self.inner.endpoints.login.as_str())
            .json(json!({"username": username, "password": password}));

        let response = self.dispatch(&request).await?;
        if response.is_unauthorized() {
            return Err(self.reject_login(&response).await);
        }
        let response = classify(response)?;

        let tokens = TokenPair::from_login_response(&response.json_value()?)?;
        self.inner.session.save_tokens(&tokens).await?;

        info!(username, "logged in");
        self.emit(SessionEvent::LoggedIn {
            username: username.to_string(),
        });
        Ok(Session::from(tokens))
    }

    /// Exchanges the refresh token for a new access token.
    ///
    /// Joins the refresh already in flight, if any, instead of starting a
    /// second one. On failure the whole session is cleared and a single
    /// `SessionEvent::Invalidated` is broadcast.
    ///
    /// # Errors
    ///
    /// - `AuthError::MissingRefreshToken` if no refresh token is stored
    /// - `AuthError::RefreshRejected` if the refresh token is not accepted
    /// - `AuthError::RefreshFailed` for any other failure
    /// - `AuthError::RefreshAbandoned` if the refresh being joined was cancelled
    pub async fn refresh(&self) -> ClientResult<String> {
        match self.inner.coordinator.join() {
            RefreshTurn::Lead(guard) => {
                let (token, guard) = self.settle_refresh(guard).await?;
                self.replay_pending(guard, &token).await;
                Ok(token)
            }
            RefreshTurn::Wait(outcome) => {
                debug!("joining the token refresh in flight");
                outcome
                    .await
                    .unwrap_or(Err(AuthError::RefreshAbandoned))
                    .map_err(ClientError::from)
            }
            RefreshTurn::Done(token) => Ok(token),
        }
    }

    /// Clears the session. Calling it again is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Storage` if the store cannot be written.
    pub async fn logout(&self) -> ClientResult<()> {
        if self.inner.session.clear().await? {
            info!("logged out");
            self.emit(SessionEvent::LoggedOut);
        }
        Ok(())
    }

    async fn dispatch(&self, request: &ApiRequest) -> ClientResult<ApiResponse> {
        debug!(
            id = %request.id,
            method = %request.method,
            path = %request.path,
            authenticated = request.authorization().is_some(),
            "sending request"
        );
        let response = self.inner.transport.send(request).await.inspect_err(|e| {
            warn!(id = %request.id, path = %request.path, error = %e, "request failed");
        })?;
        debug!(id = %request.id, status = response.status.as_u16(), "response received");
        Ok(response)
    }

    async fn recover_unauthorized(
        &self,
        sent: ApiRequest,
        response: &ApiResponse,
    ) -> ClientResult<ApiResponse> {
        let endpoints = &self.inner.endpoints;

        if endpoints.is_login(&sent.path) {
            return Err(self.reject_login(response).await);
        }

        if endpoints.is_refresh(&sent.path) {
            let message = error_message(response.status, &response.body);
            self.invalidate(&message).await?;
            return Err(AuthError::RefreshRejected { message }.into());
        }

        let admission = self
            .inner
            .coordinator
            .admit(&sent, || self.inner.session.access_token());

        match admission {
            Admission::Lead(guard) => {
                warn!(id = %sent.id, path = %sent.path, "access token rejected, refreshing");
                self.lead_refresh(guard, sent).await
            }
            Admission::Wait(reply) => {
                debug!(id = %sent.id, "queued behind token refresh");
                reply
                    .await
                    .unwrap_or_else(|_| Err(AuthError::RefreshAbandoned.into()))
            }
            Admission::Retry(token) => {
                debug!(id = %sent.id, "token changed since request was sent, replaying");
                self.replay(&sent, &token).await
            }
            Admission::Expired => Err(AuthError::SessionExpired.into()),
        }
    }

    async fn lead_refresh(
        &self,
        guard: RefreshGuard<'_>,
        sent: ApiRequest,
    ) -> ClientResult<ApiResponse> {
        let (token, guard) = self.settle_refresh(guard).await?;
        let result = self.replay(&sent, &token).await;
        self.replay_pending(guard, &token).await;
        result
    }

    /// Runs the refresh as leader. On failure every queued request and
    /// waiter is rejected before the error is returned.
    async fn settle_refresh<'a>(
        &self,
        mut guard: RefreshGuard<'a>,
    ) -> ClientResult<(String, RefreshGuard<'a>)> {
        match self.refresh_inner().await {
            Ok(token) => {
                guard.complete(&token);
                Ok((token, guard))
            }
            Err(failure) => {
                let shared = match &failure {
                    ClientError::Auth(auth) => auth.clone(),
                    other => AuthError::RefreshFailed {
                        message: other.to_string(),
                    },
                };
                for pending in guard.abort(&shared) {
                    if pending
                        .reply
                        .send(Err(AuthError::SessionExpired.into()))
                        .is_err()
                    {
                        debug!(id = %pending.request.id, "queued request was dropped before its rejection");
                    }
                }
                Err(failure)
            }
        }
    }

    /// Replays the queue in arrival order, then settles the coordinator.
    async fn replay_pending(&self, mut guard: RefreshGuard<'_>, token: &str) {
        while let Some(pending) = guard.next_pending() {
            let replayed = self.replay(&pending.request, token).await;
            if pending.reply.send(replayed).is_err() {
                debug!(id = %pending.request.id, "queued request was dropped before its replay");
            }
        }
    }

    async fn refresh_inner(&self) -> ClientResult<String> {
        let Some(refresh_token) = self.inner.session.refresh_token() else {
            warn!("token refresh needed but no refresh token is stored");
            self.invalidate("no refresh token").await?;
            return Err(AuthError::MissingRefreshToken.into());
        };

        match self.exchange_refresh_token(&refresh_token).await {
            Ok(access) => Ok(access),
            Err(failure) => {
                let failure = match failure {
                    ClientError::Auth(auth) => auth,
                    other => AuthError::RefreshFailed {
                        message: other.to_string(),
                    },
                };
                warn!(error = %failure, "token refresh failed");
                self.invalidate(&failure.to_string()).await?;
                Err(failure.into())
            }
        }
    }

    /// Re-sends a request with `token`. A second 401 is returned as is.
    async fn replay(&self, sent: &ApiRequest, token: &str) -> ClientResult<ApiResponse> {
        let response = self.dispatch(&sent.with_bearer(token)).await?;
        classify(response)
    }

    async fn exchange_refresh_token(&self, refresh_token: &str) -> ClientResult<String> {
        let request = ApiRequest::post(self.inner.endpoints.refresh.as_str())
            .json(json!({"refresh": refresh_token}));

        let response = self.dispatch(&request).await?;
        if !response.is_success() {
            let message = error_message(response.status, &response.body);
            let failure = if response.is_unauthorized() {
                AuthError::RefreshRejected { message }
            } else {
                AuthError::RefreshFailed { message }
            };
            return Err(failure.into());
        }

        let token = RefreshedToken::from_refresh_response(&response.json_value()?)?;
        self.inner.session.set_access_token(&token.access).await?;
        if let Some(rotated) = &token.refresh {
            self.inner.session.set_refresh_token(rotated).await?;
        }

        info!("access token refreshed");
        self.emit(SessionEvent::TokenRefreshed);
        Ok(token.access)
    }

    async fn reject_login(&self, response: &ApiResponse) -> ClientError {
        let message = error_message(response.status, &response.body);
        warn!(%message, "login rejected");
        if let Err(e) = self.inner.session.clear().await {
            return e.into();
        }
        AuthError::InvalidCredentials { message }.into()
    }

    /// Clears the session and broadcasts the login-redirect signal.
    async fn invalidate(&self, reason: &str) -> ClientResult<()> {
        let cleared = self.inner.session.clear().await;
        self.emit(SessionEvent::Invalidated {
            reason: reason.to_string(),
        });
        cleared?;
        Ok(())
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is not an error.
        let _ = self.inner.events.send(event);
    }
}

/// Maps a response that will not be retried to a result.
fn classify(response: ApiResponse) -> ClientResult<ApiResponse> {
    if response.is_success() {
        return Ok(response);
    }

    let status = response.status;
    let message = error_message(status, &response.body);
    if status.is_server_error() {
        error!(status = status.as_u16(), body = %response.text(), "server error");
    }
    if response.is_unauthorized() {
        return Err(AuthError::Unauthorized { message }.into());
    }
    Err(ClientError::Http {
        status: status.as_u16(),
        message,
        body: response.text(),
    })
}
