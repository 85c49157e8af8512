//! Single-flight token refresh coordination.
//!
//! The first request to hit a 401 becomes the leader and performs the
//! refresh; requests that hit a 401 while it is running are queued and
//! replayed by the leader, in arrival order, once a new token exists.
//! Explicit refreshes share the same slot: they either lead or wait for the
//! token of the refresh already in flight.

use std::collections::VecDeque;

use parking_lot::Mutex;
use photox_domain::{ApiRequest, ApiResponse, AuthError};
use tokio::sync::oneshot;
use tracing::debug;

use crate::error::ClientResult;

/// Result of a refresh as delivered to callers that did not run it.
pub type RefreshOutcome = Result<String, AuthError>;

/// A request that failed with 401 while a refresh was in flight.
#[derive(Debug)]
pub struct PendingRequest {
    /// The request as it was sent.
    pub request: ApiRequest,
    /// Where the replay result goes.
    pub reply: oneshot::Sender<ClientResult<ApiResponse>>,
}

#[derive(Debug, Default)]
struct RefreshState {
    refreshing: bool,
    /// Token issued by the running refresh, set once the exchange succeeded
    /// and while the leader is still replaying.
    refreshed: Option<String>,
    pending: VecDeque<PendingRequest>,
    waiters: Vec<oneshot::Sender<RefreshOutcome>>,
}

impl RefreshState {
    /// Returns to `Idle`. The flag and the queues are only ever reset here.
    fn finish(&mut self) -> (VecDeque<PendingRequest>, Vec<oneshot::Sender<RefreshOutcome>>) {
        self.refreshing = false;
        self.refreshed = None;
        (
            std::mem::take(&mut self.pending),
            std::mem::take(&mut self.waiters),
        )
    }
}

/// How a request that received a 401 should proceed.
#[derive(Debug)]
pub enum Admission<'a> {
    /// Perform the refresh, then replay this request and the queue.
    Lead(RefreshGuard<'a>),
    /// A refresh is running; the replayed result arrives here.
    Wait(oneshot::Receiver<ClientResult<ApiResponse>>),
    /// A refresh already finished after this request was sent; replay it
    /// with the stored token.
    Retry(String),
    /// The session was cleared after this request was sent.
    Expired,
}

/// How an explicit refresh should proceed.
#[derive(Debug)]
pub enum RefreshTurn<'a> {
    /// No refresh is running; perform it.
    Lead(RefreshGuard<'a>),
    /// A refresh is running; its outcome arrives here.
    Wait(oneshot::Receiver<RefreshOutcome>),
    /// The running refresh already obtained this token.
    Done(String),
}

/// Owns the `Idle -> Refreshing -> Idle` state machine.
#[derive(Debug, Default)]
pub struct RefreshCoordinator {
    state: Mutex<RefreshState>,
}

impl RefreshCoordinator {
    /// Creates an idle coordinator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true while a refresh is in flight.
    #[must_use]
    pub fn is_refreshing(&self) -> bool {
        self.state.lock().refreshing
    }

    /// Number of requests waiting for the current refresh.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.state.lock().pending.len()
    }

    /// Decides what a request that was answered with 401 does next.
    ///
    /// `current_token` is read under the coordinator lock so that a refresh
    /// settling concurrently is either seen as running or as finished, never
    /// as neither.
    pub fn admit(
        &self,
        sent: &ApiRequest,
        current_token: impl FnOnce() -> Option<String>,
    ) -> Admission<'_> {
        let mut state = self.state.lock();

        if state.refreshing {
            let (reply, receiver) = oneshot::channel();
            state.pending.push_back(PendingRequest {
                request: sent.clone(),
                reply,
            });
            return Admission::Wait(receiver);
        }

        match (sent.bearer_token(), current_token()) {
            (Some(used), Some(current)) if used != current => return Admission::Retry(current),
            (None, Some(current)) => return Admission::Retry(current),
            (Some(_), None) => return Admission::Expired,
            _ => {}
        }

        state.refreshing = true;
        Admission::Lead(RefreshGuard {
            coordinator: self,
            settled: false,
        })
    }

    /// Starts a refresh, or joins the one in flight.
    #[must_use]
    pub fn join(&self) -> RefreshTurn<'_> {
        let mut state = self.state.lock();

        if state.refreshing {
            if let Some(token) = &state.refreshed {
                return RefreshTurn::Done(token.clone());
            }
            let (sender, receiver) = oneshot::channel();
            state.waiters.push(sender);
            return RefreshTurn::Wait(receiver);
        }

        state.refreshing = true;
        RefreshTurn::Lead(RefreshGuard {
            coordinator: self,
            settled: false,
        })
    }
}

fn notify(waiters: Vec<oneshot::Sender<RefreshOutcome>>, outcome: &RefreshOutcome) {
    for waiter in waiters {
        if waiter.send(outcome.clone()).is_err() {
            debug!("refresh waiter was dropped before the outcome arrived");
        }
    }
}

/// Held by the leader for the lifetime of a refresh.
///
/// Dropping the guard before it settles (the leader was cancelled or
/// panicked) still returns the coordinator to `Idle`; queued requests and
/// waiters are rejected by dropping their channels.
#[derive(Debug)]
pub struct RefreshGuard<'a> {
    coordinator: &'a RefreshCoordinator,
    settled: bool,
}

impl RefreshGuard<'_> {
    /// Records the new token and hands it to every explicit refresh waiting
    /// on this one. Later joiners receive it directly until the guard settles.
    pub fn complete(&mut self, token: &str) {
        let waiters = {
            let mut state = self.coordinator.state.lock();
            state.refreshed = Some(token.to_string());
            std::mem::take(&mut state.waiters)
        };
        notify(waiters, &Ok(token.to_string()));
    }

    /// Takes the oldest queued request, or settles to `Idle` when the queue
    /// is empty.
    pub fn next_pending(&mut self) -> Option<PendingRequest> {
        let mut state = self.coordinator.state.lock();
        if let Some(pending) = state.pending.pop_front() {
            return Some(pending);
        }
        let outcome = state.refreshed.clone().ok_or(AuthError::RefreshAbandoned);
        let (_, waiters) = state.finish();
        drop(state);
        self.settled = true;
        notify(waiters, &outcome);
        None
    }

    /// Settles to `Idle`, hands `failure` to every explicit refresh waiting
    /// on this one and returns the queued requests for rejection.
    #[must_use]
    pub fn abort(mut self, failure: &AuthError) -> VecDeque<PendingRequest> {
        self.settled = true;
        let (pending, waiters) = self.coordinator.state.lock().finish();
        notify(waiters, &Err(failure.clone()));
        pending
    }
}

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        if !self.settled {
            let abandoned = self.coordinator.state.lock().finish();
            drop(abandoned);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use photox_domain::AuthError;

    use crate::error::ClientError;

    fn sent(path: &str, token: &str) -> ApiRequest {
        ApiRequest::get(path).with_bearer(token)
    }

    #[test]
    fn test_first_unauthorized_request_leads() {
        let coordinator = RefreshCoordinator::new();
        let admission = coordinator.admit(&sent("/images/", "A"), || Some("A".to_string()));

        assert!(matches!(admission, Admission::Lead(_)));
        assert!(coordinator.is_refreshing());
    }

    #[test]
    fn test_requests_queue_behind_leader_in_order() {
        let coordinator = RefreshCoordinator::new();
        let Admission::Lead(mut guard) =
            coordinator.admit(&sent("/images/", "A"), || Some("A".to_string()))
        else {
            panic!("expected leader");
        };

        for path in ["/albums/", "/users/me/"] {
            let admission = coordinator.admit(&sent(path, "A"), || Some("A".to_string()));
            assert!(matches!(admission, Admission::Wait(_)));
        }
        assert_eq!(coordinator.pending_len(), 2);

        assert_eq!(guard.next_pending().unwrap().request.path, "/albums/");
        assert_eq!(guard.next_pending().unwrap().request.path, "/users/me/");
        assert!(guard.next_pending().is_none());

        assert!(!coordinator.is_refreshing());
        assert_eq!(coordinator.pending_len(), 0);
    }

    #[test]
    fn test_abort_returns_queue_and_resets() {
        let coordinator = RefreshCoordinator::new();
        let Admission::Lead(guard) =
            coordinator.admit(&sent("/images/", "A"), || Some("A".to_string()))
        else {
            panic!("expected leader");
        };
        let _waiting = coordinator.admit(&sent("/albums/", "A"), || Some("A".to_string()));

        let rejected = guard.abort(&AuthError::SessionExpired);

        assert_eq!(rejected.len(), 1);
        assert!(!coordinator.is_refreshing());
        assert_eq!(coordinator.pending_len(), 0);
    }

    #[tokio::test]
    async fn test_dropped_leader_releases_followers() {
        let coordinator = RefreshCoordinator::new();
        let leader = coordinator.admit(&sent("/images/", "A"), || Some("A".to_string()));
        let Admission::Wait(receiver) =
            coordinator.admit(&sent("/albums/", "A"), || Some("A".to_string()))
        else {
            panic!("expected follower");
        };

        drop(leader);

        assert!(!coordinator.is_refreshing());
        assert!(receiver.await.is_err());
    }

    #[tokio::test]
    async fn test_explicit_refresh_waits_for_running_refresh() {
        let coordinator = RefreshCoordinator::new();
        let Admission::Lead(mut guard) =
            coordinator.admit(&sent("/images/", "A"), || Some("A".to_string()))
        else {
            panic!("expected leader");
        };
        let RefreshTurn::Wait(outcome) = coordinator.join() else {
            panic!("expected to wait for the running refresh");
        };

        guard.complete("B");
        assert!(matches!(coordinator.join(), RefreshTurn::Done(ref token) if token == "B"));
        assert!(guard.next_pending().is_none());

        assert_eq!(outcome.await.unwrap(), Ok("B".to_string()));
        assert!(!coordinator.is_refreshing());
    }

    #[tokio::test]
    async fn test_explicit_refresh_receives_failure() {
        let coordinator = RefreshCoordinator::new();
        let RefreshTurn::Lead(guard) = coordinator.join() else {
            panic!("expected leader");
        };
        assert!(matches!(
            coordinator.admit(&sent("/albums/", "A"), || Some("A".to_string())),
            Admission::Wait(_)
        ));
        let RefreshTurn::Wait(outcome) = coordinator.join() else {
            panic!("expected to wait for the running refresh");
        };

        let rejected = guard.abort(&AuthError::MissingRefreshToken);

        assert_eq!(rejected.len(), 1);
        assert_eq!(outcome.await.unwrap(), Err(AuthError::MissingRefreshToken));
        assert!(!coordinator.is_refreshing());
    }

    #[test]
    fn test_stale_token_is_retried_without_refresh() {
        let coordinator = RefreshCoordinator::new();
        let admission = coordinator.admit(&sent("/images/", "old"), || Some("new".to_string()));

        assert!(matches!(admission, Admission::Retry(ref token) if token == "new"));
        assert!(!coordinator.is_refreshing());
    }

    #[test]
    fn test_cleared_session_expires_request() {
        let coordinator = RefreshCoordinator::new();
        let admission = coordinator.admit(&sent("/images/", "old"), || None);

        assert!(matches!(admission, Admission::Expired));
        assert!(!coordinator.is_refreshing());
    }

    #[test]
    fn test_unauthenticated_request_with_no_session_leads() {
        let coordinator = RefreshCoordinator::new();
        let admission = coordinator.admit(&ApiRequest::get("/albums/"), || None);
        assert!(matches!(admission, Admission::Lead(_)));
    }

    #[tokio::test]
    async fn test_follower_receives_reply() {
        let coordinator = RefreshCoordinator::new();
        let Admission::Lead(mut guard) =
            coordinator.admit(&sent("/images/", "A"), || Some("A".to_string()))
        else {
            panic!("expected leader");
        };
        let Admission::Wait(receiver) =
            coordinator.admit(&sent("/albums/", "A"), || Some("A".to_string()))
        else {
            panic!("expected follower");
        };

        let pending = guard.next_pending().unwrap();
        pending
            .reply
            .send(Err(ClientError::Auth(AuthError::SessionExpired)))
            .unwrap();

        let result = receiver.await.unwrap();
        assert!(matches!(
            result,
            Err(ClientError::Auth(AuthError::SessionExpired))
        ));
    }
}
