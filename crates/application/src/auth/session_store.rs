//! Session persistence over the key-value store.
//!
//! Tokens are kept in a write-through cache so that attaching a bearer token
//! to an outgoing request never waits on storage.

use std::sync::Arc;

use parking_lot::RwLock;
use photox_domain::{Session, TokenPair};
use serde_json::Value;
use tracing::warn;

use crate::ports::{KeyValueStore, StoreError};

/// Storage key of the access token.
pub const ACCESS_TOKEN_KEY: &str = "token";
/// Storage key of the refresh token.
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";
/// Storage key of the last-known user profile (JSON).
pub const USER_KEY: &str = "user";

#[derive(Debug, Default)]
struct Cached {
    session: Session,
    user: Option<Value>,
}

/// Session state backed by a `KeyValueStore`.
pub struct SessionStore {
    store: Arc<dyn KeyValueStore>,
    cache: RwLock<Cached>,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let cache = self.cache.read();
        f.debug_struct("SessionStore")
            .field("authenticated", &cache.session.is_authenticated())
            .field("has_refresh_token", &cache.session.refresh_token.is_some())
            .finish_non_exhaustive()
    }
}

impl SessionStore {
    /// Loads the persisted session.
    ///
    /// A user profile that is not valid JSON is ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub async fn load(store: Arc<dyn KeyValueStore>) -> Result<Self, StoreError> {
        let access_token = store.get(ACCESS_TOKEN_KEY).await?;
        let refresh_token = store.get(REFRESH_TOKEN_KEY).await?;
        let user = match store.get(USER_KEY).await? {
            Some(raw) => serde_json::from_str(&raw)
                .inspect_err(|e| warn!(error = %e, "ignoring unreadable stored user profile"))
                .ok(),
            None => None,
        };

        Ok(Self {
            store,
            cache: RwLock::new(Cached {
                session: Session {
                    access_token,
                    refresh_token,
                },
                user,
            }),
        })
    }

    /// Returns a snapshot of the session.
    #[must_use]
    pub fn session(&self) -> Session {
        self.cache.read().session.clone()
    }

    /// Returns the access token, if any.
    #[must_use]
    pub fn access_token(&self) -> Option<String> {
        self.cache.read().session.access_token.clone()
    }

    /// Returns the refresh token, if any.
    #[must_use]
    pub fn refresh_token(&self) -> Option<String> {
        self.cache.read().session.refresh_token.clone()
    }

    /// Returns the last-known user profile.
    #[must_use]
    pub fn user(&self) -> Option<Value> {
        self.cache.read().user.clone()
    }

    /// Persists both tokens of a fresh login.
    ///
    /// If the refresh token cannot be written, the stored access token is
    /// put back so the two persisted tokens always belong together.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    pub async fn save_tokens(&self, tokens: &TokenPair) -> Result<(), StoreError> {
        let previous = self.access_token();
        self.store.set(ACCESS_TOKEN_KEY, &tokens.access).await?;

        if let Err(e) = self.store.set(REFRESH_TOKEN_KEY, &tokens.refresh).await {
            let restored = match &previous {
                Some(token) => self.store.set(ACCESS_TOKEN_KEY, token).await,
                None => self.store.remove(ACCESS_TOKEN_KEY).await.map(|_| ()),
            };
            if let Err(rollback) = restored {
                warn!(error = %rollback, "could not restore the previous access token");
            }
            return Err(e);
        }

        self.cache.write().session = Session::from(tokens.clone());
        Ok(())
    }

    /// Persists a new access token.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    pub async fn set_access_token(&self, token: &str) -> Result<(), StoreError> {
        self.store.set(ACCESS_TOKEN_KEY, token).await?;
        self.cache.write().session.access_token = Some(token.to_string());
        Ok(())
    }

    /// Persists a new refresh token.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    pub async fn set_refresh_token(&self, token: &str) -> Result<(), StoreError> {
        self.store.set(REFRESH_TOKEN_KEY, token).await?;
        self.cache.write().session.refresh_token = Some(token.to_string());
        Ok(())
    }

    /// Persists the user profile.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    pub async fn set_user(&self, user: &Value) -> Result<(), StoreError> {
        self.store.set(USER_KEY, &user.to_string()).await?;
        self.cache.write().user = Some(user.clone());
        Ok(())
    }

    /// Removes both tokens and the user profile.
    ///
    /// The cache is emptied before storage is touched, so no request picks up
    /// a token after this starts. Returns whether anything was present.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    pub async fn clear(&self) -> Result<bool, StoreError> {
        let had_state = {
            let mut cache = self.cache.write();
            let had_state = !cache.session.is_empty() || cache.user.is_some();
            *cache = Cached::default();
            had_state
        };

        let mut removed = false;
        for key in [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_KEY] {
            removed |= self.store.remove(key).await?;
        }
        Ok(had_state || removed)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::mocks::MemoryStore;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn pair() -> TokenPair {
        TokenPair {
            access: "A".to_string(),
            refresh: "R".to_string(),
        }
    }

    #[tokio::test]
    async fn test_load_reads_persisted_entries() {
        let store = MemoryStore::with_entries(&[
            (ACCESS_TOKEN_KEY, "A"),
            (REFRESH_TOKEN_KEY, "R"),
            (USER_KEY, r#"{"username":"alice"}"#),
        ]);
        let session = SessionStore::load(store).await.unwrap();

        assert_eq!(session.access_token().as_deref(), Some("A"));
        assert_eq!(session.refresh_token().as_deref(), Some("R"));
        assert_eq!(session.user(), Some(json!({"username": "alice"})));
    }

    #[tokio::test]
    async fn test_load_ignores_corrupt_user_profile() {
        let store = MemoryStore::with_entries(&[(USER_KEY, "{not json")]);
        let session = SessionStore::load(store).await.unwrap();
        assert_eq!(session.user(), None);
    }

    #[tokio::test]
    async fn test_save_tokens_writes_through() {
        let store = MemoryStore::new();
        let session = SessionStore::load(store.clone()).await.unwrap();

        session.save_tokens(&pair()).await.unwrap();

        assert_eq!(store.value(ACCESS_TOKEN_KEY).as_deref(), Some("A"));
        assert_eq!(store.value(REFRESH_TOKEN_KEY).as_deref(), Some("R"));
        assert!(session.session().is_authenticated());
    }

    #[tokio::test]
    async fn test_clear_is_idempotent() {
        let store = MemoryStore::new();
        let session = SessionStore::load(store.clone()).await.unwrap();
        session.save_tokens(&pair()).await.unwrap();
        session.set_user(&json!({"id": 1})).await.unwrap();

        assert!(session.clear().await.unwrap());
        let after_first = session.session();
        assert!(!session.clear().await.unwrap());

        assert_eq!(session.session(), after_first);
        assert_eq!(after_first, Session::empty());
        assert_eq!(session.user(), None);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_partial_login_write_restores_previous_tokens() {
        let store =
            MemoryStore::with_entries(&[(ACCESS_TOKEN_KEY, "old"), (REFRESH_TOKEN_KEY, "R0")]);
        let session = SessionStore::load(store.clone()).await.unwrap();
        store.fail_writes_to(REFRESH_TOKEN_KEY);

        assert!(session.save_tokens(&pair()).await.is_err());

        assert_eq!(store.value(ACCESS_TOKEN_KEY).as_deref(), Some("old"));
        assert_eq!(store.value(REFRESH_TOKEN_KEY).as_deref(), Some("R0"));
        assert_eq!(session.access_token().as_deref(), Some("old"));
    }

    #[tokio::test]
    async fn test_partial_first_login_leaves_no_access_token() {
        let store = MemoryStore::new();
        let session = SessionStore::load(store.clone()).await.unwrap();
        store.fail_writes_to(REFRESH_TOKEN_KEY);

        assert!(session.save_tokens(&pair()).await.is_err());

        assert!(store.is_empty());
        assert!(!session.session().is_authenticated());
    }

    #[tokio::test]
    async fn test_failed_write_keeps_previous_token() {
        let store = MemoryStore::new();
        let session = SessionStore::load(store.clone()).await.unwrap();
        session.save_tokens(&pair()).await.unwrap();

        store.fail_writes(true);
        assert!(session.set_access_token("B").await.is_err());
        assert_eq!(session.access_token().as_deref(), Some("A"));
    }
}
