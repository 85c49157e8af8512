//! In-memory port doubles shared by the unit tests.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use photox_domain::{ApiRequest, ApiResponse};
use serde_json::Value;

use crate::ports::{HttpTransport, KeyValueStore, StoreError, TransportError};

/// Key-value store held in a `HashMap`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
    fail_writes: AtomicBool,
    fail_key: Mutex<Option<String>>,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_entries(entries: &[(&str, &str)]) -> Arc<Self> {
        let store = Self::default();
        {
            let mut map = store.entries.lock();
            for (key, value) in entries {
                map.insert((*key).to_string(), (*value).to_string());
            }
        }
        Arc::new(store)
    }

    pub fn value(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Fails every write to `key` only.
    pub fn fail_writes_to(&self, key: &str) {
        *self.fail_key.lock() = Some(key.to_string());
    }

    fn check_writable(&self, key: &str) -> Result<(), StoreError> {
        let key_blocked = self.fail_key.lock().as_deref() == Some(key);
        if key_blocked || self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Io(std::io::Error::other("disk full")));
        }
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.value(key))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.check_writable(key)?;
        self.entries
            .lock()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<bool, StoreError> {
        self.check_writable(key)?;
        Ok(self.entries.lock().remove(key).is_some())
    }
}

type Handler = dyn Fn(&ApiRequest) -> Result<ApiResponse, TransportError> + Send + Sync;

/// Scripted transport that records every request it receives.
pub struct MockTransport {
    handler: Box<Handler>,
    sent: Mutex<Vec<ApiRequest>>,
    unauthorized: AtomicUsize,
    hold: Option<(String, usize)>,
}

impl MockTransport {
    pub fn new(
        handler: impl Fn(&ApiRequest) -> Result<ApiResponse, TransportError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            handler: Box::new(handler),
            sent: Mutex::new(Vec::new()),
            unauthorized: AtomicUsize::new(0),
            hold: None,
        }
    }

    /// Keeps requests to `path` pending until `count` 401 responses have
    /// been handed out, so that concurrent callers pile up behind it.
    pub fn hold_until_unauthorized(mut self, path: &str, count: usize) -> Self {
        self.hold = Some((path.to_string(), count));
        self
    }

    pub fn sent(&self) -> Vec<ApiRequest> {
        self.sent.lock().clone()
    }

    pub fn calls_to(&self, path: &str) -> usize {
        self.sent.lock().iter().filter(|r| r.path == path).count()
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        self.sent.lock().push(request.clone());

        if let Some((path, count)) = &self.hold {
            if &request.path == path {
                while self.unauthorized.load(Ordering::SeqCst) < *count {
                    tokio::task::yield_now().await;
                }
            }
        }

        let response = (self.handler)(request)?;
        if response.is_unauthorized() {
            self.unauthorized.fetch_add(1, Ordering::SeqCst);
        }
        Ok(response)
    }
}

pub fn json(status: u16, value: &Value) -> Result<ApiResponse, TransportError> {
    Ok(ApiResponse::json_body(status, value))
}
