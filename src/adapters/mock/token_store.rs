//! In-memory [`TokenStore`] for tests.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::traits::{TokenStore, TokenStoreError};

/// Token slot held in memory, with failure toggles and a clear counter.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTokenStore {
    token: Arc<Mutex<Option<String>>>,
    load_should_fail: Arc<Mutex<bool>>,
    clear_should_fail: Arc<Mutex<bool>>,
    clears: Arc<AtomicUsize>,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        let store = Self::default();
        *store.token.lock().unwrap() = Some(token.into());
        store
    }

    /// Current value without going through the async trait.
    pub fn peek(&self) -> Option<String> {
        self.token.lock().unwrap().clone()
    }

    /// Overwrite the slot directly, as another process would.
    pub fn set_raw(&self, token: Option<&str>) {
        *self.token.lock().unwrap() = token.map(str::to_string);
    }

    /// Number of `clear` calls so far, including no-op ones.
    pub fn clear_calls(&self) -> usize {
        self.clears.load(Ordering::SeqCst)
    }

    pub fn set_load_should_fail(&self, should_fail: bool) {
        *self.load_should_fail.lock().unwrap() = should_fail;
    }

    pub fn set_clear_should_fail(&self, should_fail: bool) {
        *self.clear_should_fail.lock().unwrap() = should_fail;
    }
}

#[async_trait]
impl TokenStore for InMemoryTokenStore {
    async fn load(&self) -> Result<Option<String>, TokenStoreError> {
        if *self.load_should_fail.lock().unwrap() {
            return Err(TokenStoreError::LoadFailed("simulated".to_string()));
        }
        Ok(self.peek())
    }

    async fn save(&self, token: &str) -> Result<(), TokenStoreError> {
        *self.token.lock().unwrap() = Some(token.to_string());
        Ok(())
    }

    async fn clear(&self) -> Result<(), TokenStoreError> {
        self.clears.fetch_add(1, Ordering::SeqCst);
        if *self.clear_should_fail.lock().unwrap() {
            return Err(TokenStoreError::ClearFailed("simulated".to_string()));
        }
        *self.token.lock().unwrap() = None;
        Ok(())
    }
}
