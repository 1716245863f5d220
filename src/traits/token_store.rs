//! Persisted bearer token slot.
//!
//! The slot survives process restarts so a member stays logged in. It is
//! read on every outgoing request, written on login, and cleared on logout
//! or forced invalidation.

use async_trait::async_trait;

/// Storage key of the bearer token.
pub const TOKEN_KEY: &str = "jwt";

#[derive(Debug, Clone)]
pub enum TokenStoreError {
    LoadFailed(String),
    SaveFailed(String),
    ClearFailed(String),
    Serialization(String),
}

impl std::fmt::Display for TokenStoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenStoreError::LoadFailed(msg) => write!(f, "Failed to load token: {}", msg),
            TokenStoreError::SaveFailed(msg) => write!(f, "Failed to save token: {}", msg),
            TokenStoreError::ClearFailed(msg) => write!(f, "Failed to clear token: {}", msg),
            TokenStoreError::Serialization(msg) => write!(f, "Token file is corrupt: {}", msg),
        }
    }
}

impl std::error::Error for TokenStoreError {}

impl From<TokenStoreError> for crate::error::PortalError {
    fn from(err: TokenStoreError) -> Self {
        crate::error::AuthError::TokenStore {
            message: err.to_string(),
        }
        .into()
    }
}

#[async_trait]
pub trait TokenStore: Send + Sync {
    /// `Ok(None)` when no token is persisted.
    async fn load(&self) -> Result<Option<String>, TokenStoreError>;

    async fn save(&self, token: &str) -> Result<(), TokenStoreError>;

    /// Removing an absent token succeeds.
    async fn clear(&self) -> Result<(), TokenStoreError>;
}
