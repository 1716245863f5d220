//! Shared request/response handling for both call paths.
//!
//! The direct client sees a failed call as an HTTP status plus raw body; the
//! query layer sees a serialized error whose status may be missing. Both are
//! turned into a [`FailureClass`] by [`normalize`] before the interceptor
//! decides whether the session has to go.

use std::fmt;
use std::sync::Arc;

use super::endpoints::SESSION_EXPIRED_STATUS;
use crate::invalidation::{FailureBroadcaster, SESSION_EXPIRED_MESSAGE};
use crate::traits::{Headers, TokenStore};

/// A failed call as each path reports it.
#[derive(Debug, Clone, Copy)]
pub enum FailureShape<'a> {
    /// Direct client: the response status and its body.
    Transport { status: u16, body: &'a str },
    /// Query layer: status is absent when the request never got an answer.
    Serialized {
        status: Option<u16>,
        message: &'a str,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureClass {
    AuthorizationExpired,
    NetworkOrServer {
        status: Option<u16>,
        message: String,
    },
}

impl FailureClass {
    pub fn is_authorization_expired(&self) -> bool {
        matches!(self, FailureClass::AuthorizationExpired)
    }
}

pub fn normalize(shape: FailureShape<'_>) -> FailureClass {
    let (status, message) = match shape {
        FailureShape::Transport { status, body } => (Some(status), body),
        FailureShape::Serialized { status, message } => (status, message),
    };
    match status {
        Some(SESSION_EXPIRED_STATUS) => FailureClass::AuthorizationExpired,
        _ => FailureClass::NetworkOrServer {
            status,
            message: message.to_string(),
        },
    }
}

/// Which path a failure came through; only used for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallPath {
    Direct,
    Query,
}

impl fmt::Display for CallPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallPath::Direct => write!(f, "direct"),
            CallPath::Query => write!(f, "query"),
        }
    }
}

/// Attaches the bearer token and runs the forced-logout sequence on 403.
#[derive(Clone)]
pub struct AuthInterceptor {
    token_store: Arc<dyn TokenStore>,
    broadcaster: FailureBroadcaster,
    expiry_message: String,
}

impl AuthInterceptor {
    pub fn new(token_store: Arc<dyn TokenStore>, broadcaster: FailureBroadcaster) -> Self {
        Self {
            token_store,
            broadcaster,
            expiry_message: SESSION_EXPIRED_MESSAGE.to_string(),
        }
    }

    pub fn with_expiry_message(mut self, message: impl Into<String>) -> Self {
        self.expiry_message = message.into();
        self
    }

    pub fn token_store(&self) -> &Arc<dyn TokenStore> {
        &self.token_store
    }

    /// Add `Authorization: Bearer <token>` when a token is persisted. An
    /// unreadable slot sends the request without one.
    pub async fn authorize(&self, headers: &mut Headers) {
        match self.token_store.load().await {
            Ok(Some(token)) => {
                headers.insert("Authorization".to_string(), format!("Bearer {}", token));
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(error = %e, "Could not read token; sending request unauthenticated");
            }
        }
    }

    /// Classify a failed call. On an expired session the persisted token is
    /// cleared first, then the bound handler is told. The caller still gets
    /// its own error back either way.
    pub async fn inspect(
        &self,
        path: CallPath,
        endpoint: &str,
        shape: FailureShape<'_>,
    ) -> FailureClass {
        let class = normalize(shape);
        match &class {
            FailureClass::AuthorizationExpired => self.expire_session(path, endpoint).await,
            FailureClass::NetworkOrServer { status, .. } => {
                tracing::debug!(%path, endpoint, ?status, "Request failed");
            }
        }
        class
    }

    async fn expire_session(&self, path: CallPath, endpoint: &str) {
        tracing::warn!(%path, endpoint, "Request rejected with 403, clearing session");

        if let Err(e) = self.token_store.clear().await {
            tracing::warn!(error = %e, "Failed to clear persisted token");
        }

        if !self.broadcaster.notify(Some(&self.expiry_message)) {
            tracing::info!(%path, endpoint, "No session handler bound; token cleared, failure absorbed");
        }
    }
}

impl fmt::Debug for AuthInterceptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthInterceptor")
            .field("broadcaster", &self.broadcaster)
            .field("expiry_message", &self.expiry_message)
            .finish()
    }
}
