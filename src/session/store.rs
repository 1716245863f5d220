//! Authoritative in-memory session state.
//!
//! Every mutation goes through one of the named transitions below, which
//! publish the new [`SessionState`] on a `tokio::sync::watch` channel. Readers
//! take snapshots or subscribe; nobody outside this module writes.

use std::sync::Arc;
use tokio::sync::watch;

use super::identity::Identity;

#[derive(Debug, Clone, PartialEq, Default)]
pub enum SessionState {
    #[default]
    Unauthenticated,
    Authenticated {
        /// `None` between a restart and the first profile fetch.
        identity: Option<Identity>,
        auth_token: String,
    },
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated { .. })
    }

    pub fn identity(&self) -> Option<&Identity> {
        match self {
            SessionState::Authenticated { identity, .. } => identity.as_ref(),
            SessionState::Unauthenticated => None,
        }
    }

    pub fn auth_token(&self) -> Option<&str> {
        match self {
            SessionState::Authenticated { auth_token, .. } => Some(auth_token),
            SessionState::Unauthenticated => None,
        }
    }
}

/// Cloneable handle to the single session state of the process.
#[derive(Debug, Clone)]
pub struct SessionStore {
    state: Arc<watch::Sender<SessionState>>,
}

impl SessionStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(SessionState::Unauthenticated);
        Self {
            state: Arc::new(tx),
        }
    }

    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    pub fn identity(&self) -> Option<Identity> {
        self.state.borrow().identity().cloned()
    }

    pub fn auth_token(&self) -> Option<String> {
        self.state.borrow().auth_token().map(str::to_string)
    }

    /// Successful login: identity and token replace whatever was there.
    pub fn login_success(&self, identity: Identity, auth_token: impl Into<String>) {
        let auth_token = auth_token.into();
        tracing::info!(member_id = %identity.member_id, "Session authenticated");
        self.state.send_replace(SessionState::Authenticated {
            identity: Some(identity),
            auth_token,
        });
    }

    /// Clear identity and token. Returns `false` if already logged out.
    pub fn logout(&self) -> bool {
        self.state.send_if_modified(|state| {
            if state.is_authenticated() {
                *state = SessionState::Unauthenticated;
                true
            } else {
                false
            }
        })
    }

    /// Replace the identity after a profile fetch. Ignored while logged out,
    /// so a late profile response cannot resurrect a dead session.
    pub fn update_identity(&self, new_identity: Identity) -> bool {
        self.state.send_if_modified(|state| match state {
            SessionState::Authenticated { identity, .. } => {
                if identity.as_ref() == Some(&new_identity) {
                    return false;
                }
                *identity = Some(new_identity);
                true
            }
            SessionState::Unauthenticated => {
                tracing::debug!("Dropping profile update for a logged-out session");
                false
            }
        })
    }

    /// Startup bootstrap from the persisted token.
    ///
    /// A token means "logged in, profile unknown"; no token means logged out.
    pub fn initialize(&self, persisted_token: Option<String>) {
        match persisted_token {
            Some(token) if !token.is_empty() => {
                self.state.send_replace(SessionState::Authenticated {
                    identity: None,
                    auth_token: token,
                });
            }
            _ => {
                self.state.send_replace(SessionState::Unauthenticated);
            }
        }
    }

    /// Fail-closed agreement check against the persisted slot.
    ///
    /// Authenticated with no persisted token, or with a different one, drops
    /// to Unauthenticated. Never upgrades to Authenticated. Returns `true`
    /// when the state was corrected.
    pub fn reconcile(&self, persisted_token: Option<&str>) -> bool {
        let corrected = self.state.send_if_modified(|state| match state {
            SessionState::Authenticated { auth_token, .. } => {
                if persisted_token == Some(auth_token.as_str()) {
                    false
                } else {
                    *state = SessionState::Unauthenticated;
                    true
                }
            }
            SessionState::Unauthenticated => false,
        });
        if corrected {
            tracing::warn!("Session disagreed with persisted token; logged out");
        }
        corrected
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}
