//! Session invalidation coordinator.
//!
//! Owns the notice state machine:
//!
//! ```text
//! Hidden --failure--> Visible(message) --acknowledge--> Hidden + reset to entry
//! ```
//!
//! On mount it binds its handler into the [`FailureBroadcaster`] and
//! bootstraps the session from the persisted token; on unmount (or drop) it
//! unbinds. Any number of concurrent failures collapse into one visible
//! notice per episode.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;

use super::broadcaster::{FailureBroadcaster, FailureHandler, HandlerRegistration};
use super::navigator::Navigator;
use super::notice::{NoticeState, SESSION_EXPIRED_MESSAGE};
use crate::session::SessionStore;
use crate::traits::TokenStore;

struct Shared {
    session: SessionStore,
    notice: watch::Sender<NoticeState>,
    navigator: Arc<dyn Navigator>,
    episodes: AtomicU64,
}

impl Shared {
    fn handle_failure(&self, message: Option<&str>) -> bool {
        let message = message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(SESSION_EXPIRED_MESSAGE)
            .to_string();

        self.session.logout();

        let shown = self.notice.send_if_modified(|notice| match notice {
            NoticeState::Hidden => {
                *notice = NoticeState::Visible { message };
                true
            }
            NoticeState::Visible { .. } => false,
        });

        if shown {
            let episode = self.episodes.fetch_add(1, Ordering::SeqCst) + 1;
            tracing::warn!(
                episode,
                correlation_id = %uuid::Uuid::new_v4(),
                "Session invalidated, notice shown"
            );
        } else {
            tracing::debug!("Session failure while notice already visible; ignored");
        }
        shown
    }
}

pub struct InvalidationCoordinator {
    shared: Arc<Shared>,
    token_store: Arc<dyn TokenStore>,
    broadcaster: FailureBroadcaster,
    registration: Mutex<Option<HandlerRegistration>>,
}

impl InvalidationCoordinator {
    pub fn new(
        session: SessionStore,
        token_store: Arc<dyn TokenStore>,
        broadcaster: FailureBroadcaster,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        let (notice, _) = watch::channel(NoticeState::Hidden);
        Self {
            shared: Arc::new(Shared {
                session,
                notice,
                navigator,
                episodes: AtomicU64::new(0),
            }),
            token_store,
            broadcaster,
            registration: Mutex::new(None),
        }
    }

    /// Bind the failure handler and bootstrap the session from the token
    /// slot. An unreadable slot counts as no token. Mounting twice only
    /// re-runs the bootstrap.
    pub async fn mount(&self) {
        {
            let mut registration = self
                .registration
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if registration.is_none() {
                let shared = self.shared.clone();
                let handler: FailureHandler = Arc::new(move |message: Option<&str>| {
                    shared.handle_failure(message);
                });
                *registration = Some(self.broadcaster.register(handler));
                tracing::info!("Invalidation coordinator mounted");
            }
        }

        let token = match self.token_store.load().await {
            Ok(token) => token,
            Err(e) => {
                tracing::warn!(error = %e, "Could not read persisted token; starting logged out");
                None
            }
        };
        self.shared.session.initialize(token);
    }

    /// Unbind. Only clears the broadcaster slot if this coordinator still
    /// owns it. Returns `false` if it was not mounted.
    pub fn unmount(&self) -> bool {
        let registration = self
            .registration
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match registration {
            Some(registration) => {
                registration.release();
                tracing::info!("Invalidation coordinator unmounted");
                true
            }
            None => false,
        }
    }

    pub fn is_mounted(&self) -> bool {
        self.registration
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(HandlerRegistration::is_current)
    }

    /// Log the member out and show the notice. Returns `true` if this call
    /// made the notice visible, `false` if one was already showing.
    pub fn handle_failure(&self, message: Option<&str>) -> bool {
        self.shared.handle_failure(message)
    }

    /// Dismiss the notice and reset to the logged-out entry point.
    /// No-op when nothing is showing.
    pub fn acknowledge(&self) -> bool {
        let dismissed = self.shared.notice.send_if_modified(|notice| {
            if notice.is_visible() {
                *notice = NoticeState::Hidden;
                true
            } else {
                false
            }
        });
        if dismissed {
            tracing::info!("Session notice acknowledged, resetting to entry");
            self.shared.navigator.reset_to_entry();
        }
        dismissed
    }

    /// Re-check the session against the persisted slot (fail-closed).
    pub async fn resync(&self) -> bool {
        let persisted = self.token_store.load().await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Could not read persisted token during resync");
            None
        });
        self.shared.session.reconcile(persisted.as_deref())
    }

    pub fn notice(&self) -> NoticeState {
        self.shared.notice.borrow().clone()
    }

    pub fn subscribe_notice(&self) -> watch::Receiver<NoticeState> {
        self.shared.notice.subscribe()
    }

    /// Number of invalidation episodes that showed a notice.
    pub fn notices_shown(&self) -> u64 {
        self.shared.episodes.load(Ordering::SeqCst)
    }

    pub fn session(&self) -> &SessionStore {
        &self.shared.session
    }
}

impl Drop for InvalidationCoordinator {
    fn drop(&mut self) {
        self.unmount();
    }
}
