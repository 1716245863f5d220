//! Single-slot registry for the session failure handler.
//!
//! The network layer is built before anything that owns session or notice
//! state, so it cannot hold a reference to them. Instead it asks the
//! broadcaster for whoever currently handles failures. At most one handler
//! is bound; a new registration replaces the old one, and a registration only
//! ever removes itself.
//!
//! ```rust,ignore
//! let broadcaster = FailureBroadcaster::global();
//! let registration = broadcaster.register(Arc::new(|message: Option<&str>| show_notice(message)));
//! // ... later, on teardown
//! registration.release();
//! ```

use once_cell::sync::Lazy;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Callback invoked with an optional human-readable message.
pub type FailureHandler = Arc<dyn Fn(Option<&str>) + Send + Sync>;

struct Slot {
    id: u64,
    handler: FailureHandler,
}

#[derive(Default)]
struct Registry {
    slot: Mutex<Option<Slot>>,
    next_id: AtomicU64,
}

static GLOBAL: Lazy<FailureBroadcaster> = Lazy::new(FailureBroadcaster::new);

/// Cloneable handle; clones share the same slot.
#[derive(Clone, Default)]
pub struct FailureBroadcaster {
    registry: Arc<Registry>,
}

impl FailureBroadcaster {
    /// A private broadcaster, independent of [`global`](Self::global).
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide broadcaster.
    pub fn global() -> Self {
        GLOBAL.clone()
    }

    fn slot(&self) -> MutexGuard<'_, Option<Slot>> {
        self.registry
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Bind `handler`, replacing any current registrant.
    pub fn register(&self, handler: FailureHandler) -> HandlerRegistration {
        let id = self.registry.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let replaced = self.slot().replace(Slot { id, handler }).is_some();
        if replaced {
            tracing::debug!(registration = id, "Failure handler replaced");
        } else {
            tracing::debug!(registration = id, "Failure handler bound");
        }
        HandlerRegistration {
            broadcaster: self.clone(),
            id,
            released: false,
        }
    }

    /// Clear the slot only if `registration` still owns it.
    pub fn unregister(&self, registration: &HandlerRegistration) -> bool {
        self.release_id(registration.id)
    }

    fn release_id(&self, id: u64) -> bool {
        let mut slot = self.slot();
        match slot.as_ref() {
            Some(current) if current.id == id => {
                *slot = None;
                tracing::debug!(registration = id, "Failure handler unbound");
                true
            }
            _ => false,
        }
    }

    pub fn current(&self) -> Option<FailureHandler> {
        self.slot().as_ref().map(|s| s.handler.clone())
    }

    pub fn is_bound(&self) -> bool {
        self.slot().is_some()
    }

    /// Invoke the current handler, if any. The handler runs outside the slot
    /// lock so it may itself register or unregister.
    pub fn notify(&self, message: Option<&str>) -> bool {
        match self.current() {
            Some(handler) => {
                handler(message);
                true
            }
            None => false,
        }
    }
}

impl std::fmt::Debug for FailureBroadcaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FailureBroadcaster")
            .field("bound", &self.is_bound())
            .finish()
    }
}

/// Proof of a registration. Releasing it (explicitly or on drop) clears the
/// slot if, and only if, this registration is still the occupant.
#[must_use = "dropping the registration unbinds the handler immediately"]
pub struct HandlerRegistration {
    broadcaster: FailureBroadcaster,
    id: u64,
    released: bool,
}

impl HandlerRegistration {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Whether this registration is the one currently bound.
    pub fn is_current(&self) -> bool {
        self.broadcaster
            .slot()
            .as_ref()
            .is_some_and(|s| s.id == self.id)
    }

    pub fn release(mut self) -> bool {
        self.released = true;
        self.broadcaster.release_id(self.id)
    }
}

impl Drop for HandlerRegistration {
    fn drop(&mut self) {
        if !self.released {
            self.broadcaster.release_id(self.id);
        }
    }
}

impl std::fmt::Debug for HandlerRegistration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistration")
            .field("id", &self.id)
            .field("released", &self.released)
            .finish()
    }
}
