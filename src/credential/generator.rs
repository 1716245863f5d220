//! Rotating member pass.
//!
//! A background task recomputes the pass ciphertext every rotation interval
//! and immediately whenever the worship id changes or a manual refresh is
//! requested. The latest value sits in a `watch` channel: readers get the
//! freshest ciphertext, and concurrent writers resolve as last-write-wins.
//!
//! # Lifecycle
//!
//! - `start()` computes one pass synchronously, then spawns the task
//! - `stop()` (or dropping the generator) ends the task exactly once

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{oneshot, watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

use super::clock::Clock;
use crate::crypto::{CredentialCodec, PassPlaintext};
use crate::session::{SessionState, SessionStore};

/// Default rotation interval (5 minutes).
pub const DEFAULT_ROTATION_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Longest accepted rotation interval (one day).
pub const MAX_ROTATION_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// What a renderer should draw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassDisplay {
    /// No worship id yet, or the codec failed.
    Loading,
    Ready(String),
}

impl PassDisplay {
    fn from_ciphertext(ciphertext: &str) -> Self {
        if ciphertext.is_empty() {
            PassDisplay::Loading
        } else {
            PassDisplay::Ready(ciphertext.to_string())
        }
    }
}

/// Write side of the generator's worship id, handed to session followers.
#[derive(Debug, Clone)]
pub struct IdentityFeed {
    reference: Arc<watch::Sender<Option<String>>>,
}

impl IdentityFeed {
    /// Returns `true` if the reference actually changed.
    pub fn set(&self, reference: Option<String>) -> bool {
        self.reference.send_if_modified(|current| {
            if *current == reference {
                false
            } else {
                *current = reference;
                true
            }
        })
    }

    pub fn get(&self) -> Option<String> {
        self.reference.borrow().clone()
    }
}

/// Everything the rotation task needs, cheap to clone into it.
#[derive(Clone)]
struct Rotation {
    codec: CredentialCodec,
    clock: Arc<dyn Clock>,
    current: Arc<watch::Sender<String>>,
}

impl Rotation {
    fn ciphertext_for(&self, reference: Option<&str>) -> String {
        match reference {
            Some(worship_id) => {
                let plaintext = PassPlaintext::at_minute(worship_id, self.clock.now());
                self.codec.encrypt_or_empty(&plaintext)
            }
            None => String::new(),
        }
    }

    fn recompute(&self, reference: Option<&str>) {
        let ciphertext = self.ciphertext_for(reference);
        tracing::trace!(ready = !ciphertext.is_empty(), "Member pass recomputed");
        self.current.send_replace(ciphertext);
    }

    /// Publish a fresh pass unless `halted` is set. The flag is read under
    /// the channel's write lock, so once `stop` has set it and cleared the
    /// pass, nothing from the old task lands after the clear.
    fn recompute_unless_halted(&self, reference: Option<&str>, halted: &AtomicBool) {
        let ciphertext = self.ciphertext_for(reference);
        let published = self.current.send_if_modified(|current| {
            if halted.load(Ordering::SeqCst) {
                return false;
            }
            *current = ciphertext;
            true
        });
        if published {
            tracing::trace!("Member pass recomputed");
        } else {
            tracing::trace!("Rotation halted, recomputed pass dropped");
        }
    }
}

struct RunningTask {
    stop_tx: oneshot::Sender<()>,
    halted: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

pub struct RotatingCredential {
    rotation: Rotation,
    period: Duration,
    feed: IdentityFeed,
    refresh: Arc<Notify>,
    task: Mutex<Option<RunningTask>>,
}

impl RotatingCredential {
    /// A zero `period` falls back to [`DEFAULT_ROTATION_INTERVAL`]; longer
    /// than [`MAX_ROTATION_INTERVAL`] is clamped to it.
    pub fn new(codec: CredentialCodec, clock: Arc<dyn Clock>, period: Duration) -> Self {
        let (current, _) = watch::channel(String::new());
        let (reference, _) = watch::channel(None);
        Self {
            rotation: Rotation {
                codec,
                clock,
                current: Arc::new(current),
            },
            period: if period.is_zero() {
                DEFAULT_ROTATION_INTERVAL
            } else {
                period.min(MAX_ROTATION_INTERVAL)
            },
            feed: IdentityFeed {
                reference: Arc::new(reference),
            },
            refresh: Arc::new(Notify::new()),
            task: Mutex::new(None),
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Begin rotating for `identity_reference`. Must run inside a tokio
    /// runtime. Starting an already running generator only swaps the
    /// reference.
    pub fn start(&self, identity_reference: Option<String>) {
        let mut slot = self.task.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() {
            drop(slot);
            self.set_identity(identity_reference);
            return;
        }

        self.feed.set(identity_reference.clone());
        self.rotation.recompute(identity_reference.as_deref());

        let (stop_tx, stop_rx) = oneshot::channel();
        let halted = Arc::new(AtomicBool::new(false));
        let handle = tokio::spawn(run_rotation(
            self.rotation.clone(),
            self.period,
            new_ticker(self.period),
            self.feed.reference.subscribe(),
            self.refresh.clone(),
            halted.clone(),
            stop_rx,
        ));
        *slot = Some(RunningTask {
            stop_tx,
            halted,
            handle,
        });
        tracing::info!(interval_secs = self.period.as_secs(), "Member pass rotation started");
    }

    /// Switch to a different worship id. A running generator recomputes
    /// immediately and restarts its interval.
    pub fn set_identity(&self, identity_reference: Option<String>) -> bool {
        self.feed.set(identity_reference)
    }

    pub fn identity_feed(&self) -> IdentityFeed {
        self.feed.clone()
    }

    /// Recompute now and restart the interval, like the page's refresh button.
    pub fn refresh_now(&self) {
        if self.is_running() {
            self.refresh.notify_one();
        }
    }

    /// Stop rotating and clear the pass. Returns `false` if not running.
    pub fn stop(&self) -> bool {
        let running = self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(RunningTask {
            stop_tx,
            halted,
            handle,
        }) = running
        else {
            return false;
        };
        halted.store(true, Ordering::SeqCst);
        if stop_tx.send(()).is_err() {
            handle.abort();
        }
        self.rotation.current.send_replace(String::new());
        tracing::info!("Member pass rotation stopped");
        true
    }

    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|t| !t.handle.is_finished())
    }

    /// Latest ciphertext, empty while loading.
    pub fn current(&self) -> String {
        self.rotation.current.borrow().clone()
    }

    pub fn display(&self) -> PassDisplay {
        PassDisplay::from_ciphertext(&self.rotation.current.borrow())
    }

    /// Receiver woken on every replacement of the ciphertext.
    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.rotation.current.subscribe()
    }
}

impl Drop for RotatingCredential {
    fn drop(&mut self) {
        self.stop();
    }
}

fn new_ticker(period: Duration) -> Interval {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

async fn run_rotation(
    rotation: Rotation,
    period: Duration,
    mut ticker: Interval,
    mut reference_rx: watch::Receiver<Option<String>>,
    refresh: Arc<Notify>,
    halted: Arc<AtomicBool>,
    mut stop_rx: oneshot::Receiver<()>,
) {
    loop {
        tokio::select! {
            biased;

            _ = &mut stop_rx => break,
            changed = reference_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let reference = reference_rx.borrow_and_update().clone();
                tracing::debug!(has_reference = reference.is_some(), "Worship id changed");
                ticker = new_ticker(period);
                rotation.recompute_unless_halted(reference.as_deref(), &halted);
            }
            _ = refresh.notified() => {
                ticker = new_ticker(period);
                rotation.recompute_unless_halted(reference_rx.borrow().as_deref(), &halted);
            }
            _ = ticker.tick() => {
                rotation.recompute_unless_halted(reference_rx.borrow().as_deref(), &halted);
            }
        }
    }

    tracing::debug!("Member pass rotation task exited");
}

/// Worship id to encode for a session state. Authenticated members without
/// a worship id get the placeholder; unknown identity means still loading.
pub fn reference_for(state: &SessionState) -> Option<String> {
    state.identity().map(|identity| identity.worship_id_label())
}

/// Keep a generator's worship id in step with the session.
///
/// Returns the task handle; abort it on shutdown.
pub fn spawn_session_follower(session: &SessionStore, feed: IdentityFeed) -> JoinHandle<()> {
    let mut rx = session.subscribe();
    tokio::spawn(async move {
        loop {
            let reference = reference_for(&rx.borrow_and_update());
            feed.set(reference);
            if rx.changed().await.is_err() {
                break;
            }
        }
        tracing::debug!("Session follower stopped");
    })
}
