//! Hard navigation reset back to the logged-out entry point.

use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationEvent {
    /// Drop every screen and in-memory cache, show the entry point.
    ResetToEntry,
}

pub trait Navigator: Send + Sync {
    fn reset_to_entry(&self);
}

/// Forwards resets to the application loop over a channel.
#[derive(Debug, Clone)]
pub struct ChannelNavigator {
    tx: mpsc::UnboundedSender<NavigationEvent>,
}

impl ChannelNavigator {
    pub fn new(tx: mpsc::UnboundedSender<NavigationEvent>) -> Self {
        Self { tx }
    }

    /// Navigator plus the receiving end for the application loop.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<NavigationEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }
}

impl Navigator for ChannelNavigator {
    fn reset_to_entry(&self) {
        if self.tx.send(NavigationEvent::ResetToEntry).is_err() {
            tracing::debug!("Navigation channel closed, reset dropped");
        }
    }
}

/// Records resets; for tests.
#[derive(Debug, Clone, Default)]
pub struct RecordingNavigator {
    resets: Arc<Mutex<usize>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resets(&self) -> usize {
        *self.resets.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Navigator for RecordingNavigator {
    fn reset_to_entry(&self) {
        *self.resets.lock().unwrap_or_else(PoisonError::into_inner) += 1;
    }
}
