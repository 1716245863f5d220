//! Application-wide session invalidation.
//!
//! The network layer reports an expired session through the
//! [`FailureBroadcaster`]; the [`InvalidationCoordinator`] bound into it logs
//! the member out, shows one notice per episode, and resets navigation when
//! the member acknowledges.

pub mod broadcaster;
pub mod coordinator;
pub mod navigator;
pub mod notice;

pub use broadcaster::{FailureBroadcaster, FailureHandler, HandlerRegistration};
pub use coordinator::InvalidationCoordinator;
pub use navigator::{ChannelNavigator, NavigationEvent, Navigator, RecordingNavigator};
pub use notice::{NoticeState, SESSION_EXPIRED_MESSAGE};
