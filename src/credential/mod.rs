//! The member pass shown at the gate: a ciphertext that rotates on a timer.

pub mod clock;
pub mod generator;

pub use clock::{Clock, ManualClock, SystemClock};
pub use generator::{
    reference_for, spawn_session_follower, IdentityFeed, PassDisplay, RotatingCredential,
    DEFAULT_ROTATION_INTERVAL, MAX_ROTATION_INTERVAL,
};
