//! Member session: who is logged in and with which token.

pub mod identity;
pub mod store;

pub use identity::{Identity, UNSET_WORSHIP_ID, WORSHIP_ID_FIELD};
pub use store::{SessionState, SessionStore};
