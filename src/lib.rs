//! memberpass - member portal client core
//!
//! A rotating encrypted member pass, plus application-wide session
//! invalidation when the portal rejects a request.
//!
//! This library exposes modules for use in integration tests.

pub mod adapters;
pub mod api;
pub mod cli;
pub mod credential;
pub mod crypto;
pub mod error;
pub mod invalidation;
pub mod session;
pub mod startup;
pub mod traits;
