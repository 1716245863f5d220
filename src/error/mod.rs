//! Error handling for the portal client.
//!
//! Domain errors (`NetworkError`, `AuthError`, `CryptoError`, `SystemError`)
//! convert into the unified [`PortalError`], which carries a category, a
//! user-facing message, and an error code for logs.
//!
//! | Category | Typical source | Retryable |
//! |----------|----------------|-----------|
//! | Network | connection refused, timeout | Yes |
//! | Server | HTTP 5xx | Yes |
//! | Auth | session expired, not logged in | No |
//! | Crypto | pass payload encryption | No |
//! | System | storage directory | No |
//! | Configuration | bad `MEMBERPASS_*` value | No |
//!
//! Boundary errors stay local to their layer: `api::ApiError` and
//! `api::QueryError` keep the raw failure shape the interceptor inspects.

mod auth;
mod category;
mod context;
mod crypto;
mod network;
mod portal_error;
mod result;
mod system;

pub use auth::AuthError;
pub use category::ErrorCategory;
pub use context::ErrorContext;
pub use crypto::CryptoError;
pub use network::NetworkError;
pub use portal_error::PortalError;
pub use result::{PortalResult, ResultExt};
pub use system::SystemError;
