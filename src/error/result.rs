//! Result alias and context extension.

use super::context::ErrorContext;
use super::portal_error::PortalError;

pub type PortalResult<T> = Result<T, PortalError>;

/// Attach an [`ErrorContext`] to any error convertible into [`PortalError`].
pub trait ResultExt<T> {
    fn context(self, ctx: ErrorContext) -> PortalResult<T>;

    /// Lazy variant; the closure only runs on `Err`.
    fn with_context<F>(self, f: F) -> PortalResult<T>
    where
        F: FnOnce() -> ErrorContext;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
    E: Into<PortalError>,
{
    fn context(self, ctx: ErrorContext) -> PortalResult<T> {
        self.map_err(|e| e.into().with_context(ctx))
    }

    fn with_context<F>(self, f: F) -> PortalResult<T>
    where
        F: FnOnce() -> ErrorContext,
    {
        self.map_err(|e| e.into().with_context(f()))
    }
}
