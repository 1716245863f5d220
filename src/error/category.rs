//! Coarse error classes used to pick a recovery path.

use std::fmt;

/// High-level classification of a [`PortalError`](super::PortalError).
///
/// The class decides what happens next: retry quietly, send the member back
/// to the login screen, or just report the failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Connection, DNS or timeout problems. Usually transient.
    Network,

    /// The member's session is missing or no longer accepted.
    Auth,

    /// The portal backend answered with a failure status.
    Server,

    /// The member pass payload could not be built.
    Crypto,

    /// Filesystem or environment problems on this machine.
    System,

    /// Invalid or missing settings.
    Configuration,
}

impl ErrorCategory {
    /// Whether an automatic retry is worth attempting.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorCategory::Network | ErrorCategory::Server)
    }

    /// Short label used in log fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Network => "network",
            ErrorCategory::Auth => "auth",
            ErrorCategory::Server => "server",
            ErrorCategory::Crypto => "crypto",
            ErrorCategory::System => "system",
            ErrorCategory::Configuration => "configuration",
        }
    }

    /// What the member can do about it.
    pub fn recovery_hint(&self) -> &'static str {
        match self {
            ErrorCategory::Network => "Check your internet connection and try again",
            ErrorCategory::Auth => "Log in again with `memberpass login <username>`",
            ErrorCategory::Server => "The portal may be having trouble. Please try again later",
            ErrorCategory::Crypto => "Check MEMBERPASS_QR_SECRET and MEMBERPASS_QR_IV",
            ErrorCategory::System => "Check file permissions for the memberpass data directory",
            ErrorCategory::Configuration => "Check the MEMBERPASS_* environment variables",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_transport_classes_retry() {
        assert!(ErrorCategory::Network.is_retryable());
        assert!(ErrorCategory::Server.is_retryable());
        assert!(!ErrorCategory::Auth.is_retryable());
        assert!(!ErrorCategory::Crypto.is_retryable());
        assert!(!ErrorCategory::System.is_retryable());
        assert!(!ErrorCategory::Configuration.is_retryable());
    }

    #[test]
    fn test_display_uses_label() {
        assert_eq!(ErrorCategory::Auth.to_string(), "auth");
        assert_eq!(ErrorCategory::Crypto.to_string(), "crypto");
    }

    #[test]
    fn test_auth_hint_points_at_login() {
        assert!(ErrorCategory::Auth.recovery_hint().contains("login"));
    }
}
