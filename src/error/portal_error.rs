//! Unified error type for the portal client.

use std::fmt;

use super::auth::AuthError;
use super::category::ErrorCategory;
use super::context::ErrorContext;
use super::crypto::CryptoError;
use super::network::NetworkError;
use super::system::SystemError;

/// Every failure the library surfaces to the binary ends up here.
#[derive(Debug)]
pub enum PortalError {
    Network(NetworkError),

    Auth(AuthError),

    Crypto(CryptoError),

    System(SystemError),

    /// Wrapped error with additional context.
    WithContext {
        error: Box<PortalError>,
        context: ErrorContext,
    },
}

impl PortalError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            PortalError::Network(NetworkError::HttpStatus { status, .. }) if *status >= 500 => {
                ErrorCategory::Server
            }
            PortalError::Network(_) => ErrorCategory::Network,
            PortalError::Auth(_) => ErrorCategory::Auth,
            PortalError::Crypto(_) => ErrorCategory::Crypto,
            PortalError::System(SystemError::EnvironmentError { .. }) => {
                ErrorCategory::Configuration
            }
            PortalError::System(_) => ErrorCategory::System,
            PortalError::WithContext { error, .. } => error.category(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            PortalError::Network(err) => err.is_retryable(),
            PortalError::WithContext { error, .. } => error.is_retryable(),
            _ => false,
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            PortalError::Network(err) => err.user_message(),
            PortalError::Auth(err) => err.user_message(),
            PortalError::Crypto(err) => err.user_message(),
            PortalError::System(err) => err.user_message(),
            PortalError::WithContext { error, .. } => error.user_message(),
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            PortalError::Network(err) => err.error_code(),
            PortalError::Auth(err) => err.error_code(),
            PortalError::Crypto(err) => err.error_code(),
            PortalError::System(err) => err.error_code(),
            PortalError::WithContext { error, .. } => error.error_code(),
        }
    }

    pub fn with_context(self, ctx: ErrorContext) -> Self {
        PortalError::WithContext {
            error: Box::new(self),
            context: ctx,
        }
    }

    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            PortalError::WithContext { context, .. } => Some(context),
            _ => None,
        }
    }

    /// The error without any context wrappers.
    pub fn inner(&self) -> &PortalError {
        match self {
            PortalError::WithContext { error, .. } => error.inner(),
            _ => self,
        }
    }

    pub fn recovery_hint(&self) -> &'static str {
        self.category().recovery_hint()
    }

    /// True when the member must log in again to continue.
    pub fn requires_login(&self) -> bool {
        match self.inner() {
            PortalError::Auth(err) => err.requires_login(),
            _ => false,
        }
    }
}

impl fmt::Display for PortalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortalError::Network(err) => write!(f, "{}", err),
            PortalError::Auth(err) => write!(f, "{}", err),
            PortalError::Crypto(err) => write!(f, "{}", err),
            PortalError::System(err) => write!(f, "{}", err),
            PortalError::WithContext { error, context } => write!(f, "{} ({})", error, context),
        }
    }
}

impl std::error::Error for PortalError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PortalError::Network(err) => Some(err),
            PortalError::Auth(err) => Some(err),
            PortalError::Crypto(err) => Some(err),
            PortalError::System(err) => Some(err),
            PortalError::WithContext { error, .. } => error.source(),
        }
    }
}

impl From<NetworkError> for PortalError {
    fn from(err: NetworkError) -> Self {
        PortalError::Network(err)
    }
}

impl From<AuthError> for PortalError {
    fn from(err: AuthError) -> Self {
        PortalError::Auth(err)
    }
}

impl From<CryptoError> for PortalError {
    fn from(err: CryptoError) -> Self {
        PortalError::Crypto(err)
    }
}

impl From<SystemError> for PortalError {
    fn from(err: SystemError) -> Self {
        PortalError::System(err)
    }
}

impl From<serde_json::Error> for PortalError {
    fn from(err: serde_json::Error) -> Self {
        PortalError::Network(NetworkError::InvalidResponse {
            message: err.to_string(),
        })
    }
}
