//! Session and login errors.

use std::fmt;

/// Errors about the member's session.
#[derive(Debug, Clone)]
pub enum AuthError {
    /// The portal answered 403; the session has been invalidated.
    SessionExpired { message: String },

    /// No token is persisted, so the operation needs a login first.
    NotAuthenticated,

    /// Username or password rejected by the login endpoint.
    LoginRejected { status: u16, message: String },

    /// The persisted token slot could not be read or written.
    TokenStore { message: String },
}

impl AuthError {
    /// Whether the member has to log in again.
    pub fn requires_login(&self) -> bool {
        matches!(
            self,
            AuthError::SessionExpired { .. } | AuthError::NotAuthenticated
        )
    }

    pub fn user_message(&self) -> String {
        match self {
            AuthError::SessionExpired { message } => message.clone(),
            AuthError::NotAuthenticated => "You are not logged in.".to_string(),
            AuthError::LoginRejected { .. } => {
                "Login failed. Check your username and password.".to_string()
            }
            AuthError::TokenStore { .. } => {
                "Could not access the saved session on this machine.".to_string()
            }
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::SessionExpired { .. } => "E_AUTH_EXPIRED",
            AuthError::NotAuthenticated => "E_AUTH_NOT_AUTH",
            AuthError::LoginRejected { .. } => "E_AUTH_LOGIN",
            AuthError::TokenStore { .. } => "E_AUTH_STORE",
        }
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::SessionExpired { message } => write!(f, "Session expired: {}", message),
            AuthError::NotAuthenticated => write!(f, "Not authenticated"),
            AuthError::LoginRejected { status, message } => {
                write!(f, "Login rejected ({}): {}", status, message)
            }
            AuthError::TokenStore { message } => write!(f, "Token store error: {}", message),
        }
    }
}

impl std::error::Error for AuthError {}
