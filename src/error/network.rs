//! Transport and HTTP status errors.

use std::fmt;

use crate::traits::HttpError;

/// Errors talking to the portal backend.
#[derive(Debug, Clone)]
pub enum NetworkError {
    ConnectionFailed { url: String, message: String },

    Timeout { message: String },

    /// Non-2xx answer other than the session-expiry status.
    HttpStatus { status: u16, message: String },

    /// Body did not match the expected JSON shape.
    InvalidResponse { message: String },

    Other { message: String },
}

impl NetworkError {
    pub fn is_retryable(&self) -> bool {
        match self {
            NetworkError::ConnectionFailed { .. } | NetworkError::Timeout { .. } => true,
            NetworkError::HttpStatus { status, .. } => {
                *status >= 500 || *status == 429 || *status == 408
            }
            NetworkError::InvalidResponse { .. } | NetworkError::Other { .. } => false,
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            NetworkError::ConnectionFailed { .. } => {
                "Unable to reach the portal. Please check your internet connection.".to_string()
            }
            NetworkError::Timeout { .. } => {
                "The portal took too long to answer. Please try again.".to_string()
            }
            NetworkError::HttpStatus { status, .. } => match *status {
                400 => "The request was invalid.".to_string(),
                401 => "Login required.".to_string(),
                404 => "The requested page was not found.".to_string(),
                429 => "Too many requests. Please wait a moment.".to_string(),
                500..=599 => "The portal is having trouble. Please try again later.".to_string(),
                _ => format!("The portal returned an error (HTTP {}).", status),
            },
            NetworkError::InvalidResponse { .. } => {
                "The portal sent an unexpected response.".to_string()
            }
            NetworkError::Other { message } => format!("Network error: {}", message),
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            NetworkError::ConnectionFailed { .. } => "E_NET_CONN",
            NetworkError::Timeout { .. } => "E_NET_TIMEOUT",
            NetworkError::HttpStatus { .. } => "E_NET_HTTP",
            NetworkError::InvalidResponse { .. } => "E_NET_INVALID",
            NetworkError::Other { .. } => "E_NET_OTHER",
        }
    }
}

impl fmt::Display for NetworkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkError::ConnectionFailed { url, message } => {
                write!(f, "Connection failed to '{}': {}", url, message)
            }
            NetworkError::Timeout { message } => write!(f, "Request timed out: {}", message),
            NetworkError::HttpStatus { status, message } => {
                write!(f, "HTTP {} error: {}", status, message)
            }
            NetworkError::InvalidResponse { message } => {
                write!(f, "Invalid response: {}", message)
            }
            NetworkError::Other { message } => write!(f, "Network error: {}", message),
        }
    }
}

impl std::error::Error for NetworkError {}

impl From<HttpError> for NetworkError {
    fn from(err: HttpError) -> Self {
        match err {
            HttpError::ConnectionFailed(message) => NetworkError::ConnectionFailed {
                url: "unknown".to_string(),
                message,
            },
            HttpError::Timeout(message) => NetworkError::Timeout { message },
            HttpError::InvalidUrl(message) => NetworkError::Other { message },
            HttpError::Other(message) => NetworkError::Other { message },
        }
    }
}
