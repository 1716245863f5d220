//! Local machine errors: storage directory, environment.

use std::fmt;

#[derive(Debug, Clone)]
pub enum SystemError {
    /// `dirs::home_dir()` returned nothing and no override was configured.
    NoHomeDirectory,

    /// A `MEMBERPASS_*` variable is set to something unusable.
    EnvironmentError { variable: String, message: String },
}

impl SystemError {
    pub fn user_message(&self) -> String {
        match self {
            SystemError::NoHomeDirectory => {
                "Could not find your home directory. Set MEMBERPASS_HOME.".to_string()
            }
            SystemError::EnvironmentError { variable, message } => {
                format!("{} is invalid: {}", variable, message)
            }
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            SystemError::NoHomeDirectory => "E_SYS_NO_HOME",
            SystemError::EnvironmentError { .. } => "E_SYS_ENV",
        }
    }
}

impl fmt::Display for SystemError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SystemError::NoHomeDirectory => write!(f, "Could not determine home directory"),
            SystemError::EnvironmentError { variable, message } => {
                write!(f, "Environment variable '{}' error: {}", variable, message)
            }
        }
    }
}

impl std::error::Error for SystemError {}
