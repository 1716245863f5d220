//! Context attached to errors as they cross layer boundaries.

use chrono::{DateTime, Utc};

/// Where and when an error happened.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorContext {
    /// Operation that failed, e.g. `fetch_profile`.
    pub operation: String,

    /// Endpoint path when the failure came from the portal API.
    pub endpoint: Option<String>,

    pub timestamp: DateTime<Utc>,
}

impl ErrorContext {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            endpoint: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Key=value rendering for log output.
    pub fn to_log_string(&self) -> String {
        let mut parts = vec![format!("operation={}", self.operation)];
        if let Some(ref endpoint) = self.endpoint {
            parts.push(format!("endpoint={}", endpoint));
        }
        parts.push(format!("timestamp={}", self.timestamp.to_rfc3339()));
        parts.join(" ")
    }
}

impl std::fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.operation)?;
        if let Some(ref endpoint) = self.endpoint {
            write!(f, " endpoint={}", endpoint)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_sets_fields() {
        let ctx = ErrorContext::new("fetch_profile")
            .with_endpoint("/auth/profile");
        assert_eq!(ctx.operation, "fetch_profile");
        assert_eq!(ctx.endpoint.as_deref(), Some("/auth/profile"));
    }

    #[test]
    fn test_log_string_skips_missing_fields() {
        let ctx = ErrorContext::new("login");
        let line = ctx.to_log_string();
        assert!(line.starts_with("operation=login"));
        assert!(!line.contains("endpoint="));
        assert!(line.contains("timestamp="));
    }

    #[test]
    fn test_display() {
        let ctx = ErrorContext::new("logout").with_endpoint("/auth/logout");
        assert_eq!(ctx.to_string(), "[logout] endpoint=/auth/logout");
    }
}
