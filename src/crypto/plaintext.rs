//! The structured payload carried inside a member pass.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::CryptoError;

/// Minute-granularity timestamp format, `YYYYMMDDHHmm`.
pub const PASS_DATETIME_FORMAT: &str = "%Y%m%d%H%M";

/// Pass payload. Field order is part of the wire contract with the
/// gate-side verifier: `worship_id` first, then `current_datetime`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassPlaintext {
    pub worship_id: String,
    pub current_datetime: String,
}

impl PassPlaintext {
    pub fn new(worship_id: impl Into<String>, current_datetime: impl Into<String>) -> Self {
        Self {
            worship_id: worship_id.into(),
            current_datetime: current_datetime.into(),
        }
    }

    /// Payload for `worship_id` at the minute containing `at`.
    pub fn at_minute(worship_id: impl Into<String>, at: NaiveDateTime) -> Self {
        Self::new(worship_id, at.format(PASS_DATETIME_FORMAT).to_string())
    }

    pub fn to_json(&self) -> Result<String, CryptoError> {
        serde_json::to_string(self).map_err(|e| CryptoError::Serialize(e.to_string()))
    }

    /// Parse `current_datetime` back into a minute.
    pub fn minute(&self) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(&self.current_datetime, PASS_DATETIME_FORMAT).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn minute(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 1)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    #[test]
    fn test_field_order_is_stable() {
        let payload = PassPlaintext::new("1024", "202501011230");
        assert_eq!(
            payload.to_json().unwrap(),
            r#"{"worship_id":"1024","current_datetime":"202501011230"}"#
        );
    }

    #[test]
    fn test_seconds_are_truncated() {
        let a = PassPlaintext::at_minute("1024", minute(12, 30, 1));
        let b = PassPlaintext::at_minute("1024", minute(12, 30, 59));
        assert_eq!(a, b);
        assert_eq!(a.current_datetime, "202501011230");
    }

    #[test]
    fn test_minute_parses_back() {
        let payload = PassPlaintext::at_minute("7", minute(9, 5, 0));
        assert_eq!(payload.current_datetime, "202501010905");
        assert_eq!(payload.minute(), Some(minute(9, 5, 0)));
    }
}
