//! Logged-in member as returned by the login and profile endpoints.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Custom field holding the member's worship id.
pub const WORSHIP_ID_FIELD: &str = "worshipid";

/// Shown in place of a pass reference when the profile has none.
pub const UNSET_WORSHIP_ID: &str = "未設定";

/// Accepts both `"42"` and `42`; the portal backend is not consistent.
pub(crate) fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::{self, Visitor};
    use std::fmt;

    struct IdVisitor;

    impl<'de> Visitor<'de> for IdVisitor {
        type Value = String;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("an id as string or integer")
        }

        fn visit_str<E: de::Error>(self, value: &str) -> Result<String, E> {
            Ok(value.to_string())
        }

        fn visit_u64<E: de::Error>(self, value: u64) -> Result<String, E> {
            Ok(value.to_string())
        }

        fn visit_i64<E: de::Error>(self, value: i64) -> Result<String, E> {
            Ok(value.to_string())
        }
    }

    deserializer.deserialize_any(IdVisitor)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    #[serde(rename = "id", deserialize_with = "deserialize_id")]
    pub member_id: String,

    #[serde(rename = "name", default)]
    pub display_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    /// Extensible attributes; values may be strings, numbers, bools or null.
    #[serde(default)]
    pub custom_fields: HashMap<String, Value>,
}

impl Identity {
    pub fn new(member_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            member_id: member_id.into(),
            display_name: display_name.into(),
            email: None,
            role: None,
            custom_fields: HashMap::new(),
        }
    }

    pub fn with_custom_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.custom_fields.insert(key.into(), value.into());
        self
    }

    /// The worship id encoded into the member pass, if the profile has one.
    pub fn credential_reference(&self) -> Option<String> {
        match self.custom_fields.get(WORSHIP_ID_FIELD)? {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Worship id for display, with the placeholder when unset.
    pub fn worship_id_label(&self) -> String {
        self.credential_reference()
            .unwrap_or_else(|| UNSET_WORSHIP_ID.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_login_user_shape() {
        let identity: Identity = serde_json::from_value(json!({
            "id": "17",
            "email": "member@example.org",
            "name": "Taro"
        }))
        .unwrap();
        assert_eq!(identity.member_id, "17");
        assert_eq!(identity.display_name, "Taro");
        assert!(identity.custom_fields.is_empty());
        assert_eq!(identity.credential_reference(), None);
    }

    #[test]
    fn test_numeric_ids_are_normalized() {
        let identity: Identity = serde_json::from_value(json!({
            "id": 17,
            "name": "Taro",
            "role": "member",
            "custom_fields": { "worshipid": 1024, "newsletter": true }
        }))
        .unwrap();
        assert_eq!(identity.member_id, "17");
        assert_eq!(identity.role.as_deref(), Some("member"));
        assert_eq!(identity.credential_reference(), Some("1024".to_string()));
    }

    #[test]
    fn test_blank_worship_id_uses_placeholder() {
        let identity = Identity::new("1", "Hanako").with_custom_field(WORSHIP_ID_FIELD, "  ");
        assert_eq!(identity.credential_reference(), None);
        assert_eq!(identity.worship_id_label(), UNSET_WORSHIP_ID);
    }

    #[test]
    fn test_null_worship_id_is_absent() {
        let identity = Identity::new("1", "Hanako").with_custom_field(WORSHIP_ID_FIELD, Value::Null);
        assert_eq!(identity.credential_reference(), None);
    }
}
