//! Binding Declaration Metadata
//!
//! One `MetadataMap` per binding declaration, parsed once from the JSON
//! configuration object and immutable afterwards. Keys are matched
//! case-insensitively; duplicate keys differing only by case collapse to a
//! single entry (last occurrence wins). Direction and the trigger flag are
//! derived at parse time and fixed for the lifetime of the binding.

use rustc_hash::FxHashMap;
use serde_json::Value;

use crate::error::{BindError, Result};

/// Case-insensitive suffix marking trigger binding types.
pub const TRIGGER_SUFFIX: &str = "trigger";

/// Name reported for declarations that carry no 'name' field.
const UNNAMED: &str = "<unnamed>";

/// Data flow of a binding, derived from the `direction` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Read,
    Write,
    ReadWrite,
}

impl Direction {
    fn parse(raw: &str) -> Option<Self> {
        if raw.eq_ignore_ascii_case("in") {
            Some(Self::Read)
        } else if raw.eq_ignore_ascii_case("out") {
            Some(Self::Write)
        } else if raw.eq_ignore_ascii_case("inout") {
            Some(Self::ReadWrite)
        } else {
            None
        }
    }

    pub fn is_read(self) -> bool {
        matches!(self, Self::Read | Self::ReadWrite)
    }

    pub fn is_write(self) -> bool {
        matches!(self, Self::Write | Self::ReadWrite)
    }

    /// Access-mode string used in capability values and diagnostics.
    pub fn access_str(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::ReadWrite => "readwrite",
        }
    }
}

/// Semantic view over one binding declaration.
#[derive(Debug, Clone)]
pub struct MetadataMap {
    name: String,
    binding_type: String,
    direction: Direction,
    is_trigger: bool,
    entries: FxHashMap<String, Value>,
}

impl MetadataMap {
    /// Parse a declaration from its JSON object.
    pub fn from_value(raw: &Value) -> Result<Self> {
        let object = raw.as_object().ok_or_else(|| BindError::MetadataNotObject {
            binding: UNNAMED.to_string(),
        })?;

        // Collapse case-variant duplicate keys; last occurrence wins.
        let mut entries = FxHashMap::default();
        for (key, value) in object {
            entries.insert(key.to_ascii_lowercase(), value.clone());
        }

        let name = entries
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or(UNNAMED)
            .to_string();

        let binding_type = entries
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| BindError::MissingBindingType {
                binding: name.clone(),
            })?
            .to_string();

        let direction = match entries.get("direction").and_then(Value::as_str) {
            Some(raw) => Direction::parse(raw).ok_or_else(|| BindError::InvalidDirection {
                binding: name.clone(),
                value: raw.to_string(),
            })?,
            None => Direction::Read,
        };

        let is_trigger = binding_type.to_ascii_lowercase().ends_with(TRIGGER_SUFFIX);

        Ok(Self {
            name,
            binding_type,
            direction,
            is_trigger,
            entries,
        })
    }

    /// Parse a declaration from raw JSON text.
    pub fn from_json(raw: &str) -> Result<Self> {
        Self::from_value(&serde_json::from_str(raw)?)
    }

    /// Binding name for diagnostics (the function parameter it binds to).
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn binding_type(&self) -> &str {
        &self.binding_type
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn is_trigger(&self) -> bool {
        self.is_trigger
    }

    /// Case-insensitive field lookup.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(&key.to_ascii_lowercase())
    }

    /// String field lookup.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// Non-empty string field lookup, for fields where the empty string
    /// means "not configured".
    pub fn get_text(&self, key: &str) -> Option<&str> {
        self.get_str(key).filter(|s| !s.is_empty())
    }

    /// Case-insensitive exact match on the `type` field.
    pub fn type_is(&self, name: &str) -> bool {
        self.binding_type.eq_ignore_ascii_case(name)
    }

    /// Optional `dataType` hint consumed by message-style bindings.
    pub fn data_type_hint(&self) -> Option<&str> {
        self.get_str("dataType")
    }

    /// All fields, keys folded to lowercase.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // ═══════════════════════════════════════════════════════════════
    // Parsing and derived fields
    // ═══════════════════════════════════════════════════════════════

    #[test]
    fn direction_defaults_to_read() {
        let metadata =
            MetadataMap::from_value(&json!({"type": "queue", "queueName": "orders"})).unwrap();
        assert_eq!(metadata.direction(), Direction::Read);
    }

    #[test]
    fn direction_parses_all_variants() {
        for (raw, expected) in [
            ("in", Direction::Read),
            ("out", Direction::Write),
            ("inout", Direction::ReadWrite),
            ("OUT", Direction::Write),
        ] {
            let metadata =
                MetadataMap::from_value(&json!({"type": "queue", "direction": raw})).unwrap();
            assert_eq!(metadata.direction(), expected, "direction '{}'", raw);
        }
    }

    #[test]
    fn unknown_direction_is_rejected() {
        let result = MetadataMap::from_value(&json!({"type": "queue", "direction": "sideways"}));
        assert!(result.is_err());
        assert_eq!(result.unwrap_err().code(), "FNB-003");
    }

    #[test]
    fn trigger_suffix_detection() {
        let trigger = MetadataMap::from_value(&json!({"type": "queueTrigger"})).unwrap();
        assert!(trigger.is_trigger());

        let plain = MetadataMap::from_value(&json!({"type": "queue"})).unwrap();
        assert!(!plain.is_trigger());

        // Suffix match is case-insensitive
        let shouty = MetadataMap::from_value(&json!({"type": "QUEUETRIGGER"})).unwrap();
        assert!(shouty.is_trigger());
    }

    #[test]
    fn missing_type_is_rejected() {
        let result = MetadataMap::from_value(&json!({"name": "input"}));
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert_eq!(err.code(), "FNB-002");
        assert!(err.to_string().contains("input"));
    }

    #[test]
    fn non_object_is_rejected() {
        let result = MetadataMap::from_value(&json!("queue"));
        assert_eq!(result.unwrap_err().code(), "FNB-001");
    }

    // ═══════════════════════════════════════════════════════════════
    // Case-insensitive lookup
    // ═══════════════════════════════════════════════════════════════

    #[test]
    fn lookup_is_case_insensitive() {
        let metadata =
            MetadataMap::from_value(&json!({"type": "queue", "QueueName": "orders"})).unwrap();
        assert_eq!(metadata.get_str("queuename"), Some("orders"));
        assert_eq!(metadata.get_str("QUEUENAME"), Some("orders"));
    }

    #[test]
    fn duplicate_case_variant_keys_collapse() {
        // serde_json object from text keeps both spellings; the map folds them
        let raw: Value =
            serde_json::from_str(r#"{"type": "queue", "Path": "first", "path": "second"}"#)
                .unwrap();
        let metadata = MetadataMap::from_value(&raw).unwrap();
        let hits: Vec<_> = metadata
            .entries()
            .filter(|(k, _)| *k == "path")
            .collect();
        assert_eq!(hits.len(), 1);
        assert_eq!(metadata.get_str("path"), Some("second"));
    }

    #[test]
    fn get_text_filters_empty_strings() {
        let metadata =
            MetadataMap::from_value(&json!({"type": "queue", "connection": ""})).unwrap();
        assert_eq!(metadata.get_str("connection"), Some(""));
        assert_eq!(metadata.get_text("connection"), None);
    }

    #[test]
    fn type_matching_ignores_case() {
        let metadata = MetadataMap::from_value(&json!({"type": "ServiceBusTrigger"})).unwrap();
        assert!(metadata.type_is("servicebustrigger"));
        assert!(!metadata.type_is("serviceBus"));
    }

    #[test]
    fn non_string_fields_pass_through() {
        let metadata = MetadataMap::from_value(
            &json!({"type": "queue", "batchSize": 16, "autoComplete": true}),
        )
        .unwrap();
        assert_eq!(metadata.get("batchSize"), Some(&json!(16)));
        assert_eq!(metadata.get("autocomplete"), Some(&json!(true)));
    }
}
