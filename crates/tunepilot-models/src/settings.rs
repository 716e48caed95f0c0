//! Configuration value types and settings snapshots.
//!
//! Settings are untyped at the storage level (a key/value map) but every
//! key has a validation rule registered in the config store. A
//! [`SettingsSnapshot`] is the frozen copy of a provider's settings that a
//! task carries from creation to completion, so configuration changes made
//! while a download is running never affect it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single configuration value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    /// Boolean toggle.
    Bool(bool),
    /// Integer setting (counts, limits, dimensions).
    Int(i64),
    /// String setting (enums, paths).
    Str(String),
}

impl ConfigValue {
    /// Returns the value as a bool, if it is one.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConfigValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the value as an integer, if it is one.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            ConfigValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the value as a string slice, if it is one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Human-readable name of the value's type.
    pub fn type_name(&self) -> &'static str {
        match self {
            ConfigValue::Bool(_) => "bool",
            ConfigValue::Int(_) => "int",
            ConfigValue::Str(_) => "string",
        }
    }

    /// Parses a value from user input, given the expected shape.
    ///
    /// Used by the command layer: `/set` arguments arrive as text.
    pub fn parse_as(type_name: &str, input: &str) -> Option<ConfigValue> {
        match type_name {
            "bool" => match input.to_ascii_lowercase().as_str() {
                "true" | "on" | "yes" | "1" => Some(ConfigValue::Bool(true)),
                "false" | "off" | "no" | "0" => Some(ConfigValue::Bool(false)),
                _ => None,
            },
            "int" => input.parse().ok().map(ConfigValue::Int),
            "string" => Some(ConfigValue::Str(input.to_string())),
            _ => None,
        }
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValue::Bool(b) => write!(f, "{}", b),
            ConfigValue::Int(i) => write!(f, "{}", i),
            ConfigValue::Str(s) => write!(f, "{}", s),
        }
    }
}

impl From<bool> for ConfigValue {
    fn from(b: bool) -> Self {
        ConfigValue::Bool(b)
    }
}

impl From<i64> for ConfigValue {
    fn from(i: i64) -> Self {
        ConfigValue::Int(i)
    }
}

impl From<&str> for ConfigValue {
    fn from(s: &str) -> Self {
        ConfigValue::Str(s.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(s: String) -> Self {
        ConfigValue::Str(s)
    }
}

/// Immutable copy of a provider's settings captured at task creation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SettingsSnapshot(BTreeMap<String, ConfigValue>);

impl SettingsSnapshot {
    /// Creates a snapshot from a key/value map.
    pub fn new(values: BTreeMap<String, ConfigValue>) -> Self {
        Self(values)
    }

    /// Looks up a raw value.
    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        self.0.get(key)
    }

    /// Looks up an integer, falling back to `default` when the key is
    /// absent or has a different type.
    pub fn int_or(&self, key: &str, default: i64) -> i64 {
        self.get(key).and_then(ConfigValue::as_int).unwrap_or(default)
    }

    /// Looks up a bool with a fallback.
    pub fn bool_or(&self, key: &str, default: bool) -> bool {
        self.get(key).and_then(ConfigValue::as_bool).unwrap_or(default)
    }

    /// Looks up a string with a fallback.
    pub fn str_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).and_then(ConfigValue::as_str).unwrap_or(default)
    }

    /// Iterates over all key/value pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &ConfigValue)> {
        self.0.iter()
    }

    /// Number of settings in the snapshot.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the snapshot holds no settings.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, ConfigValue)> for SettingsSnapshot {
    fn from_iter<T: IntoIterator<Item = (String, ConfigValue)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> SettingsSnapshot {
        [
            ("quality_audio".to_string(), ConfigValue::from("LOSSLESS")),
            ("downloads_concurrent_max".to_string(), ConfigValue::from(3)),
            ("lyrics_embed".to_string(), ConfigValue::from(true)),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_accessors() {
        let snap = snapshot();
        assert_eq!(snap.str_or("quality_audio", "LOW"), "LOSSLESS");
        assert_eq!(snap.int_or("downloads_concurrent_max", 1), 3);
        assert!(snap.bool_or("lyrics_embed", false));
    }

    #[test]
    fn test_accessor_fallbacks() {
        let snap = snapshot();
        assert_eq!(snap.int_or("missing", 7), 7);
        // Type mismatch also falls back.
        assert_eq!(snap.int_or("quality_audio", 7), 7);
    }

    #[test]
    fn test_untagged_serialization() {
        assert_eq!(
            serde_json::to_string(&ConfigValue::Bool(true)).unwrap(),
            "true"
        );
        assert_eq!(serde_json::to_string(&ConfigValue::Int(5)).unwrap(), "5");
        assert_eq!(
            serde_json::to_string(&ConfigValue::from("HIGH")).unwrap(),
            "\"HIGH\""
        );

        let v: ConfigValue = serde_json::from_str("42").unwrap();
        assert_eq!(v, ConfigValue::Int(42));
        let v: ConfigValue = serde_json::from_str("false").unwrap();
        assert_eq!(v, ConfigValue::Bool(false));
    }

    #[test]
    fn test_snapshot_roundtrip() {
        let snap = snapshot();
        let json = serde_json::to_string(&snap).unwrap();
        let back: SettingsSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(snap, back);
    }

    #[test]
    fn test_parse_as() {
        assert_eq!(
            ConfigValue::parse_as("bool", "on"),
            Some(ConfigValue::Bool(true))
        );
        assert_eq!(
            ConfigValue::parse_as("int", "10"),
            Some(ConfigValue::Int(10))
        );
        assert_eq!(ConfigValue::parse_as("int", "ten"), None);
        assert_eq!(
            ConfigValue::parse_as("string", "HIGH"),
            Some(ConfigValue::from("HIGH"))
        );
    }
}
