//! Schema-checked configuration dictionary and override sets.
use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::{Map, Value};

use super::value::{ConfigValue, ValueKind};
use crate::error::ConfigError;

/// The fixed set of keys (and their kinds) the engine accepts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigSchema {
    kinds: BTreeMap<String, ValueKind>,
}

impl ConfigSchema {
    /// Kind of `key`, or `None` when the key is not part of the schema.
    #[must_use]
    pub fn kind(&self, key: &str) -> Option<ValueKind> {
        self.kinds.get(key).copied()
    }

    /// Return `true` if `key` is part of the schema.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.kinds.contains_key(key)
    }

    /// Number of keys in the schema.
    #[must_use]
    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    /// Return `true` if the schema has no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}

/// Outcome of merging a raw preset or project fragment into a dictionary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FragmentReport {
    /// Number of keys written.
    pub applied: usize,
    /// Keys skipped because the schema does not know them.
    pub unknown: Vec<String>,
    /// Keys skipped because their value could not be coerced, with the reason.
    pub invalid: Vec<(String, String)>,
}

/// Ordered key/value configuration whose keys are fixed by a [`ConfigSchema`].
///
/// New keys are never created: every write is checked against the schema
/// and fails with [`ConfigError::UnknownKey`] otherwise. Clones share the
/// schema.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigDictionary {
    schema: Arc<ConfigSchema>,
    values: BTreeMap<String, ConfigValue>,
}

impl ConfigDictionary {
    /// Build the schema and default values from the engine defaults object.
    ///
    /// The kind of each key is inferred from its default value; entries that
    /// cannot be typed (`null`, nested objects) are left out of the schema.
    #[must_use]
    pub fn from_defaults(defaults: &Map<String, Value>) -> Self {
        let mut kinds = BTreeMap::new();
        let mut values = BTreeMap::new();
        for (key, raw) in defaults {
            if let Some((value, kind)) = ConfigValue::infer(raw) {
                kinds.insert(key.clone(), kind);
                values.insert(key.clone(), value);
            }
        }
        Self {
            schema: Arc::new(ConfigSchema { kinds }),
            values,
        }
    }

    /// The schema this dictionary is checked against.
    #[must_use]
    pub fn schema(&self) -> &ConfigSchema {
        &self.schema
    }

    /// Value of `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        self.values.get(key)
    }

    /// String value of `key` (first element for string lists).
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(ConfigValue::as_str)
    }

    /// Return `true` if `key` has a value.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Iterate over all entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ConfigValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Return `true` if there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Set `key` to an already typed value.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownKey`] if `key` is not in the schema and
    /// [`ConfigError::InvalidValue`] if `value` does not fit its kind.
    pub fn set(&mut self, key: &str, value: ConfigValue) -> Result<(), ConfigError> {
        let kind = self.kind_of(key)?;
        if !value.matches(kind) {
            return Err(ConfigError::InvalidValue {
                key: key.to_string(),
                value: value.to_string(),
                reason: format!("expected a {kind}"),
            });
        }
        self.values.insert(key.to_string(), value);
        Ok(())
    }

    /// Parse `raw` as the kind of `key` and store it, returning the typed value.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownKey`] if `key` is not in the schema and
    /// [`ConfigError::InvalidValue`] if `raw` cannot be parsed.
    pub fn set_raw(&mut self, key: &str, raw: &str) -> Result<ConfigValue, ConfigError> {
        let kind = self.kind_of(key)?;
        let value = ConfigValue::parse(kind, raw).map_err(|reason| ConfigError::InvalidValue {
            key: key.to_string(),
            value: raw.to_string(),
            reason,
        })?;
        self.values.insert(key.to_string(), value.clone());
        Ok(value)
    }

    /// Convert a JSON value to the kind of `key` without storing it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownKey`] or [`ConfigError::InvalidValue`].
    pub fn coerce(&self, key: &str, raw: &Value) -> Result<ConfigValue, ConfigError> {
        let kind = self.kind_of(key)?;
        ConfigValue::coerce(kind, raw).map_err(|reason| ConfigError::InvalidValue {
            key: key.to_string(),
            value: raw.to_string(),
            reason,
        })
    }

    /// Merge a raw fragment (preset or project JSON), skipping keys outside
    /// the schema and values that cannot be coerced.
    pub fn apply_fragment(&mut self, fragment: &Map<String, Value>) -> FragmentReport {
        let mut report = FragmentReport::default();
        for (key, raw) in fragment {
            match self.coerce(key, raw) {
                Ok(value) => {
                    self.values.insert(key.clone(), value);
                    report.applied += 1;
                }
                Err(ConfigError::UnknownKey { .. }) => report.unknown.push(key.clone()),
                Err(e) => report.invalid.push((key.clone(), e.to_string())),
            }
        }
        report
    }

    /// Write every entry of `overrides` whose key is in the schema.
    ///
    /// Returns the number of keys written. Applying the same set twice
    /// yields the same dictionary as applying it once.
    pub fn apply_overrides(&mut self, overrides: &OverrideSet) -> usize {
        let mut applied = 0;
        for (key, value) in overrides.iter() {
            if self.schema.kind(key).is_some_and(|kind| value.matches(kind)) {
                self.values.insert(key.to_string(), value.clone());
                applied += 1;
            }
        }
        applied
    }

    /// Keys whose value differs from `baseline`, with this dictionary's values.
    #[must_use]
    pub fn diff_against(&self, baseline: &Self) -> OverrideSet {
        self.iter()
            .filter(|(key, value)| baseline.get(key) != Some(*value))
            .map(|(key, value)| (key.to_string(), value.clone()))
            .collect()
    }

    /// JSON object handed to the engine.
    #[must_use]
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.values
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        )
    }

    fn kind_of(&self, key: &str) -> Result<ValueKind, ConfigError> {
        self.schema.kind(key).ok_or_else(|| ConfigError::UnknownKey {
            key: key.to_string(),
        })
    }
}

/// An ordered set of keys plus the values they override.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverrideSet {
    entries: BTreeMap<String, ConfigValue>,
}

impl OverrideSet {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an entry.
    pub fn insert(&mut self, key: impl Into<String>, value: ConfigValue) {
        self.entries.insert(key.into(), value);
    }

    /// Value for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        self.entries.get(key)
    }

    /// Return `true` if `key` is overridden.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Overridden keys in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ConfigValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Return `true` if the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, ConfigValue)> for OverrideSet {
    fn from_iter<I: IntoIterator<Item = (String, ConfigValue)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use serde_json::json;

    fn dictionary() -> ConfigDictionary {
        let defaults = json!({
            "layer_height": 0.2,
            "wall_loops": 2,
            "sparse_infill_density": "15%",
            "curr_bed_type": "High Temp Plate",
            "nozzle_diameter": [0.4],
            "enable_support": false,
            "unset": null,
        });
        ConfigDictionary::from_defaults(defaults.as_object().unwrap())
    }

    #[test]
    fn from_defaults_builds_schema() {
        let cfg = dictionary();
        assert_eq!(cfg.schema().len(), 6, "null entries are not options");
        assert_eq!(cfg.schema().kind("wall_loops"), Some(ValueKind::Int));
        assert_eq!(cfg.schema().kind("nozzle_diameter"), Some(ValueKind::Floats));
        assert!(!cfg.schema().contains("unset"));
    }

    #[test]
    fn set_raw_parses_as_schema_kind() {
        let mut cfg = dictionary();
        let value = cfg.set_raw("wall_loops", "4").unwrap();
        assert_eq!(value, ConfigValue::Int(4));
        assert_eq!(cfg.get("wall_loops"), Some(&ConfigValue::Int(4)));
    }

    #[test]
    fn set_raw_rejects_unknown_key_without_change() {
        let mut cfg = dictionary();
        let before = cfg.clone();
        let err = cfg.set_raw("no_such_key", "1").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownKey { ref key } if key == "no_such_key"));
        assert_eq!(cfg, before);
    }

    #[test]
    fn set_rejects_kind_mismatch() {
        let mut cfg = dictionary();
        let err = cfg
            .set("enable_support", ConfigValue::String("yes".into()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn apply_fragment_reports_unknown_and_invalid() {
        let mut cfg = dictionary();
        let fragment = json!({
            "layer_height": "0.28",
            "wall_loops": "many",
            "brand_new": "1",
        });
        let report = cfg.apply_fragment(fragment.as_object().unwrap());
        assert_eq!(report.applied, 1);
        assert_eq!(report.unknown, vec!["brand_new".to_string()]);
        assert_eq!(report.invalid.len(), 1);
        assert_eq!(cfg.get("layer_height"), Some(&ConfigValue::Float(0.28)));
    }

    #[test]
    fn apply_overrides_is_idempotent() {
        let mut overrides = OverrideSet::new();
        overrides.insert("wall_loops", ConfigValue::Int(5));
        overrides.insert("layer_height", ConfigValue::Float(0.12));

        let mut once = dictionary();
        once.apply_overrides(&overrides);
        let mut twice = once.clone();
        twice.apply_overrides(&overrides);
        assert_eq!(once, twice);
    }

    #[test]
    fn apply_overrides_skips_keys_outside_schema() {
        let mut cfg = dictionary();
        let mut overrides = OverrideSet::new();
        overrides.insert("not_in_schema", ConfigValue::Int(1));
        assert_eq!(cfg.apply_overrides(&overrides), 0);
        assert!(!cfg.contains_key("not_in_schema"));
    }

    #[test]
    fn diff_against_lists_changed_keys() {
        let base = dictionary();
        let mut edited = base.clone();
        edited.set_raw("sparse_infill_density", "20%").unwrap();
        let diff = edited.diff_against(&base);
        assert_eq!(diff.keys().collect::<Vec<_>>(), vec!["sparse_infill_density"]);
    }

    #[test]
    fn to_json_round_trips_values() {
        let cfg = dictionary();
        let json = cfg.to_json();
        assert_eq!(json["sparse_infill_density"], json!("15%"));
        assert_eq!(json["nozzle_diameter"], json!([0.4]));
    }
}
