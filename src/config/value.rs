//! Typed configuration values and the schema kinds they are checked against.
use std::fmt;

use serde::{Serialize, Serializer};
use serde_json::Value;

/// Kind of a configuration option as declared by the engine schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// A single boolean.
    Bool,
    /// A single integer.
    Int,
    /// A single floating point number.
    Float,
    /// A single percentage (stored without the `%` sign).
    Percent,
    /// A single string (enumerations are stored as strings).
    String,
    /// A list of booleans.
    Bools,
    /// A list of integers.
    Ints,
    /// A list of floating point numbers.
    Floats,
    /// A list of percentages.
    Percents,
    /// A list of strings.
    Strings,
}

impl ValueKind {
    /// Return `true` for the list kinds.
    #[must_use]
    pub const fn is_list(self) -> bool {
        matches!(
            self,
            Self::Bools | Self::Ints | Self::Floats | Self::Percents | Self::Strings
        )
    }

    /// Element kind of a list kind; scalar kinds map to themselves.
    #[must_use]
    pub const fn element(self) -> Self {
        match self {
            Self::Bools => Self::Bool,
            Self::Ints => Self::Int,
            Self::Floats => Self::Float,
            Self::Percents => Self::Percent,
            Self::Strings => Self::String,
            scalar => scalar,
        }
    }

    const fn list_of(self) -> Self {
        match self {
            Self::Bool => Self::Bools,
            Self::Int => Self::Ints,
            Self::Float => Self::Floats,
            Self::Percent => Self::Percents,
            Self::String => Self::Strings,
            list => list,
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Bool => "boolean",
            Self::Int => "integer",
            Self::Float => "number",
            Self::Percent => "percentage",
            Self::String => "string",
            Self::Bools => "list of booleans",
            Self::Ints => "list of integers",
            Self::Floats => "list of numbers",
            Self::Percents => "list of percentages",
            Self::Strings => "list of strings",
        };
        f.write_str(name)
    }
}

/// A typed configuration value.
///
/// Float options also accept percentages (`"100%"`), mirroring the engine's
/// float-or-percent options, so a [`ConfigValue::Percent`] is a valid value
/// for a [`ValueKind::Float`] key.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Floating point value.
    Float(f64),
    /// Percentage value, without the `%` sign.
    Percent(f64),
    /// String or enumeration value.
    String(String),
    /// List value; elements share one scalar kind.
    List(Vec<Self>),
}

impl ConfigValue {
    /// Infer a value and its kind from an engine defaults entry.
    ///
    /// Returns `None` for `null` and nested objects, which cannot be
    /// configuration options.
    #[must_use]
    pub fn infer(json: &Value) -> Option<(Self, ValueKind)> {
        match json {
            Value::Bool(b) => Some((Self::Bool(*b), ValueKind::Bool)),
            Value::Number(n) if n.is_i64() || n.is_u64() => {
                n.as_i64().map(|i| (Self::Int(i), ValueKind::Int))
            }
            Value::Number(n) => n.as_f64().map(|f| (Self::Float(f), ValueKind::Float)),
            Value::String(s) => Some(parse_percent(s).map_or_else(
                || (Self::String(s.clone()), ValueKind::String),
                |p| (Self::Percent(p), ValueKind::Percent),
            )),
            Value::Array(items) => {
                let Some(first) = items.first() else {
                    return Some((Self::List(Vec::new()), ValueKind::Strings));
                };
                let (_, element) = Self::infer(first)?;
                let kind = element.list_of();
                Self::coerce(kind, json).ok().map(|value| (value, kind))
            }
            Value::Null | Value::Object(_) => None,
        }
    }

    /// Convert a JSON value (as found in presets and project files) into a
    /// value of `kind`.
    ///
    /// Preset files store most options as strings or single-element lists,
    /// so strings are parsed and a single-element list is accepted for a
    /// scalar kind. A scalar is wrapped for a list kind.
    ///
    /// # Errors
    ///
    /// Returns a human-readable reason when the value cannot represent `kind`.
    pub fn coerce(kind: ValueKind, json: &Value) -> Result<Self, String> {
        if kind.is_list() {
            let element = kind.element();
            return match json {
                Value::Array(items) => items
                    .iter()
                    .map(|item| Self::coerce(element, item))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Self::List),
                Value::String(s) => Self::parse(kind, s),
                other => Self::coerce(element, other).map(|v| Self::List(vec![v])),
            };
        }

        if let Value::Array(items) = json
            && let [single] = items.as_slice()
        {
            return Self::coerce(kind, single);
        }

        match (kind, json) {
            (ValueKind::Bool, Value::Bool(b)) => Ok(Self::Bool(*b)),
            (ValueKind::Int, Value::Number(n)) => n
                .as_i64()
                .map(Self::Int)
                .ok_or_else(|| format!("expected an integer, got {n}")),
            (ValueKind::Float, Value::Number(n)) => n
                .as_f64()
                .map(Self::Float)
                .ok_or_else(|| format!("expected a number, got {n}")),
            (ValueKind::Percent, Value::Number(n)) => n
                .as_f64()
                .map(Self::Percent)
                .ok_or_else(|| format!("expected a percentage, got {n}")),
            (ValueKind::String, Value::Number(n)) => Ok(Self::String(n.to_string())),
            (ValueKind::String, Value::Bool(b)) => Ok(Self::String(b.to_string())),
            (_, Value::String(s)) => Self::parse(kind, s),
            (_, other) => Err(format!("expected a {kind}, got {other}")),
        }
    }

    /// Parse a raw string (CLI override, override file, preset string) as
    /// `kind`.
    ///
    /// List strings are split on `;` when present, otherwise on `,`.
    ///
    /// # Errors
    ///
    /// Returns a human-readable reason when `raw` is not a valid `kind`.
    pub fn parse(kind: ValueKind, raw: &str) -> Result<Self, String> {
        let raw = raw.trim();
        match kind {
            ValueKind::Bool => parse_bool(raw)
                .map(Self::Bool)
                .ok_or_else(|| format!("expected a boolean, got '{raw}'")),
            ValueKind::Int => raw
                .parse::<i64>()
                .map(Self::Int)
                .map_err(|_| format!("expected an integer, got '{raw}'")),
            ValueKind::Float => parse_percent(raw).map_or_else(
                || {
                    raw.parse::<f64>()
                        .ok()
                        .filter(|v| v.is_finite())
                        .map(Self::Float)
                        .ok_or_else(|| format!("expected a number, got '{raw}'"))
                },
                |p| Ok(Self::Percent(p)),
            ),
            ValueKind::Percent => parse_percent(raw)
                .or_else(|| raw.parse::<f64>().ok().filter(|v| v.is_finite()))
                .map(Self::Percent)
                .ok_or_else(|| format!("expected a percentage, got '{raw}'")),
            ValueKind::String => Ok(Self::String(raw.to_string())),
            list => split_list(raw)
                .into_iter()
                .map(|item| Self::parse(list.element(), item))
                .collect::<Result<Vec<_>, _>>()
                .map(Self::List),
        }
    }

    /// Return `true` if this value is acceptable for a key of `kind`.
    #[must_use]
    pub fn matches(&self, kind: ValueKind) -> bool {
        match (self, kind) {
            (Self::List(items), list) if list.is_list() => {
                items.iter().all(|item| item.matches(list.element()))
            }
            (Self::Bool(_), ValueKind::Bool)
            | (Self::Int(_), ValueKind::Int)
            | (Self::Float(_) | Self::Percent(_), ValueKind::Float)
            | (Self::Percent(_), ValueKind::Percent)
            | (Self::String(_), ValueKind::String) => true,
            _ => false,
        }
    }

    /// String content of a string value, or of the first element of a list.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            Self::List(items) => items.first().and_then(Self::as_str),
            _ => None,
        }
    }

    /// Numeric content of a numeric value, or of the first element of a list.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(v) | Self::Percent(v) => Some(*v),
            Self::Int(i) => i32::try_from(*i).ok().map(f64::from),
            Self::List(items) => items.first().and_then(Self::as_f64),
            Self::Bool(_) | Self::String(_) => None,
        }
    }

    /// All string elements of a list value (or the single string value).
    #[must_use]
    pub fn string_items(&self) -> Vec<String> {
        match self {
            Self::String(s) => vec![s.clone()],
            Self::List(items) => items.iter().map(ToString::to_string).collect(),
            other => vec![other.to_string()],
        }
    }

    /// JSON representation handed to the engine.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Bool(b) => Value::Bool(*b),
            Self::Int(i) => Value::from(*i),
            Self::Float(f) => Value::from(*f),
            Self::Percent(p) => Value::String(format!("{p}%")),
            Self::String(s) => Value::String(s.clone()),
            Self::List(items) => Value::Array(items.iter().map(Self::to_json).collect()),
        }
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Percent(p) => write!(f, "{p}%"),
            Self::String(s) => f.write_str(s),
            Self::List(items) => {
                let separator = if items.iter().any(|i| matches!(i, Self::String(_))) {
                    ";"
                } else {
                    ","
                };
                let joined: Vec<String> = items.iter().map(ToString::to_string).collect();
                f.write_str(&joined.join(separator))
            }
        }
    }
}

impl Serialize for ConfigValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

/// Interpret the engine's boolean spellings.
///
/// # Examples
///
/// ```
/// use orcaslicer_cli::config::parse_bool;
///
/// assert_eq!(parse_bool("1"), Some(true));
/// assert_eq!(parse_bool("FALSE"), Some(false));
/// assert_eq!(parse_bool("yes"), None);
/// ```
#[must_use]
pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim() {
        "1" | "true" | "True" | "TRUE" => Some(true),
        "0" | "false" | "False" | "FALSE" => Some(false),
        _ => None,
    }
}

fn parse_percent(raw: &str) -> Option<f64> {
    raw.trim()
        .strip_suffix('%')?
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

fn split_list(raw: &str) -> Vec<&str> {
    if raw.is_empty() {
        return Vec::new();
    }
    let separator = if raw.contains(';') { ';' } else { ',' };
    raw.split(separator)
        .map(|item| item.trim().trim_matches('"'))
        .collect()
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn infer_scalar_kinds() {
        assert_eq!(
            ConfigValue::infer(&json!(true)),
            Some((ConfigValue::Bool(true), ValueKind::Bool))
        );
        assert_eq!(
            ConfigValue::infer(&json!(3)),
            Some((ConfigValue::Int(3), ValueKind::Int))
        );
        assert_eq!(
            ConfigValue::infer(&json!(0.2)),
            Some((ConfigValue::Float(0.2), ValueKind::Float))
        );
        assert_eq!(
            ConfigValue::infer(&json!("15%")),
            Some((ConfigValue::Percent(15.0), ValueKind::Percent))
        );
        assert_eq!(
            ConfigValue::infer(&json!("grid")),
            Some((ConfigValue::String("grid".into()), ValueKind::String))
        );
    }

    #[test]
    fn infer_list_uses_first_element_kind() {
        let (value, kind) = ConfigValue::infer(&json!([0.4, 0.6])).unwrap();
        assert_eq!(kind, ValueKind::Floats);
        assert_eq!(
            value,
            ConfigValue::List(vec![ConfigValue::Float(0.4), ConfigValue::Float(0.6)])
        );
    }

    #[test]
    fn infer_rejects_null_and_objects() {
        assert!(ConfigValue::infer(&json!(null)).is_none());
        assert!(ConfigValue::infer(&json!({"a": 1})).is_none());
    }

    #[test]
    fn coerce_parses_preset_strings() {
        assert_eq!(
            ConfigValue::coerce(ValueKind::Float, &json!("0.28")),
            Ok(ConfigValue::Float(0.28))
        );
        assert_eq!(
            ConfigValue::coerce(ValueKind::Int, &json!(["3"])),
            Ok(ConfigValue::Int(3))
        );
        assert_eq!(
            ConfigValue::coerce(ValueKind::Ints, &json!(["220", "225"])),
            Ok(ConfigValue::List(vec![
                ConfigValue::Int(220),
                ConfigValue::Int(225)
            ]))
        );
    }

    #[test]
    fn coerce_wraps_scalar_for_list_kind() {
        assert_eq!(
            ConfigValue::coerce(ValueKind::Floats, &json!(12.5)),
            Ok(ConfigValue::List(vec![ConfigValue::Float(12.5)]))
        );
    }

    #[test]
    fn coerce_rejects_wrong_kind() {
        assert!(ConfigValue::coerce(ValueKind::Int, &json!("abc")).is_err());
        assert!(ConfigValue::coerce(ValueKind::Bool, &json!({"x": 1})).is_err());
    }

    #[test]
    fn parse_float_accepts_percent() {
        assert_eq!(
            ConfigValue::parse(ValueKind::Float, "100%"),
            Ok(ConfigValue::Percent(100.0))
        );
        assert!(ConfigValue::parse(ValueKind::Float, "nan").is_err());
    }

    #[test]
    fn parse_list_splits_on_semicolon_or_comma() {
        assert_eq!(
            ConfigValue::parse(ValueKind::Strings, "0x0,256x0"),
            Ok(ConfigValue::List(vec![
                ConfigValue::String("0x0".into()),
                ConfigValue::String("256x0".into())
            ]))
        );
        assert_eq!(
            ConfigValue::parse(ValueKind::Strings, "\"a,b\";\"c\""),
            Ok(ConfigValue::List(vec![
                ConfigValue::String("a,b".into()),
                ConfigValue::String("c".into())
            ]))
        );
        assert_eq!(
            ConfigValue::parse(ValueKind::Ints, ""),
            Ok(ConfigValue::List(Vec::new()))
        );
    }

    #[test]
    fn percent_matches_float_kind() {
        assert!(ConfigValue::Percent(50.0).matches(ValueKind::Float));
        assert!(!ConfigValue::Float(0.5).matches(ValueKind::Percent));
        assert!(
            ConfigValue::List(vec![ConfigValue::Int(1)]).matches(ValueKind::Ints),
            "list of ints should match Ints"
        );
        assert!(!ConfigValue::Int(1).matches(ValueKind::Ints));
    }

    #[test]
    fn display_matches_engine_serialization() {
        assert_eq!(ConfigValue::Percent(15.0).to_string(), "15%");
        assert_eq!(ConfigValue::Float(0.2).to_string(), "0.2");
        assert_eq!(
            ConfigValue::List(vec![ConfigValue::Int(1), ConfigValue::Int(2)]).to_string(),
            "1,2"
        );
    }

    #[test]
    fn to_json_keeps_percent_sign() {
        assert_eq!(ConfigValue::Percent(20.0).to_json(), json!("20%"));
        assert_eq!(
            serde_json::to_value(ConfigValue::List(vec![ConfigValue::Bool(true)])).unwrap(),
            json!([true])
        );
    }
}
