//! Override files passed with `--config`.
//!
//! Two formats are accepted: a flat JSON object (`.json`) or `key = value`
//! lines. In the line format, `#` and `;` start comments, inline comments
//! (` #`) are stripped from values and `[section]` headers are ignored, so
//! engine-exported `.ini` files can be used directly.
use std::collections::BTreeMap;
use std::path::Path;

use serde_json::Value;

use crate::error::ConfigError;

/// Load an override file as raw `key -> value` strings.
///
/// Later entries for the same key replace earlier ones.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] if the file cannot be read and
/// [`ConfigError::InvalidSyntax`] if it cannot be parsed.
pub fn load(path: &Path) -> Result<BTreeMap<String, String>, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    let parsed = if is_json {
        parse_json(&content)
    } else {
        parse_lines(&content)
    };

    parsed.map_err(|message| ConfigError::InvalidSyntax {
        path: path.to_path_buf(),
        message,
    })
}

/// Parse `key = value` lines.
///
/// # Examples
///
/// ```
/// use orcaslicer_cli::config::overrides_file::parse_lines;
///
/// let entries = parse_lines("[print]\nlayer_height = 0.2 # fine\nwall_loops=3\n").unwrap();
/// assert_eq!(entries["layer_height"], "0.2");
/// assert_eq!(entries["wall_loops"], "3");
/// ```
///
/// # Errors
///
/// Returns a message naming the first line that is not a key-value pair.
pub fn parse_lines(content: &str) -> Result<BTreeMap<String, String>, String> {
    let mut entries = BTreeMap::new();
    for (line_num, line) in content.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty()
            || trimmed.starts_with('#')
            || trimmed.starts_with(';')
            || (trimmed.starts_with('[') && trimmed.ends_with(']'))
        {
            continue;
        }
        let Some((key, value)) = parse_kv_line(trimmed) else {
            return Err(format!(
                "invalid key-value pair at line {}: {trimmed}",
                line_num + 1
            ));
        };
        entries.insert(key, value);
    }
    Ok(entries)
}

fn parse_json(content: &str) -> Result<BTreeMap<String, String>, String> {
    let value: Value = serde_json::from_str(content).map_err(|e| e.to_string())?;
    let Value::Object(map) = value else {
        return Err("expected a JSON object of key/value pairs".to_string());
    };
    map.into_iter()
        .map(|(key, value)| json_to_raw(&value).map(|raw| (key, raw)))
        .collect()
}

fn json_to_raw(value: &Value) -> Result<String, String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Array(items) => items
            .iter()
            .map(json_to_raw)
            .collect::<Result<Vec<_>, _>>()
            .map(|parts| parts.join(",")),
        other => Err(format!("unsupported value {other}")),
    }
}

/// Parse a `key = value` line, stripping inline comments from the value.
fn parse_kv_line(line: &str) -> Option<(String, String)> {
    let (key, value) = line.split_once('=')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    Some((key.to_string(), strip_inline_comment(value.trim()).to_string()))
}

/// Strip inline comments (`#` preceded by whitespace) from a value.
fn strip_inline_comment(value: &str) -> &str {
    value
        .find(" #")
        .or_else(|| value.find("\t#"))
        .map_or(value, |idx| value[..idx].trim_end())
}
