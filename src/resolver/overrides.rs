//! CLI override parsing and legacy key translation.
use std::collections::BTreeMap;

use crate::config::parse_bool;
use crate::error::ConfigError;

use super::bed::BED_TYPE_KEY;

/// Legacy option names still accepted on the command line.
const LEGACY_KEYS: &[(&str, &str)] = &[
    ("perimeters", "wall_loops"),
    ("top_solid_layers", "top_shell_layers"),
    ("bottom_solid_layers", "bottom_shell_layers"),
    ("infill_pattern", "sparse_infill_pattern"),
    ("fill_angle", "infill_direction"),
    ("skirts", "skirt_loops"),
    ("fan_speed", "overhang_fan_speed"),
    ("fan_always_on", "reduce_fan_stop_start_freq"),
];

/// Parse a comma-separated `key=value` override string.
///
/// Whitespace around keys and values is trimmed and a value wrapped in
/// matching `"` or `'` quotes is unwrapped. A segment without `=` continues
/// the previous value, so list values such as `printable_area=0x0,256x0`
/// survive the comma split.
///
/// # Examples
///
/// ```
/// use orcaslicer_cli::resolver::overrides::parse_override_string;
///
/// let pairs = parse_override_string(r#"layer_height = 0.2, filament_type="PLA""#).unwrap();
/// assert_eq!(pairs[0], ("layer_height".to_string(), "0.2".to_string()));
/// assert_eq!(pairs[1], ("filament_type".to_string(), "PLA".to_string()));
/// ```
///
/// # Errors
///
/// Returns [`ConfigError::MalformedOverride`] if the string starts with a
/// segment that has no `=`, or a segment has an empty key.
pub fn parse_override_string(input: &str) -> Result<Vec<(String, String)>, ConfigError> {
    let mut pairs: Vec<(String, String)> = Vec::new();
    for segment in input.split(',') {
        if segment.trim().is_empty() {
            continue;
        }
        match segment.split_once('=') {
            Some((key, value)) => {
                let key = key.trim();
                if key.is_empty() {
                    return Err(ConfigError::MalformedOverride {
                        segment: segment.trim().to_string(),
                    });
                }
                pairs.push((key.to_string(), value.trim().to_string()));
            }
            None => {
                let Some((_, value)) = pairs.last_mut() else {
                    return Err(ConfigError::MalformedOverride {
                        segment: segment.trim().to_string(),
                    });
                };
                value.push(',');
                value.push_str(segment.trim());
            }
        }
    }

    Ok(pairs
        .into_iter()
        .map(|(key, value)| (key, strip_quotes(&value).to_string()))
        .collect())
}

/// Parse every `--set` argument into one map; later keys replace earlier ones.
///
/// # Errors
///
/// Returns [`ConfigError::MalformedOverride`] for malformed segments.
pub fn collect_overrides<S: AsRef<str>>(
    args: &[S],
) -> Result<BTreeMap<String, String>, ConfigError> {
    let mut overrides = BTreeMap::new();
    for arg in args {
        overrides.extend(parse_override_string(arg.as_ref())?);
    }
    Ok(overrides)
}

/// Translate a legacy option name (and, where needed, its value).
///
/// # Examples
///
/// ```
/// use orcaslicer_cli::resolver::overrides::translate_legacy;
///
/// assert_eq!(translate_legacy("perimeters", "3"), ("wall_loops".to_string(), "3".to_string()));
/// assert_eq!(
///     translate_legacy("external_perimeters_first", "1").1,
///     "outer wall/inner wall"
/// );
/// ```
#[must_use]
pub fn translate_legacy(key: &str, value: &str) -> (String, String) {
    if key == "external_perimeters_first" {
        let sequence = if parse_bool(value).unwrap_or(false) {
            "outer wall/inner wall"
        } else {
            "inner wall/outer wall"
        };
        return ("wall_sequence".to_string(), sequence.to_string());
    }
    let mapped = LEGACY_KEYS
        .iter()
        .find(|(legacy, _)| *legacy == key)
        .map_or(key, |(_, current)| current);
    (mapped.to_string(), value.to_string())
}

/// Order CLI overrides for application: the bed type first, then the
/// remaining keys alphabetically.
///
/// Legacy names are translated first; when a legacy name and its current
/// name are both present the current name wins.
#[must_use]
pub fn application_order(overrides: &BTreeMap<String, String>) -> Vec<(String, String)> {
    let mut translated: BTreeMap<String, String> = BTreeMap::new();
    for (key, value) in overrides {
        let (mapped, mapped_value) = translate_legacy(key, value);
        if mapped != *key && overrides.contains_key(&mapped) {
            continue;
        }
        translated.insert(mapped, mapped_value);
    }

    let bed_type = translated.remove_entry(BED_TYPE_KEY);
    bed_type.into_iter().chain(translated).collect()
}

fn strip_quotes(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2
            && let Some(inner) = value
                .strip_prefix(quote)
                .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner;
        }
    }
    value
}
