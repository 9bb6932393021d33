//! Load the vendor preset library from the resources directory.
//!
//! Layout: `<resources>/profiles/<vendor>/{machine,filament,process}/**/*.json`.
//! Each file is one record. Records of `type` `machine_model` describe a
//! printer model and feed the model table; every other record is a preset
//! whose `inherits` chain is flattened at load time.
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use super::{Preset, PresetBundle, PresetCategory, PresetSource};
use crate::error::PresetError;

/// Maximum inheritance depth to prevent runaway chains.
const MAX_INHERITANCE_DEPTH: usize = 10;

/// Metadata fields an ancestor never passes on to its children.
const SKIP_INHERIT_FIELDS: &[&str] = &[
    "inherits",
    "name",
    "type",
    "from",
    "instantiation",
    "setting_id",
    "filament_id",
    "description",
    "include",
];

/// One preset file before inheritance is resolved.
#[derive(Debug, Clone)]
struct RawRecord {
    vendor: String,
    name: String,
    fields: Map<String, Value>,
}

/// Load every vendor library under `<resources>/profiles`.
///
/// Unreadable or malformed files, and presets whose inheritance cannot be
/// resolved, are skipped with a warning.
///
/// # Errors
///
/// Returns [`PresetError::LibraryMissing`] if `profiles/` does not exist and
/// [`PresetError::Io`] if it cannot be listed.
pub fn load_library(resources: &Path) -> Result<PresetBundle, PresetError> {
    let profiles = resources.join("profiles");
    if !profiles.is_dir() {
        return Err(PresetError::LibraryMissing { path: profiles });
    }

    let mut bundle = PresetBundle::new();
    let mut records: Vec<(PresetCategory, RawRecord)> = Vec::new();

    for vendor_dir in sorted_entries(&profiles)?
        .into_iter()
        .filter(|p| p.is_dir())
    {
        let vendor = vendor_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        for category in PresetCategory::ALL {
            let dir = vendor_dir.join(category.dir_name());
            if !dir.is_dir() {
                continue;
            }
            let mut files = Vec::new();
            collect_json_files(&dir, &mut files)?;
            for file in files {
                let Some(fields) = read_record(&file) else {
                    continue;
                };
                if fields.get("type").and_then(Value::as_str) == Some("machine_model") {
                    register_model(&mut bundle, &fields);
                    continue;
                }
                let Some(name) = fields.get("name").and_then(Value::as_str) else {
                    tracing::warn!("skipping preset without a name: {}", file.display());
                    continue;
                };
                records.push((
                    category,
                    RawRecord {
                        vendor: vendor.clone(),
                        name: name.to_string(),
                        fields,
                    },
                ));
            }
        }
    }

    for category in PresetCategory::ALL {
        let in_category: Vec<&RawRecord> = records
            .iter()
            .filter(|(c, _)| *c == category)
            .map(|(_, r)| r)
            .collect();
        for record in &in_category {
            match resolve_inheritance(category, record, &in_category) {
                Ok(config) => bundle.collection_mut(category).insert_or_replace(Preset::new(
                    category,
                    &record.name,
                    &record.vendor,
                    config,
                    PresetSource::System,
                )),
                Err(e) => tracing::warn!("skipping {category} preset '{}': {e}", record.name),
            }
        }
    }

    tracing::debug!(
        "loaded {} printers, {} filaments, {} processes, {} models",
        bundle.printers.len(),
        bundle.filaments.len(),
        bundle.processes.len(),
        bundle.model_count()
    );
    Ok(bundle)
}

/// Flatten the `inherits` chain of `record`: ancestors first, the record's
/// own fields last.
///
/// Parents are looked up among `records` of the same vendor first, then of
/// any vendor. The string `"nil"` (or a list of only `"nil"`) keeps the
/// inherited value.
fn resolve_inheritance(
    category: PresetCategory,
    record: &RawRecord,
    records: &[&RawRecord],
) -> Result<Map<String, Value>, PresetError> {
    let circular = || PresetError::CircularInheritance {
        category,
        name: record.name.clone(),
    };

    let mut chain: Vec<&RawRecord> = vec![record];
    let mut visited: HashSet<&str> = HashSet::from([record.name.as_str()]);
    let mut current = record;

    while let Some(parent_name) = current
        .fields
        .get("inherits")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        if !visited.insert(parent_name) {
            return Err(circular());
        }
        if chain.len() >= MAX_INHERITANCE_DEPTH {
            return Err(PresetError::InheritanceTooDeep {
                category,
                name: record.name.clone(),
                limit: MAX_INHERITANCE_DEPTH,
            });
        }
        let parent = records
            .iter()
            .find(|r| r.name == parent_name && r.vendor == current.vendor)
            .or_else(|| records.iter().find(|r| r.name == parent_name))
            .copied()
            .ok_or_else(|| PresetError::NotFound {
                category,
                name: parent_name.to_string(),
            })?;
        chain.push(parent);
        current = parent;
    }

    let mut resolved = Map::new();
    let (leaf, ancestors) = chain.split_first().ok_or_else(circular)?;
    for ancestor in ancestors.iter().rev() {
        for (key, value) in &ancestor.fields {
            if SKIP_INHERIT_FIELDS.contains(&key.as_str()) || is_nil_value(value) {
                continue;
            }
            resolved.insert(key.clone(), value.clone());
        }
    }
    for (key, value) in &leaf.fields {
        if !is_nil_value(value) {
            resolved.insert(key.clone(), value.clone());
        }
    }
    Ok(resolved)
}

fn is_nil_value(value: &Value) -> bool {
    match value {
        Value::String(s) => s == "nil",
        Value::Array(items) => {
            !items.is_empty() && items.iter().all(|v| v.as_str() == Some("nil"))
        }
        _ => false,
    }
}

fn register_model(bundle: &mut PresetBundle, fields: &Map<String, Value>) {
    let name = fields.get("name").and_then(Value::as_str);
    let id = fields.get("model_id").and_then(Value::as_str);
    if let (Some(name), Some(id)) = (name, id) {
        bundle.register_model(id, name);
    }
}

fn read_record(path: &Path) -> Option<Map<String, Value>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            tracing::warn!("cannot read {}: {e}", path.display());
            return None;
        }
    };
    match serde_json::from_str::<Value>(&content) {
        Ok(Value::Object(map)) => Some(map),
        Ok(_) => {
            tracing::warn!("skipping {}: not a JSON object", path.display());
            None
        }
        Err(e) => {
            tracing::warn!("skipping malformed preset {}: {e}", path.display());
            None
        }
    }
}

fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>, PresetError> {
    let io_err = |source| PresetError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut entries = fs::read_dir(dir)
        .map_err(io_err)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(io_err)?;
    entries.sort();
    Ok(entries)
}

fn collect_json_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), PresetError> {
    for path in sorted_entries(dir)? {
        if path.is_dir() {
            collect_json_files(&path, out)?;
        } else if path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
        {
            out.push(path);
        }
    }
    Ok(())
}
