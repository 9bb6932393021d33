//! Preset collections: the system library plus presets embedded in projects.
//!
//! There is one [`PresetCollection`] per [`PresetCategory`], bundled in a
//! [`PresetBundle`]. At most one preset per category is selected; the
//! bundle combines the selected presets with the engine defaults into the
//! configuration the resolver starts from.
pub mod loader;
pub mod selector;
pub mod strategies;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::{ConfigDictionary, ConfigValue};

pub use selector::{AppliedPresets, MatchKind, PresetSelector, Selection, UserPresetNames};
pub use strategies::{NamingStrategy, SelectionHints, StrategyInput, StrategySet};

/// Preset category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresetCategory {
    /// Printer (machine) presets.
    Printer,
    /// Filament presets.
    Filament,
    /// Process (print) presets.
    Process,
}

impl PresetCategory {
    /// Every category, in selection order.
    pub const ALL: [Self; 3] = [Self::Printer, Self::Filament, Self::Process];

    /// Directory holding this category inside a vendor profile directory.
    #[must_use]
    pub const fn dir_name(self) -> &'static str {
        match self {
            Self::Printer => "machine",
            Self::Filament => "filament",
            Self::Process => "process",
        }
    }

    /// Placeholder name the engine uses when nothing was chosen.
    #[must_use]
    pub const fn default_name(self) -> &'static str {
        match self {
            Self::Printer => "Default Printer",
            Self::Filament => "Default Filament",
            Self::Process => "Default Setting",
        }
    }

    /// Configuration key recording the selected preset name.
    #[must_use]
    pub const fn settings_id_key(self) -> &'static str {
        match self {
            Self::Printer => "printer_settings_id",
            Self::Filament => "filament_settings_id",
            Self::Process => "print_settings_id",
        }
    }
}

impl fmt::Display for PresetCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Printer => "printer",
            Self::Filament => "filament",
            Self::Process => "process",
        })
    }
}

impl FromStr for PresetCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "printer" | "machine" => Ok(Self::Printer),
            "filament" => Ok(Self::Filament),
            "process" | "print" => Ok(Self::Process),
            other => Err(format!("unknown preset category '{other}'")),
        }
    }
}

/// Where a preset came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresetSource {
    /// The vendor library under the resources directory.
    System,
    /// Embedded in the loaded project file.
    Project,
}

/// Names of the presets a project was saved with, first occurrence per
/// category.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmbeddedPresetNames {
    /// Printer preset name.
    pub printer: Option<String>,
    /// Filament preset name.
    pub filament: Option<String>,
    /// Process preset name.
    pub process: Option<String>,
}

impl EmbeddedPresetNames {
    /// Name recorded for `category`.
    #[must_use]
    pub fn get(&self, category: PresetCategory) -> Option<&str> {
        match category {
            PresetCategory::Printer => self.printer.as_deref(),
            PresetCategory::Filament => self.filament.as_deref(),
            PresetCategory::Process => self.process.as_deref(),
        }
    }

    /// Name recorded for `category`, unless empty or the engine placeholder.
    #[must_use]
    pub fn explicit(&self, category: PresetCategory) -> Option<&str> {
        self.get(category)
            .map(str::trim)
            .filter(|name| !name.is_empty() && *name != category.default_name())
    }

    /// Return `true` if every category names a non-default preset.
    #[must_use]
    pub fn all_explicit(&self) -> bool {
        PresetCategory::ALL
            .into_iter()
            .all(|category| self.explicit(category).is_some())
    }

    fn slot_mut(&mut self, category: PresetCategory) -> &mut Option<String> {
        match category {
            PresetCategory::Printer => &mut self.printer,
            PresetCategory::Filament => &mut self.filament,
            PresetCategory::Process => &mut self.process,
        }
    }

    /// Record `name` for `category` unless one is already recorded.
    ///
    /// Returns the name already kept when `name` was ignored.
    pub fn record_first(&mut self, category: PresetCategory, name: &str) -> Option<&str> {
        let slot = self.slot_mut(category);
        if slot.is_none() {
            *slot = Some(name.to_string());
            return None;
        }
        slot.as_deref()
    }
}

/// A named configuration fragment.
#[derive(Debug, Clone, PartialEq)]
pub struct Preset {
    /// Unique name within the category.
    pub name: String,
    /// Vendor directory the preset was loaded from (empty for project presets).
    pub vendor: String,
    /// Fully inherited configuration fragment.
    pub config: Map<String, Value>,
    /// Parent preset name, as declared.
    pub inherits: Option<String>,
    /// Printers this preset may be used with; empty means any.
    pub compatible_printers: Vec<String>,
    /// Declared printer model (printers only).
    pub printer_model: Option<String>,
    /// Declared nozzle variant (printers only).
    pub printer_variant: Option<String>,
    /// Name without the ` @<tag> <model>` suffix (system filaments and processes).
    pub alias: Option<String>,
    /// `false` for abstract base presets that only exist to be inherited from.
    pub instantiable: bool,
    /// Library or project.
    pub source: PresetSource,
}

impl Preset {
    /// Build a preset from its (already inherited) configuration fragment.
    #[must_use]
    pub fn new(
        category: PresetCategory,
        name: &str,
        vendor: &str,
        config: Map<String, Value>,
        source: PresetSource,
    ) -> Self {
        let text = |key: &str| {
            config
                .get(key)
                .and_then(json_text)
                .filter(|s| !s.is_empty())
        };
        let alias = match (category, source) {
            (PresetCategory::Filament | PresetCategory::Process, PresetSource::System) => name
                .split_once(" @")
                .map(|(base, _)| base.trim().to_string())
                .filter(|base| !base.is_empty()),
            _ => None,
        };
        Self {
            name: name.to_string(),
            vendor: vendor.to_string(),
            inherits: text("inherits"),
            compatible_printers: config
                .get("compatible_printers")
                .map(json_string_list)
                .unwrap_or_default(),
            printer_model: text("printer_model"),
            printer_variant: text("printer_variant"),
            alias,
            instantiable: text("instantiation").is_none_or(|v| v != "false"),
            source,
            config,
        }
    }

    /// Return `true` if the preset may be used with `printer`.
    #[must_use]
    pub fn is_compatible_with(&self, printer: &str) -> bool {
        self.compatible_printers.is_empty() || self.compatible_printers.iter().any(|p| p == printer)
    }
}

/// All presets of one category and the current selection.
#[derive(Debug, Clone)]
pub struct PresetCollection {
    category: PresetCategory,
    presets: Vec<Preset>,
    selected: Option<usize>,
}

impl PresetCollection {
    /// Create an empty collection.
    #[must_use]
    pub const fn new(category: PresetCategory) -> Self {
        Self {
            category,
            presets: Vec::new(),
            selected: None,
        }
    }

    /// Category of the presets held.
    #[must_use]
    pub const fn category(&self) -> PresetCategory {
        self.category
    }

    /// Add `preset`, replacing any preset with the same name.
    pub fn insert_or_replace(&mut self, preset: Preset) {
        match self.presets.iter_mut().find(|p| p.name == preset.name) {
            Some(existing) => *existing = preset,
            None => self.presets.push(preset),
        }
    }

    /// Preset named exactly `name`.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&Preset> {
        self.presets.iter().find(|p| p.name == name)
    }

    /// First instantiable preset whose alias is `alias` and that satisfies `filter`.
    pub fn find_by_alias(&self, alias: &str, filter: impl Fn(&Preset) -> bool) -> Option<&Preset> {
        self.presets
            .iter()
            .find(|p| p.instantiable && p.alias.as_deref() == Some(alias) && filter(p))
    }

    /// Instantiable presets in load order.
    pub fn visible(&self) -> impl Iterator<Item = &Preset> {
        self.presets.iter().filter(|p| p.instantiable)
    }

    /// Names of instantiable presets in load order.
    #[must_use]
    pub fn visible_names(&self) -> Vec<&str> {
        self.visible().map(|p| p.name.as_str()).collect()
    }

    /// Select the instantiable preset named `name`.
    ///
    /// Returns `false` (and keeps the previous selection) if there is none.
    pub fn select(&mut self, name: &str) -> bool {
        match self
            .presets
            .iter()
            .position(|p| p.name == name && p.instantiable)
        {
            Some(index) => {
                self.selected = Some(index);
                true
            }
            None => false,
        }
    }

    /// The selected preset.
    #[must_use]
    pub fn selected(&self) -> Option<&Preset> {
        self.selected.and_then(|i| self.presets.get(i))
    }

    /// Drop the selection.
    pub const fn clear_selection(&mut self) {
        self.selected = None;
    }

    /// Number of presets, including hidden ones.
    #[must_use]
    pub fn len(&self) -> usize {
        self.presets.len()
    }

    /// Return `true` if the collection is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }
}

/// The three preset collections plus the vendor model table.
#[derive(Debug, Clone)]
pub struct PresetBundle {
    /// Printer presets.
    pub printers: PresetCollection,
    /// Filament presets.
    pub filaments: PresetCollection,
    /// Process presets.
    pub processes: PresetCollection,
    models: BTreeMap<String, String>,
}

impl Default for PresetBundle {
    fn default() -> Self {
        Self {
            printers: PresetCollection::new(PresetCategory::Printer),
            filaments: PresetCollection::new(PresetCategory::Filament),
            processes: PresetCollection::new(PresetCategory::Process),
            models: BTreeMap::new(),
        }
    }
}

impl PresetBundle {
    /// Create an empty bundle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Collection for `category`.
    #[must_use]
    pub const fn collection(&self, category: PresetCategory) -> &PresetCollection {
        match category {
            PresetCategory::Printer => &self.printers,
            PresetCategory::Filament => &self.filaments,
            PresetCategory::Process => &self.processes,
        }
    }

    /// Mutable collection for `category`.
    pub const fn collection_mut(&mut self, category: PresetCategory) -> &mut PresetCollection {
        match category {
            PresetCategory::Printer => &mut self.printers,
            PresetCategory::Filament => &mut self.filaments,
            PresetCategory::Process => &mut self.processes,
        }
    }

    /// Record a vendor model (`model_id` to model name).
    pub fn register_model(&mut self, model_id: &str, model_name: &str) {
        self.models
            .insert(model_id.to_string(), model_name.to_string());
    }

    /// Model name for a vendor model id.
    #[must_use]
    pub fn model_name(&self, model_id: &str) -> Option<&str> {
        self.models.get(model_id).map(String::as_str)
    }

    /// Number of vendor models known.
    #[must_use]
    pub fn model_count(&self) -> usize {
        self.models.len()
    }

    /// The selected printer; the engine placeholder counts as none.
    #[must_use]
    pub fn selected_printer(&self) -> Option<&Preset> {
        self.printers
            .selected()
            .filter(|p| p.name != PresetCategory::Printer.default_name())
    }

    /// Register a preset embedded in a project.
    ///
    /// The fragment is layered on top of its parent's configuration when the
    /// parent exists in the library. A project preset replaces a library
    /// preset of the same name.
    pub fn register_project_preset(
        &mut self,
        category: PresetCategory,
        name: &str,
        inherits: Option<&str>,
        fragment: &Map<String, Value>,
    ) {
        let collection = self.collection_mut(category);
        let mut config = inherits
            .filter(|parent| !parent.is_empty())
            .and_then(|parent| collection.find(parent))
            .map(|parent| parent.config.clone())
            .unwrap_or_default();
        for (key, value) in fragment {
            config.insert(key.clone(), value.clone());
        }
        if let Some(parent) = inherits {
            config.insert("inherits".to_string(), Value::String(parent.to_string()));
        }
        config.remove("instantiation");
        collection.insert_or_replace(Preset::new(
            category,
            name,
            "",
            config,
            PresetSource::Project,
        ));
    }

    /// Engine defaults overlaid with the selected printer, process and
    /// filament presets, in that order.
    ///
    /// Preset keys the schema does not know (metadata such as `inherits`)
    /// are skipped. The `*_settings_id` keys record the selected names.
    #[must_use]
    pub fn full_config(&self, defaults: &ConfigDictionary) -> ConfigDictionary {
        let mut config = defaults.clone();
        for category in [
            PresetCategory::Printer,
            PresetCategory::Process,
            PresetCategory::Filament,
        ] {
            let Some(preset) = self.collection(category).selected() else {
                continue;
            };
            let report = config.apply_fragment(&preset.config);
            tracing::debug!(
                "{category} preset '{}': {} keys applied, {} unknown, {} invalid",
                preset.name,
                report.applied,
                report.unknown.len(),
                report.invalid.len()
            );
            let key = category.settings_id_key();
            if config.schema().contains(key) {
                // A string-list id (filaments) gets the name as its only element.
                let value = match config.schema().kind(key) {
                    Some(kind) if kind.is_list() => {
                        ConfigValue::List(vec![ConfigValue::String(preset.name.clone())])
                    }
                    _ => ConfigValue::String(preset.name.clone()),
                };
                if let Err(e) = config.set(key, value) {
                    tracing::debug!("cannot record {key}: {e}");
                }
            }
        }
        config
    }

    /// Drop every preset, model and selection.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// String content of a JSON scalar, or of the first element of an array.
fn json_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(items) => items.first().and_then(json_text),
        Value::Null | Value::Object(_) => None,
    }
}

/// A list of names stored either as a JSON array or a `;`-separated string.
fn json_string_list(value: &Value) -> Vec<String> {
    let items: Vec<String> = match value {
        Value::Array(items) => items.iter().filter_map(json_text).collect(),
        Value::String(s) => s.split([';', '\n']).map(str::to_string).collect(),
        _ => Vec::new(),
    };
    items
        .into_iter()
        .map(|s| s.trim().trim_matches('"').trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;

    /// Build a system preset from a JSON object literal.
    pub(crate) fn preset(category: PresetCategory, name: &str, config: &Value) -> Preset {
        Preset::new(
            category,
            name,
            "BBL",
            config.as_object().cloned().unwrap_or_default(),
            PresetSource::System,
        )
    }

    /// A small library: two printers, filaments and processes for the A1.
    pub(crate) fn sample_bundle() -> PresetBundle {
        let mut bundle = PresetBundle::new();
        bundle.register_model("N2S", "Bambu Lab A1");
        bundle.register_model("BL-P001", "Bambu Lab X1 Carbon");
        bundle.printers.insert_or_replace(preset(
            PresetCategory::Printer,
            "Bambu Lab A1 0.4 nozzle",
            &json!({"printer_model": "Bambu Lab A1", "printer_variant": "0.4", "nozzle_diameter": ["0.4"]}),
        ));
        bundle.printers.insert_or_replace(preset(
            PresetCategory::Printer,
            "Bambu Lab X1 Carbon 0.4 nozzle",
            &json!({"printer_model": "Bambu Lab X1 Carbon", "printer_variant": "0.4"}),
        ));
        bundle.printers.insert_or_replace(preset(
            PresetCategory::Printer,
            "fdm_machine_common",
            &json!({"instantiation": "false"}),
        ));
        bundle.filaments.insert_or_replace(preset(
            PresetCategory::Filament,
            "Bambu PLA Basic @BBL A1",
            &json!({"compatible_printers": ["Bambu Lab A1 0.4 nozzle"], "filament_type": ["PLA"]}),
        ));
        bundle.filaments.insert_or_replace(preset(
            PresetCategory::Filament,
            "Bambu PLA Basic @BBL X1C",
            &json!({"compatible_printers": ["Bambu Lab X1 Carbon 0.4 nozzle"]}),
        ));
        bundle.filaments.insert_or_replace(preset(
            PresetCategory::Filament,
            "Generic PETG",
            &json!({"filament_type": ["PETG"]}),
        ));
        bundle.processes.insert_or_replace(preset(
            PresetCategory::Process,
            "0.20mm Standard @BBL A1",
            &json!({"compatible_printers": ["Bambu Lab A1 0.4 nozzle"], "layer_height": "0.2"}),
        ));
        bundle.processes.insert_or_replace(preset(
            PresetCategory::Process,
            "0.16mm Optimal @BBL A1",
            &json!({"compatible_printers": ["Bambu Lab A1 0.4 nozzle"], "layer_height": "0.16"}),
        ));
        bundle
    }

    #[test]
    fn category_names_round_trip() {
        for category in PresetCategory::ALL {
            assert_eq!(category.to_string().parse::<PresetCategory>(), Ok(category));
        }
        assert_eq!("machine".parse::<PresetCategory>(), Ok(PresetCategory::Printer));
        assert!("nozzle".parse::<PresetCategory>().is_err());
    }

    #[test]
    fn preset_alias_strips_vendor_suffix() {
        let p = preset(PresetCategory::Filament, "Bambu PLA Basic @BBL A1", &json!({}));
        assert_eq!(p.alias.as_deref(), Some("Bambu PLA Basic"));
        let printer = preset(PresetCategory::Printer, "Bambu Lab A1 0.4 nozzle", &json!({}));
        assert_eq!(printer.alias, None, "printers have no alias");
    }

    #[test]
    fn preset_reads_metadata_fields() {
        let p = preset(
            PresetCategory::Process,
            "0.20mm Standard @BBL A1",
            &json!({
                "inherits": "fdm_process_common",
                "compatible_printers": "Bambu Lab A1 0.4 nozzle; Bambu Lab A1 0.2 nozzle",
                "instantiation": "false",
            }),
        );
        assert_eq!(p.inherits.as_deref(), Some("fdm_process_common"));
        assert_eq!(p.compatible_printers.len(), 2);
        assert!(!p.instantiable);
        assert!(p.is_compatible_with("Bambu Lab A1 0.2 nozzle"));
        assert!(!p.is_compatible_with("Bambu Lab P1S 0.4 nozzle"));
    }

    #[test]
    fn empty_compatible_list_means_any_printer() {
        let p = preset(PresetCategory::Filament, "Generic PETG", &json!({}));
        assert!(p.is_compatible_with("anything"));
    }

    #[test]
    fn collection_select_ignores_hidden_presets() {
        let mut bundle = sample_bundle();
        assert!(!bundle.printers.select("fdm_machine_common"));
        assert!(bundle.printers.select("Bambu Lab A1 0.4 nozzle"));
        assert!(!bundle.printers.select("missing"));
        assert_eq!(
            bundle.printers.selected().map(|p| p.name.as_str()),
            Some("Bambu Lab A1 0.4 nozzle"),
            "failed select keeps the previous selection"
        );
        assert_eq!(bundle.printers.visible_names().len(), 2);
    }

    #[test]
    fn default_printer_counts_as_none() {
        let mut bundle = sample_bundle();
        bundle.printers.insert_or_replace(preset(
            PresetCategory::Printer,
            "Default Printer",
            &json!({}),
        ));
        assert!(bundle.printers.select("Default Printer"));
        assert!(bundle.selected_printer().is_none());
    }

    #[test]
    fn embedded_names_record_first_occurrence() {
        let mut names = EmbeddedPresetNames::default();
        assert_eq!(names.record_first(PresetCategory::Filament, "A"), None);
        assert_eq!(names.record_first(PresetCategory::Filament, "B"), Some("A"));
        assert_eq!(names.filament.as_deref(), Some("A"));
    }

    #[test]
    fn all_explicit_rejects_placeholders() {
        let mut names = EmbeddedPresetNames {
            printer: Some("Bambu Lab A1 0.4 nozzle".into()),
            filament: Some("Bambu PLA Basic @BBL A1".into()),
            process: Some("Default Setting".into()),
        };
        assert!(!names.all_explicit());
        names.process = Some("0.20mm Standard @BBL A1".into());
        assert!(names.all_explicit());
        names.filament = Some("  ".into());
        assert!(!names.all_explicit());
    }

    #[test]
    fn project_preset_layers_on_parent() {
        let mut bundle = sample_bundle();
        let fragment = json!({"layer_height": "0.12"});
        bundle.register_project_preset(
            PresetCategory::Process,
            "0.20mm Standard @BBL A1 - edited",
            Some("0.20mm Standard @BBL A1"),
            fragment.as_object().unwrap(),
        );
        let p = bundle.processes.find("0.20mm Standard @BBL A1 - edited").unwrap();
        assert_eq!(p.source, PresetSource::Project);
        assert_eq!(p.config["layer_height"], json!("0.12"));
        assert_eq!(p.compatible_printers, vec!["Bambu Lab A1 0.4 nozzle".to_string()]);
        assert!(p.alias.is_none());
    }

    #[test]
    fn full_config_layers_printer_process_filament() {
        let defaults = json!({
            "layer_height": 0.3,
            "nozzle_diameter": [0.6],
            "filament_type": ["ABS"],
            "print_settings_id": "",
            "filament_settings_id": [""],
        });
        let defaults = ConfigDictionary::from_defaults(defaults.as_object().unwrap());
        let mut bundle = sample_bundle();
        assert!(bundle.printers.select("Bambu Lab A1 0.4 nozzle"));
        assert!(bundle.processes.select("0.20mm Standard @BBL A1"));
        assert!(bundle.filaments.select("Bambu PLA Basic @BBL A1"));

        let config = bundle.full_config(&defaults);
        assert_eq!(config.get("layer_height"), Some(&ConfigValue::Float(0.2)));
        assert_eq!(
            config.get("nozzle_diameter"),
            Some(&ConfigValue::List(vec![ConfigValue::Float(0.4)]))
        );
        assert_eq!(config.get_str("filament_type"), Some("PLA"));
        assert_eq!(config.get_str("print_settings_id"), Some("0.20mm Standard @BBL A1"));
        assert_eq!(config.get_str("filament_settings_id"), Some("Bambu PLA Basic @BBL A1"));
        assert_eq!(defaults.get("layer_height"), Some(&ConfigValue::Float(0.3)));
    }

    #[test]
    fn reset_clears_everything() {
        let mut bundle = sample_bundle();
        bundle.reset();
        assert!(bundle.printers.is_empty());
        assert_eq!(bundle.model_count(), 0);
    }
}
