//! Turn a loaded project into override sets and preset selection hints.
//!
//! Two override layers come out of a project: the project-level overrides
//! (every schema key the project changed relative to the engine defaults)
//! and the print deltas (what the user edited in the process preset relative
//! to the library preset it was derived from). Extraction is read-only; the
//! presets embedded in the project are registered separately with
//! [`register_embedded_presets`].
use serde_json::{Map, Value};

use crate::config::{ConfigDictionary, OverrideSet};
use crate::engine::{EmbeddedPreset, LoadedProject};
use crate::error::ProjectError;
use crate::plate::PlateMetadata;
use crate::presets::{EmbeddedPresetNames, PresetBundle, PresetCategory, SelectionHints};

/// Wipe tower position keys.
const WIPE_TOWER_X_KEY: &str = "wipe_tower_x";
const WIPE_TOWER_Y_KEY: &str = "wipe_tower_y";

/// Everything extracted from one project.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectExtraction {
    /// Keys the project changed relative to the engine defaults.
    pub project_overrides: OverrideSet,
    /// Keys of the edited process preset that differ from its base preset.
    pub print_overrides: OverrideSet,
    /// Evidence for preset selection.
    pub hints: SelectionHints,
    /// Inconsistencies that were resolved (first occurrence wins).
    pub warnings: Vec<ProjectError>,
}

/// Extracts override layers and selection hints from a [`LoadedProject`].
#[derive(Debug, Default, Clone, Copy)]
pub struct ProjectOverrideExtractor;

impl ProjectOverrideExtractor {
    /// Extract from `project`, comparing against the engine `baseline` and
    /// the library `presets`.
    #[must_use]
    pub fn extract(
        &self,
        project: &LoadedProject,
        baseline: &ConfigDictionary,
        presets: &PresetBundle,
    ) -> ProjectExtraction {
        let mut warnings = Vec::new();
        let mut hints = hints_from_config(&project.config);
        for preset in &project.presets {
            if let Some(kept) = hints.embedded.record_first(preset.category, &preset.name) {
                let warning = ProjectError::InconsistentProjectData(format!(
                    "project embeds more than one {} preset; keeping '{kept}', ignoring '{}'",
                    preset.category, preset.name
                ));
                tracing::warn!("{warning}");
                warnings.push(warning);
            }
        }
        hints.plate = plate_metadata(project);

        ProjectExtraction {
            project_overrides: project_overrides(project, baseline),
            print_overrides: print_overrides(project, baseline, presets),
            hints,
            warnings,
        }
    }
}

/// Register the presets embedded in `project` so they can be selected by name.
///
/// Each preset is layered on the library preset it inherits from.
pub fn register_embedded_presets(bundle: &mut PresetBundle, project: &LoadedProject) {
    for EmbeddedPreset {
        category,
        name,
        inherits,
        config,
    } in &project.presets
    {
        bundle.register_project_preset(*category, name, inherits.as_deref(), config);
        tracing::debug!("registered project {category} preset '{name}'");
    }
}

/// Keys that name presets rather than configure the print.
fn is_preset_metadata(key: &str) -> bool {
    PresetCategory::ALL
        .iter()
        .any(|category| category.settings_id_key() == key)
}

fn project_overrides(project: &LoadedProject, baseline: &ConfigDictionary) -> OverrideSet {
    let mut overrides: OverrideSet = project
        .config
        .iter()
        .filter(|(key, _)| baseline.schema().contains(key) && !is_preset_metadata(key))
        .filter_map(|(key, raw)| match baseline.coerce(key, raw) {
            Ok(value) => Some((key.clone(), value)),
            Err(e) => {
                tracing::debug!("ignoring project value: {e}");
                None
            }
        })
        .filter(|(key, value)| baseline.get(key) != Some(value))
        .collect();

    if let Some(tower) = project.wipe_tower {
        for (key, coordinate) in [(WIPE_TOWER_X_KEY, tower.x), (WIPE_TOWER_Y_KEY, tower.y)] {
            match baseline.coerce(key, &Value::from(coordinate)) {
                Ok(value) => overrides.insert(key, value),
                Err(e) => tracing::debug!("ignoring wipe tower position: {e}"),
            }
        }
    }
    overrides
}

/// Diff the edited process configuration against the preset it came from.
fn print_overrides(
    project: &LoadedProject,
    baseline: &ConfigDictionary,
    presets: &PresetBundle,
) -> OverrideSet {
    let edited = project
        .presets
        .iter()
        .find(|p| p.category == PresetCategory::Process);

    let base_name = edited
        .and_then(|p| p.inherits.as_deref().filter(|s| !s.trim().is_empty()))
        .or_else(|| edited.map(|p| p.name.as_str()))
        .or_else(|| {
            project
                .config
                .get(PresetCategory::Process.settings_id_key())
                .and_then(Value::as_str)
        })
        .map(str::trim)
        .filter(|name| !name.is_empty());
    let Some(base_name) = base_name else {
        return OverrideSet::new();
    };
    let Some(base) = presets.processes.find(base_name) else {
        tracing::debug!("base process preset '{base_name}' not in library; no print deltas");
        return OverrideSet::new();
    };

    let restricted: Map<String, Value>;
    let edited_config = if let Some(preset) = edited {
        &preset.config
    } else {
        restricted = project
            .config
            .iter()
            .filter(|(key, _)| base.config.contains_key(*key))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        &restricted
    };

    edited_config
        .iter()
        .filter(|(key, _)| baseline.schema().contains(key) && !is_preset_metadata(key))
        .filter_map(|(key, raw)| {
            let value = baseline.coerce(key, raw).ok()?;
            let base_value = base
                .config
                .get(key)
                .and_then(|v| baseline.coerce(key, v).ok());
            (base_value.as_ref() != Some(&value)).then(|| (key.clone(), value))
        })
        .collect()
}

/// Selection hints read from the project configuration.
fn hints_from_config(config: &Map<String, Value>) -> SelectionHints {
    let text = |key: &str| {
        config
            .get(key)
            .and_then(|v| match v {
                Value::String(s) => Some(s.as_str()),
                Value::Array(items) => items.first().and_then(Value::as_str),
                _ => None,
            })
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };
    let print_compatible_printers: Vec<String> = match config.get("print_compatible_printers") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        Some(Value::String(s)) => s.split([';', '\n']).map(str::to_string).collect(),
        _ => Vec::new(),
    };
    let mut recorded = EmbeddedPresetNames::default();
    for (category, fallback) in [
        (PresetCategory::Printer, None),
        (PresetCategory::Filament, Some("default_filament_profile")),
        (PresetCategory::Process, Some("default_print_profile")),
    ] {
        let name = text(category.settings_id_key()).or_else(|| fallback.and_then(text));
        if let Some(name) = name {
            recorded.record_first(category, &name);
        }
    }
    SelectionHints {
        recorded,
        printer_model: text("printer_model"),
        printer_variant: text("printer_variant"),
        default_print_profile: text("default_print_profile"),
        print_compatible_printers: print_compatible_printers
            .into_iter()
            .map(|s| s.trim().trim_matches('"').trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        ..SelectionHints::default()
    }
}

/// Plate metadata for the selected plate; the index is clamped to the list.
fn plate_metadata(project: &LoadedProject) -> PlateMetadata {
    let total_plates = project.plates.len();
    let selected_index = (total_plates > 0)
        .then(|| project.selected_plate.unwrap_or(0).min(total_plates - 1));
    let plate = selected_index.and_then(|i| project.plates.get(i));
    PlateMetadata {
        printer_model_id: plate
            .and_then(|p| p.printer_model_id.as_deref())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string),
        nozzle_variant: plate
            .and_then(|p| p.nozzle_diameters.first())
            .map(|d| d.trim().to_string())
            .filter(|s| !s.is_empty()),
        total_plates,
        selected_index,
    }
}
