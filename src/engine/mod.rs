//! The external slicing engine and the state it is driven with.
//!
//! The engine does everything geometric (mesh loading, slicing, G-code
//! output); this crate only decides what configuration and plate origin it
//! is handed. [`Engine`] is the contract, [`ProcessEngine`] the shipped
//! implementation, and [`EngineContext`] owns an engine together with the
//! preset library for the lifetime of a session.
mod context;
mod process;

pub use context::{EngineCheckout, EngineContext, EngineHandle};
pub use process::ProcessEngine;

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::ConfigDictionary;
use crate::error::EngineError;
use crate::plate::{PlacementTransform, Point2};
use crate::presets::PresetCategory;

/// Operations delegated to the slicing engine.
///
/// Calls are made in order: `initialize`, `load_model`, then any number of
/// `apply` / `set_plate_origin` before `process` and `export`.
#[cfg_attr(test, mockall::automock)]
pub trait Engine: Send + fmt::Debug {
    /// Start the engine against a resources directory and return its
    /// default configuration, which also defines the schema.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Delegation`] if the engine cannot start.
    fn initialize(&mut self, resources: &Path) -> Result<ConfigDictionary, EngineError>;

    /// Load a model or project file; `plate` is the 1-based plate to work on.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Delegation`] with the engine's message.
    fn load_model(&mut self, path: &Path, plate: Option<usize>)
    -> Result<LoadedProject, EngineError>;

    /// Describe the loaded model.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NoModelLoaded`] before `load_model`.
    fn model_info(&self) -> Result<ModelInfo, EngineError>;

    /// Hand the effective configuration to the engine.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Delegation`] if the engine rejects it.
    fn apply(&mut self, config: &ConfigDictionary) -> Result<(), EngineError>;

    /// Set the offset subtracted from model coordinates.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NoModelLoaded`] before `load_model`.
    fn set_plate_origin(&mut self, origin: PlacementTransform) -> Result<(), EngineError>;

    /// Slice the loaded model with the applied configuration.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Delegation`] with the engine's message verbatim.
    fn process(&mut self) -> Result<(), EngineError>;

    /// Write the sliced result to `output`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Delegation`] with the engine's message verbatim.
    fn export(&mut self, output: &Path) -> Result<(), EngineError>;

    /// Release engine resources. Safe to call more than once.
    fn shutdown(&mut self);
}

/// A preset embedded in a project file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddedPreset {
    /// Category of the preset.
    pub category: PresetCategory,
    /// Name the preset was saved under.
    pub name: String,
    /// Library preset it was derived from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inherits: Option<String>,
    /// Raw configuration fragment.
    #[serde(default)]
    pub config: Map<String, Value>,
}

/// What a project records about one plate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlateRecord {
    /// Vendor printer model id (e.g. `N2S`).
    pub printer_model_id: Option<String>,
    /// Nozzle diameters, one per extruder.
    pub nozzle_diameters: Vec<String>,
}

/// Everything the engine reports after loading a model or project.
///
/// Plain meshes (STL, OBJ) come back with an empty configuration and no
/// presets or plates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadedProject {
    /// Project configuration, as stored in the file.
    pub config: Map<String, Value>,
    /// Presets embedded in the project, in file order.
    pub presets: Vec<EmbeddedPreset>,
    /// Plates of the project.
    pub plates: Vec<PlateRecord>,
    /// Selected plate, 0-based.
    pub selected_plate: Option<usize>,
    /// Offsets of the object instances on the selected plate.
    pub instance_offsets: Vec<Point2>,
    /// Wipe tower position recorded for the selected plate.
    pub wipe_tower: Option<Point2>,
}

impl LoadedProject {
    /// Return `true` if the file carried project data.
    #[must_use]
    pub fn is_project(&self) -> bool {
        !self.config.is_empty() || !self.presets.is_empty() || !self.plates.is_empty()
    }
}

/// Model statistics reported by the engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelInfo {
    /// File the model was loaded from.
    pub filename: String,
    /// Number of objects.
    pub object_count: usize,
    /// Number of triangles over all objects.
    pub triangle_count: usize,
    /// Volume in cubic millimetres.
    pub volume: f64,
    /// Human-readable bounding box.
    pub bounding_box: String,
    /// Whether the engine considers the model sliceable.
    pub is_valid: bool,
    /// Non-fatal findings.
    pub warnings: Vec<String>,
    /// Fatal findings.
    pub errors: Vec<String>,
}

/// Outcome of a request, as reported to callers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationResult {
    /// Whether the request succeeded.
    pub success: bool,
    /// Summary message.
    pub message: String,
    /// Underlying cause, if any.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub error_details: String,
}

impl OperationResult {
    /// A successful result.
    #[must_use]
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            error_details: String::new(),
        }
    }

    /// A failed result.
    #[must_use]
    pub fn failure(message: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            error_details: details.into(),
        }
    }
}

impl From<&crate::error::SlicerError> for OperationResult {
    fn from(err: &crate::error::SlicerError) -> Self {
        Self::failure(err.message(), err.detail().unwrap_or_default())
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::error::SlicerError;
    use serde_json::json;

    #[test]
    fn loaded_project_parses_partial_json() {
        let project: LoadedProject = serde_json::from_value(json!({
            "config": {"layer_height": "0.2"},
            "presets": [{"category": "process", "name": "0.20mm Standard @BBL A1 - edited"}],
            "instance_offsets": [{"x": 130.0, "y": -110.0}],
        }))
        .unwrap();
        assert!(project.is_project());
        assert_eq!(project.presets[0].category, PresetCategory::Process);
        assert!(project.presets[0].inherits.is_none());
        assert!(project.plates.is_empty());
        assert_eq!(project.instance_offsets, vec![Point2::new(130.0, -110.0)]);
    }

    #[test]
    fn plain_mesh_is_not_a_project() {
        assert!(!LoadedProject::default().is_project());
    }

    #[test]
    fn operation_result_from_error_keeps_detail() {
        let err = SlicerError::from(EngineError::Delegation {
            operation: "export".into(),
            message: "disk full".into(),
            detail: Some("ENOSPC".into()),
        });
        let result = OperationResult::from(&err);
        assert!(!result.success);
        assert_eq!(result.message, "export failed: disk full");
        assert_eq!(result.error_details, "ENOSPC");
    }
}
