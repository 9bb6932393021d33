// Shared helpers for integration tests.
//
// Provides an on-disk preset library in a temporary resources directory and
// a scripted engine that records what the pipeline hands it, so each
// integration test can drive a whole command without the real engine.
//
// Used by all integration test binaries that declare `mod common;`.
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use orcaslicer_cli::config::{ConfigDictionary, Settings};
use orcaslicer_cli::engine::{Engine, EngineContext, LoadedProject, ModelInfo};
use orcaslicer_cli::error::EngineError;
use orcaslicer_cli::logging::Logger;
use orcaslicer_cli::plate::PlacementTransform;
use serde_json::{Value, json};

/// Engine defaults with the keys the integration tests touch.
pub fn engine_defaults() -> ConfigDictionary {
    let defaults = json!({
        "layer_height": 0.2,
        "wall_loops": 2,
        "sparse_infill_density": "15%",
        "curr_bed_type": "High Temp Plate",
        "hot_plate_temp": [60],
        "textured_plate_temp": [60],
        "nozzle_diameter": [0.4],
        "printable_area": ["0x0", "256x0", "256x256", "0x256"],
        "print_settings_id": "",
        "printer_settings_id": "",
        "filament_settings_id": [""],
        "wipe_tower_x": [15.0],
        "wipe_tower_y": [220.0],
    });
    ConfigDictionary::from_defaults(defaults.as_object().expect("defaults are an object"))
}

fn write_record(dir: &Path, file: &str, record: &Value) {
    std::fs::create_dir_all(dir).expect("create profile dir");
    std::fs::write(dir.join(file), record.to_string()).expect("write profile");
}

/// Write a small BBL vendor library into `root/profiles`.
///
/// Creates:
/// - two printer models (A1 `N2S`, X1 Carbon `BL-P001`) and a printer each
/// - filaments for both printers, inheriting an abstract base
/// - three processes, inheriting an abstract base
pub fn setup_resources(root: &Path) {
    let vendor = root.join("profiles").join("BBL");
    let machine = vendor.join("machine");
    let filament = vendor.join("filament");
    let process = vendor.join("process");

    write_record(
        &machine,
        "a1_model.json",
        &json!({"type": "machine_model", "name": "Bambu Lab A1", "model_id": "N2S"}),
    );
    write_record(
        &machine,
        "x1c_model.json",
        &json!({"type": "machine_model", "name": "Bambu Lab X1 Carbon", "model_id": "BL-P001"}),
    );
    write_record(
        &machine,
        "fdm_machine_common.json",
        &json!({
            "type": "machine",
            "name": "fdm_machine_common",
            "instantiation": "false",
            "nozzle_diameter": ["0.4"],
            "printable_area": ["0x0", "256x0", "256x256", "0x256"],
        }),
    );
    write_record(
        &machine,
        "a1.json",
        &json!({
            "type": "machine",
            "name": "Bambu Lab A1 0.4 nozzle",
            "inherits": "fdm_machine_common",
            "printer_model": "Bambu Lab A1",
            "printer_variant": "0.4",
        }),
    );
    write_record(
        &machine,
        "x1c.json",
        &json!({
            "type": "machine",
            "name": "Bambu Lab X1 Carbon 0.4 nozzle",
            "inherits": "fdm_machine_common",
            "printer_model": "Bambu Lab X1 Carbon",
            "printer_variant": "0.4",
        }),
    );

    write_record(
        &filament,
        "fdm_filament_pla.json",
        &json!({
            "type": "filament",
            "name": "fdm_filament_pla",
            "instantiation": "false",
            "hot_plate_temp": ["55"],
        }),
    );
    write_record(
        &filament,
        "generic_pla_base.json",
        &json!({"type": "filament", "name": "Generic PLA @base", "inherits": "fdm_filament_pla"}),
    );
    write_record(
        &filament,
        "pla_a1.json",
        &json!({
            "type": "filament",
            "name": "Bambu PLA Basic @BBL A1",
            "inherits": "fdm_filament_pla",
            "compatible_printers": ["Bambu Lab A1 0.4 nozzle"],
        }),
    );
    write_record(
        &filament,
        "pla_x1c.json",
        &json!({
            "type": "filament",
            "name": "Bambu PLA Basic @BBL X1C",
            "inherits": "fdm_filament_pla",
            "compatible_printers": ["Bambu Lab X1 Carbon 0.4 nozzle"],
        }),
    );

    write_record(
        &process,
        "fdm_process_common.json",
        &json!({
            "type": "process",
            "name": "fdm_process_common",
            "instantiation": "false",
            "layer_height": "0.2",
            "wall_loops": "2",
        }),
    );
    write_record(
        &process,
        "optimal_a1.json",
        &json!({
            "type": "process",
            "name": "0.16mm Optimal @BBL A1",
            "inherits": "fdm_process_common",
            "layer_height": "0.16",
            "compatible_printers": ["Bambu Lab A1 0.4 nozzle"],
        }),
    );
    write_record(
        &process,
        "standard_a1.json",
        &json!({
            "type": "process",
            "name": "0.20mm Standard @BBL A1",
            "inherits": "fdm_process_common",
            "compatible_printers": ["Bambu Lab A1 0.4 nozzle"],
        }),
    );
    write_record(
        &process,
        "standard_x1c.json",
        &json!({
            "type": "process",
            "name": "0.20mm Standard @BBL X1C",
            "inherits": "fdm_process_common",
            "compatible_printers": ["Bambu Lab X1 Carbon 0.4 nozzle"],
        }),
    );
}

/// What the pipeline handed to a [`FakeEngine`].
#[derive(Debug, Default)]
pub struct EngineCalls {
    /// Path and plate of every `load_model` call.
    pub loaded: Vec<(PathBuf, Option<usize>)>,
    /// Configuration of the last `apply` call.
    pub applied: Option<ConfigDictionary>,
    /// Origin of every `set_plate_origin` call.
    pub origins: Vec<PlacementTransform>,
    /// Names of the configure and slice calls, in call order.
    pub sequence: Vec<&'static str>,
    /// Number of `process` calls.
    pub processed: usize,
    /// Target of every `export` call.
    pub exported: Vec<PathBuf>,
    /// Number of `shutdown` calls.
    pub shutdowns: usize,
}

/// A scripted engine that returns canned answers and records every call.
#[derive(Debug, Clone, Default)]
pub struct FakeEngine {
    /// Returned by `load_model`.
    pub project: LoadedProject,
    /// Returned by `model_info`.
    pub info: ModelInfo,
    /// When set, `process` fails with this message.
    pub process_error: Option<String>,
    /// Calls recorded so far.
    pub calls: Arc<Mutex<EngineCalls>>,
}

impl FakeEngine {
    /// An engine that loads `project`.
    pub fn with_project(project: LoadedProject) -> Self {
        Self {
            project,
            ..Self::default()
        }
    }

    /// Shared view of the recorded calls; stays valid after the engine is
    /// boxed into a session.
    pub fn calls(&self) -> Arc<Mutex<EngineCalls>> {
        Arc::clone(&self.calls)
    }

    fn record(&self) -> MutexGuard<'_, EngineCalls> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Engine for FakeEngine {
    fn initialize(&mut self, _resources: &Path) -> Result<ConfigDictionary, EngineError> {
        Ok(engine_defaults())
    }

    fn load_model(
        &mut self,
        path: &Path,
        plate: Option<usize>,
    ) -> Result<LoadedProject, EngineError> {
        self.record().loaded.push((path.to_path_buf(), plate));
        Ok(self.project.clone())
    }

    fn model_info(&self) -> Result<ModelInfo, EngineError> {
        if self.record().loaded.is_empty() {
            return Err(EngineError::NoModelLoaded);
        }
        Ok(self.info.clone())
    }

    fn apply(&mut self, config: &ConfigDictionary) -> Result<(), EngineError> {
        let mut calls = self.record();
        calls.applied = Some(config.clone());
        calls.sequence.push("apply");
        Ok(())
    }

    fn set_plate_origin(&mut self, origin: PlacementTransform) -> Result<(), EngineError> {
        let mut calls = self.record();
        calls.origins.push(origin);
        calls.sequence.push("set_plate_origin");
        Ok(())
    }

    fn process(&mut self) -> Result<(), EngineError> {
        {
            let mut calls = self.record();
            calls.processed += 1;
            calls.sequence.push("process");
        }
        match &self.process_error {
            Some(message) => Err(EngineError::Delegation {
                operation: "process".into(),
                message: message.clone(),
                detail: None,
            }),
            None => Ok(()),
        }
    }

    fn export(&mut self, output: &Path) -> Result<(), EngineError> {
        let mut calls = self.record();
        calls.exported.push(output.to_path_buf());
        calls.sequence.push("export");
        Ok(())
    }

    fn shutdown(&mut self) {
        self.record().shutdowns += 1;
    }
}

/// An isolated resources directory plus a scratch area for models and
/// output, backed by a [`tempfile::TempDir`].
pub struct IntegrationTestContext {
    /// Temporary directory; `resources/` holds the library, the rest is scratch.
    pub root: tempfile::TempDir,
}

impl IntegrationTestContext {
    /// Create a new context with the preset library in place.
    pub fn new() -> Self {
        let root = tempfile::tempdir().expect("create temp dir");
        setup_resources(&root.path().join("resources"));
        Self { root }
    }

    /// The resources directory.
    pub fn resources(&self) -> PathBuf {
        self.root.path().join("resources")
    }

    /// Path inside the scratch area.
    pub fn path(&self, name: &str) -> PathBuf {
        self.root.path().join(name)
    }

    /// Write a non-empty model file named `name` and return its path.
    pub fn model(&self, name: &str) -> PathBuf {
        let path = self.path(name);
        std::fs::write(&path, b"solid cube\nendsolid cube\n").expect("write model");
        path
    }

    /// Open a session around `engine` against this context's resources.
    pub fn open(&self, engine: FakeEngine, log: &Logger) -> EngineContext {
        orcaslicer_cli::commands::open_session_with(
            Box::new(engine),
            Settings::default(),
            &self.resources(),
            log,
        )
        .expect("open session")
    }
}
