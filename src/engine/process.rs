//! [`Engine`] implementation that drives an engine bridge executable.
//!
//! Every operation is one bridge invocation. Requests larger than a path go
//! through a JSON job file; the bridge answers on stdout with
//! `{"success": bool, "message": str, "error_details": str, "data": any}`.
//! State between calls (the loaded model, the applied configuration, the
//! plate origin) is kept here, and sliced intermediates live in a work
//! directory owned by the engine.
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tempfile::TempDir;

use super::{Engine, LoadedProject, ModelInfo};
use crate::config::ConfigDictionary;
use crate::error::EngineError;
use crate::exec::Executor;
use crate::plate::PlacementTransform;

/// Reply printed by the bridge.
#[derive(Debug, Deserialize)]
struct BridgeReply {
    success: bool,
    #[serde(default)]
    message: String,
    #[serde(default)]
    error_details: String,
    #[serde(default)]
    data: Value,
}

/// The model currently loaded.
#[derive(Debug)]
struct Loaded {
    input: PathBuf,
    plate: Option<usize>,
}

/// Drives the engine bridge through an [`Executor`].
#[derive(Debug)]
pub struct ProcessEngine {
    bridge: PathBuf,
    executor: Arc<dyn Executor>,
    resources: Option<PathBuf>,
    loaded: Option<Loaded>,
    config: Option<Value>,
    origin: PlacementTransform,
    work: Option<TempDir>,
}

impl ProcessEngine {
    /// Create an engine that runs `bridge` through `executor`.
    #[must_use]
    pub fn new(bridge: impl Into<PathBuf>, executor: Arc<dyn Executor>) -> Self {
        Self {
            bridge: bridge.into(),
            executor,
            resources: None,
            loaded: None,
            config: None,
            origin: PlacementTransform::default(),
            work: None,
        }
    }

    fn resources(&self) -> Result<&Path, EngineError> {
        self.resources.as_deref().ok_or(EngineError::NotInitialized)
    }

    fn loaded(&self) -> Result<&Loaded, EngineError> {
        self.resources()?;
        self.loaded.as_ref().ok_or(EngineError::NoModelLoaded)
    }

    /// Run one bridge operation and return the reply's `data`.
    fn call(&self, operation: &str, args: Vec<String>) -> Result<Value, EngineError> {
        let delegation = |message: String, detail: Option<String>| EngineError::Delegation {
            operation: operation.to_string(),
            message,
            detail,
        };

        let mut argv = vec![operation.to_string()];
        argv.extend(args);
        tracing::debug!("engine bridge: {} {}", self.bridge.display(), argv.join(" "));

        let result = self
            .executor
            .run(&self.bridge, &argv)
            .map_err(|e| delegation("cannot run engine bridge".to_string(), Some(format!("{e:#}"))))?;

        match serde_json::from_str::<BridgeReply>(result.stdout.trim()) {
            Ok(reply) if reply.success => Ok(reply.data),
            Ok(reply) => Err(delegation(
                reply.message,
                Some(reply.error_details).filter(|d| !d.is_empty()),
            )),
            Err(e) if result.success => Err(delegation(
                "malformed engine reply".to_string(),
                Some(e.to_string()),
            )),
            Err(_) => Err(delegation(
                format!("engine bridge exited with code {}", result.code.unwrap_or(-1)),
                Some(result.stderr.trim().to_string()).filter(|s| !s.is_empty()),
            )),
        }
    }

    fn call_as<T: DeserializeOwned>(
        &self,
        operation: &str,
        args: Vec<String>,
    ) -> Result<T, EngineError> {
        let data = self.call(operation, args)?;
        serde_json::from_value(data).map_err(|e| EngineError::Delegation {
            operation: operation.to_string(),
            message: "unexpected engine reply".to_string(),
            detail: Some(e.to_string()),
        })
    }

    /// Write the job file for `process`/`export` and return the arguments
    /// that point the bridge at it.
    fn job_args(&mut self) -> Result<Vec<String>, EngineError> {
        let resources = self.resources()?.to_path_buf();
        let (input, plate) = {
            let loaded = self.loaded()?;
            (loaded.input.clone(), loaded.plate)
        };
        let io_error = |message: &str, e: std::io::Error| EngineError::Delegation {
            operation: "process".to_string(),
            message: message.to_string(),
            detail: Some(e.to_string()),
        };
        if self.work.is_none() {
            self.work = Some(
                tempfile::Builder::new()
                    .prefix("orcaslicer-cli-")
                    .tempdir()
                    .map_err(|e| io_error("cannot create work directory", e))?,
            );
        }
        let Some(work) = self.work.as_ref().map(TempDir::path) else {
            return Err(EngineError::NotInitialized);
        };

        let job = serde_json::json!({
            "resources": resources,
            "input": input,
            "plate": plate,
            "config": self.config.clone().unwrap_or(Value::Null),
            "origin": self.origin,
        });
        let job_path = work.join("job.json");
        let text = serde_json::to_string_pretty(&job).map_err(|e| EngineError::Delegation {
            operation: "process".to_string(),
            message: "cannot encode job".to_string(),
            detail: Some(e.to_string()),
        })?;
        std::fs::write(&job_path, text).map_err(|e| io_error("cannot write job file", e))?;

        Ok(vec![
            "--job".to_string(),
            job_path.display().to_string(),
            "--work".to_string(),
            work.display().to_string(),
        ])
    }
}

impl Engine for ProcessEngine {
    fn initialize(&mut self, resources: &Path) -> Result<ConfigDictionary, EngineError> {
        let data = self.call(
            "initialize",
            vec!["--resources".to_string(), resources.display().to_string()],
        )?;
        let Value::Object(defaults) = data else {
            return Err(EngineError::Delegation {
                operation: "initialize".to_string(),
                message: "engine returned no default configuration".to_string(),
                detail: None,
            });
        };
        self.resources = Some(resources.to_path_buf());
        Ok(ConfigDictionary::from_defaults(&defaults))
    }

    fn load_model(
        &mut self,
        path: &Path,
        plate: Option<usize>,
    ) -> Result<LoadedProject, EngineError> {
        let resources = self.resources()?.display().to_string();
        let mut args = vec![
            "--resources".to_string(),
            resources,
            "--input".to_string(),
            path.display().to_string(),
        ];
        if let Some(plate) = plate {
            args.extend(["--plate".to_string(), plate.to_string()]);
        }
        let project: LoadedProject = self.call_as("load", args)?;
        self.loaded = Some(Loaded {
            input: path.to_path_buf(),
            plate,
        });
        self.config = None;
        self.origin = PlacementTransform::default();
        Ok(project)
    }

    fn model_info(&self) -> Result<ModelInfo, EngineError> {
        let loaded = self.loaded()?;
        self.call_as(
            "info",
            vec!["--input".to_string(), loaded.input.display().to_string()],
        )
    }

    fn apply(&mut self, config: &ConfigDictionary) -> Result<(), EngineError> {
        self.resources()?;
        self.config = Some(config.to_json());
        Ok(())
    }

    fn set_plate_origin(&mut self, origin: PlacementTransform) -> Result<(), EngineError> {
        self.loaded()?;
        self.origin = origin;
        Ok(())
    }

    fn process(&mut self) -> Result<(), EngineError> {
        let args = self.job_args()?;
        self.call("process", args).map(drop)
    }

    fn export(&mut self, output: &Path) -> Result<(), EngineError> {
        let mut args = self.job_args()?;
        args.extend(["--output".to_string(), output.display().to_string()]);
        self.call("export", args).map(drop)
    }

    fn shutdown(&mut self) {
        self.loaded = None;
        self.config = None;
        self.resources = None;
        self.origin = PlacementTransform::default();
        if let Some(work) = self.work.take()
            && let Err(e) = work.close()
        {
            tracing::debug!("cannot remove engine work directory: {e}");
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::exec::{ExecResult, MockExecutor};
    use serde_json::json;

    const OK_EMPTY: &str = r#"{"success": true}"#;

    fn engine(mock: MockExecutor) -> (ProcessEngine, Arc<MockExecutor>) {
        let mock = Arc::new(mock);
        let executor: Arc<dyn Executor> = Arc::clone(&mock) as Arc<dyn Executor>;
        (ProcessEngine::new("orcaslicer-engine", executor), mock)
    }

    fn initialized(mock: MockExecutor) -> (ProcessEngine, Arc<MockExecutor>) {
        let mock = mock.with_stdout(
            json!({"success": true, "data": {"layer_height": 0.2, "printable_area": ["0x0", "256x256"]}})
                .to_string(),
        );
        let (mut engine, mock) = engine(mock);
        engine.initialize(Path::new("/res")).unwrap();
        (engine, mock)
    }

    #[test]
    fn initialize_builds_schema_from_defaults() {
        let (engine, mock) = initialized(MockExecutor::new());
        assert_eq!(engine.resources.as_deref(), Some(Path::new("/res")));
        assert_eq!(mock.calls()[0], vec!["initialize", "--resources", "/res"]);
    }

    #[test]
    fn calls_before_initialize_are_rejected() {
        let (mut engine, mock) = engine(MockExecutor::new());
        assert!(matches!(
            engine.load_model(Path::new("a.stl"), None),
            Err(EngineError::NotInitialized)
        ));
        assert!(matches!(engine.process(), Err(EngineError::NotInitialized)));
        assert!(mock.calls().is_empty());
    }

    #[test]
    fn process_requires_a_model() {
        let (mut engine, _mock) = initialized(MockExecutor::new());
        assert!(matches!(engine.process(), Err(EngineError::NoModelLoaded)));
        assert!(matches!(
            engine.set_plate_origin(PlacementTransform::default()),
            Err(EngineError::NoModelLoaded)
        ));
    }

    #[test]
    fn load_model_passes_plate_and_parses_project() {
        let reply = json!({
            "success": true,
            "data": {"config": {"layer_height": "0.12"}, "selected_plate": 1}
        });
        let (mut engine, mock) = initialized(MockExecutor::new().with_stdout(reply.to_string()));
        let project = engine.load_model(Path::new("cube.3mf"), Some(2)).unwrap();
        assert_eq!(project.selected_plate, Some(1));
        assert_eq!(
            mock.calls()[1],
            vec!["load", "--resources", "/res", "--input", "cube.3mf", "--plate", "2"]
        );
    }

    #[test]
    fn engine_failure_is_verbatim() {
        let reply = json!({
            "success": false,
            "message": "Nothing to be sliced",
            "error_details": "plate 2 has no objects"
        });
        let (mut engine, _mock) = initialized(
            MockExecutor::new()
                .with_stdout(json!({"success": true, "data": {}}).to_string())
                .with_stdout(reply.to_string()),
        );
        engine.load_model(Path::new("cube.3mf"), None).unwrap();
        let err = engine.process().unwrap_err();
        assert!(matches!(
            err,
            EngineError::Delegation { ref operation, ref message, ref detail }
                if operation == "process"
                    && message == "Nothing to be sliced"
                    && detail.as_deref() == Some("plate 2 has no objects")
        ));
    }

    #[test]
    fn crashed_bridge_reports_stderr() {
        let (mut engine, _mock) = engine(MockExecutor::new().with_result(ExecResult {
            stdout: String::new(),
            stderr: "segmentation fault\n".into(),
            success: false,
            code: Some(139),
        }));
        let err = engine.initialize(Path::new("/res")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "initialize failed: engine bridge exited with code 139"
        );
    }

    #[test]
    fn job_file_carries_config_and_origin() {
        let (mut engine, mock) = initialized(
            MockExecutor::new()
                .with_stdout(json!({"success": true, "data": {}}).to_string())
                .with_stdout(OK_EMPTY)
                .with_stdout(OK_EMPTY),
        );
        engine.load_model(Path::new("cube.stl"), None).unwrap();
        let config = ConfigDictionary::from_defaults(json!({"layer_height": 0.28}).as_object().unwrap());
        engine.apply(&config).unwrap();
        engine
            .set_plate_origin(PlacementTransform { x: 120.0, y: -120.0 })
            .unwrap();
        engine.process().unwrap();
        engine.export(Path::new("out.gcode")).unwrap();

        let export_args = &mock.calls()[3];
        assert_eq!(export_args[0], "export");
        assert_eq!(export_args.last().map(String::as_str), Some("out.gcode"));
        let job: Value =
            serde_json::from_str(&std::fs::read_to_string(&export_args[2]).unwrap()).unwrap();
        assert_eq!(job["config"]["layer_height"], json!(0.28));
        assert_eq!(job["origin"], json!({"x": 120.0, "y": -120.0}));

        let work = PathBuf::from(&export_args[4]);
        engine.shutdown();
        assert!(!work.exists(), "shutdown removes the work directory");
    }
}
