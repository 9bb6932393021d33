//! The slice request pipeline: named stages run in order against one
//! request context.
//!
//! Each stage records its outcome with the logger so the run summary shows
//! how far a request got. Unlike a best-effort batch, the first failing
//! stage aborts the request: a half-resolved configuration must never reach
//! the engine.
mod configure;
mod model;
mod presets;
mod slice;

pub use configure::{PlaceOnPlate, ResolveConfig};
pub use model::{LoadModel, validate_model};
pub use presets::{ExtractOverrides, SelectPresets};
pub use slice::Slice;

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::engine::{EngineContext, LoadedProject, OperationResult};
use crate::error::{EngineError, SlicerError};
use crate::logging::{Log, StageStatus};
use crate::plate::PlacementTransform;
use crate::presets::{AppliedPresets, PresetBundle, UserPresetNames};
use crate::project::ProjectExtraction;
use crate::resolver::{ConfigResolver, Resolution};

/// Result message of a dry run.
pub const DRY_RUN_MESSAGE: &str = "Dry run completed - no actual slicing performed";

/// Everything a slice request is made of.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlicingParams {
    /// Model or project file.
    pub input: PathBuf,
    /// Destination of the sliced result.
    pub output: PathBuf,
    /// Override file (`--config`).
    pub config_file: Option<PathBuf>,
    /// Printer preset name.
    pub printer: Option<String>,
    /// Filament preset name.
    pub filament: Option<String>,
    /// Process preset name.
    pub process: Option<String>,
    /// 1-based plate number; `0` leaves the choice to the project.
    pub plate: usize,
    /// `--set` overrides, already parsed.
    pub overrides: BTreeMap<String, String>,
    /// Verbose output was requested.
    pub verbose: bool,
    /// Stop before handing anything to the engine.
    pub dry_run: bool,
    /// Fail when a filament or process cannot be resolved.
    pub strict_presets: bool,
}

impl SlicingParams {
    /// Plate to load, if one was given.
    #[must_use]
    pub fn plate_number(&self) -> Option<usize> {
        (self.plate != 0).then_some(self.plate)
    }

    /// Preset names given by the user.
    #[must_use]
    pub fn user_presets(&self) -> UserPresetNames {
        UserPresetNames {
            printer: self.printer.clone(),
            filament: self.filament.clone(),
            process: self.process.clone(),
        }
    }
}

/// Result of a single stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageResult {
    /// The stage did its work.
    Ok,
    /// The stage had nothing to do.
    Skipped(String),
    /// The stage stopped short because of `--dry-run`.
    DryRun,
}

/// State owned by one request.
///
/// The preset bundle is a copy of the session library, so presets embedded
/// in a project never leak into the next request.
pub struct RequestContext<'a> {
    /// The checked-out engine session.
    pub engine: &'a mut EngineContext,
    /// Request parameters.
    pub params: &'a SlicingParams,
    /// Logger.
    pub log: &'a dyn Log,
    /// Merges the override layers.
    pub resolver: ConfigResolver,
    /// Request copy of the preset library.
    pub bundle: PresetBundle,
    /// What the engine reported after loading the input.
    pub project: Option<LoadedProject>,
    /// Override layers and hints taken from the project.
    pub extraction: Option<ProjectExtraction>,
    /// Presets selected for this request.
    pub applied: AppliedPresets,
    /// The merged configuration.
    pub resolution: Option<Resolution>,
    /// Plate origin handed to the engine.
    pub origin: PlacementTransform,
}

impl std::fmt::Debug for RequestContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestContext")
            .field("params", &self.params)
            .field("project", &self.project.is_some())
            .field("applied", &self.applied)
            .field("origin", &self.origin)
            .finish_non_exhaustive()
    }
}

impl<'a> RequestContext<'a> {
    /// Start a request against an initialised session.
    #[must_use]
    pub fn new(engine: &'a mut EngineContext, params: &'a SlicingParams, log: &'a dyn Log) -> Self {
        let bundle = engine.presets().clone();
        Self {
            engine,
            params,
            log,
            resolver: ConfigResolver::default(),
            bundle,
            project: None,
            extraction: None,
            applied: AppliedPresets::default(),
            resolution: None,
            origin: PlacementTransform::default(),
        }
    }

    /// Return `true` if the input carried project data.
    #[must_use]
    pub fn is_project(&self) -> bool {
        self.project.as_ref().is_some_and(LoadedProject::is_project)
    }
}

/// A named step of the slice pipeline.
pub trait Stage {
    /// Human-readable stage name.
    fn name(&self) -> &'static str;

    /// Run the stage.
    ///
    /// # Errors
    ///
    /// Returns the error that aborts the request.
    fn run(&self, ctx: &mut RequestContext<'_>) -> Result<StageResult, SlicerError>;
}

/// The stages of a slice request, in execution order.
#[must_use]
pub fn all_stages() -> Vec<Box<dyn Stage>> {
    vec![
        Box::new(LoadModel),
        Box::new(ExtractOverrides),
        Box::new(SelectPresets),
        Box::new(ResolveConfig),
        Box::new(PlaceOnPlate),
        Box::new(Slice),
    ]
}

/// Execute a stage, recording the result in the logger.
///
/// # Errors
///
/// Returns the stage's error after recording it as failed.
pub fn execute(stage: &dyn Stage, ctx: &mut RequestContext<'_>) -> Result<(), SlicerError> {
    let log = ctx.log;
    log.stage(stage.name());

    match stage.run(ctx) {
        Ok(StageResult::Ok) => {
            log.record_stage(stage.name(), StageStatus::Ok, None);
        }
        Ok(StageResult::Skipped(reason)) => {
            log.info(&format!("skipped: {reason}"));
            log.record_stage(stage.name(), StageStatus::Skipped, Some(&reason));
        }
        Ok(StageResult::DryRun) => {
            log.record_stage(stage.name(), StageStatus::DryRun, None);
        }
        Err(e) => {
            log.error(&format!("{}: {}", stage.name(), e.message()));
            if let Some(detail) = e.detail() {
                log.debug(&format!("details: {detail}"));
            }
            log.record_stage(stage.name(), StageStatus::Failed, Some(&e.message()));
            return Err(e);
        }
    }
    Ok(())
}

/// Run a full slice request against `engine`.
///
/// # Errors
///
/// Returns [`EngineError::NotInitialized`] for an uninitialised session and
/// otherwise the error of the first failing stage.
pub fn run(
    engine: &mut EngineContext,
    params: &SlicingParams,
    log: &dyn Log,
) -> Result<OperationResult, SlicerError> {
    if !engine.is_initialized() {
        return Err(EngineError::NotInitialized.into());
    }
    let mut ctx = RequestContext::new(engine, params, log);
    for stage in all_stages() {
        execute(stage.as_ref(), &mut ctx)?;
    }

    Ok(if params.dry_run {
        OperationResult::ok(DRY_RUN_MESSAGE)
    } else {
        OperationResult::ok(format!(
            "Slicing completed successfully: {}",
            params.output.display()
        ))
    })
}
