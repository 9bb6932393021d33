//! Load the input model or project.
use std::path::Path;

use super::{RequestContext, Stage, StageResult};
use crate::error::{ModelError, SlicerError};

/// Extensions the engine can load.
const SUPPORTED_EXTENSIONS: &[&str] = &["3mf", "stl", "obj"];

/// Check that `path` is a non-empty file of a supported format.
///
/// # Errors
///
/// Returns [`ModelError::NotFound`], [`ModelError::UnsupportedFormat`] or
/// [`ModelError::Empty`].
pub fn validate_model(path: &Path) -> Result<(), ModelError> {
    if !path.is_file() {
        return Err(ModelError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    if !SUPPORTED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(ModelError::UnsupportedFormat { extension });
    }
    let empty = path.metadata().map_or(true, |m| m.len() == 0);
    if empty {
        return Err(ModelError::Empty {
            path: path.to_path_buf(),
        });
    }
    Ok(())
}

/// Validate the input and hand it to the engine.
#[derive(Debug, Clone, Copy)]
pub struct LoadModel;

impl Stage for LoadModel {
    fn name(&self) -> &'static str {
        "Load model"
    }

    fn run(&self, ctx: &mut RequestContext<'_>) -> Result<StageResult, SlicerError> {
        let input = &ctx.params.input;
        validate_model(input)?;
        ctx.log.info(&format!("input: {}", input.display()));

        let project = ctx
            .engine
            .engine_mut()
            .load_model(input, ctx.params.plate_number())?;
        if project.is_project() {
            ctx.log.debug(&format!(
                "project: {} plates, {} embedded presets, {} config keys",
                project.plates.len(),
                project.presets.len(),
                project.config.len()
            ));
        }
        ctx.project = Some(project);
        Ok(StageResult::Ok)
    }
}
