//! Command: show model information.
use std::fmt::Write as _;
use std::path::Path;

use anyhow::Result;

use crate::cli::{GlobalOpts, InfoOpts};
use crate::engine::{EngineContext, ModelInfo};
use crate::error::{ModelError, SlicerError};
use crate::logging::Log;
use crate::stages::validate_model;

/// Run the info command.
///
/// # Errors
///
/// Returns an error if the file is missing or unsupported, the engine
/// cannot load it, or the engine reports it as invalid.
pub fn run(global: &GlobalOpts, opts: &InfoOpts, log: &dyn Log) -> Result<()> {
    log.info(&format!("model information for: {}", opts.input.display()));
    if let Err(e) = validate_model(&opts.input) {
        print!("{}", render_rejected(&opts.input, &[e.to_string()]));
        return Err(SlicerError::from(e).into());
    }

    let mut context = super::open_session(global, log)?;
    let result = describe(&mut context, &opts.input);
    context.shutdown();

    let info = result?;
    print!("{}", render(&opts.input, &info));
    if info.is_valid {
        Ok(())
    } else {
        Err(SlicerError::from(ModelError::Invalid {
            path: opts.input.clone(),
        })
        .into())
    }
}

/// Load `input` and ask the engine about it.
///
/// # Errors
///
/// Returns the engine error if the model cannot be loaded or described.
pub fn describe(context: &mut EngineContext, input: &Path) -> Result<ModelInfo, SlicerError> {
    validate_model(input)?;
    context.engine_mut().load_model(input, None)?;
    Ok(context.engine().model_info()?)
}

/// Format the report for a model the engine described.
#[must_use]
pub fn render(input: &Path, info: &ModelInfo) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Model Information:");
    let _ = writeln!(out, "  File: {}", input.display());
    let _ = writeln!(out, "  Valid: {}", if info.is_valid { "Yes" } else { "No" });
    if info.is_valid {
        let _ = writeln!(out, "  Objects: {}", info.object_count);
        let _ = writeln!(out, "  Triangles: {}", info.triangle_count);
        let _ = writeln!(out, "  Volume: {:.2} mm³", info.volume);
        let _ = writeln!(out, "  Bounding Box: {}", info.bounding_box);
    }
    write_list(&mut out, "Warnings", &info.warnings);
    write_list(&mut out, "Errors", &info.errors);
    out
}

/// Format the report for a file rejected before it reached the engine.
#[must_use]
pub fn render_rejected(input: &Path, errors: &[String]) -> String {
    render(
        input,
        &ModelInfo {
            errors: errors.to_vec(),
            ..ModelInfo::default()
        },
    )
}

fn write_list(out: &mut String, title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    let _ = writeln!(out, "  {title}:");
    for item in items {
        let _ = writeln!(out, "    - {item}");
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    fn cube() -> ModelInfo {
        ModelInfo {
            filename: "cube.stl".into(),
            object_count: 1,
            triangle_count: 12,
            volume: 8000.0,
            bounding_box: "[0, 0, 0] - [20, 20, 20]".into(),
            is_valid: true,
            warnings: vec!["object is close to the bed edge".into()],
            errors: Vec::new(),
        }
    }

    #[test]
    fn render_valid_model() {
        let out = render(Path::new("cube.stl"), &cube());
        insta::assert_snapshot!(out);
    }

    #[test]
    fn render_rejected_file_lists_the_reason() {
        let out = render_rejected(
            Path::new("cube.step"),
            &["Unsupported model format 'step' (expected .3mf, .stl or .obj)".into()],
        );
        assert!(out.contains("  Valid: No\n"));
        assert!(out.contains("    - Unsupported model format 'step'"));
        assert!(!out.contains("Objects:"));
    }
}
