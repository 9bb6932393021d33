//! Project extraction and preset selection.
use super::{RequestContext, Stage, StageResult};
use crate::error::SlicerError;
use crate::presets::{PresetCategory, PresetSelector, SelectionHints, StrategySet};
use crate::project::{self, ProjectOverrideExtractor};

/// Snapshot the override layers and selection hints of a project.
///
/// Runs against the library presets, before anything embedded in the
/// project is registered.
#[derive(Debug, Clone, Copy)]
pub struct ExtractOverrides;

impl Stage for ExtractOverrides {
    fn name(&self) -> &'static str {
        "Extract overrides"
    }

    fn run(&self, ctx: &mut RequestContext<'_>) -> Result<StageResult, SlicerError> {
        let Some(project) = ctx.project.as_ref().filter(|p| p.is_project()) else {
            return Ok(StageResult::Skipped("not a project file".to_string()));
        };
        let baseline = ctx.engine.defaults()?;
        let extraction = ProjectOverrideExtractor.extract(project, baseline, &ctx.bundle);

        ctx.log.info(&format!(
            "{} project overrides, {} print deltas",
            extraction.project_overrides.len(),
            extraction.print_overrides.len()
        ));
        for key in extraction.print_overrides.keys() {
            ctx.log.debug(&format!("print delta: {key}"));
        }
        for warning in &extraction.warnings {
            ctx.log.debug(&warning.to_string());
        }
        ctx.extraction = Some(extraction);
        Ok(StageResult::Ok)
    }
}

/// Register embedded presets and select printer, filament and process.
#[derive(Debug, Clone, Copy)]
pub struct SelectPresets;

impl Stage for SelectPresets {
    fn name(&self) -> &'static str {
        "Select presets"
    }

    fn run(&self, ctx: &mut RequestContext<'_>) -> Result<StageResult, SlicerError> {
        if let Some(project) = ctx.project.as_ref().filter(|p| !p.presets.is_empty()) {
            project::register_embedded_presets(&mut ctx.bundle, project);
        }

        let selector = PresetSelector::new(
            StrategySet::default(),
            ctx.engine.settings().naming.clone(),
        );
        let default_hints = SelectionHints::default();
        let hints = ctx
            .extraction
            .as_ref()
            .map_or(&default_hints, |extraction| &extraction.hints);
        let applied = selector.auto_apply_from_project(
            &mut ctx.bundle,
            hints,
            &ctx.params.user_presets(),
            ctx.params.strict_presets,
        )?;

        if applied.strict_project {
            ctx.log.info("applying the presets named by the project");
        }
        for category in PresetCategory::ALL {
            match applied.get(category) {
                Some(selection) => {
                    let via = selection
                        .strategy
                        .map_or_else(String::new, |s| format!(" (via {s})"));
                    ctx.log.info(&format!("{category}: {}{via}", selection.name));
                }
                None => ctx.log.info(&format!("{category}: engine defaults")),
            }
        }
        ctx.applied = applied;
        Ok(StageResult::Ok)
    }
}
