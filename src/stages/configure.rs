//! Configuration merge and plate placement.
use std::collections::BTreeMap;

use super::{RequestContext, Stage, StageResult};
use crate::config::{ConfigDictionary, OverrideSet, overrides_file};
use crate::engine::LoadedProject;
use crate::error::SlicerError;
use crate::plate::{BedShape, PlacementTransform, compute_origin};
use crate::project::ProjectExtraction;

/// Merge presets, project layers and CLI overrides into one configuration.
#[derive(Debug, Clone, Copy)]
pub struct ResolveConfig;

impl Stage for ResolveConfig {
    fn name(&self) -> &'static str {
        "Resolve configuration"
    }

    fn run(&self, ctx: &mut RequestContext<'_>) -> Result<StageResult, SlicerError> {
        // `--set` ranks above `--config`.
        let mut cli = match &ctx.params.config_file {
            Some(path) => {
                let entries = overrides_file::load(path)?;
                ctx.log.info(&format!(
                    "{} overrides from {}",
                    entries.len(),
                    path.display()
                ));
                entries
            }
            None => BTreeMap::new(),
        };
        cli.extend(
            ctx.params
                .overrides
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );

        let base = ctx.bundle.full_config(ctx.engine.defaults()?);
        let empty = OverrideSet::new();
        let (project, print) = ctx.extraction.as_ref().map_or((&empty, &empty), |e| {
            (&e.project_overrides, &e.print_overrides)
        });
        let resolution = ctx.resolver.resolve(&base, &cli, project, print)?;

        for (key, value) in resolution.cli.iter() {
            ctx.log.debug(&format!("override: {key} = {value}"));
        }
        ctx.log.info(&format!(
            "{} keys, {} print deltas, {} project overrides, {} CLI overrides",
            resolution.config.len(),
            print.len(),
            project.len(),
            resolution.cli.len()
        ));
        ctx.resolution = Some(resolution);
        Ok(StageResult::Ok)
    }
}

/// Derive the origin of the selected plate.
#[derive(Debug, Clone, Copy)]
pub struct PlaceOnPlate;

impl Stage for PlaceOnPlate {
    fn name(&self) -> &'static str {
        "Place on plate"
    }

    fn run(&self, ctx: &mut RequestContext<'_>) -> Result<StageResult, SlicerError> {
        if !ctx.is_project() {
            ctx.origin = PlacementTransform::default();
            return Ok(StageResult::Skipped("single model, no plate offset".to_string()));
        }
        let Some(resolution) = ctx.resolution.as_ref() else {
            return Ok(StageResult::Skipped("no configuration resolved".to_string()));
        };
        ctx.origin = plate_origin(
            &resolution.config,
            ctx.project.as_ref(),
            ctx.extraction.as_ref(),
        );
        ctx.log.info(&format!("plate origin: {}", ctx.origin));
        Ok(StageResult::Ok)
    }
}

/// Origin of the selected plate for `config`.
///
/// Plain meshes sit at the bed origin.
pub(super) fn plate_origin(
    config: &ConfigDictionary,
    project: Option<&LoadedProject>,
    extraction: Option<&ProjectExtraction>,
) -> PlacementTransform {
    let Some(project) = project.filter(|p| p.is_project()) else {
        return PlacementTransform::default();
    };
    let bed = BedShape::from_config(config);
    let (index, total) = extraction.map_or((None, 1), |e| {
        (e.hints.plate.selected_index, e.hints.plate.total_plates)
    });
    compute_origin(&bed, index, total, &project.instance_offsets)
}
