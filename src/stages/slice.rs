//! Hand the resolved configuration to the engine and slice.
use super::configure::plate_origin;
use super::{DRY_RUN_MESSAGE, RequestContext, Stage, StageResult};
use crate::config::OverrideSet;
use crate::error::SlicerError;

/// Re-assert the overrides, configure the engine, slice and export.
#[derive(Debug, Clone, Copy)]
pub struct Slice;

impl Stage for Slice {
    fn name(&self) -> &'static str {
        "Slice"
    }

    fn run(&self, ctx: &mut RequestContext<'_>) -> Result<StageResult, SlicerError> {
        if ctx.params.dry_run {
            ctx.log.dry_run(DRY_RUN_MESSAGE);
            return Ok(StageResult::DryRun);
        }
        let Some(resolution) = ctx.resolution.as_ref() else {
            return Ok(StageResult::Skipped("no configuration resolved".to_string()));
        };

        let mut config = resolution.config.clone();
        let empty = OverrideSet::new();
        let project = ctx
            .extraction
            .as_ref()
            .map_or(&empty, |e| &e.project_overrides);
        ctx.resolver.reassert(&mut config, project, &resolution.cli);

        // Loading a configuration resets placement, so the origin is set on
        // both sides of `apply`.
        let engine = ctx.engine.engine_mut();
        engine.set_plate_origin(ctx.origin)?;
        engine.apply(&config)?;

        let origin = plate_origin(&config, ctx.project.as_ref(), ctx.extraction.as_ref());
        if origin != ctx.origin {
            ctx.log.warn(&format!(
                "plate origin moved from {} to {} after configuration; using {origin}",
                ctx.origin, origin
            ));
            ctx.origin = origin;
        }
        engine.set_plate_origin(ctx.origin)?;

        ctx.log.info("slicing");
        engine.process()?;
        engine.export(&ctx.params.output)?;
        ctx.log
            .info(&format!("written: {}", ctx.params.output.display()));
        Ok(StageResult::Ok)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::ConfigValue;
    use crate::engine::{LoadedProject, MockEngine};
    use crate::logging::isolated_logger;
    use crate::plate::PlacementTransform;
    use crate::project::ProjectExtraction;
    use crate::stages::test_helpers::{library, session};
    use crate::stages::{PlaceOnPlate, ResolveConfig, SlicingParams};
    use mockall::Sequence;

    #[test]
    fn reassert_restores_project_value_and_keeps_cli() {
        let (log, _tmp, _guard) = isolated_logger();
        let dir = library();
        let mut mock = MockEngine::new();
        let mut seq = Sequence::new();
        mock.expect_set_plate_origin()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        mock.expect_apply()
            .times(1)
            .in_sequence(&mut seq)
            .withf(|config| {
                config.get("wall_loops") == Some(&ConfigValue::Int(4))
                    && config.get("layer_height") == Some(&ConfigValue::Float(0.12))
            })
            .returning(|_| Ok(()));
        mock.expect_set_plate_origin()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        mock.expect_process()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(()));
        mock.expect_export()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        let mut engine = session(mock, dir.path());
        let params = SlicingParams {
            output: dir.path().join("out.gcode"),
            overrides: [("layer_height".to_string(), "0.12".to_string())].into(),
            ..SlicingParams::default()
        };
        let mut ctx = RequestContext::new(&mut engine, &params, &log);
        ctx.project = Some(LoadedProject::default());
        let mut extraction = ProjectExtraction::default();
        extraction
            .project_overrides
            .insert("wall_loops", ConfigValue::Int(4));
        extraction
            .project_overrides
            .insert("layer_height", ConfigValue::Float(0.3));
        ctx.extraction = Some(extraction);
        ResolveConfig.run(&mut ctx).unwrap();

        // Something between resolve and slice clobbered a project value.
        let config = &mut ctx.resolution.as_mut().unwrap().config;
        config.set("wall_loops", ConfigValue::Int(2)).unwrap();

        assert_eq!(Slice.run(&mut ctx).unwrap(), StageResult::Ok);
        assert_eq!(ctx.origin, PlacementTransform::default());
    }

    #[test]
    fn origin_is_set_before_and_after_apply() {
        let (log, _tmp, _guard) = isolated_logger();
        let dir = library();
        let mut mock = MockEngine::new();
        let mut seq = Sequence::new();
        let at_second_plate =
            |origin: &PlacementTransform| (origin.x - 307.2).abs() < 1e-9 && origin.y == 0.0;
        mock.expect_set_plate_origin()
            .times(1)
            .in_sequence(&mut seq)
            .withf(at_second_plate)
            .returning(|_| Ok(()));
        mock.expect_apply()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        mock.expect_set_plate_origin()
            .times(1)
            .in_sequence(&mut seq)
            .withf(at_second_plate)
            .returning(|_| Ok(()));
        mock.expect_process()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(()));
        mock.expect_export()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        let mut engine = session(mock, dir.path());
        let params = SlicingParams {
            output: dir.path().join("plate2.gcode"),
            ..SlicingParams::default()
        };
        let mut ctx = RequestContext::new(&mut engine, &params, &log);
        ctx.project = Some(
            serde_json::from_value(serde_json::json!({
                "config": {"layer_height": "0.2"},
                "plates": [{}, {}],
                "selected_plate": 1,
            }))
            .unwrap(),
        );
        let mut extraction = ProjectExtraction::default();
        extraction.hints.plate.total_plates = 2;
        extraction.hints.plate.selected_index = Some(1);
        ctx.extraction = Some(extraction);

        ResolveConfig.run(&mut ctx).unwrap();
        PlaceOnPlate.run(&mut ctx).unwrap();
        assert!((ctx.origin.x - 307.2).abs() < 1e-9);

        assert_eq!(Slice.run(&mut ctx).unwrap(), StageResult::Ok);
    }

    #[test]
    fn dry_run_never_touches_the_engine() {
        let (log, _tmp, _guard) = isolated_logger();
        let dir = library();
        let mut mock = MockEngine::new();
        mock.expect_apply().never();
        mock.expect_export().never();
        let mut engine = session(mock, dir.path());
        let params = SlicingParams {
            dry_run: true,
            ..SlicingParams::default()
        };
        let mut ctx = RequestContext::new(&mut engine, &params, &log);
        assert_eq!(Slice.run(&mut ctx).unwrap(), StageResult::DryRun);
    }
}
