//! Command: slice a model or project.
use anyhow::Result;

use crate::cli::{GlobalOpts, SliceOpts};
use crate::engine::{EngineContext, EngineHandle, OperationResult};
use crate::error::SlicerError;
use crate::logging::{Log, Logger};
use crate::resolver::overrides::collect_overrides;
use crate::stages::{self, SlicingParams};

/// Run the slice command.
///
/// # Errors
///
/// Returns an error if the overrides are malformed, the session cannot be
/// opened, or any stage fails.
pub fn run(global: &GlobalOpts, opts: &SliceOpts, verbose: bool, log: &Logger) -> Result<()> {
    let params = params_from(opts, verbose)?;
    log.info(&format!("input: {}", params.input.display()));
    log.info(&format!("output: {}", params.output.display()));

    let handle = EngineHandle::new(super::open_session(global, log)?);
    let result = {
        let mut session = handle.checkout();
        slice_with(&mut session, &params, log)
    };
    handle.into_inner().shutdown();

    log.print_summary();
    result.map(|_| ())
}

/// Build request parameters from the command line.
///
/// # Errors
///
/// Returns an error if a `--set` argument is malformed.
pub fn params_from(opts: &SliceOpts, verbose: bool) -> Result<SlicingParams, SlicerError> {
    Ok(SlicingParams {
        input: opts.input.clone(),
        output: opts.output.clone(),
        config_file: opts.config.clone(),
        printer: opts.printer.clone(),
        filament: opts.filament.clone(),
        process: opts.process.clone(),
        plate: opts.plate,
        overrides: collect_overrides(&opts.set)?,
        verbose,
        dry_run: opts.dry_run,
        strict_presets: opts.strict_presets,
    })
}

/// Slice with an open session and report the outcome.
///
/// # Errors
///
/// Returns the pipeline error; its message and details are logged first.
pub fn slice_with(
    context: &mut EngineContext,
    params: &SlicingParams,
    log: &dyn Log,
) -> Result<OperationResult> {
    for (key, value) in &params.overrides {
        log.debug(&format!("override set: {key}={value}"));
    }
    match stages::run(context, params, log) {
        Ok(result) => {
            log.info(&result.message);
            Ok(result)
        }
        Err(e) => {
            let result = OperationResult::from(&e);
            log.error(&format!("Slicing failed: {}", result.message));
            if !result.error_details.is_empty() {
                log.debug(&format!("details: {}", result.error_details));
            }
            Err(e.into())
        }
    }
}
