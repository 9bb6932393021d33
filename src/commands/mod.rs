//! Subcommand implementations.
pub mod info;
pub mod list_profiles;
pub mod slice;
pub mod version;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context as _, Result};

use crate::cli::GlobalOpts;
use crate::config::Settings;
use crate::config::settings::resolve_resources;
use crate::engine::{Engine, EngineContext, ProcessEngine};
use crate::exec::SystemExecutor;
use crate::logging::Log;

/// Start an engine session for a command.
///
/// Loads the settings, locates the resources directory and initialises the
/// engine bridge named by `--engine` or the settings file.
///
/// # Errors
///
/// Returns an error if the settings cannot be parsed, no resources
/// directory is found, or the engine or preset library fails to load.
pub fn open_session(global: &GlobalOpts, log: &dyn Log) -> Result<EngineContext> {
    let settings =
        Settings::discover(global.settings.as_deref()).context("failed to load settings")?;
    let resources = resolve_resources(global.resources.as_deref(), &settings)?;
    let bridge = global
        .engine
        .clone()
        .unwrap_or_else(|| settings.engine.clone());
    log.debug(&format!("engine bridge: {}", bridge.display()));

    let engine = ProcessEngine::new(bridge, Arc::new(SystemExecutor));
    open_session_with(Box::new(engine), settings, &resources, log)
}

/// Initialise `engine` against `resources`.
///
/// # Errors
///
/// Returns an error if the engine or the preset library fails to load.
pub fn open_session_with(
    engine: Box<dyn Engine>,
    settings: Settings,
    resources: &Path,
    log: &dyn Log,
) -> Result<EngineContext> {
    log.stage("Initializing engine");
    log.info(&format!("resources: {}", resources.display()));

    let mut context = EngineContext::new(engine, settings);
    context
        .initialize(resources)
        .context("failed to initialize the engine")?;

    let presets = context.presets();
    log.info(&format!(
        "loaded {} printers, {} filaments, {} processes",
        presets.printers.len(),
        presets.filaments.len(),
        presets.processes.len()
    ));
    log.debug(&format!("{} printer models", presets.model_count()));
    Ok(context)
}
