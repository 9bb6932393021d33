//! Session state: an engine, its defaults, and the preset library.
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::Engine;
use crate::config::{ConfigDictionary, Settings};
use crate::error::{EngineError, SlicerError};
use crate::presets::{PresetBundle, loader};

/// Owns the engine and the process-wide preset library.
///
/// Nothing is shared implicitly: whoever holds the context (usually through
/// an [`EngineHandle`] checkout) is the only one driving the engine.
pub struct EngineContext {
    engine: Box<dyn Engine>,
    settings: Settings,
    resources: Option<PathBuf>,
    defaults: Option<ConfigDictionary>,
    presets: PresetBundle,
}

impl fmt::Debug for EngineContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineContext")
            .field("engine", &self.engine)
            .field("resources", &self.resources)
            .field("initialized", &self.defaults.is_some())
            .field("printers", &self.presets.printers.len())
            .field("filaments", &self.presets.filaments.len())
            .field("processes", &self.presets.processes.len())
            .finish_non_exhaustive()
    }
}

impl EngineContext {
    /// Wrap an engine; nothing is loaded until [`initialize`](Self::initialize).
    #[must_use]
    pub fn new(engine: Box<dyn Engine>, settings: Settings) -> Self {
        Self {
            engine,
            settings,
            resources: None,
            defaults: None,
            presets: PresetBundle::new(),
        }
    }

    /// Start the engine and load the preset library from `resources`.
    ///
    /// Re-initialising first shuts the previous session down.
    ///
    /// # Errors
    ///
    /// Returns an engine error if the engine cannot start and a preset error
    /// if the library is missing or unreadable.
    pub fn initialize(&mut self, resources: &Path) -> Result<(), SlicerError> {
        if self.is_initialized() {
            self.shutdown();
        }
        let defaults = self.engine.initialize(resources)?;
        tracing::debug!(
            "engine initialized with {} configuration keys",
            defaults.schema().len()
        );
        let presets = match loader::load_library(resources) {
            Ok(presets) => presets,
            Err(e) => {
                self.engine.shutdown();
                return Err(e.into());
            }
        };
        self.presets = presets;
        self.defaults = Some(defaults);
        self.resources = Some(resources.to_path_buf());
        Ok(())
    }

    /// Return `true` once [`initialize`](Self::initialize) has succeeded.
    #[must_use]
    pub const fn is_initialized(&self) -> bool {
        self.defaults.is_some()
    }

    /// Engine defaults, which also carry the schema.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotInitialized`] before initialisation.
    pub fn defaults(&self) -> Result<&ConfigDictionary, EngineError> {
        self.defaults.as_ref().ok_or(EngineError::NotInitialized)
    }

    /// The preset library.
    #[must_use]
    pub const fn presets(&self) -> &PresetBundle {
        &self.presets
    }

    /// Application settings.
    #[must_use]
    pub const fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Resources directory of the current session.
    #[must_use]
    pub fn resources(&self) -> Option<&Path> {
        self.resources.as_deref()
    }

    /// The engine, for delegated calls.
    pub fn engine_mut(&mut self) -> &mut dyn Engine {
        self.engine.as_mut()
    }

    /// The engine, for read-only calls.
    #[must_use]
    pub fn engine(&self) -> &dyn Engine {
        self.engine.as_ref()
    }

    /// Shut the engine down and drop the preset library.
    pub fn shutdown(&mut self) {
        self.engine.shutdown();
        self.presets.reset();
        self.defaults = None;
        self.resources = None;
    }
}

/// Serialises access to an [`EngineContext`].
#[derive(Debug)]
pub struct EngineHandle {
    inner: Mutex<EngineContext>,
}

impl EngineHandle {
    /// Wrap `context`.
    #[must_use]
    pub const fn new(context: EngineContext) -> Self {
        Self {
            inner: Mutex::new(context),
        }
    }

    /// Take exclusive use of the context until the returned guard is dropped.
    ///
    /// A context left behind by a panicking holder is still handed out; its
    /// state is whatever the last completed engine call left.
    pub fn checkout(&self) -> EngineCheckout<'_> {
        let guard = self.inner.lock().unwrap_or_else(|poisoned| {
            tracing::warn!("engine context was poisoned by a previous request");
            PoisonError::into_inner(poisoned)
        });
        tracing::debug!("engine checked out");
        EngineCheckout { guard }
    }

    /// Consume the handle and return the context.
    pub fn into_inner(self) -> EngineContext {
        self.inner.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Exclusive access to an [`EngineContext`]; checks it back in on drop.
#[derive(Debug)]
pub struct EngineCheckout<'a> {
    guard: MutexGuard<'a, EngineContext>,
}

impl Deref for EngineCheckout<'_> {
    type Target = EngineContext;

    fn deref(&self) -> &Self::Target {
        &self.guard
    }
}

impl DerefMut for EngineCheckout<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.guard
    }
}

impl Drop for EngineCheckout<'_> {
    fn drop(&mut self) {
        tracing::debug!("engine checked in");
    }
}
