//! Config Resolver: merges the override layers on top of the preset
//! configuration in precedence order.
//!
//! Precedence, highest first:
//!
//! 1. CLI overrides (`--set`, `--config`)
//! 2. project-level overrides extracted from the project file
//! 3. print-profile deltas extracted from the project file
//! 4. the selected presets
//! 5. engine defaults
//!
//! Layers 4 and 5 arrive pre-combined from
//! [`PresetBundle::full_config`](crate::presets::PresetBundle::full_config).
pub mod bed;
pub mod overrides;

use std::collections::BTreeMap;

pub use bed::{BED_TYPE_KEY, BedAlias, BedAliasMap, BedType};

use crate::config::{ConfigDictionary, OverrideSet};
use crate::error::ConfigError;

/// Effective configuration for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    /// The merged configuration.
    pub config: ConfigDictionary,
    /// CLI values as applied, keyed by concrete (alias-resolved) key.
    pub cli: OverrideSet,
}

/// Merges configuration layers; holds the bed alias table.
#[derive(Debug, Clone, Default)]
pub struct ConfigResolver {
    aliases: BedAliasMap,
}

impl ConfigResolver {
    /// Create a resolver using `aliases` for bed temperature aliases.
    #[must_use]
    pub const fn new(aliases: BedAliasMap) -> Self {
        Self { aliases }
    }

    /// Merge print deltas, project overrides and CLI overrides onto `base`.
    ///
    /// `base` is never modified; on error nothing is returned, so a half
    /// merged configuration cannot reach the engine.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownKey`], [`ConfigError::InvalidValue`] or
    /// [`ConfigError::AliasResolution`] for the first CLI override that fails.
    pub fn resolve(
        &self,
        base: &ConfigDictionary,
        cli: &BTreeMap<String, String>,
        project: &OverrideSet,
        print: &OverrideSet,
    ) -> Result<Resolution, ConfigError> {
        let mut config = base.clone();
        config.apply_overrides(print);
        config.apply_overrides(project);
        let cli = self.apply_cli_overrides(&mut config, cli)?;
        Ok(Resolution { config, cli })
    }

    /// Validate and apply CLI overrides as one transaction.
    ///
    /// The bed type is applied first so temperature aliases resolve against
    /// it, and is stored under its configuration name whichever spelling was
    /// given. `config` is only replaced once every override has been applied;
    /// on error it is left exactly as it was.
    ///
    /// # Errors
    ///
    /// Returns the first validation error.
    pub fn apply_cli_overrides(
        &self,
        config: &mut ConfigDictionary,
        overrides: &BTreeMap<String, String>,
    ) -> Result<OverrideSet, ConfigError> {
        let mut working = config.clone();
        let mut applied = OverrideSet::new();
        for (key, raw) in overrides::application_order(overrides) {
            let target = self
                .aliases
                .resolve_key(&key, working.get_str(BED_TYPE_KEY))?
                .map_or(key, str::to_string);
            let raw = if target == BED_TYPE_KEY {
                let bed: BedType = raw.parse().map_err(|_| ConfigError::AliasResolution {
                    alias: target.clone(),
                    bed_type: raw.clone(),
                })?;
                bed.config_name().to_string()
            } else {
                raw
            };
            let value = working.set_raw(&target, &raw)?;
            applied.insert(target, value);
        }
        *config = working;
        Ok(applied)
    }

    /// Re-assert hook run immediately before the engine is invoked.
    ///
    /// Re-applies the project overrides (preset synchronization may have
    /// overwritten them since [`resolve`](Self::resolve)) and then the
    /// validated CLI values, so CLI overrides keep the highest precedence.
    /// Idempotent.
    pub fn reassert(&self, config: &mut ConfigDictionary, project: &OverrideSet, cli: &OverrideSet) {
        config.apply_overrides(project);
        config.apply_overrides(cli);
    }
}
