//! Application settings and resource directory discovery.
use anyhow::{Result, bail};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use super::toml_loader;

/// Environment variable naming the settings file.
pub const SETTINGS_ENV: &str = "ORCASLICER_CLI_CONFIG";

/// Environment variable naming the resources directory.
pub const RESOURCES_ENV: &str = "ORCASLICER_RESOURCES";

/// Resource locations tried, in order, relative to the working directory
/// and to the executable's directory.
pub const RESOURCE_SEARCH_PATHS: &[&str] = &[
    "OrcaSlicer/resources",
    "./OrcaSlicer/resources",
    "../OrcaSlicer/resources",
    "../../OrcaSlicer/resources",
    "/usr/share/orcaslicer/resources",
    "/usr/local/share/orcaslicer/resources",
];

/// Settings read from `config.toml`.
///
/// Every field has a default, so a missing file is valid.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Resources directory containing `profiles/`.
    pub resources: Option<PathBuf>,
    /// Engine bridge executable.
    pub engine: PathBuf,
    /// Naming conventions used to derive preset names.
    pub naming: NamingConventions,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            resources: None,
            engine: PathBuf::from("orcaslicer-engine"),
            naming: NamingConventions::default(),
        }
    }
}

/// Conventions for deriving filament and process names from a printer model.
///
/// With the defaults, the printer model `Bambu Lab A1` yields the derived
/// filament `Bambu PLA Basic @BBL A1` and process `0.20mm Standard @BBL A1`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct NamingConventions {
    /// Vendor prefix of printer model names (stripped to get the suffix).
    pub vendor_prefix: String,
    /// Vendor tag used after `@` in system preset names.
    pub vendor_tag: String,
    /// Filament used when the project names none.
    pub base_filament: String,
    /// Process used when the project names none.
    pub base_process: String,
}

impl Default for NamingConventions {
    fn default() -> Self {
        Self {
            vendor_prefix: "Bambu Lab ".to_string(),
            vendor_tag: "BBL".to_string(),
            base_filament: "Bambu PLA Basic".to_string(),
            base_process: "0.20mm Standard".to_string(),
        }
    }
}

impl NamingConventions {
    /// The `@<tag> <model>` suffix for a printer model, e.g. `@BBL A1`.
    #[must_use]
    pub fn model_suffix(&self, printer_model: &str) -> String {
        let short = printer_model
            .strip_prefix(&self.vendor_prefix)
            .unwrap_or(printer_model)
            .trim();
        format!("@{} {short}", self.vendor_tag)
    }

    /// Recover a printer model from a preset name ending in `@<tag> <model>`.
    ///
    /// `"0.20mm Standard @BBL X1C"` yields `"Bambu Lab X1C"`.
    #[must_use]
    pub fn model_from_suffixed_name(&self, name: &str) -> Option<String> {
        let marker = format!("@{} ", self.vendor_tag);
        let (_, short) = name.split_once(&marker)?;
        let short = short.trim();
        (!short.is_empty()).then(|| format!("{}{short}", self.vendor_prefix))
    }
}

impl Settings {
    /// Load settings from `path`; a missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        toml_loader::load_config(path)
    }

    /// Locate the settings file: explicit flag, then `ORCASLICER_CLI_CONFIG`,
    /// then `$XDG_CONFIG_HOME/orcaslicer-cli/config.toml`.
    #[must_use]
    pub fn locate(explicit: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(path.to_path_buf());
        }
        if let Ok(path) = std::env::var(SETTINGS_ENV) {
            return Some(PathBuf::from(path));
        }
        let config_home = std::env::var("XDG_CONFIG_HOME").map_or_else(
            |_| {
                std::env::var("HOME")
                    .or_else(|_| std::env::var("USERPROFILE"))
                    .ok()
                    .map(|home| PathBuf::from(home).join(".config"))
            },
            |dir| Some(PathBuf::from(dir)),
        )?;
        Some(config_home.join("orcaslicer-cli").join("config.toml"))
    }

    /// Load the settings file found by [`Settings::locate`].
    ///
    /// # Errors
    ///
    /// Returns an error if the located file cannot be parsed.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        Self::locate(explicit).map_or_else(|| Ok(Self::default()), |path| Self::load(&path))
    }
}

/// Resolve the resources directory.
///
/// Order: explicit flag, settings file, `ORCASLICER_RESOURCES`, then
/// [`RESOURCE_SEARCH_PATHS`] relative to the working directory and to the
/// executable.
///
/// # Errors
///
/// Returns an error if no candidate contains a `profiles` directory.
pub fn resolve_resources(explicit: Option<&Path>, settings: &Settings) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    if let Some(path) = &settings.resources {
        return Ok(path.clone());
    }
    if let Ok(path) = std::env::var(RESOURCES_ENV) {
        return Ok(PathBuf::from(path));
    }

    let mut bases = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        bases.push(cwd);
    }
    if let Ok(exe) = std::env::current_exe()
        && let Some(parent) = exe.parent()
    {
        bases.push(parent.to_path_buf());
    }

    if let Some(found) = find_resources_in(&bases) {
        return Ok(found);
    }

    bail!("cannot locate OrcaSlicer resources. Use --resources or set {RESOURCES_ENV}");
}

/// First search-path candidate under any of `bases` that holds `profiles/`.
#[must_use]
pub fn find_resources_in(bases: &[PathBuf]) -> Option<PathBuf> {
    bases
        .iter()
        .flat_map(|base| RESOURCE_SEARCH_PATHS.iter().map(move |rel| base.join(rel)))
        .find(|candidate| candidate.join("profiles").is_dir())
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_vendor_conventions() {
        let settings = Settings::default();
        assert_eq!(settings.naming.vendor_tag, "BBL");
        assert_eq!(settings.naming.base_filament, "Bambu PLA Basic");
        assert!(settings.resources.is_none());
    }

    #[test]
    fn load_reads_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "resources = \"/opt/orca/resources\"\n\n[naming]\nbase_filament = \"Generic PLA\"\n",
        )
        .unwrap();
        let settings = Settings::load(&path).unwrap();
        assert_eq!(
            settings.resources.as_deref(),
            Some(Path::new("/opt/orca/resources"))
        );
        assert_eq!(settings.naming.base_filament, "Generic PLA");
        assert_eq!(settings.naming.vendor_tag, "BBL", "unset fields keep defaults");
    }

    #[test]
    fn load_rejects_unknown_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "resourcez = \"/typo\"\n").unwrap();
        assert!(Settings::load(&path).is_err());
    }

    #[test]
    fn locate_prefers_explicit_path() {
        let explicit = Path::new("/etc/orcaslicer-cli.toml");
        assert_eq!(
            Settings::locate(Some(explicit)).as_deref(),
            Some(explicit)
        );
    }

    #[test]
    fn model_suffix_strips_vendor_prefix() {
        let naming = NamingConventions::default();
        assert_eq!(naming.model_suffix("Bambu Lab A1 mini"), "@BBL A1 mini");
        assert_eq!(naming.model_suffix("Voron 2.4"), "@BBL Voron 2.4");
    }

    #[test]
    fn model_from_suffixed_name_round_trips() {
        let naming = NamingConventions::default();
        assert_eq!(
            naming
                .model_from_suffixed_name("0.20mm Standard @BBL X1C")
                .as_deref(),
            Some("Bambu Lab X1C")
        );
        assert!(naming.model_from_suffixed_name("0.20mm Standard").is_none());
    }

    #[test]
    fn resolve_resources_uses_explicit_then_settings() {
        let explicit = Path::new("/explicit/resources");
        let settings = Settings {
            resources: Some(PathBuf::from("/from/settings")),
            ..Settings::default()
        };
        assert_eq!(
            resolve_resources(Some(explicit), &settings).unwrap(),
            PathBuf::from("/explicit/resources")
        );
        assert_eq!(
            resolve_resources(None, &settings).unwrap(),
            PathBuf::from("/from/settings")
        );
    }

    #[test]
    fn find_resources_in_requires_profiles_dir() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().to_path_buf();
        assert!(find_resources_in(std::slice::from_ref(&base)).is_none());

        std::fs::create_dir_all(base.join("OrcaSlicer/resources/profiles")).unwrap();
        let found = find_resources_in(&[base.clone()]).unwrap();
        assert!(found.ends_with("OrcaSlicer/resources"));
    }
}
