//! Domain-specific error types for the slicing front end.
//!
//! Library modules return typed errors (e.g. [`ConfigError`],
//! [`PresetError`]) and the request pipeline aggregates them in
//! [`SlicerError`]. Command handlers at the CLI boundary convert them to
//! [`anyhow::Error`] via `?`, and `main` maps them back to an [`ErrorCode`].
//!
//! # Error hierarchy
//!
//! ```text
//! SlicerError
//! ├── Config(ConfigError)    : schema validation, aliases, override parsing
//! ├── Preset(PresetError)    : preset lookup, selection order, library loading
//! ├── Model(ModelError)      : input model validation
//! └── Engine(EngineError)    : failures reported by the external engine
//! ```
//!
//! [`ProjectError`] is never returned: project inconsistencies are resolved
//! with a first-occurrence-wins rule and only logged.
use std::path::PathBuf;

use thiserror::Error;

use crate::presets::PresetCategory;

/// Top-level error type for a slice request.
#[derive(Error, Debug)]
pub enum SlicerError {
    /// Configuration validation error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Preset resolution error.
    #[error("Preset error: {0}")]
    Preset(#[from] PresetError),

    /// Input model error.
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    /// External engine error.
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),
}

impl SlicerError {
    /// Human-readable message naming the offending key, preset or operation.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Config(e) => e.to_string(),
            Self::Preset(e) => e.to_string(),
            Self::Model(e) => e.to_string(),
            Self::Engine(e) => e.to_string(),
        }
    }

    /// Underlying cause, suitable for the `error_details` of a result.
    #[must_use]
    pub fn detail(&self) -> Option<String> {
        match self {
            Self::Config(e) => e.detail(),
            Self::Preset(e) => e.detail(),
            Self::Model(_) => None,
            Self::Engine(e) => e.detail(),
        }
    }

    /// Process exit code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Config(_)
            | Self::Preset(PresetError::NotFound { .. } | PresetError::NoPrinterSelected { .. }) => {
                ErrorCode::ConfigurationError
            }
            Self::Preset(_) | Self::Engine(EngineError::NotInitialized) => {
                ErrorCode::InitializationError
            }
            Self::Model(ModelError::NotFound { .. }) => ErrorCode::FileNotFound,
            Self::Model(_) => ErrorCode::InvalidFile,
            Self::Engine(_) => ErrorCode::SlicingError,
        }
    }
}

/// Errors that arise while validating and merging configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The key is not part of the engine schema.
    #[error("Unknown configuration key '{key}'")]
    UnknownKey {
        /// The rejected key.
        key: String,
    },

    /// The value cannot be parsed as the kind of its key.
    #[error("Invalid value '{value}' for '{key}': {reason}")]
    InvalidValue {
        /// Key being set.
        key: String,
        /// Raw value supplied.
        value: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// A bed temperature alias cannot be mapped for the active bed type.
    #[error("Cannot resolve '{alias}' for bed type '{bed_type}'")]
    AliasResolution {
        /// Alias key that was requested.
        alias: String,
        /// The active bed type.
        bed_type: String,
    },

    /// A CLI override segment is not of the form `key=value`.
    #[error("Malformed override '{segment}': expected key=value")]
    MalformedOverride {
        /// The offending segment.
        segment: String,
    },

    /// An I/O error occurred while reading a configuration file.
    #[error("IO error reading config file {}: {source}", .path.display())]
    Io {
        /// Path to the file that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// An override file has invalid syntax.
    #[error("Invalid syntax in {}: {message}", .path.display())]
    InvalidSyntax {
        /// Path to the file.
        path: PathBuf,
        /// Parser message.
        message: String,
    },
}

impl ConfigError {
    fn detail(&self) -> Option<String> {
        match self {
            Self::UnknownKey { .. } => {
                Some("the key is not part of the engine configuration schema".to_string())
            }
            Self::InvalidValue { reason, .. } => Some(reason.clone()),
            Self::AliasResolution { bed_type, .. } => Some(format!(
                "'{bed_type}' is not a known bed type (expected one of: {})",
                crate::resolver::BedType::ALL
                    .iter()
                    .map(|b| b.config_name())
                    .collect::<Vec<_>>()
                    .join(", ")
            )),
            Self::MalformedOverride { .. } => None,
            Self::Io { source, .. } => Some(source.to_string()),
            Self::InvalidSyntax { message, .. } => Some(message.clone()),
        }
    }
}

/// Errors that arise from preset lookup and selection.
#[derive(Error, Debug)]
pub enum PresetError {
    /// No preset of `category` matches `name`, after all fallbacks.
    #[error("{category} preset not found: {name}")]
    NotFound {
        /// Category searched.
        category: PresetCategory,
        /// Requested name (or the candidates tried, joined by ` | `).
        name: String,
    },

    /// A filament or process was requested before a printer was selected.
    #[error("Cannot select a {category} preset before a printer is selected")]
    NoPrinterSelected {
        /// Category that was requested.
        category: PresetCategory,
    },

    /// A preset's `inherits` chain loops back on itself.
    #[error("Circular inheritance detected for {category} preset '{name}'")]
    CircularInheritance {
        /// Category of the preset.
        category: PresetCategory,
        /// Preset whose chain could not be resolved.
        name: String,
    },

    /// A preset's `inherits` chain has more links than allowed.
    #[error("Inheritance chain of {category} preset '{name}' exceeds {limit} levels")]
    InheritanceTooDeep {
        /// Category of the preset.
        category: PresetCategory,
        /// Preset whose chain could not be resolved.
        name: String,
        /// Maximum number of presets in a chain.
        limit: usize,
    },

    /// The preset library directory does not exist.
    #[error("Preset library not found at {}", .path.display())]
    LibraryMissing {
        /// Expected library directory.
        path: PathBuf,
    },

    /// A preset library directory could not be read.
    #[error("IO error reading preset library {}: {source}", .path.display())]
    Io {
        /// Directory or file being read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

impl PresetError {
    fn detail(&self) -> Option<String> {
        match self {
            Self::NotFound { category, .. } => Some(format!(
                "no {category} preset matched by name, alias or fallback"
            )),
            Self::NoPrinterSelected { .. } => Some(
                "filament and process presets are only meaningful for a selected printer"
                    .to_string(),
            ),
            Self::InheritanceTooDeep { limit, .. } => Some(format!(
                "a preset may inherit through at most {} ancestors",
                limit.saturating_sub(1)
            )),
            Self::CircularInheritance { .. } | Self::LibraryMissing { .. } => None,
            Self::Io { source, .. } => Some(source.to_string()),
        }
    }
}

/// Inconsistencies found in project data.
///
/// These are recovered locally (first occurrence wins) and logged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProjectError {
    /// The project contradicts itself; the first occurrence was kept.
    #[error("Inconsistent project data: {0}")]
    InconsistentProjectData(String),
}

/// Errors that arise from validating the input model.
#[derive(Error, Debug)]
pub enum ModelError {
    /// The model file does not exist.
    #[error("Model file not found: {}", .path.display())]
    NotFound {
        /// Requested path.
        path: PathBuf,
    },

    /// The extension is not one the engine can load.
    #[error("Unsupported model format '{extension}' (expected .3mf, .stl or .obj)")]
    UnsupportedFormat {
        /// Extension found on the path.
        extension: String,
    },

    /// The model file is empty.
    #[error("Model file is empty: {}", .path.display())]
    Empty {
        /// Requested path.
        path: PathBuf,
    },

    /// The engine loaded the model but cannot slice it.
    #[error("Model is not valid: {}", .path.display())]
    Invalid {
        /// Requested path.
        path: PathBuf,
    },
}

/// Errors reported by, or on the way to, the external engine.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The engine reported a failure; message and detail are verbatim.
    #[error("{operation} failed: {message}")]
    Delegation {
        /// Engine operation that failed.
        operation: String,
        /// Message reported by the engine.
        message: String,
        /// Detail reported by the engine, if any.
        detail: Option<String>,
    },

    /// An operation was requested before `initialize`.
    #[error("Engine is not initialized")]
    NotInitialized,

    /// An operation needs a loaded model.
    #[error("No model is loaded")]
    NoModelLoaded,
}

impl EngineError {
    fn detail(&self) -> Option<String> {
        match self {
            Self::Delegation { detail, .. } => detail.clone(),
            Self::NotInitialized | Self::NoModelLoaded => None,
        }
    }
}

/// Process exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ErrorCode {
    /// Command-line arguments were invalid.
    InvalidArguments = 1,
    /// An input file does not exist.
    FileNotFound = 2,
    /// An input file cannot be used.
    InvalidFile = 3,
    /// Configuration or preset resolution failed.
    ConfigurationError = 4,
    /// The engine failed while slicing.
    SlicingError = 5,
    /// The engine or preset library could not be initialised.
    InitializationError = 6,
    /// Any other failure.
    InternalError = 7,
}

impl ErrorCode {
    /// Exit code for an error surfaced at the CLI boundary.
    #[must_use]
    pub fn from_error(err: &anyhow::Error) -> Self {
        err.chain()
            .find_map(|cause| cause.downcast_ref::<SlicerError>())
            .map_or(Self::InternalError, SlicerError::code)
    }

    /// Numeric value passed to the operating system.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io;

    // -----------------------------------------------------------------------
    // ConfigError
    // -----------------------------------------------------------------------

    #[test]
    fn unknown_key_names_the_key() {
        let e = ConfigError::UnknownKey {
            key: "layer_hieght".to_string(),
        };
        assert_eq!(e.to_string(), "Unknown configuration key 'layer_hieght'");
        assert!(e.detail().is_some());
    }

    #[test]
    fn alias_resolution_detail_lists_bed_types() {
        let e = ConfigError::AliasResolution {
            alias: "bed_temperature".to_string(),
            bed_type: "Glass".to_string(),
        };
        assert_eq!(
            e.to_string(),
            "Cannot resolve 'bed_temperature' for bed type 'Glass'"
        );
        let detail = e.detail().unwrap();
        assert!(detail.contains("High Temp Plate"), "detail: {detail}");
    }

    #[test]
    fn config_io_has_source() {
        use std::error::Error as StdError;
        let e = ConfigError::Io {
            path: PathBuf::from("/tmp/overrides.ini"),
            source: io::Error::new(io::ErrorKind::NotFound, "no such file"),
        };
        assert!(e.source().is_some());
        assert!(e.to_string().contains("/tmp/overrides.ini"));
    }

    // -----------------------------------------------------------------------
    // PresetError
    // -----------------------------------------------------------------------

    #[test]
    fn preset_not_found_names_category_and_request() {
        let e = PresetError::NotFound {
            category: PresetCategory::Filament,
            name: "Generic PLA @Mystery".to_string(),
        };
        assert_eq!(
            e.to_string(),
            "filament preset not found: Generic PLA @Mystery"
        );
    }

    #[test]
    fn no_printer_selected_display() {
        let e = PresetError::NoPrinterSelected {
            category: PresetCategory::Process,
        };
        assert_eq!(
            e.to_string(),
            "Cannot select a process preset before a printer is selected"
        );
    }

    #[test]
    fn inheritance_depth_and_cycle_read_differently() {
        let deep = SlicerError::from(PresetError::InheritanceTooDeep {
            category: PresetCategory::Filament,
            name: "My PLA".to_string(),
            limit: 10,
        });
        assert_eq!(
            deep.message(),
            "Inheritance chain of filament preset 'My PLA' exceeds 10 levels"
        );
        assert_eq!(
            deep.detail().as_deref(),
            Some("a preset may inherit through at most 9 ancestors")
        );
        assert_eq!(deep.code(), ErrorCode::InitializationError);

        let cycle = PresetError::CircularInheritance {
            category: PresetCategory::Filament,
            name: "My PLA".to_string(),
        };
        assert!(cycle.to_string().starts_with("Circular inheritance"));
    }

    // -----------------------------------------------------------------------
    // EngineError
    // -----------------------------------------------------------------------

    #[test]
    fn engine_delegation_is_verbatim() {
        let e = SlicerError::from(EngineError::Delegation {
            operation: "process".to_string(),
            message: "Nothing to be sliced".to_string(),
            detail: Some("plate 2 is empty".to_string()),
        });
        assert_eq!(e.message(), "process failed: Nothing to be sliced");
        assert_eq!(e.detail().as_deref(), Some("plate 2 is empty"));
        assert_eq!(e.code(), ErrorCode::SlicingError);
    }

    // -----------------------------------------------------------------------
    // Exit codes
    // -----------------------------------------------------------------------

    #[test]
    fn exit_codes_follow_error_kind() {
        let unknown = SlicerError::from(ConfigError::UnknownKey { key: "x".into() });
        assert_eq!(unknown.code(), ErrorCode::ConfigurationError);

        let missing = SlicerError::from(ModelError::NotFound {
            path: PathBuf::from("a.stl"),
        });
        assert_eq!(missing.code().as_u8(), 2);

        let library = SlicerError::from(PresetError::LibraryMissing {
            path: PathBuf::from("/nowhere"),
        });
        assert_eq!(library.code(), ErrorCode::InitializationError);
    }

    #[test]
    fn exit_code_found_through_anyhow_context() {
        let err = anyhow::Error::from(SlicerError::from(ModelError::UnsupportedFormat {
            extension: "step".into(),
        }))
        .context("validating model");
        assert_eq!(ErrorCode::from_error(&err), ErrorCode::InvalidFile);

        let other = anyhow::anyhow!("boom");
        assert_eq!(ErrorCode::from_error(&other), ErrorCode::InternalError);
    }

    #[test]
    fn errors_are_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SlicerError>();
        assert_send_sync::<ProjectError>();
    }
}
