//! Configuration: the engine's typed configuration dictionary, override
//! files, and the application's own settings.
mod dictionary;
pub mod overrides_file;
pub mod settings;
pub mod toml_loader;
mod value;

pub use dictionary::{ConfigDictionary, ConfigSchema, FragmentReport, OverrideSet};
pub use settings::{NamingConventions, Settings};
pub use value::{ConfigValue, ValueKind, parse_bool};
