//! Command-line interface definition.
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::filter::LevelFilter;

/// Top-level CLI entry point for the slicing front end.
#[derive(Parser, Debug)]
#[command(
    name = "orcaslicer-cli",
    about = "Resolve slicing configuration and drive the OrcaSlicer engine",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(flatten)]
    pub global: GlobalOpts,
}

impl Cli {
    /// Console log level: `--log-level` wins, then `--verbose`, then `--quiet`.
    #[must_use]
    pub fn console_level(&self) -> LevelFilter {
        match (self.global.log_level, self.verbose, self.global.quiet) {
            (Some(level), _, _) => level.into(),
            (None, true, _) => LevelFilter::DEBUG,
            (None, false, true) => LevelFilter::ERROR,
            (None, false, false) => LevelFilter::INFO,
        }
    }
}

/// Options shared across all subcommands.
#[derive(Parser, Debug, Clone, Default)]
pub struct GlobalOpts {
    /// Only print errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Console log level
    #[arg(long, global = true, value_enum)]
    pub log_level: Option<LogLevel>,

    /// OrcaSlicer resources directory (contains `profiles/`)
    #[arg(long, global = true)]
    pub resources: Option<PathBuf>,

    /// Settings file (default: $XDG_CONFIG_HOME/orcaslicer-cli/config.toml)
    #[arg(long, global = true)]
    pub settings: Option<PathBuf>,

    /// Engine bridge executable
    #[arg(long, global = true)]
    pub engine: Option<PathBuf>,
}

/// Console log levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    /// Errors only
    Error,
    /// Warnings and errors
    Warn,
    /// Progress messages
    Info,
    /// Resolution details
    Debug,
    /// Everything
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => Self::ERROR,
            LogLevel::Warn => Self::WARN,
            LogLevel::Info => Self::INFO,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Trace => Self::TRACE,
        }
    }
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Slice a model or project file
    Slice(SliceOpts),
    /// Show model information
    Info(InfoOpts),
    /// List available printer, filament and process profiles
    ListProfiles(ListProfilesOpts),
    /// Print version information
    Version,
}

impl Command {
    /// Name used for the log file.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Slice(_) => "slice",
            Self::Info(_) => "info",
            Self::ListProfiles(_) => "list-profiles",
            Self::Version => "version",
        }
    }
}

/// Options for the `slice` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct SliceOpts {
    /// Input model or project (.3mf, .stl, .obj)
    #[arg(short, long)]
    pub input: PathBuf,

    /// Output file
    #[arg(short, long)]
    pub output: PathBuf,

    /// Override file (key = value lines or a JSON object)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Printer profile name
    #[arg(long)]
    pub printer: Option<String>,

    /// Filament profile name
    #[arg(long)]
    pub filament: Option<String>,

    /// Process profile name
    #[arg(long)]
    pub process: Option<String>,

    /// Plate to slice, 1-based (0 lets the project decide)
    #[arg(long, default_value_t = 1)]
    pub plate: usize,

    /// Override settings: key=value[,key=value...]
    #[arg(short, long = "set")]
    pub set: Vec<String>,

    /// Resolve everything but do not slice
    #[arg(short = 'd', long)]
    pub dry_run: bool,

    /// Fail when a filament or process cannot be resolved
    #[arg(long)]
    pub strict_presets: bool,
}

/// Options for the `info` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct InfoOpts {
    /// Input model or project
    #[arg(short, long)]
    pub input: PathBuf,
}

/// Options for the `list-profiles` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct ListProfilesOpts {
    /// Profile type to list
    #[arg(long = "type", value_enum, default_value_t = ProfileType::All)]
    pub profile_type: ProfileType,
}

/// Profile categories for `list-profiles`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProfileType {
    /// All categories
    All,
    /// Printer profiles
    Printer,
    /// Filament profiles
    Filament,
    /// Process profiles
    Process,
}
