//! Command: print version information.

/// Version reported by the binary: `ORCASLICER_CLI_VERSION` from the build,
/// else the crate version.
pub const VERSION: &str = match option_env!("ORCASLICER_CLI_VERSION") {
    Some(version) => version,
    None => env!("CARGO_PKG_VERSION"),
};

/// Print the version to stdout.
pub fn run() {
    println!("orcaslicer-cli {VERSION}");
}
