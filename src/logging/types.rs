//! Core logging types: stage entries, status, and the [`Log`] trait.

/// Pipeline stage result for summary reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageEntry {
    /// Human-readable stage name.
    pub name: String,
    /// Final status of the stage.
    pub status: StageStatus,
    /// Optional detail message (e.g., skip reason or error description).
    pub message: Option<String>,
}

/// Status of a completed stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageStatus {
    /// Stage completed successfully.
    Ok,
    /// Stage had nothing to do (e.g., no project data in an STL file).
    Skipped,
    /// Stage stopped short because of `--dry-run`.
    DryRun,
    /// Stage failed; the request was aborted.
    Failed,
}

/// Abstraction over logging backends.
///
/// [`Logger`](super::logger::Logger) writes through `tracing` and collects
/// stage results; pipeline code only sees `&dyn Log` so tests can substitute
/// their own recorder.
pub trait Log: Send + Sync {
    /// Log a stage header (major section).
    fn stage(&self, msg: &str);
    /// Log an informational message.
    fn info(&self, msg: &str);
    /// Log a debug message (may be suppressed on console).
    fn debug(&self, msg: &str);
    /// Log a warning message.
    fn warn(&self, msg: &str);
    /// Log an error message.
    fn error(&self, msg: &str);
    /// Log a dry-run action message.
    fn dry_run(&self, msg: &str);
    /// Record a stage result for the summary.
    fn record_stage(&self, name: &str, status: StageStatus, message: Option<&str>);
}
