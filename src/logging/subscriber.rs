//! Global subscriber: a styled console view and a per-command run log, both
//! rendering events by the role the [`Logger`](super::Logger) gave them.
use std::fmt;
use std::fs;
use std::io::Write as _;
use std::path::Path;
use std::sync::Mutex;

use tracing::field::{Field, Visit};
use tracing::{Event, Level, Metadata, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::filter::{Filtered, LevelFilter};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;

use super::utils::{format_utc_datetime, format_utc_time, log_file_path, strip_ansi};
use crate::commands::version::VERSION;

/// Target of stage header events.
pub const STAGE_TARGET: &str = "orcaslicer_cli::stage";

/// Target of dry-run events.
pub const DRY_RUN_TARGET: &str = "orcaslicer_cli::dry_run";

/// How an event is presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Stage,
    DryRun,
    Error,
    Warn,
    Info,
    /// Debug or trace output of the named module.
    Detail(&'static str),
}

impl Role {
    fn of(metadata: &'static Metadata<'static>) -> Self {
        match (*metadata.level(), metadata.target()) {
            (Level::ERROR, _) => Self::Error,
            (Level::WARN, _) => Self::Warn,
            (Level::INFO, STAGE_TARGET) => Self::Stage,
            (Level::INFO, DRY_RUN_TARGET) => Self::DryRun,
            (Level::INFO, _) => Self::Info,
            (_, target) => Self::Detail(target),
        }
    }

    /// Run log line: timestamped, stages flush left, everything else indented.
    fn log_line(self, time: &str, message: &str) -> String {
        let tag = match self {
            Self::Stage => return format!("[{time}] ==> {message}"),
            Self::DryRun => "[dry run] ",
            Self::Error => "[error] ",
            Self::Warn => "[warn] ",
            Self::Info => "",
            Self::Detail(target) => return format!("[{time}]     [debug] {target}: {message}"),
        };
        format!("[{time}]     {tag}{message}")
    }

    fn write_console(self, out: &mut Writer<'_>, message: &str) -> fmt::Result {
        match self {
            Self::Stage => writeln!(out, "\x1b[1;34m==>\x1b[0m \x1b[1m{message}\x1b[0m"),
            Self::DryRun => writeln!(out, "  \x1b[33m[dry run]\x1b[0m {message}"),
            Self::Error => writeln!(out, "\x1b[31merror:\x1b[0m {message}"),
            Self::Warn => writeln!(out, "\x1b[33mwarning:\x1b[0m {message}"),
            Self::Info => writeln!(out, "  {message}"),
            Self::Detail(target) => writeln!(out, "  \x1b[2m{target}: {message}\x1b[0m"),
        }
    }
}

/// Text of the event's `message` field.
fn message_of(event: &Event<'_>) -> String {
    struct Message(String);

    impl Visit for Message {
        fn record_str(&mut self, field: &Field, value: &str) {
            if field.name() == "message" {
                value.clone_into(&mut self.0);
            }
        }

        fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
            if field.name() == "message" {
                self.0 = format!("{value:?}");
            }
        }
    }

    let mut message = Message(String::new());
    event.record(&mut message);
    message.0
}

/// Appends events to `$XDG_CACHE_HOME/orcaslicer-cli/<command>.log`.
///
/// The log is truncated at the start of each run and keeps `DEBUG` and
/// above whatever the console shows.
#[derive(Debug)]
pub(super) struct RunLog {
    file: Mutex<fs::File>,
}

impl RunLog {
    const LEVEL: LevelFilter = LevelFilter::DEBUG;

    /// The run log for `command` as a filtered layer, or `None` when the
    /// cache directory or the file is unavailable.
    pub(super) fn layer<S>(command: &str) -> Option<Filtered<Self, LevelFilter, S>>
    where
        S: Subscriber + for<'a> LookupSpan<'a>,
    {
        let path = log_file_path(command)?;
        Self::start(&path, command)
            .inspect_err(|e| tracing::debug!("run log unavailable at {}: {e}", path.display()))
            .ok()
            .map(|log| log.with_filter(Self::LEVEL))
    }

    fn start(path: &Path, command: &str) -> std::io::Result<Self> {
        let mut file = fs::File::create(path)?;
        let rule = "=".repeat(42);
        writeln!(
            file,
            "{rule}\norcaslicer-cli {VERSION} {command} {}\n{rule}",
            format_utc_datetime()
        )?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl<S: Subscriber> Layer<S> for RunLog {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let line = Role::of(event.metadata())
            .log_line(&format_utc_time(), &strip_ansi(&message_of(event)));
        if let Ok(mut file) = self.file.lock() {
            writeln!(file, "{line}").ok();
        }
    }
}

/// Console rendering of events.
struct ConsoleFormat;

impl<S, N> FormatEvent<S, N> for ConsoleFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        Role::of(event.metadata()).write_console(&mut writer, &message_of(event))
    }
}

/// Install the global subscriber; call once, before any logging.
///
/// The console shows events up to `console_level`, warnings and errors on
/// stderr and the rest on stdout. The run log for `command` is written
/// alongside.
pub fn init_subscriber(console_level: LevelFilter, command: &str) {
    use tracing_subscriber::fmt::writer::MakeWriterExt as _;
    use tracing_subscriber::{fmt, layer::SubscriberExt as _, util::SubscriberInitExt as _};

    let console = fmt::layer()
        .event_format(ConsoleFormat)
        .with_writer(
            std::io::stderr
                .with_max_level(Level::WARN)
                .and(std::io::stdout.with_min_level(Level::INFO)),
        )
        .with_filter(console_level);

    tracing_subscriber::registry()
        .with(console)
        .with(RunLog::layer(command))
        .init();
}
