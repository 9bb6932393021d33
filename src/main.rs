use std::process::ExitCode;

use clap::Parser;
use orcaslicer_cli::cli::{Cli, Command};
use orcaslicer_cli::error::ErrorCode;
use orcaslicer_cli::{commands, logging};

fn main() -> ExitCode {
    let _ = enable_ansi_support::enable_ansi_support();
    let args = match Cli::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::from(ErrorCode::InvalidArguments.as_u8())
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    logging::init_subscriber(args.console_level(), args.command.name());
    let log = logging::Logger::new(args.command.name());

    let result = match &args.command {
        Command::Slice(opts) => commands::slice::run(&args.global, opts, args.verbose, &log),
        Command::Info(opts) => commands::info::run(&args.global, opts, &log),
        Command::ListProfiles(opts) => commands::list_profiles::run(&args.global, opts, &log),
        Command::Version => {
            commands::version::run();
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let code = ErrorCode::from_error(&e);
            tracing::error!("{e:#}");
            ExitCode::from(code.as_u8())
        }
    }
}
