//! CLI entry and argument handling.

use std::ffi::OsString;

use anyhow::{Context, Result};
use clap::error::{ContextKind, ErrorKind};
use clap::{CommandFactory, Parser};
use tsr_core::config::Config;
use tsr_core::core::interrupt;
use tsr_core::core::launcher::ExitOutcome;
use tsr_core::core::runner::{self, RunOptions};
use tsr_core::{logging, render};

/// Command line usage error, `EX_USAGE` from sysexits.h.
const EX_USAGE: i32 = 64;

#[derive(Parser, Debug)]
#[command(name = "tsr")]
#[command(version)]
#[command(about = "Run a program with timestamped, interleaved stdout/stderr")]
#[command(
    long_about = "Run a program with timestamped, interleaved stdout/stderr.\n\n\
    Stderr is shown in color, stdin echo in bold, and every line gets a \
    right-aligned wall-clock timestamp. A summary of exit status and \
    resource usage is printed when the program ends."
)]
struct Cli {
    /// Truncate long lines with an ellipsis instead of wrapping them
    #[arg(short, long)]
    truncate: bool,

    /// Program to run, followed by its arguments
    #[arg(
        value_name = "PROGRAM",
        required = true,
        num_args = 1..,
        trailing_var_arg = true
    )]
    command: Vec<OsString>,
}

pub fn run() -> Result<ExitOutcome> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => return Ok(ExitOutcome::Exited(report_parse_error(&e))),
    };

    let _log_guard = logging::init()?;
    interrupt::init()?;

    let config = Config::load().context("load config")?;
    let mut command = cli.command.into_iter();
    let Some(program) = command.next() else {
        return Ok(ExitOutcome::Exited(usage_error("no PROGRAM given")));
    };

    let opts = RunOptions {
        program,
        args: command.collect(),
        truncate: cli.truncate || config.truncate,
        columns: render::detect_columns(),
        palette: config.palette,
    };
    tracing::debug!(?opts, "starting");

    // one tokio runtime for everything
    let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;
    rt.block_on(runner::run(opts))
}

/// Prints a parse failure and returns the exit code for it.
fn report_parse_error(e: &clap::Error) -> i32 {
    match e.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
            let _ = e.print();
            0
        }
        ErrorKind::UnknownArgument => {
            let option = e
                .get(ContextKind::InvalidArg)
                .map(ToString::to_string)
                .unwrap_or_default();
            usage_error(&format!("Unknown option: {option}"))
        }
        ErrorKind::MissingRequiredArgument => usage_error("no PROGRAM given"),
        _ => {
            let _ = e.print();
            EX_USAGE
        }
    }
}

/// Prints `message` and the usage text to stderr.
fn usage_error(message: &str) -> i32 {
    eprintln!("tsr: {message}\n");
    eprintln!("{}", Cli::command().render_help());
    EX_USAGE
}
