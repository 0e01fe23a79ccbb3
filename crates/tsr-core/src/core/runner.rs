//! Runs one wrapped program from spawn to summary.

use std::ffi::OsString;
use std::future::Future;
use std::io::{self, Write};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use tokio::task::JoinError;

use super::interrupt;
use super::launcher::{self, ExitOutcome, Launched};
use crate::config::Palette;
use crate::render::{RenderState, StreamKind, StreamRenderer, Terminal, lock};
use crate::style::{self, StyleGuard};
use crate::usage::{self, UsageSample};

/// Everything needed to run and render one program.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub program: OsString,
    pub args: Vec<OsString>,
    pub truncate: bool,
    /// Full terminal width in columns.
    pub columns: u16,
    pub palette: Palette,
}

/// Runs the program against the real terminal.
///
/// Terminal styling is reset on the way in and on every way out. Ctrl+C
/// ends the wait early and is reported as a `SIGINT` outcome.
pub async fn run(opts: RunOptions) -> Result<ExitOutcome> {
    usage::rss_unit_bytes()?;

    let _style = StyleGuard::acquire(io::stdout()).context("Failed to set up terminal style")?;
    interrupt::set_restore_hook(style::restore_stdout);

    run_with(opts, io::stdout(), interrupt::wait_for_interrupt()).await
}

/// Runs the program, rendering into `out`, until it exits or `interrupted`
/// resolves.
pub async fn run_with<W, I>(opts: RunOptions, out: W, interrupted: I) -> Result<ExitOutcome>
where
    W: Write + Send + 'static,
    I: Future<Output = ()>,
{
    let RunOptions {
        program,
        args,
        truncate,
        columns,
        palette,
    } = opts;

    let terminal = Terminal::new(out, RenderState::new(columns, truncate), palette).shared();
    let started = Instant::now();

    let Launched {
        mut child,
        stdout,
        stderr,
    } = launcher::spawn(&program, &args)?;

    let mut stdout_task = tokio::spawn(
        StreamRenderer::new(stdout, StreamKind::Stdout, Arc::clone(&terminal)).run(),
    );
    let mut stderr_task = tokio::spawn(
        StreamRenderer::new(stderr, StreamKind::Stderr, Arc::clone(&terminal)).run(),
    );

    let finished = tokio::select! {
        done = async {
            tokio::join!(child.wait(), &mut stdout_task, &mut stderr_task)
        } => Some(done),
        () = interrupted => None,
    };

    let outcome = if let Some((status, out_done, err_done)) = finished {
        report_renderer(StreamKind::Stdout, out_done);
        report_renderer(StreamKind::Stderr, err_done);
        let status = status.context("Failed to wait for child")?;
        ExitOutcome::from_status(status)
    } else {
        // The child keeps running; only the wait is abandoned.
        tracing::debug!(pid = ?child.id(), "interrupted while waiting for child");
        stdout_task.abort();
        stderr_task.abort();
        // A renderer caught mid-chunk finishes it before the newline goes out.
        let _ = stdout_task.await;
        let _ = stderr_task.await;
        lock(&terminal)
            .interrupt_newline()
            .context("Failed to write to terminal")?;
        ExitOutcome::interrupted()
    };
    tracing::debug!(%outcome, status = outcome.status_code(), "child finished");

    let usage = UsageSample::collect(started.elapsed())?;
    lock(&terminal)
        .write_summary(outcome, &usage)
        .context("Failed to write summary")?;

    Ok(outcome)
}

/// Logs a renderer that ended abnormally. The summary is printed anyway.
fn report_renderer(stream: StreamKind, done: Result<Result<()>, JoinError>) {
    match done {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::warn!(stream = stream.as_str(), "renderer failed: {e:#}"),
        Err(e) => tracing::warn!(stream = stream.as_str(), "renderer task failed: {e}"),
    }
}
