//! Child process launching and exit status conversion.

use std::ffi::OsString;
use std::fmt;
use std::process::{ExitStatus, Stdio};

use anyhow::{Context, Result, anyhow};
use nix::sys::signal::{SigHandler, Signal};
use tokio::process::{Child, ChildStderr, ChildStdout, Command};

/// A spawned child with both output streams detached for rendering.
#[derive(Debug)]
pub struct Launched {
    pub child: Child,
    pub stdout: ChildStdout,
    pub stderr: ChildStderr,
}

/// Spawns `program` with `args`.
///
/// Stdin is inherited so the child reads from the terminal directly, and
/// the tty echo shows up in whatever style is active between renders.
/// Stdout and stderr are piped.
pub fn spawn(program: &OsString, args: &[OsString]) -> Result<Launched> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::inherit())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .with_context(|| format!("Failed to execute '{}'", program.to_string_lossy()))?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow!("child stdout was not piped"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| anyhow!("child stderr was not piped"))?;

    tracing::debug!(pid = ?child.id(), program = %program.to_string_lossy(), "spawned child");

    Ok(Launched {
        child,
        stdout,
        stderr,
    })
}

/// How the child (or the wait for it) ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitOutcome {
    /// Normal exit with a status code.
    Exited(i32),
    /// Terminated by a signal. Also used for an interrupt of the wrapper.
    Signaled(Signal),
}

impl ExitOutcome {
    pub fn from_status(status: ExitStatus) -> Self {
        use std::os::unix::process::ExitStatusExt;

        if let Some(code) = status.code() {
            return Self::Exited(code);
        }
        match status.signal().map(Signal::try_from) {
            Some(Ok(signal)) => Self::Signaled(signal),
            Some(Err(_)) | None => {
                tracing::warn!(?status, "exit status has neither code nor known signal");
                Self::Exited(-1)
            }
        }
    }

    /// The outcome recorded when the wrapper itself is interrupted.
    pub fn interrupted() -> Self {
        Self::Signaled(Signal::SIGINT)
    }

    /// Exit code, or the negated signal number for signal outcomes.
    pub fn status_code(self) -> i32 {
        match self {
            Self::Exited(code) => code,
            Self::Signaled(signal) => -(signal as i32),
        }
    }

    /// Ends this process the way the child ended.
    ///
    /// Signal outcomes are re-raised with the default disposition so the
    /// parent shell sees a signal death. If the signal does not terminate
    /// (its default action is to ignore), exits with `128 + signo`.
    pub fn exit_process(self) -> ! {
        match self {
            Self::Exited(code) => std::process::exit(code),
            Self::Signaled(signal) => {
                // SAFETY: installing SIG_DFL runs no handler code of ours.
                if let Err(e) = unsafe { nix::sys::signal::signal(signal, SigHandler::SigDfl) } {
                    tracing::warn!(%signal, "failed to restore default disposition: {e}");
                }
                if let Err(e) = nix::sys::signal::raise(signal) {
                    tracing::warn!(%signal, "failed to raise signal: {e}");
                }
                std::process::exit(128 + signal as i32)
            }
        }
    }
}

impl fmt::Display for ExitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exited(code) => write!(f, "{code}"),
            Self::Signaled(signal) => f.write_str(signal.as_str()),
        }
    }
}
