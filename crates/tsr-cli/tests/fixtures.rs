//! Shared helpers for tsr integration tests.

#![allow(dead_code)]

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use tempfile::TempDir;

/// Terminal width used by every test run (working width 80).
pub const COLUMNS: &str = "81";

/// A `tsr` command isolated from the user's config and log settings.
pub fn tsr(home: &TempDir) -> Command {
    let mut cmd = cargo_bin_cmd!("tsr");
    cmd.env("TSR_HOME", home.path())
        .env("COLUMNS", COLUMNS)
        .env_remove("TSR_LOG");
    cmd
}

/// Output with ANSI escape sequences removed.
pub fn visible(raw: &[u8]) -> String {
    let raw = String::from_utf8_lossy(raw);
    let mut out = String::new();
    let mut in_escape = false;
    for c in raw.chars() {
        match (in_escape, c) {
            (false, '\x1b') => in_escape = true,
            (false, _) => out.push(c),
            (true, c) if c.is_ascii_alphabetic() => in_escape = false,
            (true, _) => {}
        }
    }
    out
}

/// The last non-empty line of `text`.
pub fn summary_line(text: &str) -> &str {
    text.lines().rfind(|l| !l.is_empty()).unwrap_or("")
}
