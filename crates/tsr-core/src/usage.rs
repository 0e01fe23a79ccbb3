//! Resource usage of terminated children.

use std::fmt;
use std::time::Duration;

use anyhow::{Context, Result};
use nix::sys::resource::{UsageWho, getrusage};
use nix::sys::time::TimeVal;

/// `ru_maxrss` unit on this platform, in bytes.
#[cfg(any(
    target_os = "linux",
    target_os = "android",
    target_os = "freebsd",
    target_os = "openbsd",
    target_os = "netbsd",
    target_os = "dragonfly"
))]
const RSS_UNIT_BYTES: Option<u64> = Some(1024);

#[cfg(any(target_os = "macos", target_os = "ios"))]
const RSS_UNIT_BYTES: Option<u64> = Some(1);

#[cfg(not(any(
    target_os = "linux",
    target_os = "android",
    target_os = "freebsd",
    target_os = "openbsd",
    target_os = "netbsd",
    target_os = "dragonfly",
    target_os = "macos",
    target_os = "ios"
)))]
const RSS_UNIT_BYTES: Option<u64> = None;

/// The host platform reports resident set size in an unknown unit.
#[derive(Debug)]
pub struct UnsupportedPlatform;

impl fmt::Display for UnsupportedPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unsupported platform '{}': unknown resident set size unit",
            std::env::consts::OS
        )
    }
}

impl std::error::Error for UnsupportedPlatform {}

/// Returns how many bytes one `ru_maxrss` unit is worth.
pub fn rss_unit_bytes() -> Result<u64, UnsupportedPlatform> {
    RSS_UNIT_BYTES.ok_or(UnsupportedPlatform)
}

/// Resource usage captured once after the child terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsageSample {
    pub real: Duration,
    pub user: Duration,
    pub sys: Duration,
    pub max_rss_bytes: u64,
}

impl UsageSample {
    /// Collects usage of all waited-for children of this process.
    pub fn collect(real: Duration) -> Result<Self> {
        let unit = rss_unit_bytes()?;
        let usage = getrusage(UsageWho::RUSAGE_CHILDREN).context("getrusage failed")?;
        Ok(Self {
            real,
            user: timeval_to_duration(usage.user_time()),
            sys: timeval_to_duration(usage.system_time()),
            max_rss_bytes: u64::try_from(usage.max_rss()).unwrap_or(0) * unit,
        })
    }

    pub fn max_rss_mb(&self) -> f64 {
        self.max_rss_bytes as f64 / (1024.0 * 1024.0)
    }
}

fn timeval_to_duration(tv: TimeVal) -> Duration {
    let secs = u64::try_from(tv.tv_sec()).unwrap_or(0);
    let micros = u64::try_from(tv.tv_usec()).unwrap_or(0);
    Duration::from_secs(secs) + Duration::from_micros(micros)
}
