//! Configuration management for tsr.
//!
//! Loads configuration from ${TSR_HOME}/config.toml with sensible defaults.
//! Command-line flags override whatever the file says.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use crossterm::style::Color;
use serde::Deserialize;

pub mod paths {
    //! Path resolution for tsr configuration and log directories.
    //!
    //! TSR_HOME resolution order:
    //! 1. TSR_HOME environment variable (if set)
    //! 2. ~/.config/tsr (default)
    //! 3. ./.tsr when no home directory can be determined

    use std::path::PathBuf;

    /// Returns the tsr home directory.
    pub fn tsr_home() -> PathBuf {
        if let Ok(home) = std::env::var("TSR_HOME") {
            return PathBuf::from(home);
        }

        dirs::home_dir().map_or_else(
            || PathBuf::from(".tsr"),
            |h| h.join(".config").join("tsr"),
        )
    }

    /// Returns the path to the config.toml file.
    pub fn config_path() -> PathBuf {
        tsr_home().join("config.toml")
    }

    /// Returns the directory log files are written to.
    pub fn logs_dir() -> PathBuf {
        tsr_home().join("logs")
    }
}

/// Colors used for everything tsr draws itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Palette {
    /// Foreground of text read from the child's stderr.
    pub stderr_color: Color,
    /// Foreground of the right-aligned timestamps.
    pub timestamp_color: Color,
    /// Foreground of the wrap marker and truncation ellipsis.
    pub decoration_color: Color,
    /// Foreground of the values in the summary line.
    pub value_color: Color,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            stderr_color: Color::Red,
            timestamp_color: Color::DarkGrey,
            decoration_color: Color::DarkGrey,
            value_color: Color::Cyan,
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Truncate long lines with an ellipsis instead of wrapping them.
    pub truncate: bool,

    #[serde(flatten)]
    pub palette: Palette,
}

impl Config {
    /// Loads configuration from the default config path.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path())
    }

    /// Loads configuration from a specific path.
    /// Returns defaults if file doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config from {}", path.display()))
        } else {
            Ok(Config::default())
        }
    }
}
