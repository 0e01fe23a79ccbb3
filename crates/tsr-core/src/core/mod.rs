//! Core module: process lifetime around the renderer.
//!
//! This module contains:
//! - `interrupt`: Ctrl+C handling for the wrapper itself
//! - `launcher`: Child spawning and exit status conversion
//! - `runner`: Spawn, render, wait, summarize

pub mod interrupt;
pub mod launcher;
pub mod runner;
