//! Core tsr library (rendering, process lifetime, usage, config).

#[cfg(not(unix))]
compile_error!("tsr needs a Unix platform: it relies on getrusage and signal dispositions");

pub mod config;
pub mod core;
pub mod logging;
pub mod render;
pub mod style;
pub mod usage;
