//! Sprig Core
//!
//! Ambient utilities shared by the sprig crates: logging setup, profiling
//! hooks and engine-level configuration.

pub mod config;
pub mod logging;
pub mod profiling;

pub use config::{Config, ProfilingMode};
