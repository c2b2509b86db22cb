//! compton-config - configuration loader for the compton compositor
//!
//! Reads the libconfig-style `compton.conf`, resolves deprecated options and
//! per-window-type overrides, and produces a typed [`Options`] record along
//! with the set of window-type fields the file assigned explicitly.

pub mod cli;
pub mod config;
pub mod logging;
pub mod models;

pub use config::{ConfigError, ConfigLoader, ConfigWarning};
pub use models::*;

/// Result type alias for compton-config operations
pub type Result<T> = anyhow::Result<T>;
