use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::config::document::ParseError;
use crate::models::BlurKernelError;

/// Errors raised while loading a configuration file
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration file \"{}\": {source}", path.display())]
    ExplicitFileUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("Cannot parse \"{option}\": unknown value \"{value}\"")]
    UnknownEnumValue { option: &'static str, value: String },

    #[error("Invalid opacity rule \"{rule}\": {reason}")]
    MalformedOpacityRule { rule: String, reason: String },

    #[error("Cannot parse \"blur-kern\": {0}")]
    MalformedBlurKernel(#[from] BlurKernelError),
}

impl ConfigError {
    /// Fatal errors must stop the compositor; the rest leave defaults in place
    pub fn is_fatal(&self) -> bool {
        !matches!(self, ConfigError::Parse(_))
    }
}

/// Non-fatal problem found while loading, e.g. a deprecated option
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWarning {
    pub option: String,
    pub message: String,
}

impl ConfigWarning {
    pub fn new(option: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            option: option.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.option, self.message)
    }
}
