//! Structured logging configuration for compton-config

use serde::Serialize;
use std::str::FromStr;
use tracing::{debug, info};
use tracing_subscriber::{
    fmt::{self, time::UtcTime},
    layer::SubscriberExt,
    registry::LookupSpan,
    reload,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

/// Logging configuration for compton-config
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: LogLevel,
    /// Log format (json, pretty, compact)
    pub format: LogFormat,
    /// Output destination (stderr, file)
    pub output: LogOutput,
    /// File path for file output
    pub file_path: Option<String>,
    /// Include source file and line numbers
    pub include_source: bool,
}

/// Log levels, also accepted by the `log-level` config option
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn as_filter(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl Default for LogLevel {
    fn default() -> Self {
        LogLevel::Warn
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(format!("Invalid log level: {}", s)),
        }
    }
}

/// Log output formats
#[derive(Debug, Clone, PartialEq)]
pub enum LogFormat {
    /// Human-readable format for development
    Pretty,
    /// Single-line format
    Compact,
    /// JSON format for log aggregation
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "compact" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            _ => Err(format!("Invalid log format: {}", s)),
        }
    }
}

/// Log output destinations
#[derive(Debug, Clone, PartialEq)]
pub enum LogOutput {
    /// Standard error, keeps stdout free for command output
    Stderr,
    /// File output
    File,
}

impl FromStr for LogOutput {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "stderr" => Ok(LogOutput::Stderr),
            "file" => Ok(LogOutput::File),
            _ => Err(format!("Invalid log output: {}", s)),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Warn,
            format: LogFormat::Compact,
            output: LogOutput::Stderr,
            file_path: None,
            include_source: false,
        }
    }
}

impl LogConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(level) = std::env::var("COMPTON_LOG_LEVEL") {
            if let Ok(parsed_level) = LogLevel::from_str(&level) {
                config.level = parsed_level;
            }
        }

        if let Ok(format) = std::env::var("COMPTON_LOG_FORMAT") {
            if let Ok(parsed_format) = LogFormat::from_str(&format) {
                config.format = parsed_format;
            }
        }

        if let Ok(output) = std::env::var("COMPTON_LOG_OUTPUT") {
            if let Ok(parsed_output) = LogOutput::from_str(&output) {
                config.output = parsed_output;
            }
        }

        if let Ok(file_path) = std::env::var("COMPTON_LOG_FILE") {
            config.file_path = Some(file_path);
        }

        if let Ok(include_source) = std::env::var("COMPTON_LOG_SOURCE") {
            config.include_source = include_source.to_lowercase() == "true";
        }

        config
    }
}

/// Handle to the installed subscriber's filter
#[derive(Clone)]
pub struct LogHandle {
    filter: reload::Handle<EnvFilter, Registry>,
}

impl LogHandle {
    /// Replace the active level, e.g. after `log-level` was read from the config file.
    /// A `RUST_LOG` directive set in the environment still wins.
    pub fn set_level(&self, level: LogLevel) -> Result<(), Box<dyn std::error::Error>> {
        if std::env::var_os(EnvFilter::DEFAULT_ENV).is_some() {
            debug!("RUST_LOG is set, ignoring log level {:?}", level);
            return Ok(());
        }
        self.filter
            .modify(|filter| *filter = EnvFilter::new(create_filter_directive(level)))?;
        debug!("Log level changed to {:?}", level);
        Ok(())
    }
}

/// Initialize the global tracing subscriber with the given configuration
pub fn init_logging(config: &LogConfig) -> Result<LogHandle, Box<dyn std::error::Error>> {
    let (filter, handle) = reload::Layer::new(create_filter(config));

    match (&config.output, &config.file_path) {
        (LogOutput::Stderr, _) => {
            tracing_subscriber::registry()
                .with(filter)
                .with(create_stderr_layer(config))
                .try_init()?;
        }
        (LogOutput::File, Some(file_path)) => {
            tracing_subscriber::registry()
                .with(filter)
                .with(create_file_layer(config, file_path)?)
                .try_init()?;
        }
        (LogOutput::File, None) => {
            return Err("File path required for file output".into());
        }
    }

    info!("Logging initialized with config: {:?}", config);
    Ok(LogHandle { filter: handle })
}

fn create_filter_directive(level: LogLevel) -> String {
    format!("compton_config={}", level.as_filter())
}

/// Create an environment filter based on the configuration
fn create_filter(config: &LogConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(create_filter_directive(config.level)))
}

/// Create a stderr logging layer
fn create_stderr_layer<S>(config: &LogConfig) -> Box<dyn Layer<S> + Send + Sync>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_timer(UtcTime::rfc_3339())
        .with_file(config.include_source)
        .with_line_number(config.include_source);

    match config.format {
        LogFormat::Pretty => Box::new(layer.pretty()),
        LogFormat::Compact => Box::new(layer.compact()),
        LogFormat::Json => Box::new(layer.json()),
    }
}

/// Create a file logging layer
fn create_file_layer<S>(
    config: &LogConfig,
    file_path: &str,
) -> Result<Box<dyn Layer<S> + Send + Sync>, Box<dyn std::error::Error>>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(file_path)?;

    let layer = fmt::layer()
        .with_writer(std::sync::Mutex::new(file))
        .with_ansi(false)
        .with_timer(UtcTime::rfc_3339())
        .with_file(config.include_source)
        .with_line_number(config.include_source);

    Ok(match config.format {
        LogFormat::Pretty => Box::new(layer.pretty()),
        LogFormat::Compact => Box::new(layer.compact()),
        LogFormat::Json => Box::new(layer.json()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_parsing() {
        assert_eq!(LogLevel::from_str("info").unwrap(), LogLevel::Info);
        assert_eq!(LogLevel::from_str("DEBUG").unwrap(), LogLevel::Debug);
        assert_eq!(LogLevel::from_str("Warning").unwrap(), LogLevel::Warn);
        assert!(LogLevel::from_str("invalid").is_err());
    }

    #[test]
    fn test_log_format_parsing() {
        assert_eq!(LogFormat::from_str("json").unwrap(), LogFormat::Json);
        assert_eq!(LogFormat::from_str("PRETTY").unwrap(), LogFormat::Pretty);
        assert!(LogFormat::from_str("invalid").is_err());
    }

    #[test]
    fn test_default_config() {
        let default_config = LogConfig::default();
        assert_eq!(default_config.level, LogLevel::Warn);
        assert_eq!(default_config.output, LogOutput::Stderr);
    }

    #[test]
    fn test_filter_directive() {
        assert_eq!(create_filter_directive(LogLevel::Trace), "compton_config=trace");
    }

    #[test]
    fn test_file_output_requires_path() {
        let config = LogConfig {
            output: LogOutput::File,
            file_path: None,
            ..LogConfig::default()
        };
        assert!(init_logging(&config).is_err());
    }
}
