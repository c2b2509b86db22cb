//! Command-line interface for compton-config
//!
//! Loads a compositor configuration the way the compositor does at startup
//! and reports the result: validation, the effective options, or just the
//! file that would be used.

use crate::config::{locate, ConfigError, ConfigLoader, ConfigWarning, SearchPaths, SCALAR_OPTIONS};
use crate::logging::LogHandle;
use crate::models::{empty_masks, Options, WinOptionMasks, WinType};
use crate::Result;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, error, warn};

/// compton-config command-line interface
#[derive(Parser)]
#[command(name = "compton-config")]
#[command(about = "Load and validate compton compositor configuration files")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct ComptonCli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file path; searched for when omitted
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable JSON output for machine-readable results
    #[arg(long, global = true)]
    pub json: bool,

    /// Subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug, PartialEq)]
pub enum Commands {
    /// Load the configuration and report problems
    Check,

    /// Print the effective options after loading
    Show {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
    },

    /// Print the configuration file that would be used
    Locate,

    /// List the recognised scalar options
    Options,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Toml,
}

/// Result of one configuration load
#[derive(Debug)]
pub struct LoadedConfig {
    pub path: Option<PathBuf>,
    pub options: Options,
    pub masks: WinOptionMasks,
    pub warnings: Vec<ConfigWarning>,
    /// Recoverable error; the defaults are in effect
    pub error: Option<ConfigError>,
}

#[derive(Serialize)]
struct ShowOutput<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    config_file: Option<String>,
    /// Window types whose overrides came from the file
    explicit_wintypes: Vec<&'static str>,
    options: &'a Options,
}

/// CLI command executor
pub struct ComptonCliExecutor {
    config: Option<PathBuf>,
    search: SearchPaths,
    json_output: bool,
    log_handle: Option<LogHandle>,
}

impl ComptonCliExecutor {
    /// Create a new CLI executor
    pub fn new(config: Option<PathBuf>, json_output: bool, log_handle: Option<LogHandle>) -> Self {
        Self {
            config,
            search: SearchPaths::from_env(),
            json_output,
            log_handle,
        }
    }

    pub fn with_search_paths(mut self, search: SearchPaths) -> Self {
        self.search = search;
        self
    }

    /// Load the configuration. Only fatal errors are returned; a parse
    /// error is kept in [`LoadedConfig::error`] with defaults in place.
    pub fn load(&self) -> std::result::Result<LoadedConfig, ConfigError> {
        let mut loader = ConfigLoader::with_search_paths(self.search.clone());
        let mut options = Options::default();
        let mut masks = empty_masks();

        let (path, error) = match loader.load(self.config.as_deref(), &mut options, &mut masks) {
            Ok(path) => (path, None),
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!("Continuing with default options: {}", e);
                (None, Some(e))
            }
        };

        if let (Some(level), Some(handle)) = (options.log_level, &self.log_handle) {
            if let Err(e) = handle.set_level(level) {
                warn!("Failed to apply log level {:?}: {}", level, e);
            }
        }

        Ok(LoadedConfig {
            path,
            options,
            masks,
            warnings: loader.take_warnings(),
            error,
        })
    }

    /// Execute a CLI command
    pub fn execute(&self, command: Commands) -> Result<()> {
        debug!("Executing {:?}", command);
        match command {
            Commands::Check => self.execute_check(),
            Commands::Show { format } => self.execute_show(format),
            Commands::Locate => self.execute_locate(),
            Commands::Options => self.execute_options(),
        }
    }

    fn execute_check(&self) -> Result<()> {
        let loaded = self.load()?;
        let path = loaded.path.as_deref().map(display_path);

        if self.json_output {
            let report = serde_json::json!({
                "config_file": path,
                "warnings": loaded.warnings.iter().map(ToString::to_string).collect::<Vec<_>>(),
                "error": loaded.error.as_ref().map(ToString::to_string),
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
            return Ok(());
        }

        match (&path, &loaded.error) {
            (_, Some(e)) => println!("Configuration not applied, defaults in effect: {}", e),
            (Some(path), None) => println!("Configuration OK: {}", path),
            (None, None) => println!("No configuration file found, defaults in effect"),
        }
        for warning in &loaded.warnings {
            println!("  warning: {}", warning);
        }
        Ok(())
    }

    fn execute_show(&self, format: OutputFormat) -> Result<()> {
        let loaded = self.load()?;
        let output = ShowOutput {
            config_file: loaded.path.as_deref().map(display_path),
            explicit_wintypes: WinType::ALL
                .into_iter()
                .filter(|t| !loaded.masks[t.index()].is_empty())
                .map(WinType::name)
                .collect(),
            options: &loaded.options,
        };

        // --json always means JSON
        let rendered = if self.json_output || format == OutputFormat::Json {
            serde_json::to_string_pretty(&output)?
        } else {
            toml::to_string_pretty(&output)?
        };
        println!("{}", rendered);
        Ok(())
    }

    fn execute_locate(&self) -> Result<()> {
        let located = locate(self.config.as_deref(), &self.search)?;
        let path = located.as_ref().map(|file| display_path(&file.path));

        if self.json_output {
            println!("{}", serde_json::json!({ "config_file": path }));
        } else {
            match path {
                Some(path) => println!("{}", path),
                None => println!("No configuration file found"),
            }
        }
        Ok(())
    }

    fn execute_options(&self) -> Result<()> {
        if self.json_output {
            let list: Vec<_> = SCALAR_OPTIONS
                .iter()
                .map(|o| serde_json::json!({ "name": o.path, "type": o.kind.type_name() }))
                .collect();
            println!("{}", serde_json::to_string_pretty(&list)?);
        } else {
            for option in SCALAR_OPTIONS {
                println!("{:<28} {}", option.path, option.kind.type_name());
            }
        }
        Ok(())
    }
}

fn display_path(path: &Path) -> String {
    path.display().to_string()
}

/// Run the CLI interface
pub fn run_cli(cli: ComptonCli, log_handle: Option<LogHandle>) -> Result<()> {
    let json = cli.json;
    let executor = ComptonCliExecutor::new(cli.config, json, log_handle);

    if let Err(e) = executor.execute(cli.command) {
        if json {
            let error_json = serde_json::json!({
                "error": true,
                "message": e.to_string()
            });
            println!("{}", serde_json::to_string_pretty(&error_json)?);
        }
        error!("{}", e);
        std::process::exit(1);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn executor_for(dir: &TempDir, config: &str) -> ComptonCliExecutor {
        let path = dir.path().join("compton.conf");
        fs::write(&path, config).unwrap();
        ComptonCliExecutor::new(Some(path), false, None).with_search_paths(SearchPaths::default())
    }

    #[test]
    fn test_cli_parsing() {
        let cli = ComptonCli::try_parse_from(["compton-config", "check"]).unwrap();
        assert_eq!(cli.command, Commands::Check);
        assert!(cli.config.is_none());

        let cli =
            ComptonCli::try_parse_from(["compton-config", "show", "--format", "toml"]).unwrap();
        assert_eq!(cli.command, Commands::Show { format: OutputFormat::Toml });
    }

    #[test]
    fn test_global_flags() {
        let cli = ComptonCli::try_parse_from([
            "compton-config",
            "locate",
            "--json",
            "--verbose",
            "--config",
            "/tmp/compton.conf",
        ])
        .unwrap();
        assert!(cli.json);
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/compton.conf")));
    }

    #[test]
    fn test_load_reports_warnings() {
        let dir = TempDir::new().unwrap();
        let executor = executor_for(&dir, "shadow = true;\nclear-shadow = true;\n");
        let loaded = executor.load().unwrap();
        assert!(loaded.options.shadow_enable);
        assert_eq!(loaded.warnings.len(), 1);
        assert!(loaded.error.is_none());
    }

    #[test]
    fn test_parse_error_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let executor = executor_for(&dir, "shadow = true;\nshadow-radius = ;\n");
        let loaded = executor.load().unwrap();
        assert!(!loaded.options.shadow_enable);
        assert!(matches!(loaded.error, Some(ConfigError::Parse(_))));
        assert!(loaded.path.is_none());
    }

    #[test]
    fn test_fatal_error_returned() {
        let dir = TempDir::new().unwrap();
        let executor = executor_for(&dir, "vsync = \"not-a-real-mode\";\n");
        assert!(executor.load().unwrap_err().is_fatal());
        assert!(executor.execute(Commands::Check).is_err());
    }

    #[test]
    fn test_show_both_formats() {
        let dir = TempDir::new().unwrap();
        let executor = executor_for(
            &dir,
            "wintypes: { dock = { shadow = false; }; };\nshadow-exclude = \"focused\";\n",
        );
        assert!(executor.execute(Commands::Show { format: OutputFormat::Json }).is_ok());
        assert!(executor.execute(Commands::Show { format: OutputFormat::Toml }).is_ok());
    }
}
