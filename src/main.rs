//! compton-config - load and validate compton configuration files
//!
//! Fatal configuration errors end the process with a non-zero status; a
//! config file that fails to parse is reported and the defaults are used.

use clap::Parser;
use compton_config::{
    cli::{run_cli, ComptonCli},
    logging::{init_logging, LogConfig, LogLevel},
    Result,
};

fn main() -> Result<()> {
    let cli = ComptonCli::parse();

    let mut log_config = LogConfig::from_env();
    if cli.verbose {
        log_config.level = LogLevel::Debug;
    }
    let log_handle = match init_logging(&log_config) {
        Ok(handle) => Some(handle),
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            None
        }
    };

    run_cli(cli, log_handle)
}
