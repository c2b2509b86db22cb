//! Configuration file discovery.
//!
//! An explicit path always wins. Otherwise the XDG config directories are
//! searched for `compton.conf` and then `compton/compton.conf`, and finally
//! the legacy `~/.compton.conf` is tried.

use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use crate::config::error::ConfigError;

const CONFIG_SUFFIXES: [&str; 2] = ["compton.conf", "compton/compton.conf"];
const LEGACY_FILENAME: &str = ".compton.conf";
const DEFAULT_CONFIG_DIRS: &str = "/etc/xdg";

/// Directories searched when no explicit config path is given
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchPaths {
    /// User config directory (`$XDG_CONFIG_HOME`)
    pub config_home: Option<PathBuf>,
    /// System config directories (`$XDG_CONFIG_DIRS`), most important first
    pub config_dirs: Vec<PathBuf>,
    /// Home directory for the legacy file name
    pub home: Option<PathBuf>,
}

impl SearchPaths {
    /// Build the search list from `XDG_CONFIG_HOME`, `XDG_CONFIG_DIRS` and `HOME`
    pub fn from_env() -> Self {
        let config_home = non_empty_var("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(dirs::config_dir);

        let config_dirs = non_empty_var("XDG_CONFIG_DIRS")
            .unwrap_or_else(|| DEFAULT_CONFIG_DIRS.to_string())
            .split(':')
            .filter(|dir| !dir.is_empty())
            .map(PathBuf::from)
            .collect();

        let home = non_empty_var("HOME").map(PathBuf::from);

        Self {
            config_home,
            config_dirs,
            home,
        }
    }

    /// Candidate paths in search order
    pub fn candidates(&self) -> Vec<PathBuf> {
        let mut candidates = Vec::new();
        for suffix in CONFIG_SUFFIXES {
            for dir in self.config_home.iter().chain(self.config_dirs.iter()) {
                candidates.push(dir.join(suffix));
            }
        }
        if let Some(home) = &self.home {
            candidates.push(home.join(LEGACY_FILENAME));
        }
        candidates
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}

/// A configuration file that was found and read
#[derive(Debug, Clone)]
pub struct LocatedFile {
    pub path: PathBuf,
    pub contents: String,
}

impl LocatedFile {
    /// Directory relative `@include` paths resolve against
    pub fn include_dir(&self) -> Option<&Path> {
        self.path.parent().filter(|dir| !dir.as_os_str().is_empty())
    }
}

/// Find and read the configuration file.
///
/// Returns `Ok(None)` when no explicit path was given and nothing was found.
pub fn locate(
    explicit: Option<&Path>,
    search: &SearchPaths,
) -> Result<Option<LocatedFile>, ConfigError> {
    if let Some(path) = explicit.filter(|path| !path.as_os_str().is_empty()) {
        let contents =
            std::fs::read_to_string(path).map_err(|source| ConfigError::ExplicitFileUnreadable {
                path: path.to_path_buf(),
                source,
            })?;
        debug!("Using configuration file {}", path.display());
        return Ok(Some(LocatedFile {
            path: path.to_path_buf(),
            contents,
        }));
    }

    for path in search.candidates() {
        match std::fs::read_to_string(&path) {
            Ok(contents) => {
                debug!("Found configuration file {}", path.display());
                return Ok(Some(LocatedFile { path, contents }));
            }
            Err(e) => trace!("Skipping {}: {}", path.display(), e),
        }
    }

    debug!("No configuration file found");
    Ok(None)
}
