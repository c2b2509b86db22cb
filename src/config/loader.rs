use std::path::{Path, PathBuf};

use tracing::{debug, error, info};

use crate::config::document::Document;
use crate::config::error::{ConfigError, ConfigWarning};
use crate::config::locator::{locate, SearchPaths};
use crate::config::mapper::{map_options, scalar_stages};
use crate::config::rules::build_rule_lists;
use crate::config::wintypes::overlay_wintypes;
use crate::models::{Options, WinOptionMasks};

/// Loads a configuration file into an [`Options`] record.
///
/// Warnings produced along the way (deprecated options, skipped conditions,
/// values of the wrong type) are collected and can be read back afterwards.
pub struct ConfigLoader {
    search: SearchPaths,
    warnings: Vec<ConfigWarning>,
}

impl ConfigLoader {
    /// Loader searching the locations named by the environment
    pub fn new() -> Self {
        Self::with_search_paths(SearchPaths::from_env())
    }

    pub fn with_search_paths(search: SearchPaths) -> Self {
        Self {
            search,
            warnings: Vec::new(),
        }
    }

    pub fn search_paths(&self) -> &SearchPaths {
        &self.search
    }

    /// Locate, parse and apply the configuration file.
    ///
    /// Returns the path of the file that was used, or `None` when no file
    /// exists and the defaults stay in place. On a [`ConfigError::Parse`]
    /// nothing has been written to `options` or `masks`.
    pub fn load(
        &mut self,
        explicit: Option<&Path>,
        options: &mut Options,
        masks: &mut WinOptionMasks,
    ) -> Result<Option<PathBuf>, ConfigError> {
        let Some(file) = locate(explicit, &self.search)? else {
            info!("No configuration file found, using defaults");
            return Ok(None);
        };

        let doc = Document::parse(&file.contents, Some(&file.path), file.include_dir())
            .map_err(|e| {
                error!("Error when reading configuration file: {}", e);
                ConfigError::Parse(e)
            })?;
        self.apply(&doc, options, masks)?;

        info!("Loaded configuration from {}", file.path.display());
        Ok(Some(file.path))
    }

    /// Parse and apply configuration text that did not come from a file
    pub fn load_str(
        &mut self,
        source: &str,
        include_dir: Option<&Path>,
        options: &mut Options,
        masks: &mut WinOptionMasks,
    ) -> Result<(), ConfigError> {
        let doc = Document::parse(source, None, include_dir)?;
        self.apply(&doc, options, masks)
    }

    /// Apply an already parsed document.
    ///
    /// The rule lists are built between the detection keys and the blur
    /// keys; the first fatal error stops everything after it.
    pub fn apply(
        &mut self,
        doc: &Document,
        options: &mut Options,
        masks: &mut WinOptionMasks,
    ) -> Result<(), ConfigError> {
        let (early, late) = scalar_stages();
        map_options(doc, early, options, masks, &mut self.warnings)?;
        build_rule_lists(doc, options, &mut self.warnings)?;
        map_options(doc, late, options, masks, &mut self.warnings)?;
        overlay_wintypes(doc, options, masks);
        debug!(
            "Configuration applied with {} warning(s)",
            self.warnings.len()
        );
        Ok(())
    }

    pub fn get_warnings(&self) -> &[ConfigWarning] {
        &self.warnings
    }

    pub fn take_warnings(&mut self) -> Vec<ConfigWarning> {
        std::mem::take(&mut self.warnings)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{empty_masks, WinType};

    #[test]
    fn test_load_str_runs_every_stage() {
        let mut loader = ConfigLoader::with_search_paths(SearchPaths::default());
        let mut options = Options::default();
        let mut masks = empty_masks();
        loader
            .load_str(
                r#"
                shadow-radius = 5;
                no-dock-shadow = true;
                fade-exclude = [ "name = 'A'" ];
                wintypes: { tooltip = { opacity = 0.5; }; };
                "#,
                None,
                &mut options,
                &mut masks,
            )
            .unwrap();

        assert_eq!(options.shadow_radius, 5);
        assert_eq!(options.fade_blacklist.len(), 1);
        assert_eq!(options.wintype(WinType::Tooltip).opacity, 0.5);
        assert!(masks[WinType::Dock.index()].shadow);
        assert_eq!(loader.get_warnings().len(), 1);
        assert_eq!(loader.take_warnings()[0].option, "no-dock-shadow");
        assert!(loader.get_warnings().is_empty());
    }

    #[test]
    fn test_fatal_error_skips_later_stages() {
        let mut loader = ConfigLoader::with_search_paths(SearchPaths::default());
        let mut options = Options::default();
        let mut masks = empty_masks();
        let err = loader
            .load_str(
                r#"
                backend = "opengl";
                shadow-exclude = "focused";
                wintypes = { dock = { shadow = false; }; };
                "#,
                None,
                &mut options,
                &mut masks,
            )
            .unwrap_err();

        assert!(err.is_fatal());
        assert!(options.shadow_blacklist.is_empty());
        assert!(masks[WinType::Dock.index()].is_empty());
    }

    #[test]
    fn test_opacity_rule_checked_before_blur_keys() {
        let mut loader = ConfigLoader::with_search_paths(SearchPaths::default());
        let mut options = Options::default();
        let mut masks = empty_masks();
        let err = loader
            .load_str(
                r#"
                glx-swap-method = "sometimes";
                blur-background = true;
                opacity-rule = [ "not a rule" ];
                detect-transient = true;
                "#,
                None,
                &mut options,
                &mut masks,
            )
            .unwrap_err();

        assert!(matches!(err, ConfigError::MalformedOpacityRule { .. }));
        // Keys before the rule lists were applied, the blur keys were not
        assert!(options.detect_transient);
        assert!(!options.blur_background);
    }

    #[test]
    fn test_no_file_keeps_defaults() {
        let mut loader = ConfigLoader::with_search_paths(SearchPaths::default());
        let mut options = Options::default();
        let mut masks = empty_masks();
        assert_eq!(loader.load(None, &mut options, &mut masks).unwrap(), None);
        assert_eq!(options.shadow_radius, Options::default().shadow_radius);
    }
}
