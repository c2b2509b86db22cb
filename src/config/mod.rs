//! Configuration loading for the compositor
//!
//! [`ConfigLoader`] finds the config file ([`locator`]), parses it
//! ([`document`]) and applies it to an [`Options`](crate::models::Options)
//! record: scalar options ([`mapper`]), condition lists and opacity rules
//! ([`rules`]) and per-window-type overrides ([`wintypes`]).

pub mod document;
pub mod error;
pub mod loader;
pub mod locator;
pub mod mapper;
pub mod rules;
pub mod wintypes;

pub use document::{Document, Group, ParseError, Value, MAX_INCLUDE_DEPTH};
pub use error::{ConfigError, ConfigWarning};
pub use loader::ConfigLoader;
pub use locator::{locate, LocatedFile, SearchPaths};
pub use mapper::{
    find_option, map_options, map_scalars, scalar_stages, OptionKind, ScalarOption,
    RULE_LISTS_AFTER, SCALAR_OPTIONS,
};
pub use rules::{build_condition_list, build_opacity_rules, build_rule_lists, CONDITION_LISTS};
pub use wintypes::overlay_wintypes;
