//! Data models for the compositor configuration

pub mod blur;
pub mod condition;
pub mod options;
pub mod render;
pub mod rule;
pub mod wintype;

pub use blur::*;
pub use condition::*;
pub use options::*;
pub use render::*;
pub use rule::*;
pub use wintype::*;
