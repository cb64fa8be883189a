//! Segue: page transitions for single-page applications.
//!
//! This crate re-exports the workspace members and adds [`replay`], a
//! headless host used by the `segue-replay` tool.

pub mod replay;

pub use segue_animator::*;
pub use segue_config as config;
pub use segue_dom as dom;
