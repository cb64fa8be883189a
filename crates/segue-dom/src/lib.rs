//! Element tree for page transitions.
//!
//! The orchestrator never touches a concrete DOM. It talks to a [`Surface`],
//! a small set of tree operations (class and attribute mutation, structural
//! duplication, lookup by attribute, detach and removal). [`ElementTree`] is
//! the in-memory implementation: a generational slot arena that can be built
//! from HTML markup (parsed with `scraper`) and serialised back to it.

pub mod error;
pub mod html;
pub mod surface;
pub mod tree;

pub use error::{DomError, Result};
pub use surface::Surface;
pub use tree::{Descendants, Element, ElementTree, Node, NodeId};
