//! Error types for element tree operations.

use thiserror::Error;

use crate::tree::NodeId;

/// Result type for element tree operations.
pub type Result<T> = std::result::Result<T, DomError>;

/// Errors that can occur while building or editing an element tree.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomError {
    /// The node id does not belong to this tree.
    #[error("unknown node: {0:?}")]
    UnknownNode(NodeId),

    /// The node exists but is a text node.
    #[error("node {0:?} is not an element")]
    NotAnElement(NodeId),

    /// Tag names must be non-empty.
    #[error("invalid tag name: {0:?}")]
    InvalidTag(String),
}
