//! Error types shared by the whole crate.

use crate::dialog::FormIssue;
use crate::dom::NodeId;
use thiserror::Error;

/// Errors raised by document, editing and upload operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Node {0:?} has no parent")]
    DetachedNode(NodeId),
    #[error("Unknown node: {0:?}")]
    UnknownNode(NodeId),
    #[error("Node {0:?} is not an element")]
    NotAnElement(NodeId),
    #[error("Node {0:?} is not an image")]
    NotAnImage(NodeId),
    #[error("Node {0:?} cannot be inserted there")]
    InvalidHierarchy(NodeId),
    #[error("Image {0:?} has no editing scaffold")]
    MissingScaffold(NodeId),
    #[error("Unsupported: {0}")]
    Unsupported(String),
    #[error("HTML parse error at byte {offset}: {message}")]
    Parse { offset: usize, message: String },
    #[error("Upload failed: {0}")]
    Upload(String),
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("Image form is incomplete: {0:?}")]
    InvalidForm(Vec<FormIssue>),
}

/// Result type for crate operations.
pub type Result<T> = std::result::Result<T, Error>;
