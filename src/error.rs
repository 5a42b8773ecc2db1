//! Error types for the form engine

use thiserror::Error;

use crate::document::NodeId;

/// Errors surfaced by form operations.
///
/// Template misconfiguration is never reported here: unknown types and missing
/// children render as empty content. The variants below cover failures of
/// caller-supplied callbacks and misuse of the edit API.
#[derive(Debug, Error)]
pub enum FormError {
    /// An options producer for a select field failed
    #[error("Options for field '{field}' failed: {message}")]
    Options { field: String, message: String },

    /// A custom component could not be instantiated
    #[error("Component '{name}' failed: {message}")]
    Component { name: String, message: String },

    /// An external change listener failed
    #[error("Change listener failed: {0}")]
    Listener(String),

    /// The node does not exist in the current document
    #[error("Unknown node: {0}")]
    UnknownNode(NodeId),

    /// No node is tagged with this path
    #[error("No field at path '{0}'")]
    UnknownPath(String),

    /// The node is not an editable input
    #[error("Node {0} is not an input")]
    NotAnInput(NodeId),

    /// The node is not a custom widget
    #[error("Node {0} is not a custom widget")]
    NotACustomWidget(NodeId),

    /// The node is not an array container or array item
    #[error("Node {0} is not an array")]
    NotAnArray(NodeId),

    /// Items of this array cannot be reordered
    #[error("Array '{0}' is not sortable")]
    NotSortable(String),

    /// Target position outside the array
    #[error("Position {position} is out of range for {len} items")]
    InvalidPosition { position: usize, len: usize },

    /// Template data could not be interpreted
    #[error("Template error: {0}")]
    Template(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Result type alias for form operations
pub type FormResult<T> = Result<T, FormError>;
