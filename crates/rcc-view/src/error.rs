//! Error types for the view tree

/// View tree errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ViewError {
    /// No element carries the requested id
    #[error("element not found: #{0}")]
    NotFound(String),

    /// Selector syntax not supported
    #[error("invalid selector: {0:?}")]
    InvalidSelector(String),
}
