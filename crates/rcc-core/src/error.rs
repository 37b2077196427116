//! Error types for RCC Core
//!
//! Taxonomy of controller failures:
//! - Validation: rejected field/association input, no state change
//! - Creation: target resource could not be created, saga aborted
//! - Cycle: link would break hierarchy acyclicity, triggers compensation
//! - Transport: network/server failure, shown as a generic message
//!
//! A stale target (the region a response was meant for is gone) is not an
//! error; operations log it and fall back.

use rcc_transport::{ApiError, TransportError};
use rcc_view::ViewError;
use std::path::PathBuf;

/// Main controller error type
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ControllerError {
    /// Rejected input
    #[error("{0}")]
    Validation(String),

    /// Target creation rejected
    #[error("{0}")]
    Creation(String),

    /// Association would create a cycle
    #[error("{0}")]
    Cycle(String),

    /// Exchange failed
    #[error("transport failure: {0}")]
    Transport(#[from] TransportError),

    /// View region missing or selector unusable
    #[error("view error: {0}")]
    View(#[from] ViewError),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Same operation already awaiting its response
    #[error("operation already in flight: {0}")]
    InFlight(String),

    /// Binding missing for an element the caller referenced
    #[error("no binding for element #{0}")]
    Unbound(String),
}

impl ControllerError {
    /// Map a route failure of an ordinary request
    #[must_use]
    pub fn from_api(err: ApiError) -> Self {
        match err {
            ApiError::Transport(e) => Self::Transport(e),
            ApiError::Rejected { message, .. } => Self::Validation(message),
            ApiError::Missing(field) => {
                Self::Transport(TransportError::Decode(format!("response missing `{field}`")))
            }
        }
    }

    /// Map a failure of a create request
    #[must_use]
    pub fn from_create(err: ApiError) -> Self {
        match err {
            ApiError::Rejected { message, .. } => Self::Creation(message),
            other => Self::from_api(other),
        }
    }

    /// Whether the user should be told about this error
    #[inline]
    #[must_use]
    pub fn is_user_visible(&self) -> bool {
        !matches!(self, Self::InFlight(_) | Self::Unbound(_))
    }

    /// Whether this error triggers saga compensation
    #[inline]
    #[must_use]
    pub fn is_cycle(&self) -> bool {
        matches!(self, Self::Cycle(_))
    }
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Config file unreadable
    #[error("cannot read {path}: {message}")]
    Io {
        /// File path
        path: PathBuf,
        /// OS error text
        message: String,
    },

    /// Config file not valid TOML for this schema
    #[error("invalid config: {0}")]
    Parse(String),

    /// Value out of range
    #[error("invalid value for `{key}`: {message}")]
    Invalid {
        /// Offending key
        key: &'static str,
        /// Why it was rejected
        message: String,
    },
}

/// State machine errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum StateMachineError {
    /// Transition not in the allowed table
    #[error("illegal state transition")]
    IllegalTransition,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_maps_by_route() {
        let rejected = ApiError::rejected("name is required");
        assert_eq!(
            ControllerError::from_api(rejected.clone()),
            ControllerError::Validation("name is required".into())
        );
        assert_eq!(
            ControllerError::from_create(rejected),
            ControllerError::Creation("name is required".into())
        );
    }

    #[test]
    fn missing_field_is_transport_failure() {
        let err = ControllerError::from_create(ApiError::Missing("id"));
        assert!(matches!(err, ControllerError::Transport(TransportError::Decode(_))));
    }

    #[test]
    fn guards_are_silent() {
        assert!(!ControllerError::InFlight("x".into()).is_user_visible());
        assert!(ControllerError::Cycle("loop".into()).is_user_visible());
        assert!(ControllerError::Cycle("loop".into()).is_cycle());
    }

    #[test]
    fn user_messages_are_verbatim() {
        let err = ControllerError::Validation("Cannot edit regions.".into());
        assert_eq!(err.to_string(), "Cannot edit regions.");
    }
}
