//! Error types for the transport adapter
//!
//! Two layers:
//! - [`TransportError`]: the exchange itself failed (network, status, body)
//! - [`ApiError`]: the exchange succeeded but the payload is a rejection or
//!   lacks the field the route promises

/// Wire-level failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// Connection, timeout or other client failure
    #[error("network error: {0}")]
    Network(String),

    /// Non-success HTTP status
    #[error("{path} returned status {status}")]
    Status {
        /// Route path
        path: String,
        /// HTTP status code
        status: u16,
    },

    /// Body was not the expected JSON
    #[error("malformed response body: {0}")]
    Decode(String),

    /// Base URL or route could not form a URL
    #[error("invalid url: {0}")]
    InvalidUrl(String),
}

/// Route-level failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// Exchange failed
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Server answered `{ error, helper? }`
    #[error("{message}")]
    Rejected {
        /// User-facing message
        message: String,
        /// Optional guidance shown next to the message
        helper: Option<String>,
    },

    /// Payload is missing the field this route must carry
    #[error("response missing `{0}`")]
    Missing(&'static str),
}

impl ApiError {
    /// Create rejection without helper text
    #[inline]
    #[must_use]
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: message.into(),
            helper: None,
        }
    }

    /// Whether this is a wire-level failure
    #[inline]
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}
