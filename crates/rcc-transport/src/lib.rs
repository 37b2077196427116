//! RCC Transport - request/response exchanges against the resource API
//!
//! The controller never builds URLs or reads JSON directly. It issues typed
//! [`ApiRequest`]s through a [`Transport`] and receives either structured
//! payloads or typed failures:
//! - [`TransportError`] when the exchange itself fails
//! - [`ApiError::Rejected`] when the server answers `{ error }`
//!
//! ```text
//! Controller → ResourceApi → Transport::exchange → ApiResponse → typed payload
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod api;
pub mod error;
pub mod http;
pub mod request;
pub mod response;
pub mod transport;
pub mod types;

pub use api::{ListPayload, ResourceApi};
pub use error::{ApiError, TransportError};
pub use http::HttpTransport;
pub use request::{ApiRequest, GeneratorKind, Method};
pub use response::{ApiResponse, BackResponse};
pub use transport::Transport;
pub use types::{FormData, ResourceId, ResourceRef};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
