//! Transport seam
//!
//! Implement [`Transport`] to decide how an [`ApiRequest`] reaches the
//! server. The console ships [`crate::HttpTransport`]; tests script their
//! own.

use crate::error::TransportError;
use crate::request::ApiRequest;
use crate::response::ApiResponse;
use std::sync::Arc;

/// One request/response exchange
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Perform the exchange and decode the JSON body
    async fn exchange(&self, request: ApiRequest) -> Result<ApiResponse, TransportError>;
}

#[async_trait::async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn exchange(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        (**self).exchange(request).await
    }
}
