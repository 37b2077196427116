//! HTTP transport over reqwest
//!
//! Keeps a cookie store so the server-held session (navigation stack,
//! expanded diagram nodes) survives across exchanges.

use crate::error::TransportError;
use crate::request::{ApiRequest, Method};
use crate::response::ApiResponse;
use crate::transport::Transport;
use reqwest::header::ACCEPT;
use reqwest::{Client, Url};
use std::time::Duration;

/// Transport that talks to the admin server over HTTP
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: Url,
}

impl HttpTransport {
    /// Create transport for a base URL
    ///
    /// # Errors
    /// `TransportError::InvalidUrl` for unparsable or non-hierarchical URLs,
    /// `TransportError::Network` if the client cannot be built
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, TransportError> {
        let base_url =
            Url::parse(base_url).map_err(|e| TransportError::InvalidUrl(format!("{base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(TransportError::InvalidUrl(base_url.to_string()));
        }
        let client = Client::builder()
            .timeout(timeout)
            .cookie_store(true)
            .build()
            .map_err(|e| TransportError::Network(e.to_string()))?;
        Ok(Self { client, base_url })
    }

    /// Base URL
    #[inline]
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Absolute URL of a request
    ///
    /// # Errors
    /// `TransportError::InvalidUrl` when the base cannot take path segments
    pub fn url_for(&self, request: &ApiRequest) -> Result<Url, TransportError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| TransportError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(request.segments());
        Ok(url)
    }
}

/// Decode a response body; empty and `null` bodies are empty payloads
pub(crate) fn decode_body(body: &str) -> Result<ApiResponse, TransportError> {
    let trimmed = body.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(ApiResponse::default());
    }
    serde_json::from_str(trimmed).map_err(|e| TransportError::Decode(e.to_string()))
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
    async fn exchange(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        let url = self.url_for(&request)?;
        let params = request.params();
        tracing::debug!(%request, params = params.len(), "sending request");

        let builder = match request.method() {
            Method::Get => self.client.get(url).query(params.pairs()),
            Method::Post => self.client.post(url).form(params.pairs()),
            Method::Delete => self.client.delete(url).form(params.pairs()),
        };

        let response = builder
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(%request, status = status.as_u16(), "request failed");
            return Err(TransportError::Status {
                path: request.path(),
                status: status.as_u16(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;
        tracing::debug!(%request, bytes = body.len(), "response received");
        decode_body(&body)
    }
}
