//! HTTP calls against the backend REST API.

use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::Method;
use thiserror::Error;
use url::Url;

/// Errors from a backend call.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("invalid backend url: {0}")]
    InvalidUrl(String),

    /// Transport failure, timeout, or unreadable body.
    #[error("backend request failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// Raw result of a backend call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

/// Issues single HTTP calls to the backend.
#[derive(Debug, Clone)]
pub struct BackendCaller {
    client: reqwest::Client,
    root: Url,
}

impl BackendCaller {
    /// Create a caller for `root_address` with a per-call `timeout`.
    pub fn new(root_address: &str, timeout: Duration) -> Result<Self, BackendError> {
        let root = Url::parse(root_address)
            .map_err(|e| BackendError::InvalidUrl(format!("'{}': {}", root_address, e)))?;
        if root.cannot_be_a_base() {
            return Err(BackendError::InvalidUrl(format!(
                "'{}' cannot carry a path",
                root_address
            )));
        }

        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, root })
    }

    /// Root address all endpoints hang off.
    pub fn root(&self) -> &Url {
        &self.root
    }

    /// Build `root + endpoint + segments`. Segments are percent-encoded.
    pub fn url(&self, endpoint: &str, segments: &[&str]) -> Result<Url, BackendError> {
        let mut url = self.root.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| BackendError::InvalidUrl(self.root.to_string()))?;
            path.pop_if_empty();
            for part in endpoint.split('/').filter(|p| !p.is_empty()) {
                path.push(part);
            }
            for segment in segments {
                path.push(segment);
            }
        }
        Ok(url)
    }

    /// Perform one call. The body, when present, is sent as JSON.
    pub async fn call(
        &self,
        method: Method,
        url: Url,
        body: Option<Vec<u8>>,
    ) -> Result<BackendResponse, BackendError> {
        tracing::debug!(method = %method, url = %url, "Sending request to backend");

        let mut request = self.client.request(method, url);
        if let Some(body) = body {
            request = request.header(CONTENT_TYPE, "application/json").body(body);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();

        tracing::debug!(status, bytes = body.len(), "Backend responded");
        Ok(BackendResponse { status, body })
    }
}
