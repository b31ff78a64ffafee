//! Loading remote image resources.

use futures::FutureExt;
use futures::future::LocalBoxFuture;
use std::time::Duration;

/// Default bound on a single image load.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(60);

/// Largest image body accepted from a rendering host.
pub const MAX_IMAGE_SIZE: u64 = 20 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedResource {
    pub status: u16,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl FetchedResource {
    /// Whether the response looks like an image a surface can display.
    pub fn is_image(&self) -> bool {
        let type_ok = self
            .content_type
            .as_deref()
            .is_none_or(|ct| ct.trim().to_ascii_lowercase().starts_with("image/"));
        (200..300).contains(&self.status) && type_ok && !self.bytes.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("request to {url} timed out")]
    Timeout { url: String },
    #[error("request to {url} returned HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },
}

/// Awaitable single-attempt GET of a URL. No retries.
pub trait ResourceFetcher {
    fn fetch<'a>(
        &'a self,
        url: &'a str,
    ) -> LocalBoxFuture<'a, Result<FetchedResource, FetchError>>;
}

/// [`ResourceFetcher`] over a blocking `ureq` agent.
#[derive(Clone)]
pub struct HttpFetcher {
    agent: ureq::Agent,
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new(DEFAULT_FETCH_TIMEOUT)
    }
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        Self { agent }
    }

    fn get(&self, url: &str) -> Result<FetchedResource, FetchError> {
        tracing::debug!(url, "fetching remote resource");
        let mut response = self
            .agent
            .get(url)
            .call()
            .map_err(|err| map_ureq_error(url, err))?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response
            .body_mut()
            .with_config()
            .limit(MAX_IMAGE_SIZE)
            .read_to_vec()
            .map_err(|err| map_ureq_error(url, err))?;

        tracing::debug!(url, status, bytes = bytes.len(), "remote resource loaded");
        Ok(FetchedResource {
            status,
            content_type,
            bytes,
        })
    }
}

impl ResourceFetcher for HttpFetcher {
    fn fetch<'a>(
        &'a self,
        url: &'a str,
    ) -> LocalBoxFuture<'a, Result<FetchedResource, FetchError>> {
        async move { self.get(url) }.boxed_local()
    }
}

fn map_ureq_error(url: &str, err: ureq::Error) -> FetchError {
    match err {
        ureq::Error::Timeout(_) => FetchError::Timeout {
            url: url.to_string(),
        },
        ureq::Error::StatusCode(status) => FetchError::Status {
            url: url.to_string(),
            status,
        },
        other => FetchError::Transport {
            url: url.to_string(),
            message: other.to_string(),
        },
    }
}
