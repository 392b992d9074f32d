//! Network transfer used by the fetch strategy.

use std::time::Duration;

use crate::error::{FetchError, FetchResult};

/// Default bound on a whole bundle download.
const DEFAULT_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(300);

/// Retrieves a complete response body.
pub trait Transport: Send + Sync {
    /// Downloads `url` into memory.
    ///
    /// # Errors
    /// Returns [`FetchError::Network`] or [`FetchError::Status`] when the
    /// request fails.
    fn get(&self, url: &str) -> FetchResult<Vec<u8>>;
}

/// Blocking HTTP transport.
///
/// Performs one attempt per call; no retries and no resumable downloads.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    timeout: Duration,
}

impl HttpTransport {
    /// Creates a transport whose requests give up after `timeout`.
    #[must_use]
    pub const fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::with_timeout(DEFAULT_DOWNLOAD_TIMEOUT)
    }
}

impl Transport for HttpTransport {
    fn get(&self, url: &str) -> FetchResult<Vec<u8>> {
        let network = |source| FetchError::Network {
            url: url.to_owned(),
            source,
        };
        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(network)?;
        let response = client.get(url).send().map_err(network)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_owned(),
                status: status.as_u16(),
            });
        }
        let body = response.bytes().map_err(network)?;
        Ok(body.to_vec())
    }
}
