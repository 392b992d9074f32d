//! Remote retrieval of platform archives on a cache miss.
//!
//! The repository publishes one `.jar` bundle per platform and release. The
//! bundle is a zip container holding the `.txz` archive this crate extracts;
//! only that inner archive is written to the cache.

mod bundle;
mod transport;

use camino::Utf8Path;
use tracing::{info, info_span};

pub use self::transport::{HttpTransport, Transport};
use crate::cache::Platform;
use crate::config::DEFAULT_REPOSITORY_URL;
use crate::error::FetchResult;
use crate::observability::FETCH_TARGET;

/// Retrieves the archive for a platform and writes it to the cache.
///
/// Invoked only on a cache miss. Implementations are synchronous and make a
/// single attempt.
#[cfg_attr(test, mockall::automock)]
pub trait RemoteFetchStrategy: Send + Sync {
    /// Fetches the archive for `platform` and writes it to `destination`.
    ///
    /// # Errors
    /// Returns a [`FetchError`](crate::FetchError) when the download fails,
    /// the bundle cannot be decoded, holds no platform archive, or the archive
    /// cannot be written.
    fn fetch(&self, platform: &Platform, destination: &Utf8Path) -> FetchResult<()>;
}

/// Builds the bundle URL for `platform` under the repository at `base`.
///
/// # Examples
/// ```
/// use pg_embed_lifecycle::fetch::download_url;
/// use pg_embed_lifecycle::{Platform, PostgresVersion};
///
/// let platform = Platform::new("linux", "amd64", PostgresVersion::V12_1_0);
/// assert_eq!(
///     download_url("https://repo.example/postgres", &platform),
///     "https://repo.example/postgres/embedded-postgres-binaries-linux-amd64/12.1.0/\
///      embedded-postgres-binaries-linux-amd64-12.1.0.jar",
/// );
/// ```
#[must_use]
pub fn download_url(base: &str, platform: &Platform) -> String {
    let stem = platform.artifact_stem();
    let version = platform.version();
    format!(
        "{}/{stem}/{version}/{stem}-{version}.jar",
        base.trim_end_matches('/')
    )
}

/// Downloads bundles from a Maven-layout repository.
#[derive(Debug)]
pub struct MavenFetchStrategy<T = HttpTransport> {
    base_url: String,
    transport: T,
}

impl MavenFetchStrategy<HttpTransport> {
    /// Creates a strategy for the repository at `base_url` using HTTP.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_transport(base_url, HttpTransport::default())
    }
}

impl Default for MavenFetchStrategy<HttpTransport> {
    fn default() -> Self {
        Self::new(DEFAULT_REPOSITORY_URL)
    }
}

impl<T: Transport> MavenFetchStrategy<T> {
    /// Creates a strategy for the repository at `base_url` using `transport`.
    #[must_use]
    pub fn with_transport(base_url: impl Into<String>, transport: T) -> Self {
        Self {
            base_url: base_url.into(),
            transport,
        }
    }

    /// Base URL of the repository.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl<T: Transport> RemoteFetchStrategy for MavenFetchStrategy<T> {
    fn fetch(&self, platform: &Platform, destination: &Utf8Path) -> FetchResult<()> {
        let url = download_url(&self.base_url, platform);
        let _span = info_span!(target: FETCH_TARGET, "fetch", url = %url).entered();
        info!(target: FETCH_TARGET, destination = %destination, "downloading release bundle");

        let body = self.transport.get(&url)?;
        let archive = bundle::platform_archive(&url, &body)?;
        bundle::write_archive(destination, &archive)?;

        info!(
            target: FETCH_TARGET,
            destination = %destination,
            bytes = archive.len(),
            "cached platform archive"
        );
        Ok(())
    }
}
