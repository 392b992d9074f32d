//! Domain error types for the embedded `PostgreSQL` lifecycle.

use std::io;
use std::process::ExitStatus;
use std::time::Duration;

use camino::Utf8PathBuf;
use color_eyre::Report;
use thiserror::Error;

use crate::lifecycle::LifecycleState;

/// Result alias for [`EmbeddedPostgres::start`](crate::EmbeddedPostgres::start).
pub type StartResult<T> = std::result::Result<T, StartError>;

/// Result alias for [`EmbeddedPostgres::stop`](crate::EmbeddedPostgres::stop).
pub type StopResult<T> = std::result::Result<T, StopError>;

/// Result alias for remote fetch operations.
pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Result alias for configuration fallible operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Failures that abort [`EmbeddedPostgres::start`](crate::EmbeddedPostgres::start).
///
/// Every variant leaves no running child process behind.
#[derive(Debug, Error)]
pub enum StartError {
    /// Another process already listens on the configured port.
    #[error("process already listening on port {port}")]
    PortInUse {
        /// Port that could not be bound.
        port: u16,
        /// Bind failure reported by the operating system.
        #[source]
        source: io::Error,
    },
    /// The binary archive could not be fetched into the cache.
    #[error("failed to fetch PostgreSQL binaries")]
    Fetch(#[from] FetchError),
    /// The cached archive could not be unpacked into the runtime directory.
    #[error("failed to extract PostgreSQL archive")]
    Extraction(#[source] Report),
    /// Preparing the runtime directory or running `initdb` failed.
    #[error("failed to initialise PostgreSQL data directory")]
    Initialization(#[source] Report),
    /// The server process (or its supervisor) could not be launched.
    #[error("failed to launch PostgreSQL server")]
    Spawn(#[source] Report),
    /// The server never answered the readiness probe before the deadline.
    #[error("PostgreSQL did not become ready within {timeout:?}")]
    StartTimeout {
        /// Configured start timeout that elapsed.
        timeout: Duration,
    },
    /// The server exited while the readiness probe was still waiting.
    #[error("PostgreSQL exited before becoming ready ({status})")]
    ServerExited {
        /// Exit status reaped from the server process.
        status: ExitStatus,
    },
    /// `start()` was called while an instance is already live.
    #[error("cannot start while the instance is {state}")]
    InvalidState {
        /// State the coordinator was in when the call was rejected.
        state: LifecycleState,
    },
}

/// Failures returned by [`EmbeddedPostgres::stop`](crate::EmbeddedPostgres::stop).
///
/// Errors raised while terminating the server are logged rather than returned:
/// once `stop()` returns the process is gone either way.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum StopError {
    /// `stop()` was called without a preceding successful `start()`.
    #[error("postgres not yet started")]
    NotStarted,
}

/// Failures raised while fetching a binary archive into the cache.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The HTTP request could not be completed.
    #[error("failed to download {url}")]
    Network {
        /// URL that was requested.
        url: String,
        /// Transport failure.
        #[source]
        source: reqwest::Error,
    },
    /// The repository answered with a non-success status.
    #[error("download of {url} returned HTTP {status}")]
    Status {
        /// URL that was requested.
        url: String,
        /// HTTP status code returned by the repository.
        status: u16,
    },
    /// The downloaded bundle is not a readable zip container.
    #[error("failed to read release bundle from {url}")]
    Bundle {
        /// URL the bundle was downloaded from.
        url: String,
        /// Decoding failure.
        #[source]
        source: zip::result::ZipError,
    },
    /// The bundle holds no entry for the platform archive.
    #[error("release bundle {url} contains no entry ending in {suffix}")]
    NoMatchingArchive {
        /// URL the bundle was downloaded from.
        url: String,
        /// File suffix that was searched for.
        suffix: &'static str,
    },
    /// The archive could not be written into the cache.
    #[error("failed to write archive to {path}")]
    Write {
        /// Destination path inside the cache.
        path: Utf8PathBuf,
        /// Filesystem failure.
        #[source]
        source: io::Error,
    },
    /// The cache lock could not be acquired.
    #[error("failed to lock binary cache at {path}")]
    Lock {
        /// Cache directory holding the lock file.
        path: Utf8PathBuf,
        /// Locking failure.
        #[source]
        source: io::Error,
    },
    /// The fetch strategy reported success but left no archive behind.
    #[error("archive missing at {path} after fetch")]
    Missing {
        /// Cache path that should hold the archive.
        path: Utf8PathBuf,
    },
}

/// Captures configuration failures.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct ConfigError(#[from] Report);

/// Captures the failure of a single readiness attempt.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct ProbeError(#[from] Report);
