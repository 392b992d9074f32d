//! Runs a disposable `PostgreSQL` server from prebuilt binaries.
//!
//! [`EmbeddedPostgres`] checks that the configured port is free, fetches the
//! platform archive into a local cache on first use, unpacks it into a fresh
//! runtime directory, runs `initdb`, and supervises the server on a
//! background thread until [`EmbeddedPostgres::stop`] is called or the value
//! is dropped.
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use pg_embed_lifecycle::{Config, EmbeddedPostgres, PostgresVersion};
//!
//! let config = Config::default()
//!     .with_version(PostgresVersion::V12_1_0)
//!     .with_port(15_432)
//!     .with_database("testdb")
//!     .with_start_timeout(Duration::from_secs(10));
//! let mut postgres = EmbeddedPostgres::new(config);
//! postgres.start()?;
//! if let Some(connection) = postgres.connection() {
//!     println!("{}", connection.database_connection_string());
//! }
//! postgres.stop()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! Tracing events are emitted under the `pg_embed::*` targets; the crate
//! never installs a subscriber.

pub mod cache;
mod config;
mod connection;
mod error;
mod extract;
pub mod fetch;
mod fs;
mod instance;
mod lifecycle;
mod observability;
mod port;
mod readiness;
mod supervisor;

pub use cache::{CacheEntry, CacheLocator, DefaultCacheLocator, Platform};
pub use config::{Config, DEFAULT_REPOSITORY_URL, PostgresVersion};
pub use connection::ConnectionMetadata;
pub use error::{
    ConfigError, ConfigResult, FetchError, FetchResult, ProbeError, StartError, StartResult,
    StopError, StopResult,
};
pub use extract::{ArchiveExtractor, TarXzExtractor};
pub use fetch::RemoteFetchStrategy;
pub use lifecycle::{EmbeddedPostgres, EmbeddedPostgresBuilder, LifecycleState};
pub use readiness::{ReadinessProbe, SqlProbe};
