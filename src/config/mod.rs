//! Immutable configuration for an embedded `PostgreSQL` instance.
//!
//! [`Config`] is a value type: every `with_*` method consumes the current value
//! and returns an updated copy, so coordinators never share mutable settings.
//!
//! # Examples
//! ```
//! use std::time::Duration;
//!
//! use pg_embed_lifecycle::{Config, PostgresVersion};
//!
//! let config = Config::default()
//!     .with_version(PostgresVersion::V11_6_0)
//!     .with_port(15_432)
//!     .with_database("testdb")
//!     .with_start_timeout(Duration::from_secs(10));
//! assert_eq!(config.port(), 15_432);
//! assert_eq!(config.database(), "testdb");
//! ```

mod env;
mod version;

use std::fmt;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};

pub use self::version::PostgresVersion;

/// Administrative database every fresh cluster contains.
pub(crate) const ADMIN_DATABASE: &str = "postgres";

/// Default base URL of the repository publishing the binary bundles.
pub const DEFAULT_REPOSITORY_URL: &str = "https://repo1.maven.org/maven2/io/zonky/test/postgres";

const DEFAULT_PORT: u16 = 5432;
const DEFAULT_CREDENTIAL: &str = "postgres";
const DEFAULT_START_TIMEOUT: Duration = Duration::from_secs(15);
const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_INIT_TIMEOUT: Duration = Duration::from_secs(60);

/// Settings consumed once when an [`EmbeddedPostgres`](crate::EmbeddedPostgres)
/// is constructed.
#[derive(Clone, PartialEq, Eq)]
pub struct Config {
    version: PostgresVersion,
    port: u16,
    database: String,
    username: String,
    password: String,
    runtime_path: Option<Utf8PathBuf>,
    cache_dir: Option<Utf8PathBuf>,
    repository_url: String,
    start_timeout: Duration,
    stop_timeout: Duration,
    init_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: PostgresVersion::default(),
            port: DEFAULT_PORT,
            database: DEFAULT_CREDENTIAL.to_owned(),
            username: DEFAULT_CREDENTIAL.to_owned(),
            password: DEFAULT_CREDENTIAL.to_owned(),
            runtime_path: None,
            cache_dir: None,
            repository_url: DEFAULT_REPOSITORY_URL.to_owned(),
            start_timeout: DEFAULT_START_TIMEOUT,
            stop_timeout: DEFAULT_STOP_TIMEOUT,
            init_timeout: DEFAULT_INIT_TIMEOUT,
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("version", &self.version)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &"***")
            .field("runtime_path", &self.runtime_path)
            .field("cache_dir", &self.cache_dir)
            .field("repository_url", &self.repository_url)
            .field("start_timeout", &self.start_timeout)
            .field("stop_timeout", &self.stop_timeout)
            .field("init_timeout", &self.init_timeout)
            .finish()
    }
}

impl Config {
    /// Returns a copy using the given `PostgreSQL` release.
    #[must_use]
    pub fn with_version(mut self, version: PostgresVersion) -> Self {
        self.version = version;
        self
    }

    /// Returns a copy listening on `port`.
    #[must_use]
    pub const fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Returns a copy that provisions `database` once the server is ready.
    #[must_use]
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    /// Returns a copy using `username` as the superuser.
    #[must_use]
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = username.into();
        self
    }

    /// Returns a copy using `password` for the superuser.
    #[must_use]
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = password.into();
        self
    }

    /// Returns a copy that extracts the binaries into `path` instead of the
    /// default directory beside the cache.
    #[must_use]
    pub fn with_runtime_path(mut self, path: impl Into<Utf8PathBuf>) -> Self {
        self.runtime_path = Some(path.into());
        self
    }

    /// Returns a copy that caches archives under `path`.
    #[must_use]
    pub fn with_cache_dir(mut self, path: impl Into<Utf8PathBuf>) -> Self {
        self.cache_dir = Some(path.into());
        self
    }

    /// Returns a copy that downloads bundles from `url`.
    #[must_use]
    pub fn with_repository_url(mut self, url: impl Into<String>) -> Self {
        self.repository_url = url.into();
        self
    }

    /// Returns a copy that waits at most `timeout` for the server to accept
    /// connections.
    #[must_use]
    pub const fn with_start_timeout(mut self, timeout: Duration) -> Self {
        self.start_timeout = timeout;
        self
    }

    /// Returns a copy that waits at most `timeout` for a graceful exit before
    /// killing the server.
    #[must_use]
    pub const fn with_stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout = timeout;
        self
    }

    /// Returns a copy that allows `initdb` at most `timeout` to finish.
    #[must_use]
    pub const fn with_init_timeout(mut self, timeout: Duration) -> Self {
        self.init_timeout = timeout;
        self
    }

    /// Configured `PostgreSQL` release.
    #[must_use]
    pub const fn version(&self) -> &PostgresVersion {
        &self.version
    }

    /// Configured TCP port.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Database provisioned once the server is ready.
    #[must_use]
    pub fn database(&self) -> &str {
        &self.database
    }

    /// Superuser account name.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Superuser password.
    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }

    /// Custom extraction directory, if one was configured.
    #[must_use]
    pub fn runtime_path(&self) -> Option<&Utf8Path> {
        self.runtime_path.as_deref()
    }

    /// Custom cache root, if one was configured.
    #[must_use]
    pub fn cache_dir(&self) -> Option<&Utf8Path> {
        self.cache_dir.as_deref()
    }

    /// Base URL of the binary repository.
    #[must_use]
    pub fn repository_url(&self) -> &str {
        &self.repository_url
    }

    /// Deadline for the readiness poller.
    #[must_use]
    pub const fn start_timeout(&self) -> Duration {
        self.start_timeout
    }

    /// Grace period granted to the server after the shutdown signal.
    #[must_use]
    pub const fn stop_timeout(&self) -> Duration {
        self.stop_timeout
    }

    /// Deadline for the one-shot `initdb` run.
    #[must_use]
    pub const fn init_timeout(&self) -> Duration {
        self.init_timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.version(), &PostgresVersion::V12_1_0);
        assert_eq!(config.port(), 5432);
        assert_eq!(config.database(), "postgres");
        assert_eq!(config.username(), "postgres");
        assert_eq!(config.password(), "postgres");
        assert_eq!(config.start_timeout(), Duration::from_secs(15));
        assert_eq!(config.stop_timeout(), Duration::from_secs(5));
        assert!(config.runtime_path().is_none());
        assert!(config.cache_dir().is_none());
        assert_eq!(config.repository_url(), DEFAULT_REPOSITORY_URL);
    }

    #[test]
    fn with_methods_leave_the_original_untouched() {
        let base = Config::default();
        let derived = base.clone().with_port(15_432).with_database("testdb");

        assert_eq!(base.port(), 5432);
        assert_eq!(base.database(), "postgres");
        assert_eq!(derived.port(), 15_432);
        assert_eq!(derived.database(), "testdb");
    }

    #[test]
    fn runtime_and_cache_paths_are_recorded() {
        let config = Config::default()
            .with_runtime_path("/tmp/pg-runtime")
            .with_cache_dir("/tmp/pg-cache");
        assert_eq!(config.runtime_path(), Some(Utf8Path::new("/tmp/pg-runtime")));
        assert_eq!(config.cache_dir(), Some(Utf8Path::new("/tmp/pg-cache")));
    }

    #[test]
    fn debug_output_redacts_password() {
        let config = Config::default().with_password("hunter2");
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("hunter2"), "password leaked: {rendered}");
        assert!(rendered.contains("***"));
    }
}
