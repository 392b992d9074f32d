//! Start/stop coordination for one embedded `PostgreSQL` instance.
//!
//! [`EmbeddedPostgres::start`] runs the pipeline in order:
//!
//! 1. fail fast if the configured port is already bound,
//! 2. locate the platform archive, fetching it under a cache lock on a miss,
//! 3. rebuild the runtime directory and run `initdb`,
//! 4. launch the supervisor and wait for readiness.
//!
//! [`EmbeddedPostgres::stop`] asks the supervisor to shut the server down
//! and returns once the process has been reaped.

mod state;

use std::fmt;
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use tracing::{debug, info, info_span, warn};

pub use self::state::LifecycleState;
use crate::Config;
use crate::cache::{CacheLocator, CacheLock, DefaultCacheLocator, Platform, resolve_cache_root};
use crate::connection::ConnectionMetadata;
use crate::error::{FetchError, StartError, StartResult, StopError, StopResult};
use crate::extract::{ArchiveExtractor, TarXzExtractor};
use crate::fetch::{MavenFetchStrategy, RemoteFetchStrategy};
use crate::instance::{InitRequest, RuntimeLayout, initialize};
use crate::observability::{CACHE_TARGET, LOG_TARGET};
use crate::port::ensure_port_available;
use crate::readiness::{ReadinessProbe, SqlProbe};
use crate::supervisor::{LaunchRequest, Supervisor};

/// Coordinates the lifecycle of one embedded `PostgreSQL` server.
///
/// The server, its port, and its runtime directory belong to this value.
/// Dropping a running instance stops the server.
///
/// # Examples
/// ```no_run
/// use pg_embed_lifecycle::{Config, EmbeddedPostgres};
///
/// let mut postgres = EmbeddedPostgres::new(Config::default().with_port(15_432));
/// postgres.start()?;
/// // connect using postgres.connection()
/// postgres.stop()?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct EmbeddedPostgres {
    config: Config,
    platform: Platform,
    locator: Box<dyn CacheLocator>,
    fetcher: Box<dyn RemoteFetchStrategy>,
    extractor: Box<dyn ArchiveExtractor>,
    probe: Arc<dyn ReadinessProbe>,
    state: LifecycleState,
    runtime: Option<RuntimeLayout>,
    supervisor: Option<Supervisor>,
}

impl EmbeddedPostgres {
    /// Creates a coordinator with the default collaborators for `config`.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self::builder(config).build()
    }

    /// Starts a builder for replacing individual collaborators.
    #[must_use]
    pub fn builder(config: Config) -> EmbeddedPostgresBuilder {
        EmbeddedPostgresBuilder::new(config)
    }

    /// Brings the server up and blocks until it accepts connections.
    ///
    /// # Errors
    /// - [`StartError::InvalidState`] if a server is already live;
    /// - [`StartError::PortInUse`] if the port is bound, before any other
    ///   work happens;
    /// - [`StartError::Fetch`], [`StartError::Extraction`], or
    ///   [`StartError::Initialization`] if preparing the binaries fails;
    /// - [`StartError::Spawn`], [`StartError::StartTimeout`], or
    ///   [`StartError::ServerExited`] if the server never became ready.
    ///
    /// No server process is left running after an error.
    pub fn start(&mut self) -> StartResult<()> {
        if !self.state.can_start() {
            return Err(StartError::InvalidState { state: self.state });
        }
        let span = info_span!(
            target: LOG_TARGET,
            "start",
            port = self.config.port(),
            version = %self.config.version()
        );
        let _entered = span.enter();
        info!(target: LOG_TARGET, "starting embedded postgres");

        self.state = LifecycleState::Initializing;
        match self.launch() {
            Ok(supervisor) => {
                info!(target: LOG_TARGET, pid = supervisor.pid(), "postgres ready");
                self.supervisor = Some(supervisor);
                self.state = LifecycleState::Ready;
                Ok(())
            }
            Err(err) => {
                warn!(target: LOG_TARGET, error = %err, "postgres failed to start");
                self.state = LifecycleState::Failed;
                Err(err)
            }
        }
    }

    /// Shuts the server down and blocks until it has exited.
    ///
    /// # Errors
    /// Returns [`StopError::NotStarted`] unless a `start()` succeeded since
    /// the last `stop()`.
    pub fn stop(&mut self) -> StopResult<()> {
        let Some(supervisor) = self.supervisor.take() else {
            return Err(StopError::NotStarted);
        };
        let pid = supervisor.pid();
        info!(target: LOG_TARGET, pid, "stopping postgres");
        self.state = LifecycleState::Stopping;
        supervisor.stop();
        self.state = LifecycleState::Stopped;
        info!(target: LOG_TARGET, pid, "postgres stopped");
        Ok(())
    }

    /// Current phase.
    #[must_use]
    pub const fn state(&self) -> LifecycleState {
        self.state
    }

    /// Process ID of the running server.
    #[must_use]
    pub fn pid(&self) -> Option<u32> {
        self.supervisor.as_ref().map(Supervisor::pid)
    }

    /// Runtime directory of the most recent start attempt that got past the
    /// cache step.
    #[must_use]
    pub fn runtime_dir(&self) -> Option<&Utf8Path> {
        self.runtime.as_ref().map(RuntimeLayout::root)
    }

    /// Connection details while the server is ready.
    #[must_use]
    pub fn connection(&self) -> Option<ConnectionMetadata> {
        (self.state == LifecycleState::Ready).then(|| ConnectionMetadata::from_config(&self.config))
    }

    /// Configuration this instance was built with.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Platform whose binaries this instance runs.
    #[must_use]
    pub const fn platform(&self) -> &Platform {
        &self.platform
    }

    fn launch(&mut self) -> StartResult<Supervisor> {
        ensure_port_available(self.config.port())?;
        let archive = self.ensure_archive()?;

        let layout = RuntimeLayout::resolve(&self.config, &archive);
        self.runtime = Some(layout.clone());
        initialize(&InitRequest {
            layout: &layout,
            archive: &archive,
            extractor: self.extractor.as_ref(),
            username: self.config.username(),
            password: self.config.password(),
            timeout: self.config.init_timeout(),
        })?;

        self.state = LifecycleState::Starting;
        Supervisor::launch(LaunchRequest {
            server: layout.binary("postgres"),
            data_dir: layout.data_dir(),
            target: ConnectionMetadata::from_config(&self.config),
            probe: Arc::clone(&self.probe),
            start_timeout: self.config.start_timeout(),
            stop_timeout: self.config.stop_timeout(),
        })
    }

    /// Returns the cached archive path, fetching it on a miss.
    fn ensure_archive(&self) -> StartResult<Utf8PathBuf> {
        let entry = self.locator.locate(&self.platform);
        if entry.exists {
            info!(target: CACHE_TARGET, path = %entry.path, "binary cache hit");
            return Ok(entry.path);
        }
        info!(target: CACHE_TARGET, path = %entry.path, "binary cache miss");

        let cache_dir = entry
            .path
            .parent()
            .filter(|parent| !parent.as_str().is_empty())
            .unwrap_or_else(|| Utf8Path::new("."));
        let _lock = CacheLock::acquire_exclusive(cache_dir, &self.platform.archive_file_name())
            .map_err(|source| FetchError::Lock {
                path: cache_dir.to_path_buf(),
                source,
            })?;

        let rechecked = self.locator.locate(&self.platform);
        if rechecked.exists {
            debug!(target: CACHE_TARGET, path = %rechecked.path, "archive fetched by another process");
            return Ok(rechecked.path);
        }
        self.fetcher.fetch(&self.platform, &rechecked.path)?;

        if !self.locator.locate(&self.platform).exists {
            return Err(FetchError::Missing {
                path: rechecked.path,
            }
            .into());
        }
        info!(target: CACHE_TARGET, path = %rechecked.path, "cached fetched archive");
        Ok(rechecked.path)
    }
}

impl fmt::Debug for EmbeddedPostgres {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmbeddedPostgres")
            .field("config", &self.config)
            .field("platform", &self.platform)
            .field("state", &self.state)
            .field("runtime", &self.runtime_dir())
            .field("pid", &self.pid())
            .finish_non_exhaustive()
    }
}

impl Drop for EmbeddedPostgres {
    fn drop(&mut self) {
        let Some(supervisor) = self.supervisor.take() else {
            return;
        };
        warn!(
            target: LOG_TARGET,
            pid = supervisor.pid(),
            "dropping running postgres without stop(); shutting it down"
        );
        supervisor.stop();
    }
}

/// Builder for an [`EmbeddedPostgres`] with replaced collaborators.
///
/// Anything not set falls back to the default derived from the
/// [`Config`]: the host platform, a [`DefaultCacheLocator`] under the
/// configured cache directory, a [`MavenFetchStrategy`] for the configured
/// repository, [`TarXzExtractor`], and [`SqlProbe`].
pub struct EmbeddedPostgresBuilder {
    config: Config,
    platform: Option<Platform>,
    locator: Option<Box<dyn CacheLocator>>,
    fetcher: Option<Box<dyn RemoteFetchStrategy>>,
    extractor: Option<Box<dyn ArchiveExtractor>>,
    probe: Option<Arc<dyn ReadinessProbe>>,
}

impl EmbeddedPostgresBuilder {
    fn new(config: Config) -> Self {
        Self {
            config,
            platform: None,
            locator: None,
            fetcher: None,
            extractor: None,
            probe: None,
        }
    }

    /// Uses `platform` instead of the host platform.
    #[must_use]
    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = Some(platform);
        self
    }

    /// Uses `locator` to find cached archives.
    #[must_use]
    pub fn with_cache_locator(mut self, locator: impl CacheLocator + 'static) -> Self {
        self.locator = Some(Box::new(locator));
        self
    }

    /// Uses `fetcher` on cache misses.
    #[must_use]
    pub fn with_fetch_strategy(mut self, fetcher: impl RemoteFetchStrategy + 'static) -> Self {
        self.fetcher = Some(Box::new(fetcher));
        self
    }

    /// Uses `extractor` to unpack the cached archive.
    #[must_use]
    pub fn with_extractor(mut self, extractor: impl ArchiveExtractor + 'static) -> Self {
        self.extractor = Some(Box::new(extractor));
        self
    }

    /// Uses `probe` to decide when the server is ready.
    #[must_use]
    pub fn with_probe(mut self, probe: impl ReadinessProbe + 'static) -> Self {
        self.probe = Some(Arc::new(probe));
        self
    }

    /// Assembles the coordinator.
    #[must_use]
    pub fn build(self) -> EmbeddedPostgres {
        let config = self.config;
        let platform = self
            .platform
            .unwrap_or_else(|| Platform::host(config.version().clone()));
        let locator = self.locator.unwrap_or_else(|| {
            let root = config
                .cache_dir()
                .map_or_else(resolve_cache_root, Utf8Path::to_path_buf);
            Box::new(DefaultCacheLocator::with_root(root))
        });
        let fetcher = self
            .fetcher
            .unwrap_or_else(|| Box::new(MavenFetchStrategy::new(config.repository_url())));

        EmbeddedPostgres {
            platform,
            locator,
            fetcher,
            extractor: self.extractor.unwrap_or_else(|| Box::new(TarXzExtractor)),
            probe: self.probe.unwrap_or_else(|| Arc::new(SqlProbe)),
            config,
            state: LifecycleState::Idle,
            runtime: None,
            supervisor: None,
        }
    }
}

impl fmt::Debug for EmbeddedPostgresBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmbeddedPostgresBuilder")
            .field("config", &self.config)
            .field("platform", &self.platform)
            .finish_non_exhaustive()
    }
}
