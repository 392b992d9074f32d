//! Maps a platform triple to its expected archive path inside the cache.

use camino::{Utf8Path, Utf8PathBuf};
use std::fmt;
use tracing::debug;

use crate::config::PostgresVersion;
use crate::observability::CACHE_TARGET;

/// Prefix shared by every archive and bundle published by the repository.
pub(crate) const ARTIFACT_PREFIX: &str = "embedded-postgres-binaries";

/// Extension of the platform archive stored in the cache.
pub(crate) const ARCHIVE_EXTENSION: &str = "txz";

/// Operating system, architecture, and release naming one binary archive.
///
/// Names follow the repository's conventions rather than Rust's target
/// names, so `macos`/`x86_64` becomes `darwin`/`amd64`.
///
/// # Examples
/// ```
/// use pg_embed_lifecycle::{Platform, PostgresVersion};
///
/// let platform = Platform::new("linux", "amd64", PostgresVersion::V12_1_0);
/// assert_eq!(platform.artifact_stem(), "embedded-postgres-binaries-linux-amd64");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Platform {
    os: String,
    arch: String,
    version: PostgresVersion,
}

impl Platform {
    /// Builds a platform triple from explicit components.
    #[must_use]
    pub fn new(os: impl Into<String>, arch: impl Into<String>, version: PostgresVersion) -> Self {
        Self {
            os: os.into(),
            arch: arch.into(),
            version,
        }
    }

    /// Describes the host this process runs on.
    #[must_use]
    pub fn host(version: PostgresVersion) -> Self {
        Self::new(
            repository_os(std::env::consts::OS),
            repository_arch(std::env::consts::ARCH),
            version,
        )
    }

    /// Operating system component.
    #[must_use]
    pub fn os(&self) -> &str {
        &self.os
    }

    /// Architecture component.
    #[must_use]
    pub fn arch(&self) -> &str {
        &self.arch
    }

    /// Release component.
    #[must_use]
    pub const fn version(&self) -> &PostgresVersion {
        &self.version
    }

    /// Artifact name without the version, e.g.
    /// `embedded-postgres-binaries-linux-amd64`.
    #[must_use]
    pub fn artifact_stem(&self) -> String {
        format!("{ARTIFACT_PREFIX}-{}-{}", self.os, self.arch)
    }

    /// File name of the cached archive, e.g.
    /// `embedded-postgres-binaries-linux-amd64-12.1.0.txz`.
    #[must_use]
    pub fn archive_file_name(&self) -> String {
        format!(
            "{}-{}.{ARCHIVE_EXTENSION}",
            self.artifact_stem(),
            self.version
        )
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.os, self.arch, self.version)
    }
}

fn repository_os(os: &str) -> String {
    match os {
        "macos" => "darwin".to_owned(),
        other => other.to_owned(),
    }
}

fn repository_arch(arch: &str) -> String {
    match arch {
        "x86_64" => "amd64",
        "x86" => "i386",
        "aarch64" => "arm64v8",
        "arm" => "arm32v7",
        "powerpc64" => "ppc64le",
        other => other,
    }
    .to_owned()
}

/// Location of a cached archive and whether it is already materialised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// Canonical archive path inside the cache.
    pub path: Utf8PathBuf,
    /// `true` when `path` exists and is a regular file.
    pub exists: bool,
}

/// Computes where the archive for a platform lives.
///
/// Implementations must be deterministic and free of side effects; existence
/// is re-derived on every call rather than remembered.
#[cfg_attr(test, mockall::automock)]
pub trait CacheLocator: Send + Sync {
    /// Returns the expected archive path for `platform` and whether it exists.
    fn locate(&self, platform: &Platform) -> CacheEntry;
}

/// Cache locator rooted at a fixed directory.
#[derive(Debug, Clone)]
pub struct DefaultCacheLocator {
    root: Utf8PathBuf,
}

impl DefaultCacheLocator {
    /// Creates a locator rooted at [`resolve_cache_root`](super::resolve_cache_root).
    #[must_use]
    pub fn new() -> Self {
        Self::with_root(super::resolve_cache_root())
    }

    /// Creates a locator rooted at `root`.
    #[must_use]
    pub fn with_root(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the cache root.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }
}

impl Default for DefaultCacheLocator {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheLocator for DefaultCacheLocator {
    fn locate(&self, platform: &Platform) -> CacheEntry {
        let path = self.root.join(platform.archive_file_name());
        let exists = path.metadata().is_ok_and(|metadata| metadata.is_file());
        debug!(
            target: CACHE_TARGET,
            platform = %platform,
            path = %path,
            exists,
            "located cached archive"
        );
        CacheEntry { path, exists }
    }
}
