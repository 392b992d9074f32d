//! Local cache of platform-specific binary archives.
//!
//! Archives live directly under the cache root, one file per
//! `(os, architecture, version)` triple:
//!
//! ```text
//! ~/.embedded-postgres-go/embedded-postgres-binaries-linux-amd64-12.1.0.txz
//! ```
//!
//! # Cache Location
//!
//! The cache root resolves in the following order:
//!
//! 1. [`Config::with_cache_dir`](crate::Config::with_cache_dir) (or
//!    `PG_EMBED_CACHE_DIR` via [`Config::from_env`](crate::Config::from_env))
//! 2. `~/.embedded-postgres-go` when the home directory is known
//! 3. `.embedded-postgres-go` relative to the working directory
//!
//! # Cross-Process Coordination
//!
//! Fetches hold a per-archive file lock so parallel test runners sharing a
//! cache download each archive once.

mod config;
mod locator;
mod lock;

pub use config::resolve_cache_root;
pub use lock::CacheLock;
#[cfg(test)]
pub(crate) use locator::MockCacheLocator;
pub use locator::{CacheEntry, CacheLocator, DefaultCacheLocator, Platform};
