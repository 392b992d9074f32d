//! Shared tracing targets for observability instrumentation.
//!
//! Centralises the log targets used by the crate so subscribers can filter
//! lifecycle events without pulling in unrelated application logs.

/// Target used by coordinator spans and lifecycle transitions.
pub(crate) const LOG_TARGET: &str = "pg_embed::lifecycle";

/// Target used by cache lookups and locking.
pub(crate) const CACHE_TARGET: &str = "pg_embed::cache";

/// Target used by remote fetches.
pub(crate) const FETCH_TARGET: &str = "pg_embed::fetch";

/// Target used by the process supervisor and readiness poller.
pub(crate) const SUPERVISOR_TARGET: &str = "pg_embed::supervisor";
