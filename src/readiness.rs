//! Readiness probing for a freshly spawned server.
//!
//! A [`ReadinessProbe`] makes one attempt; [`poll_until_ready`] repeats it
//! under the start deadline, pausing between attempts and watching for the
//! child exiting underneath it.

use std::process::ExitStatus;
use std::thread;
use std::time::{Duration, Instant};

use color_eyre::eyre::{Context, eyre};
use postgres::{Client, NoTls};
use tracing::debug;

use crate::config::ADMIN_DATABASE;
use crate::connection::{ConnectionMetadata, escape_identifier};
use crate::error::ProbeError;
use crate::observability::SUPERVISOR_TARGET;

/// Pause between readiness attempts.
pub(crate) const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Upper bound on a single connection attempt.
pub(crate) const MAX_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(1);

/// Confirms that a server accepts work.
///
/// Implementations perform a single attempt and must return within roughly
/// `attempt_timeout`.
pub trait ReadinessProbe: Send + Sync {
    /// Runs one readiness attempt against `target`.
    ///
    /// # Errors
    /// Returns a [`ProbeError`] when the server is not ready yet or the
    /// attempt failed for any other reason; the caller retries until its
    /// deadline.
    fn probe(&self, target: &ConnectionMetadata, attempt_timeout: Duration)
    -> Result<(), ProbeError>;
}

/// Probe that connects to the administrative database, runs `SELECT 1`,
/// and creates the configured database when it differs from `postgres`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlProbe;

impl ReadinessProbe for SqlProbe {
    fn probe(
        &self,
        target: &ConnectionMetadata,
        attempt_timeout: Duration,
    ) -> Result<(), ProbeError> {
        let mut client = connect(target, attempt_timeout)?;
        client
            .simple_query("SELECT 1")
            .wrap_err("liveness query failed")?;
        if target.database() != ADMIN_DATABASE {
            ensure_database(&mut client, target.database())?;
        }
        client.close().wrap_err("failed to close probe connection")?;
        Ok(())
    }
}

fn connect(target: &ConnectionMetadata, attempt_timeout: Duration) -> Result<Client, ProbeError> {
    let conninfo = target.connection_string(ADMIN_DATABASE);
    let mut config: postgres::Config = conninfo
        .parse()
        .map_err(|err| eyre!("invalid connection string: {err}"))?;
    config.connect_timeout(attempt_timeout);
    let client = config
        .connect(NoTls)
        .wrap_err_with(|| format!("failed to connect to port {}", target.port()))?;
    Ok(client)
}

fn ensure_database(client: &mut Client, name: &str) -> Result<(), ProbeError> {
    let row = client
        .query_one(
            "SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)",
            &[&name],
        )
        .wrap_err("failed to check for database")?;
    let exists: bool = row
        .try_get(0)
        .wrap_err("failed to read database existence flag")?;
    if exists {
        return Ok(());
    }
    let escaped = escape_identifier(name);
    client
        .batch_execute(&format!("CREATE DATABASE \"{escaped}\""))
        .wrap_err_with(|| format!("failed to create database '{name}'"))?;
    Ok(())
}

/// Result of waiting for readiness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ReadinessOutcome {
    Ready,
    TimedOut,
    ChildExited(ExitStatus),
}

/// Deadline `timeout` from now, or `None` when it lies beyond what
/// [`Instant`] can represent.
pub(crate) fn deadline_after(timeout: Duration) -> Option<Instant> {
    Instant::now().checked_add(timeout)
}

fn remaining_until(deadline: Option<Instant>) -> Duration {
    deadline.map_or(Duration::MAX, |at| {
        at.saturating_duration_since(Instant::now())
    })
}

/// Repeats `probe` until it succeeds, `deadline` passes, or `child_exit`
/// reports that the server has exited.
///
/// A `None` deadline polls until one of the other two happens.
pub(crate) fn poll_until_ready<F>(
    probe: &dyn ReadinessProbe,
    target: &ConnectionMetadata,
    deadline: Option<Instant>,
    mut child_exit: F,
) -> ReadinessOutcome
where
    F: FnMut() -> Option<ExitStatus>,
{
    let mut attempt: u32 = 0;
    loop {
        if let Some(status) = child_exit() {
            return ReadinessOutcome::ChildExited(status);
        }
        let remaining = remaining_until(deadline);
        if remaining.is_zero() {
            return ReadinessOutcome::TimedOut;
        }

        attempt += 1;
        match probe.probe(target, remaining.min(MAX_ATTEMPT_TIMEOUT)) {
            Ok(()) => {
                debug!(target: SUPERVISOR_TARGET, attempt, "readiness probe succeeded");
                return ReadinessOutcome::Ready;
            }
            Err(err) => {
                debug!(target: SUPERVISOR_TARGET, attempt, error = %err, "readiness probe failed");
            }
        }

        thread::sleep(POLL_INTERVAL.min(remaining_until(deadline)));
    }
}
