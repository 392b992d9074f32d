//! Background thread owning the server process.
//!
//! The supervisor spawns the server, polls it for readiness under the start
//! deadline, reports the outcome once over a one-shot channel, and then
//! waits for a shutdown request. Shutdown sends `SIGQUIT`,
//! waits out the grace period, and escalates to a kill.
//!
//! Both channels are created per launch, so a stopped instance can be
//! started again with fresh ones.

mod signal;

use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use camino::Utf8PathBuf;
use color_eyre::Report;
use color_eyre::eyre::{Context, eyre};
use tracing::{debug, info, info_span, warn};
use wait_timeout::ChildExt;

#[cfg(all(test, unix))]
pub(crate) use self::signal::process_is_running;
use crate::connection::{ConnectionMetadata, HOST};
use crate::error::{StartError, StartResult};
use crate::observability::SUPERVISOR_TARGET;
use crate::readiness::{ReadinessOutcome, ReadinessProbe, deadline_after, poll_until_ready};

/// Everything the supervisor thread needs to run one server.
pub(crate) struct LaunchRequest {
    pub(crate) server: Utf8PathBuf,
    pub(crate) data_dir: Utf8PathBuf,
    pub(crate) target: ConnectionMetadata,
    pub(crate) probe: Arc<dyn ReadinessProbe>,
    pub(crate) start_timeout: Duration,
    pub(crate) stop_timeout: Duration,
}

enum StartupSignal {
    Ready { pid: u32 },
    TimedOut,
    Exited(ExitStatus),
    SpawnFailed(Report),
}

/// Handle on a ready server and the thread supervising it.
#[derive(Debug)]
pub(crate) struct Supervisor {
    pid: u32,
    shutdown: SyncSender<()>,
    thread: JoinHandle<()>,
}

impl Supervisor {
    /// Starts the supervisor thread and blocks until the server is ready or
    /// has failed to become ready.
    ///
    /// No server process survives an error return.
    pub(crate) fn launch(request: LaunchRequest) -> StartResult<Self> {
        let start_timeout = request.start_timeout;
        let (startup_tx, startup_rx) = mpsc::sync_channel(1);
        let (shutdown_tx, shutdown_rx) = mpsc::sync_channel(1);
        let thread = thread::Builder::new()
            .name("pg-embed-supervisor".to_owned())
            .spawn(move || supervise(&request, &startup_tx, &shutdown_rx))
            .context("failed to spawn supervisor thread")
            .map_err(StartError::Spawn)?;

        let signal = startup_rx.recv();
        match signal {
            Ok(StartupSignal::Ready { pid }) => Ok(Self {
                pid,
                shutdown: shutdown_tx,
                thread,
            }),
            Ok(StartupSignal::TimedOut) => {
                join_supervisor(thread);
                Err(StartError::StartTimeout {
                    timeout: start_timeout,
                })
            }
            Ok(StartupSignal::Exited(status)) => {
                join_supervisor(thread);
                Err(StartError::ServerExited { status })
            }
            Ok(StartupSignal::SpawnFailed(report)) => {
                join_supervisor(thread);
                Err(StartError::Spawn(report))
            }
            Err(_) => {
                join_supervisor(thread);
                Err(StartError::Spawn(eyre!(
                    "supervisor exited before reporting startup"
                )))
            }
        }
    }

    /// Process ID of the server.
    pub(crate) const fn pid(&self) -> u32 {
        self.pid
    }

    /// Requests shutdown and blocks until the server has been reaped.
    pub(crate) fn stop(self) {
        if self.shutdown.send(()).is_err() {
            warn!(
                target: SUPERVISOR_TARGET,
                pid = self.pid,
                "supervisor already gone before shutdown was requested"
            );
        }
        join_supervisor(self.thread);
    }
}

/// Server child that is killed and reaped if the supervisor unwinds.
struct ServerProcess(Child);

impl Drop for ServerProcess {
    fn drop(&mut self) {
        if thread::panicking() {
            warn!(
                target: SUPERVISOR_TARGET,
                pid = self.0.id(),
                "supervisor panicked; killing server"
            );
            kill_and_reap(&mut self.0);
        }
    }
}

fn join_supervisor(thread: JoinHandle<()>) {
    if thread.join().is_err() {
        warn!(target: SUPERVISOR_TARGET, "supervisor thread panicked");
    }
}

fn supervise(
    request: &LaunchRequest,
    startup: &SyncSender<StartupSignal>,
    shutdown: &Receiver<()>,
) {
    let _span = info_span!(target: SUPERVISOR_TARGET, "supervisor", port = request.target.port())
        .entered();
    let mut server = match spawn_server(request) {
        Ok(child) => ServerProcess(child),
        Err(report) => {
            report_startup(startup, StartupSignal::SpawnFailed(report));
            return;
        }
    };
    let pid = server.0.id();
    info!(target: SUPERVISOR_TARGET, pid, "spawned server");

    let deadline = deadline_after(request.start_timeout);
    if deadline.is_none() {
        debug!(target: SUPERVISOR_TARGET, pid, "start timeout out of clock range; no deadline");
    }
    let outcome = poll_until_ready(request.probe.as_ref(), &request.target, deadline, || {
        server.0.try_wait().ok().flatten()
    });
    match outcome {
        ReadinessOutcome::Ready => {
            info!(target: SUPERVISOR_TARGET, pid, "server ready");
            report_startup(startup, StartupSignal::Ready { pid });
        }
        ReadinessOutcome::TimedOut => {
            warn!(
                target: SUPERVISOR_TARGET,
                pid,
                timeout_ms = request.start_timeout.as_millis(),
                "server not ready before deadline; terminating"
            );
            terminate(&mut server.0, request.stop_timeout);
            report_startup(startup, StartupSignal::TimedOut);
            return;
        }
        ReadinessOutcome::ChildExited(status) => {
            warn!(target: SUPERVISOR_TARGET, pid, %status, "server exited during startup");
            report_startup(startup, StartupSignal::Exited(status));
            return;
        }
    }

    // A dropped sender counts as a shutdown request.
    if shutdown.recv().is_err() {
        debug!(target: SUPERVISOR_TARGET, pid, "coordinator dropped; shutting down");
    }
    terminate(&mut server.0, request.stop_timeout);
}

fn spawn_server(request: &LaunchRequest) -> Result<Child, Report> {
    Command::new(request.server.as_std_path())
        .arg("-p")
        .arg(request.target.port().to_string())
        .args(["-h", HOST, "-D"])
        .arg(request.data_dir.as_std_path())
        .stdin(Stdio::null())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
        .with_context(|| format!("failed to spawn {}", request.server))
}

fn report_startup(startup: &SyncSender<StartupSignal>, signal: StartupSignal) {
    if startup.send(signal).is_err() {
        debug!(target: SUPERVISOR_TARGET, "startup result had no receiver");
    }
}

/// Stops `child`: shutdown signal, bounded wait, then kill and reap.
///
/// Failures are logged; the child is gone or unreachable on return.
fn terminate(child: &mut Child, grace: Duration) {
    let pid = child.id();
    match child.try_wait() {
        Ok(Some(status)) => {
            debug!(target: SUPERVISOR_TARGET, pid, %status, "server already exited");
            return;
        }
        Ok(None) => {}
        Err(err) => warn!(target: SUPERVISOR_TARGET, pid, error = %err, "failed to poll server"),
    }

    if let Err(err) = signal::request_shutdown(child) {
        warn!(target: SUPERVISOR_TARGET, pid, error = %err, "failed to signal server");
    }
    match child.wait_timeout(grace) {
        Ok(Some(status)) => {
            info!(target: SUPERVISOR_TARGET, pid, %status, "server stopped");
        }
        Ok(None) => {
            warn!(
                target: SUPERVISOR_TARGET,
                pid,
                grace_ms = grace.as_millis(),
                "server ignored shutdown request; killing"
            );
            kill_and_reap(child);
        }
        Err(err) => {
            warn!(target: SUPERVISOR_TARGET, pid, error = %err, "failed to wait for server");
            kill_and_reap(child);
        }
    }
}

fn kill_and_reap(child: &mut Child) {
    let pid = child.id();
    if let Err(err) = child.kill() {
        warn!(target: SUPERVISOR_TARGET, pid, error = %err, "failed to kill server");
    }
    match child.wait() {
        Ok(status) => info!(target: SUPERVISOR_TARGET, pid, %status, "server killed"),
        Err(err) => warn!(target: SUPERVISOR_TARGET, pid, error = %err, "failed to reap server"),
    }
}
