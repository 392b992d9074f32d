//! Cleans the runtime directory, unpacks the binaries, and runs `initdb`.

use std::io::Read;
use std::process::{Command, ExitStatus, Output, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use camino::Utf8Path;
use color_eyre::Report;
use color_eyre::eyre::{Context, Result};
use tracing::{debug, info, info_span, warn};
use wait_timeout::ChildExt;

use super::RuntimeLayout;
use super::output::render_failure;
use crate::error::{StartError, StartResult};
use crate::extract::ArchiveExtractor;
use crate::fs::{ensure_dir_exists, remove_dir_all_if_exists, write_private_file};
use crate::observability::LOG_TARGET;

/// Inputs for preparing a fresh runtime directory.
pub(crate) struct InitRequest<'a> {
    pub(crate) layout: &'a RuntimeLayout,
    pub(crate) archive: &'a Utf8Path,
    pub(crate) extractor: &'a dyn ArchiveExtractor,
    pub(crate) username: &'a str,
    pub(crate) password: &'a str,
    pub(crate) timeout: Duration,
}

/// Rebuilds the runtime directory from `request.archive` and initialises a
/// new data directory in it.
///
/// Extraction failures map to [`StartError::Extraction`]; every other
/// failure maps to [`StartError::Initialization`].
pub(crate) fn initialize(request: &InitRequest<'_>) -> StartResult<()> {
    let root = request.layout.root();
    let _span = info_span!(target: LOG_TARGET, "initialize", runtime = %root).entered();

    remove_dir_all_if_exists(root)
        .and_then(|()| ensure_dir_exists(root))
        .map_err(StartError::Initialization)?;
    request
        .extractor
        .extract(request.archive, root)
        .map_err(StartError::Extraction)?;
    write_private_file(&request.layout.pwfile(), request.password.as_bytes())
        .wrap_err("failed to write password file")
        .map_err(StartError::Initialization)?;
    run_initdb(request).map_err(StartError::Initialization)?;

    info!(target: LOG_TARGET, data_dir = %request.layout.data_dir(), "initialised data directory");
    Ok(())
}

fn initdb_command(request: &InitRequest<'_>) -> Command {
    let layout = request.layout;
    let mut command = Command::new(layout.binary("initdb").as_std_path());
    command
        .args(["-A", "password", "-U", request.username, "-D"])
        .arg(layout.data_dir().as_std_path())
        .arg(format!("--pwfile={}", layout.pwfile()))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    command
}

fn run_initdb(request: &InitRequest<'_>) -> Result<()> {
    let initdb = request.layout.binary("initdb");
    let mut child = initdb_command(request)
        .spawn()
        .with_context(|| format!("failed to spawn {initdb}"))?;
    // Drained while waiting so a chatty initdb cannot fill the pipes and stall.
    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let waited = match child.wait_timeout(request.timeout) {
        Ok(waited) => waited,
        Err(error) => {
            if let Err(kill_err) = child.kill() {
                warn!(target: LOG_TARGET, error = %kill_err, "failed to kill initdb");
            }
            let reaped = child.wait();
            return Err(Report::new(error)
                .wrap_err(format!("failed to wait for initdb (reaped: {reaped:?})")));
        }
    };

    let Some(status) = waited else {
        if let Err(kill_err) = child.kill() {
            warn!(target: LOG_TARGET, error = %kill_err, "failed to kill timed out initdb");
        }
        let status = child.wait().context("failed to reap timed out initdb")?;
        return Err(render_failure(
            &format!("initdb timed out after {:?}", request.timeout),
            &collect(status, stdout, stderr),
        ));
    };

    check_exit(&collect(status, stdout, stderr))
}

type PipeReader = Option<JoinHandle<Vec<u8>>>;

fn drain<R>(pipe: Option<R>) -> PipeReader
where
    R: Read + Send + 'static,
{
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buffer = Vec::new();
            if let Err(err) = pipe.read_to_end(&mut buffer) {
                debug!(target: LOG_TARGET, error = %err, "failed to read initdb output");
            }
            buffer
        })
    })
}

fn collect(status: ExitStatus, stdout: PipeReader, stderr: PipeReader) -> Output {
    let join = |reader: PipeReader| {
        reader
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default()
    };
    Output {
        status,
        stdout: join(stdout),
        stderr: join(stderr),
    }
}

fn check_exit(output: &Output) -> Result<()> {
    if output.status.success() {
        return Ok(());
    }
    Err(render_failure(
        &format!("initdb exited with {}", output.status),
        output,
    ))
}
