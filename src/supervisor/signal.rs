//! Signal delivery to the server process.

use std::io;
use std::process::Child;

/// Sends `SIGQUIT`, which the server answers by disconnecting clients and
/// exiting without a checkpoint.
#[cfg(unix)]
pub(super) fn request_shutdown(child: &mut Child) -> io::Result<()> {
    let pid = libc::pid_t::try_from(child.id()).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("pid {} does not fit pid_t", child.id()),
        )
    })?;
    // SAFETY: `pid` names a child this process spawned and has not yet
    // reaped, so it cannot have been recycled for an unrelated process.
    let rc = unsafe { libc::kill(pid, libc::SIGQUIT) };
    if rc == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

/// Terminates the server; there is no graceful signal to send.
#[cfg(not(unix))]
pub(super) fn request_shutdown(child: &mut Child) -> io::Result<()> {
    child.kill()
}

/// Returns `true` if a process with the given PID exists.
#[cfg(all(test, unix))]
pub(crate) fn process_is_running(pid: u32) -> bool {
    let Ok(pid) = libc::pid_t::try_from(pid) else {
        return false;
    };
    // SAFETY: signal 0 only probes for existence; nothing is delivered.
    let rc = unsafe { libc::kill(pid, 0) };
    if rc == 0 {
        return true;
    }
    !matches!(
        io::Error::last_os_error().raw_os_error(),
        Some(code) if code == libc::ESRCH
    )
}
