//! Unix process probing

use std::io;

use tracing::trace;

use super::Probe;

/// Check whether a process exists.
///
/// `kill(pid, 0)` performs the permission and existence checks without
/// delivering a signal. `ESRCH` means the process is gone, `EPERM` means it
/// exists but is owned by someone else.
pub fn probe_process(pid: i32) -> io::Result<Probe> {
    let result = unsafe { libc::kill(pid as libc::pid_t, 0) };
    if result == 0 {
        trace!("kill({}, 0) succeeded", pid);
        return Ok(Probe::Alive);
    }

    let err = io::Error::last_os_error();
    match err.raw_os_error() {
        Some(libc::ESRCH) => Ok(Probe::Exited),
        Some(libc::EPERM) => Ok(Probe::Denied),
        _ => Err(err),
    }
}
