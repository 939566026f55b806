//! Platform-specific process probing for Unix and Windows

#[cfg(unix)]
pub mod unix;

#[cfg(windows)]
pub mod windows;

use std::io;

/// Result of probing a process id without affecting the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Probe {
    /// The process exists and we are allowed to signal it
    Alive,
    /// No process with this id exists any more
    Exited,
    /// The process exists but belongs to another principal
    Denied,
}

/// Probe a process with a no-op signal (signal 0 on Unix, an exit-code query on Windows)
pub fn probe_process(pid: i32) -> io::Result<Probe> {
    #[cfg(unix)]
    {
        unix::probe_process(pid)
    }
    #[cfg(windows)]
    {
        windows::probe_process(pid)
    }
    #[cfg(not(any(unix, windows)))]
    {
        let _ = pid;
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "process probing is not supported on this platform",
        ))
    }
}
