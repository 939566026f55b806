//! Process liveness - reading PID files and probing the processes they name

use std::io;
use std::path::Path;

use tracing::{debug, warn};

use super::error::PidFileError;
use crate::platform::{self, Probe};

/// Read the process id recorded in `path` and check that the process is alive.
///
/// Returns 0 if the file does not exist or the process has already terminated,
/// in which case the stale file is removed. A process we are not permitted to
/// signal (e.g. a network daemon running as root) is still reported as alive.
pub fn read_pid_file(path: &Path) -> Result<i32, PidFileError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
        Err(source) => {
            return Err(PidFileError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let pid: i32 = contents
        .trim()
        .parse()
        .map_err(|source| PidFileError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    if pid <= 0 {
        return Err(PidFileError::InvalidPid {
            path: path.to_path_buf(),
            pid,
        });
    }

    match platform::probe_process(pid) {
        Ok(Probe::Alive) => {
            debug!("Process {} from {:?} is alive", pid, path);
            Ok(pid)
        }
        Ok(Probe::Denied) => {
            debug!(
                "Process {} from {:?} exists but cannot be signalled",
                pid, path
            );
            Ok(pid)
        }
        Ok(Probe::Exited) => {
            warn!("Removing stale pid file {:?} (process {} exited)", path, pid);
            // Another prober may have removed it already
            let _ = std::fs::remove_file(path);
            Ok(0)
        }
        Err(source) => Err(PidFileError::Probe {
            path: path.to_path_buf(),
            pid,
            source,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_is_not_running() {
        let dir = TempDir::new().unwrap();
        assert_eq!(read_pid_file(&dir.path().join("none.pid")).unwrap(), 0);
    }

    #[test]
    fn live_process_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("self.pid");
        std::fs::write(&path, format!("  {}\n", std::process::id())).unwrap();

        assert_eq!(read_pid_file(&path).unwrap(), std::process::id() as i32);
        assert!(path.exists());
    }

    #[cfg(unix)]
    #[test]
    fn exited_process_removes_stale_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gone.pid");
        let mut child = std::process::Command::new("true").spawn().unwrap();
        let pid = child.id();
        child.wait().unwrap();
        std::fs::write(&path, pid.to_string()).unwrap();

        assert_eq!(read_pid_file(&path).unwrap(), 0);
        assert!(!path.exists());
        // Probing again sees no file and still reports nothing running
        assert_eq!(read_pid_file(&path).unwrap(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn foreign_process_counts_as_alive() {
        // init is owned by root: either signalable (as root) or EPERM, never gone
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("init.pid");
        std::fs::write(&path, "1").unwrap();

        assert_eq!(read_pid_file(&path).unwrap(), 1);
    }

    #[test]
    fn garbage_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.pid");
        std::fs::write(&path, "not-a-pid").unwrap();

        assert!(matches!(
            read_pid_file(&path),
            Err(PidFileError::Parse { .. })
        ));
    }

    #[test]
    fn non_positive_pid_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("zero.pid");
        std::fs::write(&path, "0").unwrap();

        assert!(matches!(
            read_pid_file(&path),
            Err(PidFileError::InvalidPid { pid: 0, .. })
        ));
    }
}
