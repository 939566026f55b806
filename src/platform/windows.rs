//! Windows process probing

use std::io;

use windows::Win32::Foundation::{
    CloseHandle, ERROR_ACCESS_DENIED, ERROR_INVALID_PARAMETER, FALSE, STILL_ACTIVE,
};
use windows::Win32::System::Threading::{
    GetExitCodeProcess, OpenProcess, PROCESS_QUERY_LIMITED_INFORMATION,
};

use super::Probe;

/// Check whether a process exists by opening it and reading its exit code
pub fn probe_process(pid: i32) -> io::Result<Probe> {
    unsafe {
        let handle = match OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, FALSE, pid as u32) {
            Ok(h) => h,
            Err(e) if e.code() == ERROR_ACCESS_DENIED.to_hresult() => return Ok(Probe::Denied),
            Err(e) if e.code() == ERROR_INVALID_PARAMETER.to_hresult() => {
                return Ok(Probe::Exited)
            }
            Err(e) => return Err(io::Error::other(e)),
        };

        let mut exit_code: u32 = 0;
        let result = GetExitCodeProcess(handle, &mut exit_code);
        CloseHandle(handle).ok();
        result.map_err(io::Error::other)?;

        if exit_code == STILL_ACTIVE.0 as u32 {
            Ok(Probe::Alive)
        } else {
            Ok(Probe::Exited)
        }
    }
}
