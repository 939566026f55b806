//! Store settings and well-known on-disk names

use std::path::{Path, PathBuf};
use std::time::Duration;

use super::config::VmType;
use super::error::StoreError;

/// Environment variable overriding the store home directory
pub const HOME_ENV: &str = "VMSTATE_HOME";

/// Store home directory name under the user's home
pub const DEFAULT_HOME_DIR: &str = ".vmstate";

/// Configuration document inside an instance directory
pub const CONFIG_FILE: &str = "instance.yaml";

/// PID file written by the supervisor
pub const SUPERVISOR_PID_FILE: &str = "supervisor.pid";

/// Control socket served by the supervisor
pub const SUPERVISOR_SOCKET: &str = "supervisor.sock";

/// Directory under the store home holding user-wide configuration
pub const CONFIG_DIR: &str = "_config";

/// Private key used to reach instances over SSH
pub const USER_PRIVATE_KEY: &str = "user";

/// Default deadline for the supervisor info query
pub const DEFAULT_INFO_TIMEOUT: Duration = Duration::from_secs(3);

/// PID file written by the driver of a given backend
pub fn driver_pid_file(vm_type: VmType) -> String {
    format!("{}.pid", vm_type)
}

/// Identity file for a given store home
pub fn identity_file(home: &Path) -> PathBuf {
    home.join(CONFIG_DIR).join(USER_PRIVATE_KEY)
}

/// Resolve the store home: `$VMSTATE_HOME`, else `~/.vmstate`
pub fn resolve_home() -> Result<PathBuf, StoreError> {
    if let Some(home) = std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(home));
    }
    dirs::home_dir()
        .map(|h| h.join(DEFAULT_HOME_DIR))
        .ok_or(StoreError::NoHomeDir)
}

/// Store settings
#[derive(Debug, Clone)]
pub struct StoreSettings {
    /// Directory holding one sub-directory per instance
    pub home: PathBuf,
    /// Deadline for the supervisor info query
    pub info_timeout: Duration,
}

impl StoreSettings {
    pub fn new(home: impl Into<PathBuf>) -> Self {
        Self {
            home: home.into(),
            info_timeout: DEFAULT_INFO_TIMEOUT,
        }
    }

    /// Settings for the home resolved from the environment
    pub fn from_env() -> Result<Self, StoreError> {
        Ok(Self::new(resolve_home()?))
    }

    pub fn with_info_timeout(mut self, timeout: Duration) -> Self {
        self.info_timeout = timeout;
        self
    }

    /// Validate settings and fix any invalid values
    pub fn validate(&mut self) {
        self.info_timeout = self.info_timeout.max(Duration::from_millis(100));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn driver_pid_file_follows_backend() {
        assert_eq!(driver_pid_file(VmType::Qemu), "qemu.pid");
        assert_eq!(driver_pid_file(VmType::Vz), "vz.pid");
    }

    #[test]
    fn identity_file_lives_in_config_dir() {
        assert_eq!(
            identity_file(Path::new("/home/u/.vmstate")),
            PathBuf::from("/home/u/.vmstate/_config/user")
        );
    }

    #[test]
    fn validate_clamps_timeout() {
        let mut settings = StoreSettings::new("/tmp").with_info_timeout(Duration::ZERO);
        settings.validate();
        assert_eq!(settings.info_timeout, Duration::from_millis(100));
    }
}
