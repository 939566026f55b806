//! Process-wide context exposed to message templates

use std::path::PathBuf;

use super::config::Arch;
use super::error::StoreError;
use super::instance::{FormatData, Instance};
use super::settings;

/// Host facts merged into every rendered template.
///
/// Captured once and passed explicitly so rendering never reads ambient state.
#[derive(Debug, Clone)]
pub struct HostContext {
    pub os: String,
    pub arch: String,
    /// Store home; `None` when it could not be resolved
    pub home: Option<PathBuf>,
}

impl HostContext {
    pub fn new(os: impl Into<String>, arch: impl Into<String>, home: Option<PathBuf>) -> Self {
        Self {
            os: os.into(),
            arch: arch.into(),
            home,
        }
    }

    /// Read the host OS, architecture and store home from the environment
    pub fn detect() -> Self {
        let arch = Arch::from_host_name(std::env::consts::ARCH)
            .map(|a| a.label().to_string())
            .unwrap_or_else(|| std::env::consts::ARCH.to_string());
        Self {
            os: std::env::consts::OS.to_string(),
            arch,
            home: settings::resolve_home().ok(),
        }
    }

    /// Current host with an explicit store home
    pub fn with_home(home: impl Into<PathBuf>) -> Self {
        Self {
            home: Some(home.into()),
            ..Self::detect()
        }
    }

    /// Combine an instance with the host fields
    pub fn format_data<'a>(&self, instance: &'a Instance) -> Result<FormatData<'a>, StoreError> {
        let home = self.home.clone().ok_or(StoreError::NoHomeDir)?;
        Ok(FormatData {
            instance,
            host_os: self.os.clone(),
            host_arch: self.arch.clone(),
            identity_file: settings::identity_file(&home),
            home,
        })
    }
}
