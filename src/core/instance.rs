//! Instance snapshot - the observed state of a single VM instance

use std::fmt;
use std::path::PathBuf;

use serde::{Serialize, Serializer};

use super::config::{Arch, Disk, InstanceConfig, Network, VmType};
use super::error::{ConfigError, InspectError};
use super::settings::CONFIG_FILE;

/// Status of an instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Status {
    /// Not yet reconciled
    #[default]
    Unknown,
    /// Neither the supervisor nor the driver is running
    Stopped,
    /// Both the supervisor and the driver are running
    Running,
    /// The instance exists but its state is inconsistent or could not be read
    Broken,
}

impl Status {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Unknown => "Unknown",
            Self::Stopped => "Stopped",
            Self::Running => "Running",
            Self::Broken => "Broken",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for Status {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

/// Point-in-time snapshot of an instance, built fresh by every inspection
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Instance {
    pub name: String,
    pub status: Status,
    pub dir: PathBuf,
    pub vm_type: VmType,
    pub arch: Arch,
    pub cpu_type: String,
    pub cpus: u32,
    /// Memory size in bytes, 0 if the configured size could not be parsed
    pub memory: i64,
    /// Disk size in bytes, 0 if the configured size could not be parsed
    pub disk: i64,
    pub message: String,
    pub additional_disks: Vec<Disk>,
    #[serde(rename = "network")]
    pub networks: Vec<Network>,
    pub ssh_local_port: u16,
    #[serde(rename = "supervisorPID")]
    pub supervisor_pid: i32,
    #[serde(rename = "driverPID")]
    pub driver_pid: i32,
    /// Soft failures in the order they were discovered
    #[serde(serialize_with = "serialize_errors")]
    pub errors: Vec<InspectError>,
    pub config: Option<InstanceConfig>,
}

fn serialize_errors<S: Serializer>(
    errors: &[InspectError],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(errors.iter().map(|e| e.to_string()))
}

impl Instance {
    pub fn new(name: impl Into<String>, dir: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            status: Status::Unknown,
            dir: dir.into(),
            vm_type: VmType::default(),
            arch: Arch::default(),
            cpu_type: String::new(),
            cpus: 0,
            memory: 0,
            disk: 0,
            message: String::new(),
            additional_disks: Vec::new(),
            networks: Vec::new(),
            ssh_local_port: 0,
            supervisor_pid: 0,
            driver_pid: 0,
            errors: Vec::new(),
            config: None,
        }
    }

    /// Re-read the configuration document from the instance directory
    pub fn load_config(&self) -> Result<InstanceConfig, ConfigError> {
        if self.dir.as_os_str().is_empty() {
            return Err(ConfigError::NoDirectory);
        }
        InstanceConfig::load(&self.dir.join(CONFIG_FILE))
    }

    pub fn is_running(&self) -> bool {
        self.status == Status::Running
    }

    /// Whether inspection hit any soft failure
    pub fn is_degraded(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Instance plus process-wide fields, used only as template input
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormatData<'a> {
    #[serde(flatten)]
    pub instance: &'a Instance,
    #[serde(rename = "hostOS")]
    pub host_os: String,
    pub host_arch: String,
    pub home: PathBuf,
    pub identity_file: PathBuf,
}
