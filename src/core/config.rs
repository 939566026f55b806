//! Instance configuration document (`instance.yaml`)

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::ConfigError;

/// Guest architecture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Arch {
    #[serde(rename = "x86_64")]
    X86_64,
    Aarch64,
    Armv7l,
    Riscv64,
}

impl Arch {
    /// Architecture of the machine we are running on, falling back to x86_64
    pub fn host() -> Self {
        Self::from_host_name(std::env::consts::ARCH).unwrap_or(Self::X86_64)
    }

    /// Map a Rust target architecture name to a guest architecture
    pub fn from_host_name(name: &str) -> Option<Self> {
        match name {
            "x86_64" => Some(Self::X86_64),
            "aarch64" => Some(Self::Aarch64),
            "arm" => Some(Self::Armv7l),
            "riscv64" => Some(Self::Riscv64),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::X86_64 => "x86_64",
            Self::Aarch64 => "aarch64",
            Self::Armv7l => "armv7l",
            Self::Riscv64 => "riscv64",
        }
    }
}

impl Default for Arch {
    fn default() -> Self {
        Self::host()
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Virtualization backend driving the VM
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VmType {
    #[default]
    Qemu,
    Vz,
    Wsl2,
}

impl VmType {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Qemu => "qemu",
            Self::Vz => "vz",
            Self::Wsl2 => "wsl2",
        }
    }
}

impl fmt::Display for VmType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// An extra disk attached to the instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "DiskSpec", rename_all = "camelCase")]
pub struct Disk {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fs_type: Option<String>,
}

/// Disks may be listed either by bare name or as a mapping
#[derive(Deserialize)]
#[serde(untagged)]
enum DiskSpec {
    Name(String),
    Full {
        name: String,
        #[serde(default)]
        format: Option<bool>,
        #[serde(default, rename = "fsType")]
        fs_type: Option<String>,
    },
}

impl From<DiskSpec> for Disk {
    fn from(spec: DiskSpec) -> Self {
        match spec {
            DiskSpec::Name(name) => Self {
                name,
                format: None,
                fs_type: None,
            },
            DiskSpec::Full {
                name,
                format,
                fs_type,
            } => Self {
                name,
                format,
                fs_type,
            },
        }
    }
}

/// A network attachment
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Network {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lima: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub socket: Option<String>,
    #[serde(default, rename = "vzNAT", skip_serializing_if = "Option::is_none")]
    pub vz_nat: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mac_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interface: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SshConfig {
    /// Host port forwarded to the guest's sshd; 0 means "assigned at start"
    #[serde(default)]
    pub local_port: u16,
}

/// Configuration document stored in every instance directory.
///
/// Only the fields consumed by status inspection are modelled; unknown keys are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceConfig {
    #[serde(default)]
    pub arch: Arch,
    #[serde(default)]
    pub vm_type: VmType,
    /// CPU model per guest architecture
    #[serde(default)]
    pub cpu_type: BTreeMap<Arch, String>,
    #[serde(default = "default_cpus")]
    pub cpus: u32,
    #[serde(default = "default_memory")]
    pub memory: String,
    #[serde(default = "default_disk")]
    pub disk: String,
    #[serde(default)]
    pub additional_disks: Vec<Disk>,
    #[serde(default)]
    pub networks: Vec<Network>,
    #[serde(default)]
    pub ssh: SshConfig,
    /// Template rendered into the instance message after inspection
    #[serde(default)]
    pub message: String,
}

fn default_cpus() -> u32 {
    4
}

fn default_memory() -> String {
    "4GiB".to_string()
}

fn default_disk() -> String {
    "100GiB".to_string()
}

impl Default for InstanceConfig {
    fn default() -> Self {
        Self {
            arch: Arch::default(),
            vm_type: VmType::default(),
            cpu_type: BTreeMap::new(),
            cpus: default_cpus(),
            memory: default_memory(),
            disk: default_disk(),
            additional_disks: Vec::new(),
            networks: Vec::new(),
            ssh: SshConfig::default(),
            message: String::new(),
        }
    }
}

impl InstanceConfig {
    /// Load a configuration document from `path`
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let data = std::fs::read(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_slice(&data).map_err(|source| ConfigError::Decode {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_slice(data: &[u8]) -> Result<Self, serde_yaml::Error> {
        // An empty document means "all defaults"
        if data.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        serde_yaml::from_slice(data)
    }

    /// CPU model configured for the selected architecture, if any
    pub fn cpu_type_for_arch(&self) -> String {
        self.cpu_type.get(&self.arch).cloned().unwrap_or_default()
    }
}
