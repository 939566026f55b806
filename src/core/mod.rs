//! Core module - Instance configuration, liveness probing, and inspection

pub mod config;
pub mod error;
mod host;
mod instance;
mod process;
mod reconcile;
pub mod settings;
mod store;
pub mod supervisor;
pub mod units;

pub use config::{Arch, Disk, InstanceConfig, Network, SshConfig, VmType};
pub use error::{
    ConfigError, InspectError, PidFileError, ReportError, StoreError, SupervisorError,
    TemplateError,
};
pub use host::HostContext;
pub use instance::{FormatData, Instance, Status};
pub use process::read_pid_file;
pub use reconcile::{settle_status, Reconciler};
pub use settings::StoreSettings;
pub use store::{validate_name, Store};
