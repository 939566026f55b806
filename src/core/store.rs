//! Instance store - locating instance directories and inspecting them

use std::path::PathBuf;

use tracing::{debug, error, warn};

use super::config::InstanceConfig;
use super::error::{InspectError, StoreError};
use super::host::HostContext;
use super::instance::{Instance, Status};
use super::process::read_pid_file;
use super::reconcile::Reconciler;
use super::settings::{self, StoreSettings};
use super::supervisor;
use super::units::parse_ram_size;
use crate::template::Template;

/// Read-only view over a directory of instances
#[derive(Debug, Clone)]
pub struct Store {
    settings: StoreSettings,
    host: HostContext,
}

impl Store {
    pub fn new(mut settings: StoreSettings, host: HostContext) -> Self {
        settings.validate();
        Self { settings, host }
    }

    /// Store at the home resolved from the environment
    pub fn from_env() -> Result<Self, StoreError> {
        let settings = StoreSettings::from_env()?;
        let host = HostContext::with_home(settings.home.clone());
        Ok(Self::new(settings, host))
    }

    pub fn home(&self) -> &std::path::Path {
        &self.settings.home
    }

    pub fn host(&self) -> &HostContext {
        &self.host
    }

    /// Directory for `name`; validates the name but not that the directory exists
    pub fn instance_dir(&self, name: &str) -> Result<PathBuf, StoreError> {
        validate_name(name)?;
        Ok(self.settings.home.join(name))
    }

    /// Names of all instances, sorted
    pub fn instance_names(&self) -> Result<Vec<String>, StoreError> {
        let entries = match std::fs::read_dir(&self.settings.home) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.settings.home.clone(),
                    source,
                })
            }
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| StoreError::Io {
                path: self.settings.home.clone(),
                source,
            })?;
            if !entry.path().is_dir() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if validate_name(&name).is_ok() {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    /// Inspect a single instance.
    ///
    /// Fails only when the instance does not exist (invalid name, missing
    /// directory or missing configuration document). Every other problem is
    /// recorded in [`Instance::errors`] and marks the instance broken.
    pub async fn inspect(&self, name: &str) -> Result<Instance, StoreError> {
        let dir = self.instance_dir(name)?;
        if !dir.is_dir() {
            return Err(StoreError::NotFound {
                name: name.to_string(),
                dir,
            });
        }

        let mut inst = Instance::new(name, dir.clone());
        let mut reconciler = Reconciler::new();

        let config_path = dir.join(settings::CONFIG_FILE);
        let config = match InstanceConfig::load(&config_path) {
            Ok(config) => config,
            Err(e) if e.is_not_found() => return Err(StoreError::ConfigMissing(config_path)),
            Err(e) => {
                reconciler.fail(InspectError::Config(e));
                let (status, errors) = reconciler.finish();
                inst.status = status;
                inst.errors = errors;
                warn!("Instance '{}' has a malformed configuration", name);
                return Ok(inst);
            }
        };

        inst.arch = config.arch;
        inst.vm_type = config.vm_type;
        inst.cpu_type = config.cpu_type_for_arch();
        inst.cpus = config.cpus;
        inst.memory = parse_ram_size(&config.memory).unwrap_or(0);
        inst.disk = parse_ram_size(&config.disk).unwrap_or(0);
        inst.additional_disks = config.additional_disks.clone();
        inst.networks = config.networks.clone();
        inst.ssh_local_port = config.ssh.local_port;

        inst.supervisor_pid = reconciler
            .check(read_pid_file(&dir.join(settings::SUPERVISOR_PID_FILE)))
            .unwrap_or(0);

        if inst.supervisor_pid != 0 {
            let socket = dir.join(settings::SUPERVISOR_SOCKET);
            if let Some(info) =
                reconciler.check(supervisor::query_info(&socket, self.settings.info_timeout).await)
            {
                inst.ssh_local_port = info.ssh_local_port;
            }
        }

        let driver_pid_file = dir.join(settings::driver_pid_file(config.vm_type));
        inst.driver_pid = reconciler
            .check(read_pid_file(&driver_pid_file))
            .unwrap_or(0);

        reconciler.settle(inst.supervisor_pid, inst.driver_pid, inst.vm_type);

        let (status, errors) = reconciler.finish();
        inst.status = status;
        inst.errors = errors;
        inst.config = Some(config);

        match self.render_message(&inst) {
            Ok(message) => inst.message = message,
            Err(e) => {
                inst.status = Status::Broken;
                inst.errors.push(e);
            }
        }

        if inst.is_degraded() {
            warn!(
                "Instance '{}' is {} with {} error(s)",
                name,
                inst.status,
                inst.errors.len()
            );
        } else {
            debug!("Instance '{}' is {}", name, inst.status);
        }
        Ok(inst)
    }

    /// Inspect every instance, skipping (and logging) ones that vanished mid-listing
    pub async fn inspect_all(&self) -> Result<Vec<Instance>, StoreError> {
        let mut instances = Vec::new();
        for name in self.instance_names()? {
            match self.inspect(&name).await {
                Ok(inst) => instances.push(inst),
                Err(e) => error!("Unable to load instance '{}': {}", name, e),
            }
        }
        Ok(instances)
    }

    /// Render the configured message template for an inspected instance
    fn render_message(&self, inst: &Instance) -> Result<String, InspectError> {
        let source = inst
            .config
            .as_ref()
            .map(|c| c.message.as_str())
            .unwrap_or_default();

        let template = Template::parse(source).map_err(|e| InspectError::MessageTemplate {
            template: source.to_string(),
            source: e,
        })?;
        let data = self
            .host
            .format_data(inst)
            .map_err(InspectError::GlobalFields)?;
        template
            .execute(&data)
            .map_err(|e| InspectError::MessageRender {
                template: source.to_string(),
                source: e,
            })
    }
}

/// Instance names are dot/dash/underscore separated alphanumeric words.
///
/// Names starting with `_` are reserved for store-wide directories.
pub fn validate_name(name: &str) -> Result<(), StoreError> {
    let invalid = || StoreError::InvalidName(name.to_string());
    if name.is_empty() {
        return Err(invalid());
    }
    let mut prev_separator = true;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            prev_separator = false;
        } else if matches!(c, '.' | '-' | '_') && !prev_separator {
            prev_separator = true;
        } else {
            return Err(invalid());
        }
    }
    if prev_separator {
        return Err(invalid());
    }
    Ok(())
}
