//! Error types for instance inspection and reporting

use std::io;
use std::num::ParseIntError;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Existence-class failures. These abort an inspection without producing an instance.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("instance name {0:?} is invalid")]
    InvalidName(String),

    #[error("instance {name:?} does not exist (no directory at {dir})")]
    NotFound { name: String, dir: PathBuf },

    #[error("instance configuration {0} does not exist")]
    ConfigMissing(PathBuf),

    #[error("cannot determine the home directory")]
    NoHomeDir,

    #[error("cannot read store directory {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Error)]
pub enum PidFileError {
    #[error("cannot read pid file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("pid file {path} does not contain a process id: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseIntError,
    },

    #[error("pid file {path} contains invalid process id {pid}")]
    InvalidPid { path: PathBuf, pid: i32 },

    #[error("cannot probe process {pid} from {path}: {source}")]
    Probe {
        path: PathBuf,
        pid: i32,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("connection failed: {0}")]
    Connect(#[source] io::Error),

    #[error("no reply within {0:?}")]
    Timeout(Duration),

    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("malformed reply: {0}")]
    Protocol(String),

    #[error("supervisor replied with {code}: {message}")]
    Remote { code: String, message: String },

    #[error("control sockets are not supported on this platform")]
    Unsupported,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("instance directory is not set")]
    NoDirectory,
}

impl ConfigError {
    /// Whether the document is simply absent (as opposed to malformed)
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Read { source, .. } if source.kind() == io::ErrorKind::NotFound)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("template parse error at byte {offset}: {message}")]
    Parse { offset: usize, message: String },

    #[error("template execution error: {0}")]
    Execute(String),
}

/// Soft failures accumulated on an instance. Each one marks the instance broken
/// but never aborts the inspection.
#[derive(Debug, Error)]
pub enum InspectError {
    #[error(transparent)]
    Config(ConfigError),

    #[error(transparent)]
    PidFile(#[from] PidFileError),

    #[error("failed to connect to {socket:?}: {source}")]
    SupervisorConnect {
        socket: PathBuf,
        #[source]
        source: SupervisorError,
    },

    #[error("failed to get Info from {socket:?}: {source}")]
    SupervisorInfo {
        socket: PathBuf,
        #[source]
        source: SupervisorError,
    },

    #[error("supervisor is running but driver is not")]
    DriverNotRunning,

    #[error("{backend} driver is running but supervisor is not")]
    SupervisorNotRunning { backend: String },

    #[error("message {template:?} is not a valid template: {source}")]
    MessageTemplate {
        template: String,
        #[source]
        source: TemplateError,
    },

    #[error("cannot add global fields to instance data: {0}")]
    GlobalFields(#[source] StoreError),

    #[error("cannot execute template {template:?}: {source}")]
    MessageRender {
        template: String,
        #[source]
        source: TemplateError,
    },
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("cannot determine the home directory")]
    NoHomeDir,

    #[error("invalid template: {0}")]
    Template(#[source] TemplateError),

    #[error("cannot render instance {name:?}: {source}")]
    Render {
        name: String,
        #[source]
        source: TemplateError,
    },

    #[error(transparent)]
    Io(#[from] io::Error),
}
