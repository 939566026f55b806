//! Status reconciliation - folding independent liveness observations into one status

use super::config::VmType;
use super::error::InspectError;
use super::instance::Status;

/// Accumulates diagnostics during one inspection pass.
///
/// Any failure forces the status to `Broken`; once broken, later steps keep
/// appending diagnostics but can never move the status back.
#[derive(Debug, Default)]
pub struct Reconciler {
    status: Status,
    errors: Vec<InspectError>,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a soft failure
    pub fn fail(&mut self, error: impl Into<InspectError>) {
        self.status = Status::Broken;
        self.errors.push(error.into());
    }

    /// Record the outcome of a fallible step, keeping the value on success
    pub fn check<T, E: Into<InspectError>>(&mut self, result: Result<T, E>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                self.fail(e);
                None
            }
        }
    }

    pub fn is_broken(&self) -> bool {
        self.status == Status::Broken
    }

    /// Decide the final status from the two process observations.
    ///
    /// Only applies when no earlier step has already broken the instance.
    pub fn settle(&mut self, supervisor_pid: i32, driver_pid: i32, backend: VmType) {
        if self.status != Status::Unknown {
            return;
        }
        match settle_status(supervisor_pid > 0, driver_pid > 0, backend) {
            Ok(status) => self.status = status,
            Err(error) => self.fail(error),
        }
    }

    pub fn finish(self) -> (Status, Vec<InspectError>) {
        (self.status, self.errors)
    }
}

/// Truth table over (supervisor alive, driver alive)
pub fn settle_status(
    supervisor_alive: bool,
    driver_alive: bool,
    backend: VmType,
) -> Result<Status, InspectError> {
    match (supervisor_alive, driver_alive) {
        (true, true) => Ok(Status::Running),
        (false, false) => Ok(Status::Stopped),
        (true, false) => Err(InspectError::DriverNotRunning),
        (false, true) => Err(InspectError::SupervisorNotRunning {
            backend: backend.to_string(),
        }),
    }
}
