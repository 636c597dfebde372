//! Run results.

use super::{SessionState, Stage};
use crate::error::{Error, Result, StageError};

/// What happened to one device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceOutcome {
    pub host: String,
    pub state: SessionState,
    /// Platform as reported by the probe.
    pub detected_platform: Option<String>,
    pub canonical_platform: Option<String>,
    pub driver_name: Option<String>,
    /// Persisted configuration read back after commit.
    pub startup_config: Option<String>,
    pub failure: Option<StageError>,
}

/// Outcome of a fleet run, one entry per device in fleet order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FleetReport {
    pub outcomes: Vec<DeviceOutcome>,
    /// Stage the run stopped at, if it did not run to completion.
    pub halted_at: Option<Stage>,
    /// The run was stopped through its cancel handle.
    pub cancelled: bool,
}

impl FleetReport {
    /// Outcome for `host`.
    pub fn outcome(&self, host: &str) -> Option<&DeviceOutcome> {
        self.outcomes.iter().find(|o| o.host == host)
    }

    /// Failures, in fleet order.
    pub fn failures(&self) -> impl Iterator<Item = &StageError> {
        self.outcomes.iter().filter_map(|o| o.failure.as_ref())
    }

    /// Every device reached the end of the lifecycle.
    pub fn is_success(&self) -> bool {
        !self.cancelled
            && self.halted_at.is_none()
            && self.outcomes.iter().all(|o| o.state == SessionState::Closed)
    }

    /// Devices in `state`.
    pub fn count(&self, state: SessionState) -> usize {
        self.outcomes.iter().filter(|o| o.state == state).count()
    }

    /// The report on full success, otherwise the first failure.
    pub fn into_result(self) -> Result<Self> {
        if let Some(err) = self.failures().next() {
            return Err(Error::Stage(err.clone()));
        }
        match (self.cancelled, self.halted_at) {
            (true, Some(stage)) => Err(Error::Cancelled(stage)),
            _ => Ok(self),
        }
    }
}
