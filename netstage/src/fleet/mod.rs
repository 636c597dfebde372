//! Fleet-wide staging.
//!
//! A run renders the configuration once, then walks every device through
//! the same stage before any device moves on to the next one:
//!
//! ```text
//! detect all → resolve all → connect all → stage all → commit all → verify + close all
//! ```
//!
//! Each device is one [`DeviceSession`]; the fleet is the ordered list of
//! sessions built from the address list and never reshaped.

mod orchestrator;
mod report;
mod session;
mod target;

#[cfg(test)]
pub(crate) mod mock;

pub use orchestrator::{CancelHandle, FleetOrchestrator};
pub use report::{DeviceOutcome, FleetReport};
pub use session::DeviceSession;
pub use target::DeviceTarget;

use std::fmt;

/// One fleet-wide step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Detect,
    Resolve,
    Connect,
    Stage,
    Commit,
    Verify,
}

impl Stage {
    /// Every stage, in run order.
    pub const ALL: [Stage; 6] = [
        Stage::Detect,
        Stage::Resolve,
        Stage::Connect,
        Stage::Stage,
        Stage::Commit,
        Stage::Verify,
    ];

    /// State a session must be in for this stage to run.
    pub fn entry_state(self) -> SessionState {
        match self {
            Stage::Detect => SessionState::Created,
            Stage::Resolve => SessionState::Detected,
            Stage::Connect => SessionState::Resolved,
            Stage::Stage => SessionState::Connected,
            Stage::Commit => SessionState::Staged,
            Stage::Verify => SessionState::Committed,
        }
    }

    /// State a session reaches when this stage succeeds.
    pub fn exit_state(self) -> SessionState {
        match self {
            Stage::Detect => SessionState::Detected,
            Stage::Resolve => SessionState::Resolved,
            Stage::Connect => SessionState::Connected,
            Stage::Stage => SessionState::Staged,
            Stage::Commit => SessionState::Committed,
            Stage::Verify => SessionState::Verified,
        }
    }

    /// Lowercase name used in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Detect => "detect",
            Stage::Resolve => "resolve",
            Stage::Connect => "connect",
            Stage::Stage => "stage",
            Stage::Commit => "commit",
            Stage::Verify => "verify",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of one device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    Created,
    Detected,
    Resolved,
    Connected,
    Staged,
    Committed,
    Verified,
    Closed,
    /// Absorbing; the failing stage is kept on the session.
    Failed,
}

impl SessionState {
    /// Lowercase name used in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            SessionState::Created => "created",
            SessionState::Detected => "detected",
            SessionState::Resolved => "resolved",
            SessionState::Connected => "connected",
            SessionState::Staged => "staged",
            SessionState::Committed => "committed",
            SessionState::Verified => "verified",
            SessionState::Closed => "closed",
            SessionState::Failed => "failed",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stages_chain() {
        let mut state = SessionState::Created;
        for stage in Stage::ALL {
            assert_eq!(stage.entry_state(), state);
            state = stage.exit_state();
        }
        assert_eq!(state, SessionState::Verified);
    }

    #[test]
    fn test_display() {
        assert_eq!(Stage::Commit.to_string(), "commit");
        assert_eq!(SessionState::Verified.to_string(), "verified");
    }
}
