//! Error types for netstage.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::fleet::{SessionState, Stage};

/// Main error type for netstage operations.
#[derive(Error, Debug)]
pub enum Error {
    /// SSH transport-level errors
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Channel operation errors
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    /// Driver-level errors
    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),

    /// Template rendering and variable loading errors
    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    /// A device failed one of the fleet lifecycle stages
    #[error("{0}")]
    Stage(#[from] StageError),

    /// Invalid run configuration
    #[error("Invalid run configuration: {message}")]
    Config { message: String },

    /// The run was cancelled between stages
    #[error("Run cancelled before stage '{0}'")]
    Cancelled(Stage),

    /// I/O error outside the transport
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Transport layer errors (SSH connection, authentication).
#[derive(Error, Debug)]
pub enum TransportError {
    /// SSH handshake or protocol error
    #[error("SSH error: {0}")]
    Ssh(#[from] russh::Error),

    /// Authentication failed
    #[error("Authentication failed for user '{user}'")]
    AuthenticationFailed { user: String },

    /// Host key is not in known_hosts and strict checking is on
    #[error("Unknown host key for {host}:{port}")]
    HostKeyUnknown { host: String, port: u16 },

    /// Host key differs from the known_hosts entry
    #[error("Host key for {host}:{port} changed (known_hosts line {line})")]
    HostKeyChanged { host: String, port: u16, line: usize },

    /// Failed to read or update known_hosts
    #[error("known_hosts error: {0}")]
    KnownHosts(String),

    /// Operation timed out
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),
}

/// Channel layer errors (pattern matching, PTY operations).
#[derive(Error, Debug)]
pub enum ChannelError {
    /// Pattern matching timed out
    #[error("Pattern not found within {0:?}")]
    PatternTimeout(Duration),

    /// Channel closed unexpectedly
    #[error("Channel closed")]
    Closed,

    /// SSH protocol error on the channel
    #[error("Channel SSH error: {0}")]
    Ssh(russh::Error),

    /// Invalid regex pattern
    #[error("Invalid regex pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

/// Driver layer errors (command execution, lifecycle misuse).
#[derive(Error, Debug)]
pub enum DriverError {
    /// Driver not connected
    #[error("Driver not connected - call open() first")]
    NotConnected,

    /// Driver already connected
    #[error("Driver already connected")]
    AlreadyConnected,

    /// Device output matched a failure pattern
    #[error("Command '{command}' failed: {message}")]
    CommandFailed { command: String, message: String },

    /// Commit was requested without a loaded candidate
    #[error("No merge candidate loaded")]
    NoCandidate,

    /// The candidate file held no configuration lines
    #[error("Merge candidate {0} contains no configuration")]
    EmptyCandidate(PathBuf),

    /// Failed to read the candidate file
    #[error("Failed to read merge candidate {path}: {source}")]
    CandidateRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Driver name is empty or not registered
    #[error("No driver registered for '{name}'")]
    UnknownDriver { name: String },

    /// A driver with this name is already registered
    #[error("Driver '{name}' is already registered")]
    DuplicateDriver { name: String },

    /// Privileged mode could not be entered
    #[error("Failed to enter privileged mode on '{host}'")]
    EnableFailed { host: String },

    /// Session operation called from the wrong lifecycle state
    #[error("Invalid transition for '{host}': {from} -> {to}")]
    InvalidTransition {
        host: String,
        from: SessionState,
        to: SessionState,
    },
}

/// Template rendering and variable source errors.
#[derive(Error, Debug)]
pub enum TemplateError {
    /// Template file could not be registered
    #[error("Failed to load template '{name}': {source}")]
    Load {
        name: String,
        #[source]
        source: Box<handlebars::TemplateError>,
    },

    /// Rendering failed (missing variable, helper error, ...)
    #[error("Failed to render template '{name}': {source}")]
    Render {
        name: String,
        #[source]
        source: Box<handlebars::RenderError>,
    },

    /// Variables file could not be read
    #[error("Failed to read variables file {path}: {source}")]
    VariablesRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Variables file is not a valid variable tree
    #[error("Failed to parse variables file {path}: {source}")]
    VariablesParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// A device failed at one lifecycle stage.
///
/// Carries the host and a rendered reason so it can be cloned into the
/// per-device outcome record.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StageError {
    /// Probe unreachable, timed out, or inconclusive
    #[error("Detection failed for {host}: {reason}")]
    Detection { host: String, reason: String },

    /// Unknown platform after normalization or unresolvable driver
    #[error("Resolution failed for {host}: {reason}")]
    Resolution { host: String, reason: String },

    /// Session open failed
    #[error("Connection failed for {host}: {reason}")]
    Connection { host: String, reason: String },

    /// Merge-candidate load failed
    #[error("Staging failed for {host}: {reason}")]
    Staging { host: String, reason: String },

    /// Commit rejected or connection dropped mid-commit
    #[error("Commit failed for {host}: {reason}")]
    Commit { host: String, reason: String },

    /// Post-commit read back failed
    #[error("Readback failed for {host}: {reason}")]
    Readback { host: String, reason: String },
}

impl StageError {
    /// Build the error for `stage`.
    pub fn new(stage: Stage, host: impl Into<String>, reason: impl ToString) -> Self {
        let host = host.into();
        let reason = reason.to_string();
        match stage {
            Stage::Detect => Self::Detection { host, reason },
            Stage::Resolve => Self::Resolution { host, reason },
            Stage::Connect => Self::Connection { host, reason },
            Stage::Stage => Self::Staging { host, reason },
            Stage::Commit => Self::Commit { host, reason },
            Stage::Verify => Self::Readback { host, reason },
        }
    }

    /// The lifecycle stage that failed.
    pub fn stage(&self) -> Stage {
        match self {
            Self::Detection { .. } => Stage::Detect,
            Self::Resolution { .. } => Stage::Resolve,
            Self::Connection { .. } => Stage::Connect,
            Self::Staging { .. } => Stage::Stage,
            Self::Commit { .. } => Stage::Commit,
            Self::Readback { .. } => Stage::Verify,
        }
    }

    /// The device the failure belongs to.
    pub fn host(&self) -> &str {
        match self {
            Self::Detection { host, .. }
            | Self::Resolution { host, .. }
            | Self::Connection { host, .. }
            | Self::Staging { host, .. }
            | Self::Commit { host, .. }
            | Self::Readback { host, .. } => host,
        }
    }

    /// The underlying cause.
    pub fn reason(&self) -> &str {
        match self {
            Self::Detection { reason, .. }
            | Self::Resolution { reason, .. }
            | Self::Connection { reason, .. }
            | Self::Staging { reason, .. }
            | Self::Commit { reason, .. }
            | Self::Readback { reason, .. } => reason,
        }
    }
}

/// Result type alias using netstage's Error.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_error_round_trips_stage() {
        for stage in Stage::ALL {
            let err = StageError::new(stage, "10.0.0.1", "boom");
            assert_eq!(err.stage(), stage);
            assert_eq!(err.host(), "10.0.0.1");
            assert_eq!(err.reason(), "boom");
        }
    }

    #[test]
    fn test_stage_error_display_names_device_and_cause() {
        let err = StageError::new(Stage::Resolve, "10.0.0.2", "unknown platform 'acme_os'");
        assert_eq!(
            err.to_string(),
            "Resolution failed for 10.0.0.2: unknown platform 'acme_os'"
        );
    }
}
