//! Vendor drivers.
//!
//! A [`NetworkDriver`] is the managed session a device is configured
//! through: open it, load a merge candidate from a file, commit, read the
//! configuration back, close. Drivers are looked up by driver-vocabulary
//! name through the [`DriverResolver`].

mod cli;
mod registry;
pub(crate) mod response;
mod shell;

pub use cli::CliDriver;
pub use registry::{DriverFactory, DriverResolver, DriverType};
pub use response::Response;
pub use shell::CliShell;

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::SecretString;

use crate::error::Result;
use crate::transport::HostKeyVerification;

/// A managed configuration session on one device.
#[async_trait]
pub trait NetworkDriver: Send {
    /// Open the connection to the device.
    async fn open(&mut self) -> Result<()>;

    /// Load a configuration file as a merge (additive) candidate.
    async fn load_merge_candidate(&mut self, path: &Path) -> Result<()>;

    /// Make the loaded candidate part of the active configuration.
    async fn commit_config(&mut self) -> Result<()>;

    /// Read the device configuration.
    async fn get_config(&mut self) -> Result<ConfigSnapshot>;

    /// Close the connection. Closing a closed driver is a no-op.
    async fn close(&mut self) -> Result<()>;

    /// Check if the driver is connected.
    fn is_open(&self) -> bool;
}

/// Construction parameters for a driver.
#[derive(Debug, Clone)]
pub struct DriverParams {
    /// Device address.
    pub hostname: String,

    /// Login username.
    pub username: String,

    /// Login password.
    pub password: SecretString,

    /// Vendor-specific extras.
    pub optional_args: OptionalArgs,
}

/// Optional driver arguments.
#[derive(Debug, Clone)]
pub struct OptionalArgs {
    /// Privileged-mode secret (defaults to the login password upstream).
    pub secret: SecretString,

    /// Transfer the candidate over the CLI session instead of a file copy.
    pub inline_transfer: bool,

    /// SSH port.
    pub port: u16,

    /// Per-read timeout inside the driver.
    pub timeout: Duration,

    /// Host key verification mode.
    pub host_key_verification: HostKeyVerification,
}

impl OptionalArgs {
    /// Defaults for `secret`: inline transfer on, port 22, 30s timeout.
    pub fn new(secret: SecretString) -> Self {
        Self {
            secret,
            inline_transfer: true,
            port: 22,
            timeout: Duration::from_secs(30),
            host_key_verification: HostKeyVerification::default(),
        }
    }
}

/// Configuration read back from a device.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigSnapshot {
    /// Active configuration.
    pub running: String,

    /// Persisted configuration.
    pub startup: String,

    /// Candidate loaded but not committed (empty after commit).
    pub candidate: String,
}

impl ConfigSnapshot {
    /// Look a section up by name: `running`, `startup` or `candidate`.
    pub fn get(&self, key: &str) -> Option<&str> {
        match key {
            "running" => Some(&self.running),
            "startup" => Some(&self.startup),
            "candidate" => Some(&self.candidate),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_lookup() {
        let snapshot = ConfigSnapshot {
            running: "hostname r1".into(),
            startup: "hostname r1\n!".into(),
            candidate: String::new(),
        };
        assert_eq!(snapshot.get("startup"), Some("hostname r1\n!"));
        assert_eq!(snapshot.get("running"), Some("hostname r1"));
        assert_eq!(snapshot.get("bogus"), None);
    }

    #[test]
    fn test_optional_args_defaults() {
        let args = OptionalArgs::new(SecretString::from("cisco"));
        assert!(args.inline_transfer);
        assert_eq!(args.port, 22);
    }
}
