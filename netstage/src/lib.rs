//! # netstage
//!
//! Render a configuration template once and stage it on a fleet of network
//! devices whose vendor is not known in advance.
//!
//! Every device goes through the same lifecycle:
//!
//! 1. **detect** the platform by probing the device over SSH
//! 2. **resolve** the guess through the vocabulary tables to a driver type
//! 3. **connect** a vendor driver
//! 4. **stage** the rendered file as a merge candidate
//! 5. **commit** the candidate
//! 6. **verify** by reading the startup configuration back, then close
//!
//! The fleet moves stage by stage: no device is connected until every
//! device has been detected and resolved, and no device commits until
//! every device has staged.
//!
//! ## Features
//!
//! - Async SSH via russh, with known_hosts verification
//! - Autodetection of Cisco IOS/XE/XR/NX-OS/ASA, Arista EOS, Junos,
//!   Nokia SR OS, Huawei VRP, PAN-OS and Linux
//! - CLI drivers for IOS, IOS-XR, NX-OS, EOS and Junos
//! - Handlebars templates with YAML variables
//! - Per-stage timeouts, abort or isolate failure policy, cancellation
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use netstage::{FleetOrchestrator, RunConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), netstage::Error> {
//!     let config = RunConfig::from_yaml_file("run.yml")?;
//!     let report = FleetOrchestrator::new(config).run().await?;
//!
//!     for outcome in &report.outcomes {
//!         println!("{}: {}", outcome.host, outcome.state);
//!     }
//!     report.into_result()?;
//!     Ok(())
//! }
//! ```

pub mod channel;
pub mod config;
pub mod driver;
pub mod error;
pub mod fleet;
pub mod platform;
pub mod render;
pub mod transport;

// Re-export main types for convenience
pub use config::{Credentials, FailurePolicy, RunConfig};
pub use driver::{
    ConfigSnapshot, DriverParams, DriverResolver, DriverType, NetworkDriver, OptionalArgs,
};
pub use error::{Error, Result, StageError};
pub use fleet::{
    CancelHandle, DeviceOutcome, DeviceSession, DeviceTarget, FleetOrchestrator, FleetReport,
    SessionState, Stage,
};
pub use platform::{PlatformProbe, ProbeParams, SshProbe, VocabularyMapper};
pub use render::{RenderedConfig, TemplateRenderer, VariableTree};
pub use transport::{HostKeyVerification, SshConfig};
