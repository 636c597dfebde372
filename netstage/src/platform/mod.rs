//! Platform knowledge: vendor shells, autodetection and name vocabularies.
//!
//! Three naming schemes meet here. A probe reports a platform in its own
//! vocabulary (`cisco_ios`, `juniper`), the [`VocabularyMapper`] folds that
//! into a canonical name and then into the driver vocabulary (`ios`,
//! `junos`) that the [`DriverResolver`](crate::driver::DriverResolver) is
//! keyed by.

mod definition;
mod privilege_level;
pub mod probe;
pub mod vendors;
pub mod vocabulary;

pub use definition::PlatformDefinition;
pub use privilege_level::PrivilegeLevel;
pub use probe::{CommandRunner, PlatformProbe, ProbeParams, SshProbe};
pub use vocabulary::VocabularyMapper;
