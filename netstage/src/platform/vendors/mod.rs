//! Built-in vendor platform definitions, keyed by driver-vocabulary name.

pub mod arista_eos;
pub mod cisco_ios;
pub mod cisco_iosxr;
pub mod cisco_nxos;
pub mod juniper_junos;

use super::PlatformDefinition;

/// All built-in platform definitions.
pub fn builtin() -> Vec<PlatformDefinition> {
    vec![
        cisco_ios::platform(),
        cisco_iosxr::platform(),
        cisco_nxos::platform(),
        arista_eos::platform(),
        juniper_junos::platform(),
    ]
}
