//! Cisco NX-OS platform definition (SSH CLI).

use crate::platform::{PlatformDefinition, PrivilegeLevel};

/// Driver name for Cisco NX-OS over SSH.
pub const PLATFORM_NAME: &str = "nxos_ssh";

/// Create the Cisco NX-OS platform definition.
pub fn platform() -> PlatformDefinition {
    let privilege_exec = PrivilegeLevel::new("privilege_exec", r"(?mi)^[\w.\-]{1,63}#\s?$")
        .unwrap()
        .with_not_contains("(config");

    let configuration = PrivilegeLevel::new(
        "configuration",
        r"(?mi)^[\w.\-]{1,63}\(config[\w.\-@/:\+]{0,32}\)#\s?$",
    )
    .unwrap();

    PlatformDefinition::new(PLATFORM_NAME)
        .with_privilege(privilege_exec)
        .with_privilege(configuration)
        .with_default_privilege("privilege_exec")
        .with_failure_pattern("% Ambiguous command")
        .with_failure_pattern("% Incomplete command")
        .with_failure_pattern("% Invalid command")
        .with_failure_pattern("% Invalid number")
        .with_failure_pattern("% Invalid parameter detected")
        .with_on_open_command("terminal length 0")
        .with_on_open_command("terminal width 511")
        .with_config_mode("configure terminal", "end")
        .with_save_command("copy running-config startup-config")
        .with_config_commands("show running-config", "show startup-config")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn level_of(prompt: &str) -> Option<String> {
        platform().determine_privilege(prompt).map(|l| l.name.clone())
    }

    #[test]
    fn test_nxos_platform() {
        let platform = platform();
        assert_eq!(platform.name, "nxos_ssh");
        assert_eq!(
            platform.save_commands,
            vec!["copy running-config startup-config".to_string()]
        );
    }

    #[test]
    fn test_nxos_prompts() {
        assert_eq!(level_of("n9k-leaf1#").as_deref(), Some("privilege_exec"));
        assert_eq!(level_of("n9k-leaf1(config)#").as_deref(), Some("configuration"));
        assert_eq!(level_of("n9k-leaf1(config-if)#").as_deref(), Some("configuration"));
    }
}
