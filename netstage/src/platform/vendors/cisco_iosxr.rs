//! Cisco IOS-XR platform definition.
//!
//! IOS-XR logs in directly at the privileged prompt and keeps a
//! candidate configuration that only takes effect on `commit`.
//!
//! # Prompt Examples
//!
//! ```text
//! RP/0/RP0/CPU0:xrv9k#             # privilege_exec mode
//! RP/0/RP0/CPU0:xrv9k(config)#     # configuration mode
//! ```

use crate::platform::{PlatformDefinition, PrivilegeLevel};

/// Driver name for Cisco IOS-XR.
pub const PLATFORM_NAME: &str = "iosxr";

/// Create the Cisco IOS-XR platform definition.
pub fn platform() -> PlatformDefinition {
    let privilege_exec = PrivilegeLevel::new("privilege_exec", r"(?mi)^[\w.\-@/:]{1,63}#\s?$")
        .unwrap()
        .with_not_contains("(config");

    let configuration = PrivilegeLevel::new(
        "configuration",
        r"(?mi)^[\w.\-@/:]{1,63}\(config[\w.\-@/:+]{0,32}\)#\s?$",
    )
    .unwrap();

    // The committed configuration is the persisted one; there is no
    // separate startup configuration to save to.
    PlatformDefinition::new(PLATFORM_NAME)
        .with_privilege(privilege_exec)
        .with_privilege(configuration)
        .with_default_privilege("privilege_exec")
        .with_failure_pattern("% Ambiguous command")
        .with_failure_pattern("% Incomplete command")
        .with_failure_pattern("% Invalid input detected")
        .with_failure_pattern("% Failed to commit")
        .with_on_open_command("terminal length 0")
        .with_on_open_command("terminal width 512")
        .with_config_mode("configure terminal", "end")
        .with_commit_command("commit")
        .with_candidate_datastore()
        .with_abort_command("abort")
        .with_config_commands("show running-config", "show running-config")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iosxr_prompts() {
        let platform = platform();
        assert_eq!(
            platform
                .determine_privilege("RP/0/RP0/CPU0:xrv9k#")
                .map(|l| l.name.as_str()),
            Some("privilege_exec")
        );
        assert_eq!(
            platform
                .determine_privilege("RP/0/RP0/CPU0:xrv9k(config-if)#")
                .map(|l| l.name.as_str()),
            Some("configuration")
        );
    }

    #[test]
    fn test_commit_inside_config_mode() {
        let platform = platform();
        assert_eq!(platform.commit_commands, vec!["commit".to_string()]);
        assert!(platform.save_commands.is_empty());
        assert!(platform.enable_command.is_none());
    }
}
