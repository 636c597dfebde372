//! Arista EOS platform definition.
//!
//! Supports Arista devices running EOS with the following privilege levels:
//! - `exec` - User EXEC mode with `>` prompt
//! - `privilege_exec` - Privileged EXEC mode with `#` prompt
//! - `configuration` - Configuration mode with `(config*)#` prompt
//!
//! Prompt patterns are adapted from [scrapli](https://github.com/carlmontanari/scrapli).
//!
//! # Prompt Examples
//!
//! ```text
//! switch>                            # exec mode
//! switch#                            # privilege_exec mode
//! switch(config)#                    # configuration mode
//! switch(config-if-Et1)#             # config sub-mode (interface)
//! ```

use crate::platform::{PlatformDefinition, PrivilegeLevel};

/// Driver name for Arista EOS.
pub const PLATFORM_NAME: &str = "eos";

/// Create the Arista EOS platform definition.
///
/// Uses `(?mi)` flags for multiline (^ matches line start) and case-insensitive matching.
pub fn platform() -> PlatformDefinition {
    let exec = PrivilegeLevel::new("exec", r"(?mi)^[\w.\-@()/: ]{1,63}>\s?$").unwrap();

    // not_contains "(config" prevents matching config mode prompts
    let privilege_exec = PrivilegeLevel::new("privilege_exec", r"(?mi)^[\w.\-@()/: ]{1,63}#\s?$")
        .unwrap()
        .with_not_contains("(config");

    let configuration = PrivilegeLevel::new(
        "configuration",
        r"(?mi)^[\w.\-@()/: ]{1,63}\(config[\w.\-@/:+]{0,63}\)#\s?$",
    )
    .unwrap();

    PlatformDefinition::new(PLATFORM_NAME)
        .with_privilege(exec)
        .with_privilege(privilege_exec)
        .with_privilege(configuration)
        .with_default_privilege("privilege_exec")
        .with_enable("enable", r"(?mi)^password:\s?$")
        .unwrap()
        .with_failure_pattern("% Ambiguous command")
        .with_failure_pattern("% Error")
        .with_failure_pattern("% Incomplete command")
        .with_failure_pattern("% Invalid input")
        .with_failure_pattern("% Cannot commit")
        .with_failure_pattern("% Unavailable command")
        .with_on_open_command("terminal length 0")
        .with_on_open_command("terminal width 32767")
        .with_config_mode("configure terminal", "end")
        .with_save_command("copy running-config startup-config")
        .with_config_commands("show running-config", "show startup-config")
        .with_terminal_size(32767, 24)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arista_platform() {
        let platform = platform();
        assert_eq!(platform.name, "eos");
        assert_eq!(platform.privilege_levels.len(), 3);
        assert!(platform.privilege_levels.contains_key("exec"));
        assert!(platform.privilege_levels.contains_key("privilege_exec"));
        assert!(platform.privilege_levels.contains_key("configuration"));
    }

    #[test]
    fn test_exec_prompt_match() {
        let platform = platform();
        let exec = platform.privilege_levels.get("exec").unwrap();

        assert!(exec.pattern.is_match(b"switch>"));
        assert!(exec.pattern.is_match(b"switch> "));
        assert!(exec.pattern.is_match(b"admin@switch>"));

        assert!(!exec.pattern.is_match(b"switch#"));
        assert!(!exec.pattern.is_match(b"switch(config)#"));
    }

    #[test]
    fn test_privilege_exec_prompt_match() {
        let platform = platform();
        let priv_exec = platform.privilege_levels.get("privilege_exec").unwrap();

        // Config prompts also end in '#'; not_contains filters them out
        assert!(priv_exec.matches("switch#"));
        assert!(priv_exec.matches("switch# "));
        assert!(!priv_exec.matches("switch(config)#"));
        assert!(!priv_exec.matches("switch(config-if-Et1)#"));
    }

    #[test]
    fn test_configuration_prompt_match() {
        let platform = platform();
        let config = platform.privilege_levels.get("configuration").unwrap();

        assert!(config.matches("switch(config)#"));
        assert!(config.matches("switch(config-if-Et1)#"));
        assert!(config.matches("switch(config-router-bgp)#"));
        assert!(!config.matches("switch#"));
    }

    #[test]
    fn test_on_open_commands() {
        let platform = platform();
        assert_eq!(
            platform.on_open_commands,
            vec![
                "terminal length 0".to_string(),
                "terminal width 32767".to_string()
            ]
        );
    }
}
