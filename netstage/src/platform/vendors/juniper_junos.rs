//! Juniper JUNOS platform definition.
//!
//! Supports Juniper devices running JUNOS with the following privilege levels:
//! - `exec` - Operational mode with `>` prompt
//! - `configuration` - Configuration mode with `#` prompt
//!
//! Prompt patterns are adapted from [scrapli](https://github.com/carlmontanari/scrapli).
//!
//! # Prompt Examples
//!
//! ```text
//! user@router>              # exec mode
//! user@router#              # configuration mode
//! {master:0}                # routing-engine indicator (separate line)
//! user@router>              # exec prompt on next line
//! ```
//!
//! The candidate is merged with `configure`/`commit`; the committed
//! configuration is the persisted one, so startup and running read back the
//! same text.

use crate::platform::{PlatformDefinition, PrivilegeLevel};

/// Driver name for Juniper JUNOS.
pub const PLATFORM_NAME: &str = "junos";

/// Create the Juniper JUNOS platform definition.
pub fn platform() -> PlatformDefinition {
    let exec = PrivilegeLevel::new(
        "exec",
        r"(?mi)^(\{\w+(:(\w+)?\d)?\}\n)?[\w\-@()/:\.]{1,63}>\s?$",
    )
    .unwrap();

    let configuration = PrivilegeLevel::new(
        "configuration",
        r"(?mi)^(\{\w+(:(\w+)?\d)?\}\[edit\]\n)?[\w\-@()/:\.]{1,63}#\s?$",
    )
    .unwrap();

    PlatformDefinition::new(PLATFORM_NAME)
        .with_privilege(exec)
        .with_privilege(configuration)
        .with_default_privilege("exec")
        .with_failure_pattern("is ambiguous")
        .with_failure_pattern("No valid completions")
        .with_failure_pattern("unknown command")
        .with_failure_pattern("syntax error")
        .with_failure_pattern("error: configuration check-out failed")
        .with_on_open_command("set cli screen-length 0")
        .with_on_open_command("set cli screen-width 511")
        .with_on_open_command("set cli complete-on-space off")
        .with_config_mode("configure", "exit configuration-mode")
        .with_commit_command("commit")
        .with_candidate_datastore()
        .with_abort_command("rollback 0")
        .with_abort_command("exit configuration-mode")
        .with_config_commands(
            "show configuration | display set | no-more",
            "show configuration | no-more",
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_juniper_platform() {
        let platform = platform();
        assert_eq!(platform.name, "junos");
        assert_eq!(platform.default_privilege, "exec");
        assert_eq!(platform.config_enter, "configure");
        assert_eq!(platform.commit_commands, vec!["commit".to_string()]);
    }

    #[test]
    fn test_prompts() {
        let platform = platform();
        let level = |prompt: &str| platform.determine_privilege(prompt).map(|l| l.name.clone());

        assert_eq!(level("admin@vmx1>").as_deref(), Some("exec"));
        assert_eq!(level("admin@vmx1# ").as_deref(), Some("configuration"));
        assert_eq!(level("{master:0}\nadmin@vmx1>").as_deref(), Some("exec"));
    }

    #[test]
    fn test_failure_patterns() {
        let platform = platform();
        assert_eq!(
            platform.detect_failure("set interfaces lo0 foo\n                    ^\nsyntax error."),
            Some("syntax error")
        );
    }
}
