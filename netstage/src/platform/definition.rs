//! Platform definition for CLI-driven vendor drivers.

use indexmap::IndexMap;
use regex::bytes::Regex;

use super::privilege_level::PrivilegeLevel;

/// Everything the CLI driver needs to know about one vendor's shell.
///
/// A definition is keyed by its driver-vocabulary name (`ios`, `eos`, ...).
/// Privilege levels are kept in insertion order, lowest first; prompt
/// classification walks them in that order.
#[derive(Debug, Clone)]
pub struct PlatformDefinition {
    /// Driver-vocabulary name (e.g., "ios", "eos", "junos").
    pub name: String,

    /// Privilege levels for this platform.
    pub privilege_levels: IndexMap<String, PrivilegeLevel>,

    /// Level that configuration staging runs from.
    pub default_privilege: String,

    /// Command that escalates from an unprivileged login (e.g., `enable`).
    pub enable_command: Option<String>,

    /// Prompt asking for the privileged-mode secret after `enable_command`.
    pub enable_auth_prompt: Option<Regex>,

    /// Patterns that indicate command failure.
    pub failed_when_contains: Vec<String>,

    /// Commands to run when connection is established (paging, width).
    pub on_open_commands: Vec<String>,

    /// Command that enters configuration mode.
    pub config_enter: String,

    /// Commands run inside configuration mode after the candidate lines.
    pub commit_commands: Vec<String>,

    /// The device keeps a candidate configuration apart from the running
    /// one, so candidate lines can be sent at load time and only take
    /// effect on commit.
    pub candidate_datastore: bool,

    /// Command that leaves configuration mode.
    pub config_exit: String,

    /// Commands that discard the candidate and leave configuration mode.
    /// Empty means `config_exit` alone is enough.
    pub abort_commands: Vec<String>,

    /// Commands that persist the running configuration to startup.
    pub save_commands: Vec<String>,

    /// Command that prints the running configuration.
    pub running_config_command: String,

    /// Command that prints the persisted (startup) configuration.
    pub startup_config_command: String,

    /// Terminal width for PTY.
    pub terminal_width: u32,

    /// Terminal height for PTY.
    pub terminal_height: u32,
}

impl PlatformDefinition {
    /// Create a new platform definition with Cisco-style defaults.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            privilege_levels: IndexMap::new(),
            default_privilege: String::new(),
            enable_command: None,
            enable_auth_prompt: None,
            failed_when_contains: vec![],
            on_open_commands: vec![],
            config_enter: "configure terminal".to_string(),
            commit_commands: vec![],
            candidate_datastore: false,
            config_exit: "end".to_string(),
            abort_commands: vec![],
            save_commands: vec![],
            running_config_command: "show running-config".to_string(),
            startup_config_command: "show startup-config".to_string(),
            terminal_width: 511,
            terminal_height: 24,
        }
    }

    /// Add a privilege level.
    pub fn with_privilege(mut self, level: PrivilegeLevel) -> Self {
        self.privilege_levels.insert(level.name.clone(), level);
        self
    }

    /// Set the default privilege level.
    pub fn with_default_privilege(mut self, name: impl Into<String>) -> Self {
        self.default_privilege = name.into();
        self
    }

    /// Set the enable command and the secret prompt it may raise.
    pub fn with_enable(
        mut self,
        command: impl Into<String>,
        auth_prompt: &str,
    ) -> Result<Self, regex::Error> {
        self.enable_command = Some(command.into());
        self.enable_auth_prompt = Some(Regex::new(auth_prompt)?);
        Ok(self)
    }

    /// Add a failure pattern.
    pub fn with_failure_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.failed_when_contains.push(pattern.into());
        self
    }

    /// Add an on_open command.
    pub fn with_on_open_command(mut self, command: impl Into<String>) -> Self {
        self.on_open_commands.push(command.into());
        self
    }

    /// Set the configuration mode enter/exit commands.
    pub fn with_config_mode(mut self, enter: impl Into<String>, exit: impl Into<String>) -> Self {
        self.config_enter = enter.into();
        self.config_exit = exit.into();
        self
    }

    /// Add a command run in configuration mode to commit the candidate.
    pub fn with_commit_command(mut self, command: impl Into<String>) -> Self {
        self.commit_commands.push(command.into());
        self
    }

    /// Mark the platform as having a separate candidate datastore.
    pub fn with_candidate_datastore(mut self) -> Self {
        self.candidate_datastore = true;
        self
    }

    /// Add a command that discards the candidate on a failed commit.
    pub fn with_abort_command(mut self, command: impl Into<String>) -> Self {
        self.abort_commands.push(command.into());
        self
    }

    /// Add a command that saves running to startup.
    pub fn with_save_command(mut self, command: impl Into<String>) -> Self {
        self.save_commands.push(command.into());
        self
    }

    /// Set the running/startup configuration display commands.
    pub fn with_config_commands(
        mut self,
        running: impl Into<String>,
        startup: impl Into<String>,
    ) -> Self {
        self.running_config_command = running.into();
        self.startup_config_command = startup.into();
        self
    }

    /// Set terminal dimensions.
    pub fn with_terminal_size(mut self, width: u32, height: u32) -> Self {
        self.terminal_width = width;
        self.terminal_height = height;
        self
    }

    /// Regex matching the prompt of any privilege level.
    pub fn prompt_pattern(&self) -> Regex {
        let combined = self
            .privilege_levels
            .values()
            .map(|level| format!("(?:{})", level.pattern.as_str()))
            .collect::<Vec<_>>()
            .join("|");
        Regex::new(&combined).unwrap_or_else(|_| Regex::new(r"[$#>]\s*$").unwrap())
    }

    /// Determine the privilege level a prompt belongs to.
    pub fn determine_privilege(&self, prompt: &str) -> Option<&PrivilegeLevel> {
        self.privilege_levels
            .values()
            .find(|level| level.matches(prompt))
    }

    /// First failure pattern found in `output`, if any.
    pub fn detect_failure(&self, output: &str) -> Option<&str> {
        self.failed_when_contains
            .iter()
            .find(|pattern| output.contains(pattern.as_str()))
            .map(String::as_str)
    }
}
