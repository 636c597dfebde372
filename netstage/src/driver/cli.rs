//! CLI vendor driver that works with any platform definition.

use std::path::Path;

use async_trait::async_trait;
use log::{debug, info, warn};
use regex::bytes::Regex;
use secrecy::ExposeSecret;

use super::response::{Response, last_line};
use super::shell::CliShell;
use super::{ConfigSnapshot, DriverParams, NetworkDriver};
use crate::error::{ChannelError, DriverError, Result};
use crate::platform::PlatformDefinition;
use crate::transport::SshConfig;

/// Driver that stages configuration by typing it into the device CLI.
///
/// On platforms with a candidate datastore (Junos, IOS-XR),
/// `load_merge_candidate` enters configuration mode and sends every
/// candidate line, so syntax errors surface while staging and
/// `commit_config` only runs the commit commands. Elsewhere the candidate
/// is held locally and `commit_config` types it in, since any line sent
/// to those devices takes effect at once. Either way the commit ends by
/// leaving configuration mode and saving running to startup.
pub struct CliDriver {
    params: DriverParams,
    platform: PlatformDefinition,
    shell: Option<CliShell>,
    candidate: Option<Vec<String>>,
    /// Candidate lines sit uncommitted in the device's datastore.
    staged_on_device: bool,
}

impl CliDriver {
    /// Create a driver; nothing is connected until `open()`.
    pub fn new(params: DriverParams, platform: PlatformDefinition) -> Self {
        Self {
            params,
            platform,
            shell: None,
            candidate: None,
            staged_on_device: false,
        }
    }

    /// Get a reference to the platform definition.
    pub fn platform(&self) -> &PlatformDefinition {
        &self.platform
    }

    /// The candidate lines loaded by `load_merge_candidate`.
    pub fn candidate(&self) -> Option<&[String]> {
        self.candidate.as_deref()
    }

    fn ssh_config(&self) -> SshConfig {
        let args = &self.params.optional_args;
        let mut config = SshConfig::new(
            self.params.hostname.clone(),
            self.params.username.clone(),
            self.params.password.clone(),
        );
        config.port = args.port;
        config.timeout = args.timeout;
        config.host_key_verification = args.host_key_verification.clone();
        config.terminal_width = self.platform.terminal_width;
        config.terminal_height = self.platform.terminal_height;
        config
    }

    /// Send a command and fail if its output matches a failure pattern.
    async fn run_checked(&mut self, command: &str) -> Result<Response> {
        let shell = self.shell.as_mut().ok_or(DriverError::NotConnected)?;
        let response = shell.send_command(command).await?;
        if let Some(pattern) = self.platform.detect_failure(&response.result) {
            return Err(DriverError::CommandFailed {
                command: command.to_string(),
                message: pattern.to_string(),
            }
            .into());
        }
        Ok(response)
    }

    /// Escalate to the platform's default privilege level if the login
    /// landed below it.
    async fn enable(&mut self) -> Result<()> {
        let shell = self.shell.as_mut().ok_or(DriverError::NotConnected)?;

        let current = self
            .platform
            .determine_privilege(shell.prompt())
            .map(|level| level.name.clone())
            .unwrap_or_default();
        if current == self.platform.default_privilege {
            return Ok(());
        }

        let Some(command) = self.platform.enable_command.clone() else {
            return Ok(());
        };

        let prompt_pattern = shell.prompt_pattern().clone();
        let output = match self.platform.enable_auth_prompt {
            Some(ref auth) => {
                let either = Regex::new(&format!(
                    "(?:{})|(?:{})",
                    auth.as_str(),
                    prompt_pattern.as_str()
                ))
                .map_err(ChannelError::from)?;
                let output = shell.send_expect(&command, &either).await?;
                if auth.is_match(last_line(output.as_bytes()).as_bytes()) {
                    debug!("{}: sending enable secret", self.params.hostname);
                    shell
                        .send_line(self.params.optional_args.secret.expose_secret())
                        .await?;
                    String::from_utf8_lossy(&shell.read_prompt().await?).into_owned()
                } else {
                    output
                }
            }
            None => shell.send_expect(&command, &prompt_pattern).await?,
        };

        let reached = self
            .platform
            .determine_privilege(shell.prompt())
            .is_some_and(|level| level.name == self.platform.default_privilege);
        if !reached {
            debug!("{}: enable output: {}", self.params.hostname, output.trim());
            return Err(DriverError::EnableFailed {
                host: self.params.hostname.clone(),
            }
            .into());
        }
        Ok(())
    }

    async fn prepare_session(&mut self) -> Result<()> {
        self.enable().await?;
        for command in self.platform.on_open_commands.clone() {
            self.run_checked(&command).await?;
        }
        Ok(())
    }

    /// Commands `load_merge_candidate` sends to the device.
    pub(crate) fn staging_commands(&self, lines: &[String]) -> Vec<String> {
        if !self.platform.candidate_datastore {
            return Vec::new();
        }
        std::iter::once(self.platform.config_enter.clone())
            .chain(lines.iter().cloned())
            .collect()
    }

    /// Commands `commit_config` sends before leaving configuration mode.
    pub(crate) fn commit_sequence(&self, lines: &[String]) -> Vec<String> {
        let mut commands = Vec::new();
        if !self.platform.candidate_datastore {
            commands.push(self.platform.config_enter.clone());
            commands.extend(lines.iter().cloned());
        }
        commands.extend(self.platform.commit_commands.iter().cloned());
        commands
    }

    /// Run commands in configuration mode, aborting the candidate on the
    /// first failure.
    async fn run_in_config(&mut self, commands: &[String]) -> Result<()> {
        for command in commands {
            if let Err(e) = self.run_checked(command).await {
                self.abort_candidate().await;
                return Err(e);
            }
        }
        Ok(())
    }

    /// Best-effort discard of the candidate and exit from configuration mode.
    async fn abort_candidate(&mut self) {
        self.staged_on_device = false;
        let commands = if self.platform.abort_commands.is_empty() {
            vec![self.platform.config_exit.clone()]
        } else {
            self.platform.abort_commands.clone()
        };
        if let Some(shell) = self.shell.as_mut() {
            for command in commands {
                if let Err(e) = shell.send_command(&command).await {
                    warn!("{}: '{}' failed during abort: {}", self.params.hostname, command, e);
                    break;
                }
            }
        }
    }
}

#[async_trait]
impl NetworkDriver for CliDriver {
    async fn open(&mut self) -> Result<()> {
        if self.shell.is_some() {
            return Err(DriverError::AlreadyConnected.into());
        }
        if !self.params.optional_args.inline_transfer {
            warn!(
                "{}: CLI drivers always transfer the candidate inline",
                self.params.hostname
            );
        }

        let shell = CliShell::open(self.ssh_config(), self.platform.prompt_pattern()).await?;
        info!(
            "{}: connected ({} driver, prompt '{}')",
            self.params.hostname,
            self.platform.name,
            shell.prompt()
        );
        self.shell = Some(shell);

        if let Err(e) = self.prepare_session().await {
            let _ = self.close().await;
            return Err(e);
        }
        Ok(())
    }

    async fn load_merge_candidate(&mut self, path: &Path) -> Result<()> {
        if self.shell.is_none() {
            return Err(DriverError::NotConnected.into());
        }
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| DriverError::CandidateRead {
                path: path.to_path_buf(),
                source,
            })?;

        let lines = parse_candidate(&text);
        if lines.is_empty() {
            return Err(DriverError::EmptyCandidate(path.to_path_buf()).into());
        }
        if self.staged_on_device {
            // a second load replaces the first
            self.abort_candidate().await;
        }
        self.candidate = None;

        let staging = self.staging_commands(&lines);
        if !staging.is_empty() {
            self.run_in_config(&staging).await?;
            self.staged_on_device = true;
        }
        debug!(
            "{}: loaded {} candidate lines from {}{}",
            self.params.hostname,
            lines.len(),
            path.display(),
            if self.staged_on_device { " into the device candidate" } else { "" }
        );
        self.candidate = Some(lines);
        Ok(())
    }

    async fn commit_config(&mut self) -> Result<()> {
        let lines = self.candidate.clone().ok_or(DriverError::NoCandidate)?;

        let commands = self.commit_sequence(&lines);
        self.run_in_config(&commands).await?;
        self.staged_on_device = false;

        let exit = self.platform.config_exit.clone();
        self.run_checked(&exit).await?;

        for command in self.platform.save_commands.clone() {
            self.run_checked(&command).await?;
        }

        self.candidate = None;
        Ok(())
    }

    async fn get_config(&mut self) -> Result<ConfigSnapshot> {
        let running_command = self.platform.running_config_command.clone();
        let startup_command = self.platform.startup_config_command.clone();

        let running = self.run_checked(&running_command).await?.result;
        let startup = self.run_checked(&startup_command).await?.result;

        Ok(ConfigSnapshot {
            running,
            startup,
            candidate: self.candidate.as_ref().map(|c| c.join("\n")).unwrap_or_default(),
        })
    }

    async fn close(&mut self) -> Result<()> {
        if self.staged_on_device {
            debug!("{}: discarding uncommitted candidate", self.params.hostname);
            self.abort_candidate().await;
        }
        if let Some(shell) = self.shell.take() {
            shell.close().await?;
            debug!("{}: closed", self.params.hostname);
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.shell.is_some()
    }
}

impl Drop for CliDriver {
    fn drop(&mut self) {
        if self.shell.is_some() {
            warn!(
                "CliDriver for '{}' dropped without close()",
                self.params.hostname
            );
        }
    }
}

/// Configuration lines worth sending: no blanks, comments, or a bare `end`.
pub(crate) fn parse_candidate(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim_end)
        .filter(|line| {
            let trimmed = line.trim_start();
            !trimmed.is_empty()
                && !trimmed.starts_with('!')
                && !trimmed.starts_with('#')
                && trimmed != "end"
        })
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use secrecy::SecretString;

    use super::*;
    use crate::driver::OptionalArgs;
    use crate::platform::vendors::{cisco_ios, cisco_iosxr, juniper_junos};

    fn lines(text: &str) -> Vec<String> {
        parse_candidate(text)
    }

    fn params() -> DriverParams {
        DriverParams {
            hostname: "10.0.0.1".into(),
            username: "admin".into(),
            password: SecretString::from("cisco"),
            optional_args: OptionalArgs::new(SecretString::from("enable-secret")),
        }
    }

    #[test]
    fn test_parse_candidate_keeps_indentation() {
        let text = "!\ninterface Loopback1\n ip address 2.2.2.2 255.255.255.255\n\n!\nend\n";
        assert_eq!(
            parse_candidate(text),
            vec![
                "interface Loopback1".to_string(),
                " ip address 2.2.2.2 255.255.255.255".to_string()
            ]
        );
    }

    #[test]
    fn test_parse_candidate_only_comments() {
        assert!(parse_candidate("!\n# generated\n   \n").is_empty());
    }

    #[test]
    fn test_ssh_config_from_params() {
        let driver = CliDriver::new(params(), cisco_ios::platform());
        let config = driver.ssh_config();
        assert_eq!(config.host, "10.0.0.1");
        assert_eq!(config.username, "admin");
        assert_eq!(config.password.expose_secret(), "cisco");
        assert_eq!(config.port, 22);
        assert!(!driver.is_open());
    }

    #[tokio::test]
    async fn test_operations_require_open() {
        let mut driver = CliDriver::new(params(), cisco_ios::platform());
        let err = driver
            .load_merge_candidate(Path::new("/nonexistent"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Driver(DriverError::NotConnected)
        ));
        assert!(matches!(
            driver.commit_config().await,
            Err(crate::Error::Driver(DriverError::NoCandidate))
        ));
        // close on a never-opened driver is a no-op
        driver.close().await.unwrap();
    }

    #[test]
    fn test_datastore_platforms_send_candidate_while_staging() {
        let candidate = lines("set interfaces lo0 unit 0 family inet address 10.255.0.1/32\n");
        let driver = CliDriver::new(params(), juniper_junos::platform());

        assert_eq!(
            driver.staging_commands(&candidate),
            vec![
                "configure".to_string(),
                "set interfaces lo0 unit 0 family inet address 10.255.0.1/32".to_string()
            ]
        );
        assert_eq!(driver.commit_sequence(&candidate), vec!["commit".to_string()]);

        let driver = CliDriver::new(params(), cisco_iosxr::platform());
        let candidate = lines("hostname xr1\n");
        assert_eq!(
            driver.staging_commands(&candidate),
            vec!["configure terminal".to_string(), "hostname xr1".to_string()]
        );
        assert_eq!(driver.commit_sequence(&candidate), vec!["commit".to_string()]);
    }

    #[test]
    fn test_immediate_platforms_send_candidate_at_commit() {
        let candidate = lines("interface Loopback1\n ip address 2.2.2.2 255.255.255.255\n");
        let driver = CliDriver::new(params(), cisco_ios::platform());

        assert!(driver.staging_commands(&candidate).is_empty());
        assert_eq!(
            driver.commit_sequence(&candidate),
            vec![
                "configure terminal".to_string(),
                "interface Loopback1".to_string(),
                " ip address 2.2.2.2 255.255.255.255".to_string(),
            ]
        );
    }
}
