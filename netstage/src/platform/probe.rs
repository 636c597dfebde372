//! Platform autodetection over SSH.
//!
//! A probe logs into a device with a prompt pattern loose enough for any
//! vendor, runs a few `show` commands and matches the output against an
//! ordered list of vendor signatures. The first matching signature wins,
//! so more specific signatures (IOS-XR, IOS-XE) come before the generic
//! ones they overlap with (IOS).

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info};
use once_cell::sync::Lazy;
use regex::Regex;
use secrecy::SecretString;

use crate::driver::CliShell;
use crate::error::Result;
use crate::transport::{HostKeyVerification, SshConfig};

/// Connection parameters handed to a probe.
#[derive(Debug, Clone)]
pub struct ProbeParams {
    /// Device address.
    pub host: String,

    /// SSH port.
    pub port: u16,

    /// Login username.
    pub username: String,

    /// Login password.
    pub password: SecretString,

    /// Privileged-mode secret.
    pub secret: SecretString,

    /// Requested device type; always "autodetect" for fleet runs.
    pub device_type: String,
}

impl ProbeParams {
    /// Parameters for an autodetect probe.
    pub fn autodetect(
        host: impl Into<String>,
        username: impl Into<String>,
        password: SecretString,
        secret: SecretString,
    ) -> Self {
        Self {
            host: host.into(),
            port: 22,
            username: username.into(),
            password,
            secret,
            device_type: "autodetect".to_string(),
        }
    }
}

/// Guesses the platform of one device.
#[async_trait]
pub trait PlatformProbe: Send + Sync {
    /// Return a probe-vocabulary platform name, or `None` if inconclusive.
    async fn probe(&self, params: &ProbeParams) -> Result<Option<String>>;
}

/// A vendor fingerprint: a command and the output patterns that identify it.
#[derive(Debug)]
pub struct Signature {
    /// Probe-vocabulary platform name.
    pub platform: &'static str,

    /// Command whose output is inspected.
    pub command: &'static str,

    /// Any of these matching identifies the platform.
    pub patterns: Vec<Regex>,
}

impl Signature {
    fn new(platform: &'static str, command: &'static str, patterns: &[&str]) -> Self {
        Self {
            platform,
            command,
            patterns: patterns.iter().map(|p| Regex::new(p).unwrap()).collect(),
        }
    }

    /// Check the command output against this signature.
    pub fn matches(&self, output: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(output))
    }
}

static SIGNATURES: Lazy<Vec<Signature>> = Lazy::new(|| {
    vec![
        Signature::new("cisco_xr", "show version", &[r"Cisco IOS XR"]),
        Signature::new("cisco_xe", "show version", &[r"Cisco IOS XE Software", r"IOS-XE"]),
        Signature::new(
            "cisco_nxos",
            "show version",
            &[r"Cisco Nexus Operating System", r"NX-OS"],
        ),
        Signature::new(
            "cisco_asa",
            "show version",
            &[r"Cisco Adaptive Security Appliance"],
        ),
        Signature::new(
            "cisco_ios",
            "show version",
            &[
                r"Cisco IOS Software",
                r"Cisco Internetwork Operating System Software",
            ],
        ),
        Signature::new("arista_eos", "show version", &[r"Arista"]),
        Signature::new(
            "juniper_junos",
            "show version",
            &[
                r"JUNOS Software Release",
                r"JUNOS .+ Software",
                r"JUNOS OS Kernel",
                r"JUNOS Base Version",
            ],
        ),
        Signature::new("nokia_sros", "show version", &[r"TiMOS", r"Nokia"]),
        Signature::new(
            "huawei",
            "display version",
            &[
                r"Huawei Technologies",
                r"Huawei Versatile Routing Platform Software",
            ],
        ),
        Signature::new("paloalto_panos", "show system info", &[r"model:\s+PA"]),
        Signature::new("linux", "uname -a", &[r"Linux"]),
    ]
});

/// The ordered signature list, highest priority first.
pub fn signatures() -> &'static [Signature] {
    &SIGNATURES
}

/// Best match for already-collected outputs keyed by command.
///
/// Signatures whose command has no output are skipped.
pub fn detect_from_outputs(outputs: &HashMap<String, String>) -> Option<&'static str> {
    signatures()
        .iter()
        .find(|sig| {
            outputs
                .get(sig.command)
                .is_some_and(|output| sig.matches(output))
        })
        .map(|sig| sig.platform)
}

/// Prompt pattern used before the platform is known.
///
/// Only a prompt-like line that ends the buffer counts, so banner lines
/// followed by more output never stop a read.
const GENERIC_PROMPT: &str = r"(?m)^[^\r\n]{1,80}[>#$%\]][ \t]*\z";

/// How long the shell must stay silent before its prompt is pinned.
const PROMPT_SETTLE: Duration = Duration::from_millis(500);

/// Something that runs a CLI command and returns its output.
#[async_trait]
pub trait CommandRunner: Send {
    /// Run `command` and return the output without echo or prompt.
    async fn run(&mut self, command: &str) -> Result<String>;
}

#[async_trait]
impl CommandRunner for CliShell {
    async fn run(&mut self, command: &str) -> Result<String> {
        Ok(self.send_command(command).await?.result)
    }
}

/// Walk the signatures in priority order, running each distinct command
/// at most once.
pub async fn fingerprint(runner: &mut dyn CommandRunner) -> Result<Option<&'static str>> {
    // Paging off; vendors without this command just print an error.
    runner.run("terminal length 0").await?;

    let mut outputs: HashMap<String, String> = HashMap::new();
    for sig in signatures() {
        if outputs.contains_key(sig.command) {
            continue;
        }
        let output = runner.run(sig.command).await?;
        outputs.insert(sig.command.to_string(), output);
        if let Some(platform) = detect_from_outputs(&outputs) {
            return Ok(Some(platform));
        }
    }
    Ok(None)
}

/// Probe that fingerprints devices over an SSH shell.
#[derive(Debug, Clone)]
pub struct SshProbe {
    timeout: Duration,
    host_key_verification: HostKeyVerification,
}

impl SshProbe {
    /// Create a probe with a per-read timeout.
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            host_key_verification: HostKeyVerification::default(),
        }
    }

    /// Set the host key verification mode.
    pub fn with_host_key_verification(mut self, mode: HostKeyVerification) -> Self {
        self.host_key_verification = mode;
        self
    }

    async fn identify(shell: &mut CliShell) -> Result<Option<String>> {
        shell.lock_prompt(PROMPT_SETTLE).await?;
        Ok(fingerprint(shell).await?.map(str::to_string))
    }
}

impl Default for SshProbe {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

#[async_trait]
impl PlatformProbe for SshProbe {
    async fn probe(&self, params: &ProbeParams) -> Result<Option<String>> {
        let mut config = SshConfig::new(
            params.host.clone(),
            params.username.clone(),
            params.password.clone(),
        );
        config.port = params.port;
        config.timeout = self.timeout;
        config.host_key_verification = self.host_key_verification.clone();

        let prompt =
            regex::bytes::Regex::new(GENERIC_PROMPT).map_err(crate::error::ChannelError::from)?;
        let mut shell = CliShell::open(config, prompt).await?;

        let guess = Self::identify(&mut shell).await;
        if let Err(e) = shell.close().await {
            debug!("{}: probe session close failed: {}", params.host, e);
        }

        if let Ok(ref platform) = guess {
            info!("{}: probe guessed {:?}", params.host, platform);
        }
        guess
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outputs(command: &str, text: &str) -> HashMap<String, String> {
        HashMap::from([(command.to_string(), text.to_string())])
    }

    #[test]
    fn test_ios_show_version() {
        let text = "Cisco IOS Software, IOSv Software (VIOS-ADVENTERPRISEK9-M), Version 15.9(3)M6\n\
                    Technical Support: http://www.cisco.com/techsupport";
        assert_eq!(detect_from_outputs(&outputs("show version", text)), Some("cisco_ios"));
    }

    #[test]
    fn test_iosxe_wins_over_ios() {
        let text = "Cisco IOS XE Software, Version 17.03.04a\n\
                    Cisco IOS Software [Amsterdam], Virtual XE Software";
        assert_eq!(detect_from_outputs(&outputs("show version", text)), Some("cisco_xe"));
    }

    #[test]
    fn test_iosxr_and_nxos() {
        let xr = "Cisco IOS XR Software, Version 7.3.2";
        assert_eq!(detect_from_outputs(&outputs("show version", xr)), Some("cisco_xr"));

        let nxos = "Cisco Nexus Operating System (NX-OS) Software\nTAC support: http://www.cisco.com/tac";
        assert_eq!(detect_from_outputs(&outputs("show version", nxos)), Some("cisco_nxos"));
    }

    #[test]
    fn test_arista_and_junos() {
        let eos = "Arista vEOS-lab\nHardware version:\nSoftware image version: 4.28.0F";
        assert_eq!(detect_from_outputs(&outputs("show version", eos)), Some("arista_eos"));

        let junos = "Hostname: vmx1\nModel: vmx\nJunos: 21.2R1.10\nJUNOS OS Kernel 64-bit  [20210528.2fba5d3_builder_stable_12]";
        assert_eq!(detect_from_outputs(&outputs("show version", junos)), Some("juniper_junos"));
    }

    #[test]
    fn test_other_commands() {
        let huawei = "Huawei Versatile Routing Platform Software\nVRP (R) software, Version 8.180";
        assert_eq!(detect_from_outputs(&outputs("display version", huawei)), Some("huawei"));

        let linux = "Linux bastion 6.1.0-18-amd64 #1 SMP PREEMPT_DYNAMIC x86_64 GNU/Linux";
        assert_eq!(detect_from_outputs(&outputs("uname -a", linux)), Some("linux"));
    }

    #[test]
    fn test_inconclusive() {
        let text = "% Invalid input detected at '^' marker.";
        assert_eq!(detect_from_outputs(&outputs("show version", text)), None);
        assert_eq!(detect_from_outputs(&HashMap::new()), None);
    }

    #[test]
    fn test_generic_prompt() {
        let prompt = regex::bytes::Regex::new(GENERIC_PROMPT).unwrap();
        for p in ["router>", "router#", "admin@vmx1> ", "user@host:~$ ", "<HUAWEI>", "[~HUAWEI]"] {
            assert!(prompt.is_match(p.as_bytes()), "{p}");
        }
        assert!(!prompt.is_match(b"Cisco IOS Software, Version 15.9"));
    }

    #[test]
    fn test_generic_prompt_skips_banner_lines() {
        let prompt = regex::bytes::Regex::new(GENERIC_PROMPT).unwrap();
        let banner = b"\r\n*** Authorized access only [lab-r1]\r\n";
        assert!(!prompt.is_match(banner));

        let mut buffer = crate::channel::PatternBuffer::default();
        buffer.extend(banner);
        buffer.extend(b"\r\nUnauthorized use is prohibited.\r\n");
        assert!(!buffer.tail_contains(&prompt));
        buffer.extend(b"\r\nlab-r1#");
        assert!(buffer.tail_contains(&prompt));
        assert_eq!(crate::driver::response::last_line(&buffer.take()), "lab-r1#");
    }

    /// Answers commands from a table and remembers what it was asked.
    struct ScriptedRunner {
        answers: HashMap<&'static str, &'static str>,
        ran: Vec<String>,
    }

    impl ScriptedRunner {
        fn new(answers: &[(&'static str, &'static str)]) -> Self {
            Self {
                answers: answers.iter().copied().collect(),
                ran: Vec::new(),
            }
        }
    }

    #[async_trait]
    impl CommandRunner for ScriptedRunner {
        async fn run(&mut self, command: &str) -> Result<String> {
            self.ran.push(command.to_string());
            Ok(self
                .answers
                .get(command)
                .copied()
                .unwrap_or("% Invalid input detected at '^' marker.")
                .to_string())
        }
    }

    #[tokio::test]
    async fn test_fingerprint_prefers_iosxe_and_runs_show_version_once() {
        let mut runner = ScriptedRunner::new(&[(
            "show version",
            "Cisco IOS XE Software, Version 17.03.04a\nCisco IOS Software [Amsterdam]",
        )]);
        assert_eq!(fingerprint(&mut runner).await.unwrap(), Some("cisco_xe"));
        assert_eq!(runner.ran, vec!["terminal length 0", "show version"]);
    }

    #[tokio::test]
    async fn test_fingerprint_falls_through_to_later_commands() {
        let mut runner = ScriptedRunner::new(&[(
            "uname -a",
            "Linux bastion 6.1.0-18-amd64 #1 SMP x86_64 GNU/Linux",
        )]);
        assert_eq!(fingerprint(&mut runner).await.unwrap(), Some("linux"));
        assert_eq!(
            runner.ran,
            vec![
                "terminal length 0",
                "show version",
                "display version",
                "show system info",
                "uname -a"
            ]
        );
    }

    #[tokio::test]
    async fn test_fingerprint_inconclusive_runs_each_command_once() {
        let mut runner = ScriptedRunner::new(&[]);
        assert_eq!(fingerprint(&mut runner).await.unwrap(), None);

        let mut distinct: Vec<&str> = signatures().iter().map(|sig| sig.command).collect();
        distinct.dedup();
        assert_eq!(runner.ran.len(), 1 + distinct.len());
        for command in distinct {
            assert_eq!(runner.ran.iter().filter(|c| *c == command).count(), 1, "{command}");
        }
    }

    #[tokio::test]
    async fn test_fingerprint_stops_on_runner_error() {
        struct Unreachable;

        #[async_trait]
        impl CommandRunner for Unreachable {
            async fn run(&mut self, _command: &str) -> Result<String> {
                Err(crate::error::ChannelError::Closed.into())
            }
        }

        assert!(fingerprint(&mut Unreachable).await.is_err());
    }

    #[test]
    fn test_autodetect_params() {
        let params = ProbeParams::autodetect(
            "10.0.0.1",
            "admin",
            SecretString::from("cisco"),
            SecretString::from("cisco"),
        );
        assert_eq!(params.device_type, "autodetect");
        assert_eq!(params.port, 22);
    }
}
