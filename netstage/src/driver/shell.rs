//! Prompt-driven CLI shell over SSH.

use std::time::{Duration, Instant};

use log::debug;
use regex::bytes::Regex;

use super::response::{Response, last_line};
use crate::channel::PtyChannel;
use crate::error::{ChannelError, Result};
use crate::transport::{SshConfig, SshTransport};

/// An authenticated SSH shell that sends lines and waits for prompts.
///
/// Shared by the platform probe and the CLI vendor drivers.
pub struct CliShell {
    transport: SshTransport,
    channel: PtyChannel,
    prompt_pattern: Regex,
    timeout: Duration,
    prompt: String,
}

impl CliShell {
    /// Connect, open a shell and wait for the first prompt.
    pub async fn open(config: SshConfig, prompt_pattern: Regex) -> Result<Self> {
        let timeout = config.timeout;
        let transport = SshTransport::connect(config).await?;
        let channel = match transport.open_shell().await {
            Ok(channel) => channel,
            Err(e) => {
                let _ = transport.close().await;
                return Err(e);
            }
        };

        let mut shell = Self {
            transport,
            channel,
            prompt_pattern,
            timeout,
            prompt: String::new(),
        };

        match shell.read_prompt().await {
            Ok(_) => Ok(shell),
            Err(e) => {
                let _ = shell.close().await;
                Err(e)
            }
        }
    }

    /// The most recently seen prompt.
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// The pattern that marks the end of command output.
    pub fn prompt_pattern(&self) -> &Regex {
        &self.prompt_pattern
    }

    /// Replace the prompt pattern.
    pub fn set_prompt_pattern(&mut self, pattern: Regex) {
        self.prompt_pattern = pattern;
    }

    /// Read until the prompt pattern matches and record the prompt.
    pub async fn read_prompt(&mut self) -> Result<Vec<u8>> {
        let data = self
            .channel
            .read_until_pattern(&self.prompt_pattern, self.timeout)
            .await?;
        self.prompt = last_line(&data).trim().to_string();
        Ok(data)
    }

    /// Pin the prompt to the exact text the device prints.
    ///
    /// Sends an empty line, waits for the current prompt pattern, then
    /// drains until the channel has been quiet for `quiet` so late banner
    /// or prompt bytes are not mistaken for command output. Later reads
    /// only stop at that literal prompt at the very end of the buffer.
    pub async fn lock_prompt(&mut self, quiet: Duration) -> Result<String> {
        self.channel.clear_buffer();
        self.channel.send("").await?;
        let mut data = self
            .channel
            .read_until_pattern(&self.prompt_pattern, self.timeout)
            .await?;
        data.extend(self.channel.read_until_quiet(quiet).await?);

        let prompt = last_line(&data).trim().to_string();
        if prompt.is_empty() {
            return Err(ChannelError::PatternTimeout(self.timeout).into());
        }
        self.prompt_pattern = exact_prompt(&prompt).map_err(ChannelError::from)?;
        debug!("{}: prompt locked to '{}'", self.transport.host(), prompt);
        self.prompt = prompt.clone();
        Ok(prompt)
    }

    /// Send a command and wait for the prompt.
    pub async fn send_command(&mut self, command: &str) -> Result<Response> {
        let start = Instant::now();
        self.channel.clear_buffer();
        self.channel.send(command).await?;
        let data = self.read_prompt().await?;
        debug!("{}: '{}' -> {} bytes", self.transport.host(), command, data.len());
        Ok(Response::from_raw(command, &data, start.elapsed()))
    }

    /// Send input and wait for an arbitrary pattern; returns the raw output.
    ///
    /// If the output ends at a regular prompt, that prompt is recorded.
    pub async fn send_expect(&mut self, input: &str, pattern: &Regex) -> Result<String> {
        self.channel.clear_buffer();
        self.channel.send(input).await?;
        let data = self.channel.read_until_pattern(pattern, self.timeout).await?;
        let last = last_line(&data).trim().to_string();
        if self.prompt_pattern.is_match(last.as_bytes()) {
            self.prompt = last;
        }
        Ok(String::from_utf8_lossy(&data).into_owned())
    }

    /// Send a line without waiting for output (e.g., a password).
    pub async fn send_line(&mut self, input: &str) -> Result<()> {
        self.channel.send(input).await
    }

    /// Close the shell and the SSH connection.
    pub async fn close(self) -> Result<()> {
        let _ = self.channel.close().await;
        self.transport.close().await
    }
}

/// Pattern matching `prompt` literally as the last line of the output.
pub(crate) fn exact_prompt(prompt: &str) -> std::result::Result<Regex, regex::Error> {
    Regex::new(&format!(r"(?:^|[\r\n]){}[ \t]*\z", regex::escape(prompt)))
}
