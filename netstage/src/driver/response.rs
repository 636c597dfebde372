//! Response type for shell command execution.

use std::time::Duration;

/// Response from a command execution.
#[derive(Debug, Clone)]
pub struct Response {
    /// The command that was executed.
    pub command: String,

    /// The command output with the echo and trailing prompt removed.
    pub result: String,

    /// The prompt that was matched at the end.
    pub prompt: String,

    /// Time taken to execute the command.
    pub elapsed: Duration,
}

impl Response {
    /// Build a response from raw shell output ending in a prompt.
    pub fn from_raw(command: impl Into<String>, raw: &[u8], elapsed: Duration) -> Self {
        let command = command.into();
        let prompt = last_line(raw).trim().to_string();
        let result = normalize_output(&String::from_utf8_lossy(raw), &command);
        Self {
            command,
            result,
            prompt,
            elapsed,
        }
    }

    /// Get the result lines as an iterator.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.result.lines()
    }
}

impl std::fmt::Display for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.result)
    }
}

/// The text after the last newline (the prompt, for prompt-terminated output).
pub(crate) fn last_line(raw: &[u8]) -> String {
    let start = memchr::memrchr(b'\n', raw).map_or(0, |pos| pos + 1);
    String::from_utf8_lossy(&raw[start..]).into_owned()
}

/// Strip the command echo from the front and the prompt line from the end.
pub(crate) fn normalize_output(raw: &str, command: &str) -> String {
    let output = raw
        .trim_start_matches(['\r', '\n'])
        .strip_prefix(command)
        .unwrap_or(raw)
        .trim_start_matches(['\r', '\n']);

    match output.rfind('\n') {
        Some(pos) => output[..pos].trim_end_matches('\r').to_string(),
        None => String::new(),
    }
}
