//! PTY shell channel with prompt-driven reads.

use std::time::Duration;

use log::trace;
use regex::bytes::Regex;
use russh::ChannelMsg;
use russh::client::Msg;

use super::buffer::PatternBuffer;
use crate::error::{ChannelError, Result};

/// Interactive shell channel on an SSH connection.
///
/// Writes are newline-terminated lines; reads accumulate output until a
/// prompt pattern shows up in the buffer tail or the deadline passes.
pub struct PtyChannel {
    channel: russh::Channel<Msg>,
    buffer: PatternBuffer,
    timeout: Duration,
}

impl PtyChannel {
    pub(crate) fn new(channel: russh::Channel<Msg>, timeout: Duration) -> Self {
        Self {
            channel,
            buffer: PatternBuffer::default(),
            timeout,
        }
    }

    /// Default timeout for reads.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Set the default timeout for reads.
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    /// Send one line of input.
    pub async fn send(&mut self, input: &str) -> Result<()> {
        let line = format!("{input}\n");
        self.channel
            .data(line.as_bytes())
            .await
            .map_err(ChannelError::Ssh)?;
        Ok(())
    }

    /// Read until `pattern` matches the buffer tail; returns everything read.
    pub async fn read_until_pattern(&mut self, pattern: &Regex, timeout: Duration) -> Result<Vec<u8>> {
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            if self.buffer.tail_contains(pattern) {
                return Ok(self.buffer.take());
            }

            match tokio::time::timeout_at(deadline, self.channel.wait()).await {
                Err(_) => return Err(ChannelError::PatternTimeout(timeout).into()),
                Ok(None) | Ok(Some(ChannelMsg::Eof)) | Ok(Some(ChannelMsg::Close)) => {
                    return Err(ChannelError::Closed.into());
                }
                Ok(Some(ChannelMsg::Data { data })) => {
                    trace!("read {} bytes", data.len());
                    self.buffer.extend(&data);
                }
                Ok(Some(ChannelMsg::ExtendedData { data, .. })) => {
                    self.buffer.extend(&data);
                }
                Ok(Some(_)) => {}
            }
        }
    }

    /// Keep reading until the channel has been silent for `quiet`.
    ///
    /// Returns whatever arrived, possibly nothing.
    pub async fn read_until_quiet(&mut self, quiet: Duration) -> Result<Vec<u8>> {
        loop {
            match tokio::time::timeout(quiet, self.channel.wait()).await {
                Err(_) => return Ok(self.buffer.take()),
                Ok(None) | Ok(Some(ChannelMsg::Eof)) | Ok(Some(ChannelMsg::Close)) => {
                    return Err(ChannelError::Closed.into());
                }
                Ok(Some(ChannelMsg::Data { data }))
                | Ok(Some(ChannelMsg::ExtendedData { data, .. })) => {
                    trace!("drained {} bytes", data.len());
                    self.buffer.extend(&data);
                }
                Ok(Some(_)) => {}
            }
        }
    }

    /// Drop any buffered output.
    pub fn clear_buffer(&mut self) {
        self.buffer.clear();
    }

    /// Signal end of input on the shell.
    pub async fn close(self) -> Result<()> {
        self.channel.eof().await.map_err(ChannelError::Ssh)?;
        Ok(())
    }
}
