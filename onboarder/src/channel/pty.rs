//! PTY channel for interactive device sessions.

use std::time::Duration;

use log::trace;
use regex::bytes::Regex;
use russh::client::Msg;
use russh::{Channel, ChannelMsg};
use tokio::time::Instant;

use super::buffer::PatternBuffer;
use crate::error::{ChannelError, Result};

/// Bytes from the end of the output searched for a prompt.
const SEARCH_DEPTH: usize = 1000;

/// Interactive shell channel with prompt-driven reads.
pub struct PtyChannel {
    channel: Channel<Msg>,

    /// Output received since the last completed read.
    buffer: PatternBuffer,

    /// Bound on a single `read_until`.
    timeout: Duration,
}

impl PtyChannel {
    /// Wrap an SSH channel that already has a PTY and shell.
    pub fn new(channel: Channel<Msg>, timeout: Duration) -> Self {
        Self {
            channel,
            buffer: PatternBuffer::new(SEARCH_DEPTH),
            timeout,
        }
    }

    /// Send a line of input followed by a return.
    pub async fn send(&mut self, input: &str) -> Result<()> {
        let line = format!("{input}\n");
        self.channel
            .data(line.as_bytes())
            .await
            .map_err(ChannelError::Ssh)?;
        Ok(())
    }

    /// Read until `pattern` matches the tail of the output.
    ///
    /// Returns everything received up to and including the match and
    /// empties the buffer for the next command.
    pub async fn read_until(&mut self, pattern: &Regex) -> Result<Vec<u8>> {
        let deadline = Instant::now() + self.timeout;

        loop {
            if self.buffer.tail_contains(pattern) {
                return Ok(self.buffer.take());
            }

            let msg = tokio::time::timeout_at(deadline, self.channel.wait())
                .await
                .map_err(|_| ChannelError::PatternTimeout(self.timeout))?;

            match msg {
                Some(ChannelMsg::Data { ref data }) => {
                    trace!("read {} bytes", data.len());
                    self.buffer.extend(data);
                }
                Some(ChannelMsg::ExtendedData { ref data, .. }) => {
                    self.buffer.extend(data);
                }
                Some(ChannelMsg::Eof) | Some(ChannelMsg::Close) | None => {
                    if self.buffer.tail_contains(pattern) {
                        return Ok(self.buffer.take());
                    }
                    return Err(ChannelError::Closed.into());
                }
                Some(_) => {}
            }
        }
    }

    /// Close the channel.
    pub async fn close(self) -> Result<()> {
        self.channel.close().await.map_err(ChannelError::Ssh)?;
        Ok(())
    }
}
