//! Response type for command execution results.

use std::time::Duration;

use crate::error::DriverError;

/// Response from a command execution.
#[derive(Debug, Clone)]
pub struct Response {
    /// The command that was executed.
    pub command: String,

    /// The command output (normalized - command echo and trailing prompt removed).
    pub result: String,

    /// The raw output before normalization.
    pub raw_result: String,

    /// The prompt that was matched at the end.
    pub prompt: String,

    /// Time taken to execute the command.
    pub elapsed: Duration,

    /// Failure message if the command failed (based on failure patterns).
    pub failure_message: Option<String>,
}

impl Response {
    /// Create a new successful response.
    pub fn new(
        command: impl Into<String>,
        result: impl Into<String>,
        raw_result: impl Into<String>,
        prompt: impl Into<String>,
        elapsed: Duration,
    ) -> Self {
        Self {
            command: command.into(),
            result: result.into(),
            raw_result: raw_result.into(),
            prompt: prompt.into(),
            elapsed,
            failure_message: None,
        }
    }

    /// Mark this response as failed.
    pub fn with_failure(mut self, failure_message: impl Into<String>) -> Self {
        self.failure_message = Some(failure_message.into());
        self
    }

    /// Turn a failed response into a [`DriverError::CommandFailed`].
    ///
    /// The error message carries the device output, which names what the
    /// device objected to.
    pub fn into_result(self) -> Result<Self, DriverError> {
        match self.failure_message {
            None => Ok(self),
            Some(pattern) => {
                let detail = self.result.trim();
                Err(DriverError::CommandFailed {
                    command: self.command,
                    message: if detail.is_empty() {
                        pattern
                    } else {
                        detail.replace('\n', " | ")
                    },
                })
            }
        }
    }

    /// Check if the result contains a substring.
    pub fn contains(&self, pattern: &str) -> bool {
        self.result.contains(pattern)
    }
}
