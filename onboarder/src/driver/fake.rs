//! Scripted in-memory driver for session-level tests.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use super::{Driver, Response};
use crate::error::{DriverError, Result, TransportError};

/// Plays back canned Junos output and records every line sent,
/// including the privilege transitions.
#[derive(Debug, Default)]
pub(crate) struct FakeDriver {
    pub refuse_login: bool,
    pub replies: HashMap<String, String>,
    pub failing: HashSet<String>,
    pub sent: Vec<String>,
    pub privilege: Option<String>,
    pub closed: bool,
}

impl FakeDriver {
    pub fn reply(mut self, command: &str, output: &str) -> Self {
        self.replies.insert(command.to_string(), output.to_string());
        self
    }

    pub fn reject(mut self, command: &str) -> Self {
        self.failing.insert(command.to_string());
        self
    }

    /// An already-open driver sitting at the exec prompt.
    pub fn at_exec() -> Self {
        Self {
            privilege: Some("exec".to_string()),
            ..Self::default()
        }
    }
}

impl Driver for FakeDriver {
    async fn open(&mut self) -> Result<()> {
        if self.refuse_login {
            return Err(TransportError::AuthenticationFailed {
                user: "super_user".to_string(),
            }
            .into());
        }
        self.privilege = Some("exec".to_string());
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.privilege = None;
        self.closed = true;
        Ok(())
    }

    async fn send_command(&mut self, command: &str) -> Result<Response> {
        if self.privilege.is_none() {
            return Err(DriverError::NotConnected.into());
        }
        self.sent.push(command.to_string());

        let output = self.replies.get(command).cloned().unwrap_or_default();
        if command == "commit and-quit" && output.contains("commit complete") {
            self.privilege = Some("exec".to_string());
        }

        let response = Response::new(command, output.clone(), output, "", Duration::ZERO);
        if self.failing.contains(command) {
            return Ok(response.with_failure("error:"));
        }
        Ok(response)
    }

    async fn acquire_privilege(&mut self, target: &str) -> Result<()> {
        let current = self.privilege.clone().ok_or(DriverError::NotConnected)?;
        let command = match (current.as_str(), target) {
            (from, to) if from == to => return Ok(()),
            ("exec", "configuration") => "configure",
            ("configuration", "exec") => "exit configuration-mode",
            (from, to) => {
                return Err(DriverError::NoPrivilegePath {
                    from: from.to_string(),
                    to: to.to_string(),
                }
                .into());
            }
        };
        self.sent.push(command.to_string());
        self.privilege = Some(target.to_string());
        Ok(())
    }

    fn host(&self) -> &str {
        "192.168.0.2"
    }

    fn current_privilege(&self) -> Option<&str> {
        self.privilege.as_deref()
    }
}
