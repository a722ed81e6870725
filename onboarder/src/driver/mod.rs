//! High-level driver for device interaction.
//!
//! The driver layer owns the SSH session for one device and provides
//! command execution, privilege navigation and configuration sessions.

pub mod config_session;
#[cfg(test)]
pub(crate) mod fake;
mod generic;
mod privilege;
pub(crate) mod response;

pub use config_session::ConfigSession;
pub use generic::{COMMAND_LOG_TARGET, GenericDriver};
pub use privilege::PrivilegeManager;
pub use response::Response;

use std::future::Future;

use crate::error::Result;

/// Trait for device drivers.
pub trait Driver: Send + Sync {
    /// Open the connection to the device.
    fn open(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Close the connection. Safe to call when not open.
    fn close(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Send a command and wait for the prompt.
    fn send_command(&mut self, command: &str) -> impl Future<Output = Result<Response>> + Send;

    /// Send multiple commands, stopping at the first one the device rejects.
    fn send_commands<S>(
        &mut self,
        commands: &[S],
    ) -> impl Future<Output = Result<Vec<Response>>> + Send
    where
        S: AsRef<str> + Sync,
    {
        async move {
            let mut responses = Vec::with_capacity(commands.len());
            for cmd in commands {
                let response = self.send_command(cmd.as_ref()).await?.into_result()?;
                responses.push(response);
            }
            Ok(responses)
        }
    }

    /// Acquire a specific privilege level.
    fn acquire_privilege(&mut self, privilege: &str) -> impl Future<Output = Result<()>> + Send;

    /// Host this driver talks to.
    fn host(&self) -> &str;

    /// Get the current privilege level name.
    fn current_privilege(&self) -> Option<&str>;
}
