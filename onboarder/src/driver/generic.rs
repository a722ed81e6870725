//! Generic driver implementation that works with any platform.

use std::sync::Arc;
use std::time::Instant;

use log::{Level, debug, log_enabled};
use regex::bytes::Regex;

use super::Driver;
use super::privilege::PrivilegeManager;
use super::response::Response;
use crate::channel::PtyChannel;
use crate::error::{DriverError, Result};
use crate::platform::{DefaultBehavior, PlatformDefinition, VendorBehavior};
use crate::transport::{SshConfig, SshTransport};

/// Log target for device command transcripts.
pub const COMMAND_LOG_TARGET: &str = "onboarder::commands";

/// Driver for one device session over any platform definition.
///
/// Handles:
/// - SSH transport and PTY channel lifetime
/// - Command execution with prompt detection
/// - Privilege level navigation
/// - Failure detection through the platform's patterns
pub struct GenericDriver {
    /// SSH configuration.
    ssh_config: SshConfig,

    /// Platform definition.
    platform: PlatformDefinition,

    /// Vendor behavior implementation.
    behavior: Arc<dyn VendorBehavior>,

    /// SSH transport (None when disconnected).
    transport: Option<SshTransport>,

    /// Interactive shell channel (None when disconnected).
    channel: Option<PtyChannel>,

    /// Privilege level manager.
    privilege_manager: PrivilegeManager,

    /// Combined prompt pattern for all privilege levels.
    prompt_pattern: Regex,
}

impl GenericDriver {
    /// Create a new driver. Does not connect; call `open()`.
    pub fn new(mut ssh_config: SshConfig, platform: PlatformDefinition) -> Self {
        let privilege_manager = PrivilegeManager::new(platform.privilege_levels.clone());

        let behavior = platform
            .behavior
            .clone()
            .unwrap_or_else(|| Arc::new(DefaultBehavior));

        let prompt_pattern = platform
            .combined_prompt_pattern()
            .unwrap_or_else(|_| Regex::new(r"[$#>%]\s?\z").unwrap());

        ssh_config.terminal_width = platform.terminal_width;
        ssh_config.terminal_height = platform.terminal_height;

        Self {
            ssh_config,
            platform,
            behavior,
            transport: None,
            channel: None,
            privilege_manager,
            prompt_pattern,
        }
    }

    /// Read until a prompt and return (raw output, prompt line).
    async fn read_until_prompt(&mut self) -> Result<(String, String)> {
        let channel = self.channel.as_mut().ok_or(DriverError::NotConnected)?;

        let data = channel.read_until(&self.prompt_pattern).await?;
        let output = String::from_utf8_lossy(&data).to_string();

        let prompt = match self.prompt_pattern.find(&data) {
            Some(m) => String::from_utf8_lossy(&data[m.start()..]).trim().to_string(),
            None => String::new(),
        };

        Ok((output, prompt))
    }

    /// Record the privilege level a prompt belongs to.
    fn track_prompt(&mut self, prompt: &str) {
        if let Ok(level) = self.privilege_manager.determine_from_prompt(prompt) {
            let level_name = level.name.clone();
            let _ = self.privilege_manager.set_current(&level_name);
        }
    }

    /// Send a line without normalization or failure checks.
    async fn send_raw(&mut self, input: &str) -> Result<String> {
        let channel = self.channel.as_mut().ok_or(DriverError::NotConnected)?;
        channel.send(input).await?;

        let (_, prompt) = self.read_until_prompt().await?;
        self.track_prompt(&prompt);
        Ok(prompt)
    }
}

impl Driver for GenericDriver {
    async fn open(&mut self) -> Result<()> {
        if self.transport.is_some() {
            return Err(DriverError::AlreadyConnected.into());
        }

        let transport = SshTransport::connect(&self.ssh_config).await?;
        let channel = transport.open_channel(&self.ssh_config).await?;
        self.transport = Some(transport);
        self.channel = Some(channel);

        // Wait for the login prompt
        let (_, prompt) = self.read_until_prompt().await?;
        debug!("{}: initial prompt {:?}", self.ssh_config.host, prompt);
        self.track_prompt(&prompt);

        if self.privilege_manager.current().is_none() {
            return Err(DriverError::UnknownPrivilege { prompt }.into());
        }

        let default_privilege = self.platform.default_privilege.clone();
        if !default_privilege.is_empty() {
            self.acquire_privilege(&default_privilege).await?;
        }

        for cmd in self.platform.on_open_commands.clone() {
            self.send_command(&cmd).await?;
        }

        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(channel) = self.channel.take() {
            // The transport disconnect below tears the channel down anyway
            if let Err(e) = channel.close().await {
                debug!("{}: channel close: {}", self.ssh_config.host, e);
            }
        }
        if let Some(transport) = self.transport.take() {
            transport.close().await?;
        }
        Ok(())
    }

    async fn send_command(&mut self, command: &str) -> Result<Response> {
        let channel = self.channel.as_mut().ok_or(DriverError::NotConnected)?;
        let start = Instant::now();

        channel.send(command).await?;
        let (raw_result, prompt) = self.read_until_prompt().await?;
        let elapsed = start.elapsed();

        self.track_prompt(&prompt);

        let result = self.behavior.normalize_output(&raw_result, command);

        if log_enabled!(target: COMMAND_LOG_TARGET, Level::Debug) {
            debug!(
                target: COMMAND_LOG_TARGET,
                "{} [{}] {}\n{}",
                self.ssh_config.host,
                prompt,
                command,
                result
            );
        }

        let response = Response::new(command, result, raw_result, prompt, elapsed);

        if let Some(pattern) = self.platform.find_failure(&response.result) {
            let pattern = pattern.to_string();
            return Ok(response.with_failure(pattern));
        }

        Ok(response)
    }

    async fn acquire_privilege(&mut self, target: &str) -> Result<()> {
        let current = self
            .privilege_manager
            .current()
            .map(|l| l.name.clone())
            .unwrap_or_default();

        if current == target {
            return Ok(());
        }

        let path = self.privilege_manager.find_path(&current, target)?;

        for step in path.windows(2) {
            let (from, to) = (&step[0], &step[1]);

            let command = self
                .privilege_manager
                .transition_command(from, to)
                .ok_or_else(|| DriverError::NoPrivilegePath {
                    from: from.clone(),
                    to: to.clone(),
                })?;

            debug!("{}: {} -> {} via {:?}", self.ssh_config.host, from, to, command);
            self.send_raw(&command).await?;

            let reached = self.privilege_manager.current().map(|l| l.name.as_str());
            if reached != Some(to.as_str()) {
                return Err(DriverError::PrivilegeAcquisitionFailed { target: to.clone() }.into());
            }
        }

        Ok(())
    }

    fn host(&self) -> &str {
        &self.ssh_config.host
    }

    fn current_privilege(&self) -> Option<&str> {
        self.privilege_manager.current().map(|l| l.name.as_str())
    }
}
