//! SSH connection configuration.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;

/// Host key verification mode, analogous to OpenSSH's `StrictHostKeyChecking`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HostKeyVerification {
    /// Reject unknown and changed keys. Connection fails if the host
    /// is not already in known_hosts.
    Strict,

    /// Accept and auto-learn unknown keys, but reject changed keys.
    #[default]
    AcceptNew,

    /// Accept all keys without checking. For lab use only.
    Disabled,
}

impl FromStr for HostKeyVerification {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "accept-new" | "accept_new" => Ok(Self::AcceptNew),
            "disabled" | "no" | "off" => Ok(Self::Disabled),
            other => Err(format!(
                "unknown host key mode '{other}' (expected strict, accept-new or disabled)"
            )),
        }
    }
}

/// SSH connection configuration for a single device.
#[derive(Debug)]
pub struct SshConfig {
    /// Target host (IP address or hostname).
    pub host: String,

    /// SSH port (default: 22).
    pub port: u16,

    /// Username for authentication.
    pub username: String,

    /// Login password, also used to answer keyboard-interactive prompts.
    pub password: SecretString,

    /// Bound on TCP connect, SSH handshake and authentication.
    pub connect_timeout: Duration,

    /// Bound on waiting for a prompt after each command.
    pub command_timeout: Duration,

    /// Terminal width for PTY.
    pub terminal_width: u32,

    /// Terminal height for PTY.
    pub terminal_height: u32,

    /// Host key verification mode.
    pub host_key_verification: HostKeyVerification,

    /// Path to known_hosts file (None = ~/.ssh/known_hosts).
    pub known_hosts_path: Option<PathBuf>,
}

impl SshConfig {
    /// Get the socket address for connection.
    pub fn socket_addr(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(host: &str) -> SshConfig {
        SshConfig {
            host: host.to_string(),
            port: 22,
            username: "super_user".to_string(),
            password: SecretString::from("MyPassw0rd!".to_string()),
            connect_timeout: Duration::from_secs(15),
            command_timeout: Duration::from_secs(30),
            terminal_width: 511,
            terminal_height: 24,
            host_key_verification: HostKeyVerification::default(),
            known_hosts_path: None,
        }
    }

    #[test]
    fn test_socket_addr() {
        assert_eq!(config("192.168.0.2").socket_addr(), "192.168.0.2:22");
        assert_eq!(config("2001:db8::2").socket_addr(), "[2001:db8::2]:22");
    }

    #[test]
    fn test_password_not_in_debug_output() {
        let rendered = format!("{:?}", config("192.168.0.2"));
        assert!(!rendered.contains("MyPassw0rd!"));
    }

    #[test]
    fn test_host_key_mode_parsing() {
        assert_eq!(
            "strict".parse::<HostKeyVerification>().unwrap(),
            HostKeyVerification::Strict
        );
        assert_eq!(
            "accept-new".parse::<HostKeyVerification>().unwrap(),
            HostKeyVerification::AcceptNew
        );
        assert_eq!(
            "Disabled".parse::<HostKeyVerification>().unwrap(),
            HostKeyVerification::Disabled
        );
        assert!("sometimes".parse::<HostKeyVerification>().is_err());
    }
}
