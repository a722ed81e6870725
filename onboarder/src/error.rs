//! Error types for onboarder.
//!
//! The SSH stack (transport, channel, driver) has its own layered [`Error`].
//! The onboarding workflow speaks a closed taxonomy on top of it:
//! [`InputError`] for the CSV stage, [`SessionError`] for device sessions,
//! [`RegistrationError`] for the cloud API and [`OnboardError`] for anything
//! that aborts the whole run.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Error type for the SSH stack.
#[derive(Error, Debug)]
pub enum Error {
    /// SSH transport-level errors
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Channel operation errors
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    /// Driver-level errors
    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),
}

/// Transport layer errors (SSH connection, authentication).
#[derive(Error, Debug)]
pub enum TransportError {
    /// Failed to connect to host
    #[error("Connection failed to {host}:{port}: {source}")]
    ConnectionFailed {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },

    /// SSH handshake or protocol error
    #[error("SSH error: {0}")]
    Ssh(#[from] russh::Error),

    /// Authentication failed
    #[error("Authentication failed for user '{user}'")]
    AuthenticationFailed { user: String },

    /// Host is not in known_hosts and verification is strict
    #[error("Host key for {host}:{port} is not in known_hosts")]
    HostKeyUnknown { host: String, port: u16 },

    /// Host key does not match the one recorded in known_hosts
    #[error("Host key for {host}:{port} changed (known_hosts line {line})")]
    HostKeyChanged { host: String, port: u16, line: usize },

    /// known_hosts could not be read or written
    #[error("known_hosts error: {0}")]
    KnownHosts(String),

    /// Operation timed out
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),
}

/// Channel layer errors (pattern matching, PTY operations).
#[derive(Error, Debug)]
pub enum ChannelError {
    /// Pattern matching timed out
    #[error("Prompt not found within {0:?}")]
    PatternTimeout(Duration),

    /// Channel closed unexpectedly
    #[error("Channel closed")]
    Closed,

    /// SSH protocol error on the channel
    #[error("Channel SSH error: {0}")]
    Ssh(russh::Error),
}

/// Driver layer errors (command execution, privilege changes).
#[derive(Error, Debug)]
pub enum DriverError {
    /// Driver not connected
    #[error("Session not open - call open() first")]
    NotConnected,

    /// Driver already connected
    #[error("Session already open")]
    AlreadyConnected,

    /// The device reported an error for a command
    #[error("Command '{command}' failed: {message}")]
    CommandFailed { command: String, message: String },

    /// Commit did not report success
    #[error("Commit failed: {message}")]
    CommitFailed { message: String },

    /// Failed to acquire target privilege level
    #[error("Failed to acquire privilege level '{target}'")]
    PrivilegeAcquisitionFailed { target: String },

    /// Unknown privilege level detected
    #[error("Unknown privilege level from prompt: '{prompt}'")]
    UnknownPrivilege { prompt: String },

    /// No path found between privilege levels
    #[error("No path from privilege '{from}' to '{to}'")]
    NoPrivilegePath { from: String, to: String },

    /// Expected data was missing from command output
    #[error("Could not parse {what} from device output")]
    Parse { what: &'static str },
}

/// Result type alias using the SSH stack's Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while loading the credentials CSV. Always fatal.
#[derive(Error, Debug)]
pub enum InputError {
    /// The CSV file could not be opened
    #[error("Cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The header is missing or lacks required columns
    #[error("Malformed input: {message}")]
    MalformedInput { message: String },

    /// A data row is unusable
    #[error("Invalid row {row}: {message}")]
    InvalidRow { row: u64, message: String },
}

/// Per-device session failures.
#[derive(Error, Debug)]
pub enum SessionError {
    /// Host unreachable, port closed, timeout or dropped session
    #[error("connection error: {message}")]
    Connection { message: String },

    /// Credentials rejected by the device
    #[error("authentication error: {message}")]
    Authentication { message: String },

    /// The device reported an error while configuring
    #[error("command error: {message}")]
    Command { message: String },
}

impl From<Error> for SessionError {
    fn from(err: Error) -> Self {
        let message = err.to_string();
        match err {
            Error::Transport(TransportError::AuthenticationFailed { .. }) => {
                SessionError::Authentication { message }
            }
            Error::Transport(
                TransportError::ConnectionFailed { .. }
                | TransportError::Ssh(_)
                | TransportError::HostKeyUnknown { .. }
                | TransportError::HostKeyChanged { .. }
                | TransportError::KnownHosts(_)
                | TransportError::Timeout(_),
            ) => SessionError::Connection { message },
            Error::Channel(_) => SessionError::Connection { message },
            Error::Driver(DriverError::NotConnected) => SessionError::Connection { message },
            Error::Driver(
                DriverError::AlreadyConnected
                | DriverError::CommandFailed { .. }
                | DriverError::CommitFailed { .. }
                | DriverError::PrivilegeAcquisitionFailed { .. }
                | DriverError::UnknownPrivilege { .. }
                | DriverError::NoPrivilegePath { .. }
                | DriverError::Parse { .. },
            ) => SessionError::Command { message },
        }
    }
}

/// Cloud registration failures.
#[derive(Error, Debug)]
pub enum RegistrationError {
    /// Token rejected
    #[error("API token rejected (HTTP {status})")]
    Auth { status: u16 },

    /// Organization (or endpoint) does not exist
    #[error("not found: {message}")]
    NotFound { message: String },

    /// Device already claimed
    #[error("device '{identifier}' is already claimed")]
    Conflict { identifier: String },

    /// Network failure, timeout, throttling or server error
    #[error("transient failure: {message}")]
    Transient { message: String },

    /// Nothing to adopt
    #[error("device identifier must not be empty")]
    EmptyIdentifier,

    /// Any other unexpected response
    #[error("rejected (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },
}

impl RegistrationError {
    /// Whether a retry may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, RegistrationError::Transient { .. })
    }
}

/// Invalid run configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("API token must not be empty")]
    EmptyToken,

    #[error("organization id must not be empty")]
    EmptyOrgId,

    #[error("API URL must start with http:// or https://, got '{url}'")]
    InvalidApiUrl { url: String },

    #[error("API token contains characters not allowed in an HTTP header")]
    InvalidToken,

    #[error("concurrency must be at least 1")]
    ZeroConcurrency,

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Errors that abort the whole run before any device is contacted.
#[derive(Error, Debug)]
pub enum OnboardError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Input(#[from] InputError),

    #[error("could not get adoption commands: {0}")]
    Script(#[from] RegistrationError),

    #[error("cannot read command file {}: {source}", path.display())]
    ScriptFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("adoption script is empty")]
    EmptyScript,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_failure_classified_as_authentication() {
        let err: Error = TransportError::AuthenticationFailed {
            user: "super_user".to_string(),
        }
        .into();
        assert!(matches!(
            SessionError::from(err),
            SessionError::Authentication { .. }
        ));
    }

    #[test]
    fn test_timeouts_classified_as_connection() {
        let err: Error = TransportError::Timeout(Duration::from_secs(15)).into();
        assert!(matches!(
            SessionError::from(err),
            SessionError::Connection { .. }
        ));

        let err: Error = ChannelError::PatternTimeout(Duration::from_secs(30)).into();
        assert!(matches!(
            SessionError::from(err),
            SessionError::Connection { .. }
        ));
    }

    #[test]
    fn test_device_errors_classified_as_command() {
        let err: Error = DriverError::CommandFailed {
            command: "set foo".to_string(),
            message: "syntax error".to_string(),
        }
        .into();
        let classified = SessionError::from(err);
        assert!(matches!(classified, SessionError::Command { .. }));
        assert!(classified.to_string().contains("syntax error"));
    }

    #[test]
    fn test_only_transient_is_retryable() {
        assert!(
            RegistrationError::Transient {
                message: "503".to_string()
            }
            .is_transient()
        );
        assert!(!RegistrationError::Auth { status: 401 }.is_transient());
        assert!(
            !RegistrationError::Conflict {
                identifier: "JW3619260218".to_string()
            }
            .is_transient()
        );
    }
}
