//! SSH transport layer wrapping russh.
//!
//! Connection setup, host key checking, authentication and PTY channel
//! creation for a single device.

pub mod config;
mod ssh;

pub use config::{HostKeyVerification, SshConfig};
pub use ssh::SshTransport;
