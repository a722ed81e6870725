//! Command line interface.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use log::LevelFilter;

use crate::config::{DEFAULT_API_URL, OnboardConfig, OrgContext, RetryPolicy, SessionPolicy};
use crate::error::ConfigError;
use crate::transport::HostKeyVerification;

/// Log verbosity accepted by `-l`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    #[value(name = "ERROR")]
    Error,
    #[value(name = "WARNING", alias = "WARN")]
    Warning,
    #[default]
    #[value(name = "INFO")]
    Info,
    #[value(name = "DEBUG")]
    Debug,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warning => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
        }
    }
}

/// Bulk-onboard Juniper switches into a Mist organization
#[derive(Parser)]
#[command(name = "onboarder")]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Mist API token
    #[arg(short = 't', long = "token", env = "MIST_API_TOKEN", hide_env_values = true)]
    pub token: String,

    /// Mist organization id
    #[arg(short = 'o', long = "org_id")]
    pub org_id: String,

    /// CSV file with ip,username,password columns
    #[arg(short = 'c', long = "csv")]
    pub csv: PathBuf,

    /// Log level
    #[arg(
        short = 'l',
        long = "log_level",
        value_enum,
        ignore_case = true,
        default_value_t = LogLevel::Info
    )]
    pub log_level: LogLevel,

    /// Mist API base URL
    #[arg(long, default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Read the adoption commands from this file instead of the cloud
    #[arg(long, value_name = "FILE")]
    pub commands: Option<PathBuf>,

    /// SSH port
    #[arg(long, default_value_t = 22)]
    pub port: u16,

    /// SSH connect timeout, in seconds
    #[arg(long, value_name = "SECS", default_value_t = 15)]
    pub connect_timeout: u64,

    /// Per-command timeout, in seconds
    #[arg(long, value_name = "SECS", default_value_t = 30)]
    pub command_timeout: u64,

    /// Cloud API request timeout, in seconds
    #[arg(long, value_name = "SECS", default_value_t = 30)]
    pub api_timeout: u64,

    /// Retries for transient registration failures
    #[arg(long, default_value_t = 1)]
    pub retries: u32,

    /// Delay before the first registration retry, in milliseconds
    #[arg(long, value_name = "MS", default_value_t = 2000)]
    pub retry_backoff_ms: u64,

    /// Devices onboarded in parallel
    #[arg(long, default_value_t = 1)]
    pub concurrency: usize,

    /// Host key verification: strict, accept-new or disabled
    #[arg(long, value_name = "MODE", default_value = "accept-new")]
    pub host_key: HostKeyVerification,

    /// known_hosts file (default ~/.ssh/known_hosts)
    #[arg(long, value_name = "FILE")]
    pub known_hosts: Option<PathBuf>,
}

impl fmt::Debug for Args {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Args")
            .field("token", &"<redacted>")
            .field("org_id", &self.org_id)
            .field("csv", &self.csv)
            .field("log_level", &self.log_level)
            .field("api_url", &self.api_url)
            .field("commands", &self.commands)
            .field("concurrency", &self.concurrency)
            .finish_non_exhaustive()
    }
}

impl Args {
    /// Build the validated run configuration.
    pub fn into_config(self) -> Result<OnboardConfig, ConfigError> {
        let org = OrgContext::with_api_url(self.token, self.org_id, self.api_url)?;

        OnboardConfig {
            org,
            session: SessionPolicy {
                port: self.port,
                connect_timeout: Duration::from_secs(self.connect_timeout),
                command_timeout: Duration::from_secs(self.command_timeout),
                host_key_verification: self.host_key,
                known_hosts_path: self.known_hosts,
            },
            retry: RetryPolicy {
                retries: self.retries,
                backoff: Duration::from_millis(self.retry_backoff_ms),
            },
            api_timeout: Duration::from_secs(self.api_timeout),
            concurrency: self.concurrency,
            commands_file: self.commands,
        }
        .validate()
    }
}
