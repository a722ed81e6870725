//! Run configuration.
//!
//! Built once at startup and passed explicitly to the session client,
//! registrar and orchestrator.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

use crate::error::ConfigError;
use crate::records::CredentialRecord;
use crate::transport::{HostKeyVerification, SshConfig};

/// Default Mist API base URL.
pub const DEFAULT_API_URL: &str = "https://api.mist.com/api/v1";

/// The cloud organization devices are adopted into.
pub struct OrgContext {
    /// API token. Never logged.
    pub token: SecretString,

    /// Target organization id.
    pub org_id: String,

    /// API base URL, without a trailing slash.
    pub api_url: String,
}

impl OrgContext {
    /// Create an org context against the default API URL.
    pub fn new(token: impl Into<String>, org_id: impl Into<String>) -> Result<Self, ConfigError> {
        Self::with_api_url(token, org_id, DEFAULT_API_URL)
    }

    /// Create an org context against a specific API URL.
    pub fn with_api_url(
        token: impl Into<String>,
        org_id: impl Into<String>,
        api_url: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let token = token.into();
        let org_id = org_id.into().trim().to_string();
        let api_url = api_url.into().trim().trim_end_matches('/').to_string();

        if token.trim().is_empty() {
            return Err(ConfigError::EmptyToken);
        }
        if org_id.is_empty() {
            return Err(ConfigError::EmptyOrgId);
        }
        if !(api_url.starts_with("http://") || api_url.starts_with("https://")) {
            return Err(ConfigError::InvalidApiUrl { url: api_url });
        }

        Ok(Self {
            token: SecretString::from(token.trim().to_string()),
            org_id,
            api_url,
        })
    }
}

impl fmt::Debug for OrgContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrgContext")
            .field("token", &"<redacted>")
            .field("org_id", &self.org_id)
            .field("api_url", &self.api_url)
            .finish()
    }
}

/// How device sessions are opened.
#[derive(Debug, Clone)]
pub struct SessionPolicy {
    /// SSH port.
    pub port: u16,

    /// Bound on TCP connect, handshake and authentication.
    pub connect_timeout: Duration,

    /// Bound on waiting for the prompt after each command.
    pub command_timeout: Duration,

    /// Host key verification mode.
    pub host_key_verification: HostKeyVerification,

    /// known_hosts file (None = ~/.ssh/known_hosts).
    pub known_hosts_path: Option<PathBuf>,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            port: 22,
            connect_timeout: Duration::from_secs(15),
            command_timeout: Duration::from_secs(30),
            host_key_verification: HostKeyVerification::default(),
            known_hosts_path: None,
        }
    }
}

impl SessionPolicy {
    /// SSH configuration for one device.
    pub fn ssh_config(&self, record: &CredentialRecord) -> SshConfig {
        SshConfig {
            host: record.ip.to_string(),
            port: self.port,
            username: record.username.clone(),
            password: SecretString::from(record.password.expose_secret().to_string()),
            connect_timeout: self.connect_timeout,
            command_timeout: self.command_timeout,
            terminal_width: 511,
            terminal_height: 24,
            host_key_verification: self.host_key_verification,
            known_hosts_path: self.known_hosts_path.clone(),
        }
    }
}

/// Retry policy for transient registration failures.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Extra attempts after the first one.
    pub retries: u32,

    /// Delay before the first retry; grows linearly with each attempt.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 1,
            backoff: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// Policy that never retries.
    pub fn none() -> Self {
        Self {
            retries: 0,
            backoff: Duration::ZERO,
        }
    }

    /// Delay before retry number `attempt` (1-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        self.backoff.saturating_mul(attempt)
    }
}

/// Everything a run needs, validated.
#[derive(Debug)]
pub struct OnboardConfig {
    pub org: OrgContext,
    pub session: SessionPolicy,
    pub retry: RetryPolicy,

    /// Timeout for each cloud API request.
    pub api_timeout: Duration,

    /// Devices processed at the same time.
    pub concurrency: usize,

    /// Local adoption script; fetched from the cloud when None.
    pub commands_file: Option<PathBuf>,
}

impl OnboardConfig {
    /// Config with default policies.
    pub fn new(org: OrgContext) -> Self {
        Self {
            org,
            session: SessionPolicy::default(),
            retry: RetryPolicy::default(),
            api_timeout: Duration::from_secs(30),
            concurrency: 1,
            commands_file: None,
        }
    }

    /// Check the invariants the constructors cannot.
    pub fn validate(self) -> Result<Self, ConfigError> {
        if self.concurrency == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_org_context_rejects_empty_values() {
        assert!(matches!(
            OrgContext::new("  ", "org-1"),
            Err(ConfigError::EmptyToken)
        ));
        assert!(matches!(
            OrgContext::new("secret-token", ""),
            Err(ConfigError::EmptyOrgId)
        ));
        assert!(matches!(
            OrgContext::with_api_url("secret-token", "org-1", "api.mist.com"),
            Err(ConfigError::InvalidApiUrl { .. })
        ));
    }

    #[test]
    fn test_org_context_normalizes_url() {
        let org =
            OrgContext::with_api_url("secret-token", "org-1", "https://api.eu.mist.com/api/v1/")
                .unwrap();
        assert_eq!(org.api_url, "https://api.eu.mist.com/api/v1");
        assert_eq!(OrgContext::new("t", "o").unwrap().api_url, DEFAULT_API_URL);
    }

    #[test]
    fn test_token_is_redacted() {
        let org = OrgContext::new("secret-token", "org-1").unwrap();
        let rendered = format!("{:?}", OnboardConfig::new(org));
        assert!(!rendered.contains("secret-token"));
        assert!(rendered.contains("org-1"));
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let mut config = OnboardConfig::new(OrgContext::new("t", "o").unwrap());
        config.concurrency = 0;
        assert!(matches!(config.validate(), Err(ConfigError::ZeroConcurrency)));
    }

    #[test]
    fn test_retry_delay_is_linear() {
        let policy = RetryPolicy {
            retries: 3,
            backoff: Duration::from_millis(500),
        };
        assert_eq!(policy.delay(1), Duration::from_millis(500));
        assert_eq!(policy.delay(2), Duration::from_secs(1));
        assert_eq!(RetryPolicy::none().retries, 0);
    }

    #[test]
    fn test_huge_backoff_saturates() {
        let policy = RetryPolicy {
            retries: 2,
            backoff: Duration::from_millis(u64::MAX),
        };
        assert_eq!(policy.delay(2), Duration::MAX);
    }
}
