//! Device session client: configure one switch over SSH.

use std::future::Future;

use log::{debug, info, warn};

use crate::config::SessionPolicy;
use crate::driver::{ConfigSession, Driver, GenericDriver};
use crate::error::{DriverError, Result, SessionError};
use crate::platform::vendors::juniper::{self, JuniperConfigSession};
use crate::records::CredentialRecord;
use crate::script::AdoptionScript;

/// What a successful session produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceReport {
    /// Chassis serial number, used as the cloud identifier.
    pub serial: String,

    /// Output of every command, in order.
    pub output: String,
}

/// Applies an adoption script to one device.
///
/// One call is one session and one attempt; retries are the caller's call.
pub trait SessionClient: Send + Sync {
    fn configure(
        &self,
        record: &CredentialRecord,
        script: &AdoptionScript,
    ) -> impl Future<Output = std::result::Result<DeviceReport, SessionError>> + Send;
}

/// Session client for Junos switches over SSH.
#[derive(Debug, Clone, Default)]
pub struct SshSessionClient {
    policy: SessionPolicy,
}

impl SshSessionClient {
    pub fn new(policy: SessionPolicy) -> Self {
        Self { policy }
    }
}

impl SessionClient for SshSessionClient {
    async fn configure(
        &self,
        record: &CredentialRecord,
        script: &AdoptionScript,
    ) -> std::result::Result<DeviceReport, SessionError> {
        let mut driver = GenericDriver::new(self.policy.ssh_config(record), juniper::platform());
        configure_with(&mut driver, record, script).await
    }
}

/// Run one session on `driver` and close it on every path, including a
/// failed open.
async fn configure_with<D: Driver>(
    driver: &mut D,
    record: &CredentialRecord,
    script: &AdoptionScript,
) -> std::result::Result<DeviceReport, SessionError> {
    let outcome = run_session(driver, record, script).await;

    if let Err(e) = driver.close().await {
        warn!("{}: error closing session: {}", record.ip, e);
    }

    outcome.map_err(SessionError::from)
}

/// Open, read the serial, then push and commit the script.
async fn run_session<D: Driver>(
    driver: &mut D,
    record: &CredentialRecord,
    script: &AdoptionScript,
) -> Result<DeviceReport> {
    driver.open().await?;
    info!("{}: connected as {}", record.ip, record.username);

    let mut output = String::new();

    let hardware = driver
        .send_command(juniper::SERIAL_COMMAND)
        .await?
        .into_result()?;
    let serial = juniper::parse_chassis_serial(&hardware.result)
        .ok_or(DriverError::Parse { what: "chassis serial number" })?;
    debug!("{}: serial {}", driver.host(), serial);
    output.push_str(&hardware.result);

    let mut session = JuniperConfigSession::new(driver).await?;

    match session.send_configs(script.commands()).await {
        Ok(responses) => {
            for response in responses {
                if !response.result.is_empty() {
                    output.push('\n');
                    output.push_str(&response.result);
                }
            }
        }
        Err(e) => {
            if let Err(abort_err) = session.abort().await {
                warn!("{}: rollback failed: {}", record.ip, abort_err);
            }
            return Err(e);
        }
    }

    session.commit().await?;

    Ok(DeviceReport { serial, output })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::fake::FakeDriver;
    use secrecy::SecretString;

    const HARDWARE: &str = "\
Hardware inventory:
Item             Version  Part number  Serial number     Description
Chassis                                JW3619260218      EX2300-C-12P";

    fn record() -> CredentialRecord {
        CredentialRecord {
            ip: "192.168.0.2".parse().unwrap(),
            username: "super_user".to_string(),
            password: SecretString::from("MyPassw0rd!".to_string()),
            row: 2,
        }
    }

    fn script() -> AdoptionScript {
        AdoptionScript::new([
            "set system services outbound-ssh client mist device-id abc",
            "set system services outbound-ssh client mist secret xyz",
        ])
    }

    #[tokio::test]
    async fn test_successful_session_commits_and_closes() {
        let mut driver = FakeDriver::default()
            .reply(juniper::SERIAL_COMMAND, HARDWARE)
            .reply("commit and-quit", "commit complete\nExiting configuration mode");

        let report = configure_with(&mut driver, &record(), &script()).await.unwrap();

        assert_eq!(report.serial, "JW3619260218");
        assert!(report.output.contains("EX2300-C-12P"));
        assert_eq!(
            driver.sent,
            [
                "show chassis hardware",
                "configure",
                "set system services outbound-ssh client mist device-id abc",
                "set system services outbound-ssh client mist secret xyz",
                "commit and-quit",
            ]
        );
        assert!(driver.closed);
    }

    #[tokio::test]
    async fn test_rejected_line_rolls_back_before_close() {
        let mut driver = FakeDriver::default()
            .reply(juniper::SERIAL_COMMAND, HARDWARE)
            .reply(
                "set system services outbound-ssh client mist device-id abc",
                "syntax error.",
            )
            .reject("set system services outbound-ssh client mist device-id abc");

        let err = configure_with(&mut driver, &record(), &script())
            .await
            .unwrap_err();

        assert!(matches!(err, SessionError::Command { .. }));
        assert!(err.to_string().contains("syntax error."));
        assert_eq!(
            driver.sent,
            [
                "show chassis hardware",
                "configure",
                "set system services outbound-ssh client mist device-id abc",
                "rollback 0",
                "exit configuration-mode",
            ]
        );
        assert!(driver.closed);
    }

    #[tokio::test]
    async fn test_failed_commit_is_command_error() {
        let mut driver = FakeDriver::default()
            .reply(juniper::SERIAL_COMMAND, HARDWARE)
            .reply("commit and-quit", "error: commit failed");

        let err = configure_with(&mut driver, &record(), &script())
            .await
            .unwrap_err();

        assert!(matches!(err, SessionError::Command { .. }));
        assert_eq!(
            driver.sent[driver.sent.len() - 3..],
            ["commit and-quit", "rollback 0", "exit configuration-mode"]
        );
        assert!(driver.closed);
    }

    #[tokio::test]
    async fn test_refused_login_still_closes() {
        let mut driver = FakeDriver {
            refuse_login: true,
            ..FakeDriver::default()
        };

        let err = configure_with(&mut driver, &record(), &script())
            .await
            .unwrap_err();

        assert!(matches!(err, SessionError::Authentication { .. }));
        assert!(driver.sent.is_empty());
        assert!(driver.closed);
    }

    #[tokio::test]
    async fn test_missing_serial_never_enters_configuration() {
        let mut driver =
            FakeDriver::default().reply(juniper::SERIAL_COMMAND, "Hardware inventory:");

        let err = configure_with(&mut driver, &record(), &script())
            .await
            .unwrap_err();

        assert!(matches!(err, SessionError::Command { .. }));
        assert_eq!(driver.sent, ["show chassis hardware"]);
        assert!(driver.closed);
    }
}
