//! Juniper JUNOS configuration session.
//!
//! Juniper uses a shared candidate configuration entered with `configure`.
//! Changes only take effect on `commit`; `rollback 0` throws the candidate
//! away, so a session that fails half way leaves the running config intact.

use log::{debug, warn};

use crate::driver::{ConfigSession, Driver, Response};
use crate::error::{DriverError, Result};

/// Output Junos prints when a commit succeeds.
const COMMIT_COMPLETE: &str = "commit complete";

/// Juniper JUNOS configuration session guard.
pub struct JuniperConfigSession<'a, D: Driver> {
    driver: &'a mut D,
    original_privilege: String,
    consumed: bool,
}

impl<'a, D: Driver> JuniperConfigSession<'a, D> {
    /// Enter Juniper configuration mode.
    pub async fn new(driver: &'a mut D) -> Result<Self> {
        let original_privilege = driver
            .current_privilege()
            .unwrap_or("exec")
            .to_string();

        debug!(
            "{}: entering configuration mode (from {:?})",
            driver.host(),
            original_privilege
        );

        driver.acquire_privilege("configuration").await?;

        Ok(Self {
            driver,
            original_privilege,
            consumed: false,
        })
    }

    /// Throw away the candidate and return to the original privilege.
    async fn discard(&mut self) -> Result<()> {
        debug!("{}: rollback 0", self.driver.host());
        self.driver.send_command("rollback 0").await?;
        self.driver
            .acquire_privilege(&self.original_privilege)
            .await
    }

    /// Send configuration lines in order, failing on the first one the
    /// device rejects.
    pub async fn send_configs<S>(&mut self, commands: &[S]) -> Result<Vec<Response>>
    where
        S: AsRef<str> + Sync,
    {
        self.driver.send_commands(commands).await
    }
}

impl<D: Driver> ConfigSession for JuniperConfigSession<'_, D> {
    async fn commit(mut self) -> Result<()> {
        debug!("{}: commit and-quit", self.driver.host());
        self.consumed = true;

        let response = self.driver.send_command("commit and-quit").await?;
        if !response.contains(COMMIT_COMPLETE) {
            // A failed commit leaves us in configuration mode with the
            // candidate still loaded
            if let Err(e) = self.discard().await {
                warn!("{}: discarding after failed commit: {}", self.driver.host(), e);
            }
            return Err(DriverError::CommitFailed {
                message: response.result.trim().replace('\n', " | "),
            }
            .into());
        }

        if self.driver.current_privilege() != Some(self.original_privilege.as_str()) {
            self.driver
                .acquire_privilege(&self.original_privilege)
                .await?;
        }

        Ok(())
    }

    async fn abort(mut self) -> Result<()> {
        self.consumed = true;
        self.discard().await
    }
}

impl<D: Driver> Drop for JuniperConfigSession<'_, D> {
    fn drop(&mut self) {
        if !self.consumed {
            warn!(
                "{}: configuration session dropped without commit or abort",
                self.driver.host()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::fake::FakeDriver;
    use crate::error::Error;

    const COMMIT_OK: &str = "commit complete\nExiting configuration mode";

    #[tokio::test]
    async fn test_commit_returns_to_exec() {
        let mut driver = FakeDriver::at_exec().reply("commit and-quit", COMMIT_OK);

        let mut session = JuniperConfigSession::new(&mut driver).await.unwrap();
        session
            .send_configs(&["set system services outbound-ssh client mist"])
            .await
            .unwrap();
        session.commit().await.unwrap();

        assert_eq!(
            driver.sent,
            [
                "configure",
                "set system services outbound-ssh client mist",
                "commit and-quit",
            ]
        );
        assert_eq!(driver.current_privilege(), Some("exec"));
    }

    #[tokio::test]
    async fn test_failed_commit_rolls_back() {
        let mut driver = FakeDriver::at_exec().reply(
            "commit and-quit",
            "error: configuration check-out failed\nerror: commit failed",
        );

        let session = JuniperConfigSession::new(&mut driver).await.unwrap();
        let err = session.commit().await.unwrap_err();

        match err {
            Error::Driver(DriverError::CommitFailed { message }) => {
                assert_eq!(
                    message,
                    "error: configuration check-out failed | error: commit failed"
                );
            }
            other => panic!("expected CommitFailed, got {other:?}"),
        }
        assert_eq!(
            driver.sent,
            [
                "configure",
                "commit and-quit",
                "rollback 0",
                "exit configuration-mode",
            ]
        );
        assert_eq!(driver.current_privilege(), Some("exec"));
    }

    #[tokio::test]
    async fn test_rejected_line_stops_the_batch() {
        let mut driver = FakeDriver::at_exec().reject("set bogus");

        let mut session = JuniperConfigSession::new(&mut driver).await.unwrap();
        let err = session
            .send_configs(&["set system host-name ex-01", "set bogus", "set never-sent"])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Driver(DriverError::CommandFailed { ref command, .. }) if command == "set bogus"
        ));
        session.abort().await.unwrap();

        assert_eq!(
            driver.sent,
            [
                "configure",
                "set system host-name ex-01",
                "set bogus",
                "rollback 0",
                "exit configuration-mode",
            ]
        );
    }
}
