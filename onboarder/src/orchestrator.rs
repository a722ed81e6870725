//! Batch orchestration.
//!
//! Every record walks its own small state machine:
//!
//! ```text
//! Pending -> Configuring -> Registering -> Done(Success)
//!               |               |
//!               v               v
//!   Done(ConnectionFailed |   Done(RegistrationFailed)
//!        ConfigFailed)
//! ```
//!
//! Records not started when the run is cancelled go straight from
//! `Pending` to `Done(Skipped)`. A failure is converted into an
//! [`OnboardingResult`] at this boundary and never stops the batch.

use std::fmt;
use std::net::IpAddr;

use futures_util::stream::{self, StreamExt};
use indexmap::IndexMap;
use log::{debug, error, info, warn};
use tokio::sync::watch;

use crate::client::SessionClient;
use crate::config::RetryPolicy;
use crate::error::{RegistrationError, SessionError};
use crate::records::CredentialRecord;
use crate::registrar::{Adoption, Registrar};
use crate::script::AdoptionScript;

/// Final outcome for one device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OnboardingStatus {
    Success,
    ConfigFailed,
    RegistrationFailed,
    ConnectionFailed,
    /// The run was cancelled before this device was contacted.
    Skipped,
}

impl OnboardingStatus {
    /// All statuses, in summary order.
    pub const ALL: [OnboardingStatus; 5] = [
        OnboardingStatus::Success,
        OnboardingStatus::ConfigFailed,
        OnboardingStatus::RegistrationFailed,
        OnboardingStatus::ConnectionFailed,
        OnboardingStatus::Skipped,
    ];

    pub fn is_success(self) -> bool {
        self == OnboardingStatus::Success
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OnboardingStatus::Success => "Success",
            OnboardingStatus::ConfigFailed => "ConfigFailed",
            OnboardingStatus::RegistrationFailed => "RegistrationFailed",
            OnboardingStatus::ConnectionFailed => "ConnectionFailed",
            OnboardingStatus::Skipped => "Skipped",
        }
    }
}

impl fmt::Display for OnboardingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&SessionError> for OnboardingStatus {
    fn from(err: &SessionError) -> Self {
        match err {
            SessionError::Connection { .. } | SessionError::Authentication { .. } => {
                OnboardingStatus::ConnectionFailed
            }
            SessionError::Command { .. } => OnboardingStatus::ConfigFailed,
        }
    }
}

/// Outcome record for one device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnboardingResult {
    pub ip: IpAddr,
    pub status: OnboardingStatus,
    /// Human-readable detail: the adoption id or the error.
    pub detail: String,
}

/// Where a record is in its workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Pending,
    Configuring,
    Registering,
    Done(OnboardingStatus),
}

impl Stage {
    /// Whether `next` is a legal forward step from here.
    pub fn can_advance_to(self, next: Stage) -> bool {
        use OnboardingStatus::*;
        match (self, next) {
            (Stage::Pending, Stage::Configuring) => true,
            (Stage::Pending, Stage::Done(Skipped)) => true,
            (Stage::Configuring, Stage::Registering) => true,
            (Stage::Configuring, Stage::Done(ConnectionFailed | ConfigFailed)) => true,
            (Stage::Registering, Stage::Done(Success | RegistrationFailed)) => true,
            _ => false,
        }
    }
}

/// One record's state machine.
struct DeviceRun {
    ip: IpAddr,
    stage: Stage,
}

impl DeviceRun {
    fn new(ip: IpAddr) -> Self {
        Self {
            ip,
            stage: Stage::Pending,
        }
    }

    fn advance(&mut self, next: Stage) {
        debug_assert!(
            self.stage.can_advance_to(next),
            "illegal transition {:?} -> {:?}",
            self.stage,
            next
        );
        debug!("{}: {:?} -> {:?}", self.ip, self.stage, next);
        self.stage = next;
    }

    fn finish(mut self, status: OnboardingStatus, detail: String) -> OnboardingResult {
        self.advance(Stage::Done(status));
        match status {
            OnboardingStatus::Success => info!("{}: onboarded ({})", self.ip, detail),
            OnboardingStatus::Skipped => warn!("{}: skipped ({})", self.ip, detail),
            _ => error!("{}: {} - {}", self.ip, status, detail),
        }
        OnboardingResult {
            ip: self.ip,
            status,
            detail,
        }
    }
}

/// Per-status counts for a finished batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    counts: IndexMap<OnboardingStatus, usize>,
}

impl RunSummary {
    pub fn from_results(results: &[OnboardingResult]) -> Self {
        let mut counts: IndexMap<OnboardingStatus, usize> =
            OnboardingStatus::ALL.iter().map(|s| (*s, 0)).collect();
        for result in results {
            *counts.entry(result.status).or_insert(0) += 1;
        }
        Self { counts }
    }

    pub fn count(&self, status: OnboardingStatus) -> usize {
        self.counts.get(&status).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    /// Devices that did not end in `Success`.
    pub fn failures(&self) -> usize {
        self.total() - self.count(OnboardingStatus::Success)
    }

    /// True for an empty batch as well.
    pub fn all_succeeded(&self) -> bool {
        self.failures() == 0
    }

    /// Process exit code for this batch: 0 or 1.
    pub fn exit_code(&self) -> u8 {
        if self.all_succeeded() { 0 } else { 1 }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (status, count) in &self.counts {
            if *status == OnboardingStatus::Skipped && *count == 0 {
                continue;
            }
            if !first {
                writeln!(f)?;
            }
            write!(f, "{status}: {count}")?;
            first = false;
        }
        Ok(())
    }
}

/// Everything a finished run produced.
#[derive(Debug, Clone)]
pub struct BatchReport {
    /// One entry per input record, in input order.
    pub results: Vec<OnboardingResult>,
    pub summary: RunSummary,
}

impl BatchReport {
    fn new(results: Vec<OnboardingResult>) -> Self {
        let summary = RunSummary::from_results(&results);
        Self { results, summary }
    }

    pub fn successful(&self) -> impl Iterator<Item = &OnboardingResult> {
        self.results.iter().filter(|r| r.status.is_success())
    }

    pub fn failed(&self) -> impl Iterator<Item = &OnboardingResult> {
        self.results.iter().filter(|r| !r.status.is_success())
    }

    pub fn exit_code(&self) -> u8 {
        self.summary.exit_code()
    }
}

/// Drives every record through configure then adopt.
pub struct Orchestrator<C, R> {
    client: C,
    registrar: R,
    retry: RetryPolicy,
    concurrency: usize,
}

impl<C: SessionClient, R: Registrar> Orchestrator<C, R> {
    pub fn new(client: C, registrar: R, retry: RetryPolicy, concurrency: usize) -> Self {
        Self {
            client,
            registrar,
            retry,
            concurrency: concurrency.max(1),
        }
    }

    /// Onboard every record; never fails as a whole.
    ///
    /// Up to `concurrency` devices are in flight at once. Results come back
    /// in input order regardless. Once `cancel` reads `true`, records not
    /// yet started are reported as [`OnboardingStatus::Skipped`].
    pub async fn run(
        &self,
        records: &[CredentialRecord],
        script: &AdoptionScript,
        cancel: watch::Receiver<bool>,
    ) -> BatchReport {
        info!(
            "Onboarding {} device(s), {} at a time",
            records.len(),
            self.concurrency
        );

        let results: Vec<OnboardingResult> = stream::iter(records)
            .map(|record| {
                let cancel = cancel.clone();
                async move { self.onboard(record, script, &cancel).await }
            })
            .buffered(self.concurrency)
            .collect()
            .await;

        BatchReport::new(results)
    }

    async fn onboard(
        &self,
        record: &CredentialRecord,
        script: &AdoptionScript,
        cancel: &watch::Receiver<bool>,
    ) -> OnboardingResult {
        let mut run = DeviceRun::new(record.ip);

        if *cancel.borrow() {
            return run.finish(OnboardingStatus::Skipped, "run cancelled".to_string());
        }

        run.advance(Stage::Configuring);
        info!("{}: configuring (row {})", record.ip, record.row);

        let report = match self.client.configure(record, script).await {
            Ok(report) => report,
            Err(e) => return run.finish(OnboardingStatus::from(&e), e.to_string()),
        };

        run.advance(Stage::Registering);
        info!("{}: registering serial {}", record.ip, report.serial);

        match self.adopt_with_retry(record.ip, &report.serial).await {
            Ok(adoption) => run.finish(
                OnboardingStatus::Success,
                format!("serial {} adopted as {}", report.serial, adoption.device_id),
            ),
            Err(e) => run.finish(OnboardingStatus::RegistrationFailed, e.to_string()),
        }
    }

    async fn adopt_with_retry(
        &self,
        ip: IpAddr,
        identifier: &str,
    ) -> Result<Adoption, RegistrationError> {
        let mut attempt = 0;
        loop {
            match self.registrar.adopt(identifier).await {
                Err(e) if e.is_transient() && attempt < self.retry.retries => {
                    attempt += 1;
                    let delay = self.retry.delay(attempt);
                    warn!("{}: {}; retrying in {:?}", ip, e, delay);
                    tokio::time::sleep(delay).await;
                }
                outcome => return outcome,
            }
        }
    }
}
