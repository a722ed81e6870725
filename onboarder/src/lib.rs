//! # onboarder
//!
//! Bulk onboarding of Juniper switches into a Mist cloud organization.
//!
//! For every row of a credentials CSV the tool logs into the switch over
//! SSH, pushes the organization's adoption commands, commits them and then
//! claims the switch in the organization's inventory. One bad device never
//! stops the batch; each ends with an [`OnboardingStatus`].
//!
//! ## Layout
//!
//! - [`records`]: CSV loading
//! - [`client`]: one SSH session per device, on top of the in-crate SSH
//!   stack ([`transport`], [`channel`], [`driver`], [`platform`])
//! - [`registrar`]: the cloud API
//! - [`orchestrator`]: the per-device state machine and run summary
//! - [`config`] and [`cli`]: run configuration
//!
//! ## Example
//!
//! ```rust,no_run
//! use onboarder::{
//!     AdoptionScript, MistRegistrar, OnboardConfig, Orchestrator, OrgContext, SshSessionClient,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = OnboardConfig::new(OrgContext::new("api-token", "org-id")?).validate()?;
//!     let records = onboarder::records::load_path("switches.csv")?;
//!
//!     let registrar = MistRegistrar::new(config.org, config.api_timeout)?;
//!     let script: AdoptionScript = registrar.fetch_adoption_script().await?;
//!
//!     let (_cancel_tx, cancel_rx) = tokio::sync::watch::channel(false);
//!     let orchestrator = Orchestrator::new(
//!         SshSessionClient::new(config.session),
//!         registrar,
//!         config.retry,
//!         config.concurrency,
//!     );
//!
//!     let report = orchestrator.run(&records, &script, cancel_rx).await;
//!     println!("{}", report.summary);
//!     Ok(())
//! }
//! ```

pub mod channel;
pub mod cli;
pub mod client;
pub mod config;
pub mod driver;
pub mod error;
pub mod orchestrator;
pub mod platform;
pub mod records;
pub mod registrar;
pub mod script;
pub mod transport;

// Re-export main types for convenience
pub use client::{DeviceReport, SessionClient, SshSessionClient};
pub use config::{OnboardConfig, OrgContext, RetryPolicy, SessionPolicy};
pub use driver::{ConfigSession, Driver, GenericDriver, Response};
pub use error::{Error, InputError, OnboardError, RegistrationError, SessionError};
pub use orchestrator::{BatchReport, OnboardingResult, OnboardingStatus, Orchestrator, RunSummary};
pub use platform::{PlatformDefinition, PrivilegeLevel};
pub use records::CredentialRecord;
pub use registrar::{Adoption, MistRegistrar, Registrar};
pub use script::AdoptionScript;
pub use transport::{HostKeyVerification, SshConfig};
