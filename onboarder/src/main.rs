//! `onboarder` binary.
//!
//! Exit status: 0 when every device was onboarded (or the CSV had none),
//! 1 when at least one device failed, 2 when the run could not start.

use std::future::Future;
use std::io;
use std::process::ExitCode;

use clap::Parser;
use log::{error, info, warn};
use tokio::sync::watch;

use onboarder::cli::Args;
use onboarder::client::SshSessionClient;
use onboarder::config::OnboardConfig;
use onboarder::error::OnboardError;
use onboarder::orchestrator::{BatchReport, Orchestrator};
use onboarder::records;
use onboarder::registrar::MistRegistrar;
use onboarder::script::AdoptionScript;

const EXIT_FATAL: u8 = 2;

/// Conventional status for a process killed by SIGINT.
const EXIT_INTERRUPTED: i32 = 130;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    env_logger::Builder::from_env(env_logger::Env::default())
        .filter_level(args.log_level.into())
        .init();

    match run(args).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            error!("{e}");
            ExitCode::from(EXIT_FATAL)
        }
    }
}

async fn run(args: Args) -> Result<u8, OnboardError> {
    let csv = args.csv.clone();
    let OnboardConfig {
        org,
        session,
        retry,
        api_timeout,
        concurrency,
        commands_file,
    } = args.into_config()?;

    let records = records::load_path(&csv)?;
    info!("Loaded {} device(s) from {}", records.len(), csv.display());

    info!("Target organization {} at {}", org.org_id, org.api_url);
    let registrar = MistRegistrar::new(org, api_timeout)?;

    let script = if records.is_empty() {
        AdoptionScript::default()
    } else if let Some(path) = commands_file {
        info!("Using adoption commands from {}", path.display());
        AdoptionScript::from_file(path)?
    } else {
        registrar.fetch_adoption_script().await?
    };

    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if watch_interrupts(tokio::signal::ctrl_c, cancel_tx).await {
            warn!("Interrupted again: exiting without waiting for devices in progress");
            std::process::exit(EXIT_INTERRUPTED);
        }
    });

    let orchestrator =
        Orchestrator::new(SshSessionClient::new(session), registrar, retry, concurrency);
    let report = orchestrator.run(&records, &script, cancel_rx).await;

    log_report(&report);
    Ok(report.exit_code())
}

/// First interrupt cancels the batch. Returns `true` once a second one
/// arrives.
async fn watch_interrupts<F, Fut>(mut interrupted: F, cancel: watch::Sender<bool>) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = io::Result<()>>,
{
    if interrupted().await.is_err() {
        return false;
    }
    warn!("Interrupted: finishing devices in progress, skipping the rest (Ctrl-C again to exit)");
    let _ = cancel.send(true);

    interrupted().await.is_ok()
}

fn log_report(report: &BatchReport) {
    for line in report.summary.to_string().lines() {
        info!("{line}");
    }

    let successful: Vec<String> = report.successful().map(|r| r.ip.to_string()).collect();
    if !successful.is_empty() {
        info!("Onboarded: {}", successful.join(", "));
    }

    for result in report.failed() {
        warn!("Failed: {} ({}: {})", result.ip, result.status, result.detail);
    }
}
