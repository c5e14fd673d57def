use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use log::{error, info};

use acm_cert_provisioner::core::types::OutcomeStatus;
use acm_cert_provisioner::providers::AwsRuntime;
use acm_cert_provisioner::{
    Collaborators, Disposition, ProvisionerConfig, ProvisioningOrchestrator, ProvisioningRequest,
};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    if let Err(err) = run() {
        error!("[orchestrator] {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let event_path = std::env::args_os().nth(1).map(PathBuf::from);
    let bytes = read_event(event_path.as_ref())?;
    let request = ProvisioningRequest::from_slice(&bytes).context("Failed to parse event")?;
    info!("[orchestrator] received event: {}", request.redacted_payload());

    let config = ProvisionerConfig::from_env();
    let aws = AwsRuntime::load()?;
    let collaborators = Collaborators::aws(&aws, &config);

    match ProvisioningOrchestrator::new(collaborators, config).run(&request)? {
        Disposition::HandedOff => info!("[orchestrator] continuation dispatched"),
        Disposition::Signal(outcome) if outcome.status == OutcomeStatus::Failed => info!(
            "[orchestrator] reported failure: {}",
            outcome.reason.as_deref().unwrap_or("no reason")
        ),
        Disposition::Signal(_) => info!("[orchestrator] reported success"),
    }
    Ok(())
}

/// Reads the invocation event from `path`, or from stdin when no path is given.
fn read_event(path: Option<&PathBuf>) -> Result<Vec<u8>> {
    let bytes = match path {
        Some(path) => std::fs::read(path)
            .with_context(|| format!("Failed to read event file {}", path.display()))?,
        None => {
            let mut buffer = Vec::new();
            std::io::stdin()
                .read_to_end(&mut buffer)
                .context("Failed to read event from stdin")?;
            buffer
        }
    };
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(anyhow!("event is empty"));
    }
    Ok(bytes)
}
