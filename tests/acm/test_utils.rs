use std::time::Duration;

use anyhow::{Result, anyhow};
use serde_json::{Value, json};

use acm_cert_provisioner::core::types::ProvisioningOutcome;
use acm_cert_provisioner::fakes::FakeWorld;
use acm_cert_provisioner::{
    Disposition, ProvisionerConfig, ProvisioningOrchestrator, ProvisioningRequest,
};

pub const ARN: &str = "arn:aws:acm:us-east-1:123456789012:certificate/4f1c2d7e";
pub const STACK_ID: &str =
    "arn:aws:cloudformation:us-east-1:123456789012:stack/web-tier/5b1e7a90-2f4d-11ef-9b21-0a1b2c3d4e5f";
pub const ZONE: &str = "Z1";

/// Lambda's maximum invocation time.
pub const FULL_BUDGET: Duration = Duration::from_secs(900);

pub fn event(request_type: &str, host_names: &[&str], physical_id: Option<&str>) -> Value {
    let mut event = json!({
        "RequestType": request_type,
        "ServiceToken": "arn:aws:lambda:us-east-1:123456789012:function:acm-cert-provisioner",
        "ResponseURL": "https://cloudformation-custom-resource-response-useast1.s3.amazonaws.com/presigned",
        "StackId": STACK_ID,
        "RequestId": "6a7c9e42-1d3b-4f5a-8c2e-9b0d1f3a5c7e",
        "LogicalResourceId": "SiteCertificate",
        "ResourceType": "Custom::ACMCertificate",
        "ResourceProperties": {
            "ServiceToken": "arn:aws:lambda:us-east-1:123456789012:function:acm-cert-provisioner",
            "HostNames": host_names,
            "HostedZoneId": ZONE
        }
    });
    if let Some(physical_id) = physical_id {
        event["PhysicalResourceId"] = json!(physical_id);
    }
    event
}

pub fn request(event: Value) -> Result<ProvisioningRequest> {
    Ok(ProvisioningRequest::from_payload(event)?)
}

/// Runs one invocation against `world` with `budget` of fresh invocation time.
pub fn invoke(
    world: &FakeWorld,
    budget: Duration,
    request: &ProvisioningRequest,
) -> Result<Disposition> {
    let orchestrator =
        ProvisioningOrchestrator::new(world.collaborators(budget), ProvisionerConfig::default());
    Ok(orchestrator.run(request)?)
}

/// The one and only completion signal sent so far.
pub fn single_outcome(world: &FakeWorld) -> Result<ProvisioningOutcome> {
    let outcomes = world.signaler.outcomes();
    match outcomes.as_slice() {
        [outcome] => Ok(outcome.clone()),
        other => Err(anyhow!("expected exactly one signal, got {}", other.len())),
    }
}
