use log::error;

use super::types::{ProvisioningOutcome, ProvisioningRequest};

pub const UPDATE_REJECTED_REASON: &str = "Stack updates are not supported";

/// Every update fails; the certificate keeps its physical id and nothing is called.
pub fn reject_update(request: &ProvisioningRequest) -> ProvisioningOutcome {
    error!(
        "[orchestrator] rejecting update of {}: {}",
        request.logical_resource_id, UPDATE_REJECTED_REASON
    );
    ProvisioningOutcome::failed(
        request.physical_resource_id.clone(),
        UPDATE_REJECTED_REASON,
    )
}
