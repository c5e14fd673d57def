use log::{error, info};

use crate::config::ProvisionerConfig;
use crate::domain::validate_host_names;
use crate::issuance::{
    CertificateRequester, Deprovisioner, DnsRecordManager, ValidationPoller, ValidationState,
};
use crate::providers::Collaborators;

use super::errors::{ProvisionError, RequestError};
use super::types::{
    CertificateHandle, Disposition, ProvisioningOutcome, ProvisioningRequest, RequestKind,
};
use super::update::reject_update;

/// Runs one invocation: dispatches the request and owns the completion signal.
pub struct ProvisioningOrchestrator {
    collaborators: Collaborators,
    config: ProvisionerConfig,
}

impl ProvisioningOrchestrator {
    pub fn new(collaborators: Collaborators, config: ProvisionerConfig) -> Self {
        Self {
            collaborators,
            config,
        }
    }

    /// Dispatches `request` and signals its outcome unless a continuation took over.
    ///
    /// Only a failure to deliver the signal itself is returned as an error; provisioning
    /// failures travel inside the signalled outcome.
    pub fn run(&self, request: &ProvisioningRequest) -> Result<Disposition, ProvisionError> {
        let disposition = self.dispatch(request);
        match &disposition {
            Disposition::Signal(outcome) => {
                info!(
                    "[orchestrator] signalling {:?} for {} ({})",
                    outcome.status,
                    request.logical_resource_id,
                    outcome.physical_id.as_deref().unwrap_or("no physical id")
                );
                self.collaborators
                    .signaler
                    .signal(request, outcome)
                    .map_err(|err| {
                        error!("[orchestrator] completion signal failed: {}", err);
                        ProvisionError::provider("send completion signal", err)
                    })?;
            }
            Disposition::HandedOff => {
                info!(
                    "[orchestrator] {} handed off; the continuation will signal completion",
                    request.logical_resource_id
                );
            }
        }
        Ok(disposition)
    }

    /// Decides the outcome of `request` without signalling it.
    ///
    /// Every error is converted into a FAILED outcome whose reason is the error text.
    pub fn dispatch(&self, request: &ProvisioningRequest) -> Disposition {
        info!(
            "[orchestrator] {} request for {} in stack {}",
            request.kind.as_str(),
            request.logical_resource_id,
            request.stack_id
        );
        match request.kind {
            RequestKind::Create => self.create(request),
            RequestKind::Update => Disposition::Signal(reject_update(request)),
            RequestKind::Delete => Disposition::Signal(self.delete(request)),
        }
    }

    fn create(&self, request: &ProvisioningRequest) -> Disposition {
        let mut issued: Option<CertificateHandle> = None;
        match self.try_create(request, &mut issued) {
            Ok(disposition) => disposition,
            Err(err) => {
                error!("[orchestrator] create failed: {}", err);
                // Reporting the certificate lets the stack rollback delete it.
                let physical_id = issued.map(|handle| handle.arn().to_string());
                Disposition::Signal(ProvisioningOutcome::failed(physical_id, err.to_string()))
            }
        }
    }

    fn try_create(
        &self,
        request: &ProvisioningRequest,
        issued: &mut Option<CertificateHandle>,
    ) -> Result<Disposition, ProvisionError> {
        validate_host_names(&request.host_names)?;
        if request.hosted_zone_id.trim().is_empty() {
            return Err(RequestError::MissingHostedZone.into());
        }
        let primary = request
            .primary_host()
            .ok_or(RequestError::MissingHostNames)?;

        let handle = CertificateRequester::new(&self.collaborators, &self.config)
            .request_certificate(
                primary,
                request.alternate_hosts(),
                &request.idempotency_token(),
            )?;
        *issued = Some(handle.clone());

        let records = DnsRecordManager::new(&self.collaborators, &self.config);
        let validation_records = records.fetch_validation_records(&handle)?;
        records.upsert_validation_records(&request.hosted_zone_id, &validation_records)?;

        let state = ValidationPoller::new(&self.collaborators, &self.config)
            .await_validation(&handle, request)?;
        Ok(match state {
            ValidationState::HandedOff => Disposition::HandedOff,
            ValidationState::Validated => {
                Disposition::Signal(ProvisioningOutcome::for_certificate(&handle))
            }
            ValidationState::Failed { reason } => Disposition::Signal(
                ProvisioningOutcome::for_unvalidated_certificate(&handle, reason),
            ),
        })
    }

    fn delete(&self, request: &ProvisioningRequest) -> ProvisioningOutcome {
        let physical_id = request.physical_resource_id.clone();
        match self.try_delete(request) {
            Ok(()) => ProvisioningOutcome::success(physical_id, Default::default()),
            Err(err) => {
                error!("[orchestrator] delete failed: {}", err);
                ProvisioningOutcome::failed(physical_id, err.to_string())
            }
        }
    }

    fn try_delete(&self, request: &ProvisioningRequest) -> Result<(), ProvisionError> {
        let physical_id = request
            .physical_resource_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or(RequestError::MissingPhysicalId("Delete"))?;
        Deprovisioner::new(&self.collaborators, &self.config)
            .deprovision(physical_id, &request.hosted_zone_id)
    }
}
