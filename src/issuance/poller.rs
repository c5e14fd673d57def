use log::{error, info, warn};

use crate::config::ProvisionerConfig;
use crate::core::errors::ProvisionError;
use crate::core::types::{CertificateDetails, CertificateHandle, ProvisioningRequest};
use crate::providers::Collaborators;

use super::retry::{Finished, Step, retry_with_policy};

const OPERATION: &str = "await validation";

/// Where validation polling left the certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationState {
    Validated,
    Failed { reason: String },
    /// A continuation now owns the wait and the completion signal.
    HandedOff,
}

/// Polls the authority until every domain leaves `PENDING_VALIDATION`.
///
/// The runtime kills an invocation at its deadline. Before that happens the poller
/// dispatches a continuation with the original request and stops. The continuation
/// re-runs every earlier step (request, records, publish), all idempotent, and resumes
/// polling with a fresh budget.
pub struct ValidationPoller<'a> {
    collaborators: &'a Collaborators,
    config: &'a ProvisionerConfig,
}

impl<'a> ValidationPoller<'a> {
    pub fn new(collaborators: &'a Collaborators, config: &'a ProvisionerConfig) -> Self {
        Self {
            collaborators,
            config,
        }
    }

    pub fn await_validation(
        &self,
        handle: &CertificateHandle,
        request: &ProvisioningRequest,
    ) -> Result<ValidationState, ProvisionError> {
        let finished = retry_with_policy(
            self.collaborators.clock.as_ref(),
            self.collaborators.budget.as_ref(),
            &self.config.validation_policy(),
            OPERATION,
            |attempt| {
                let details = self
                    .collaborators
                    .authority
                    .describe_certificate(handle)
                    .map_err(|err| ProvisionError::provider("describe certificate", err))?;
                let pending = details.pending_domains();
                if pending.is_empty() {
                    return Ok(Step::Ready(details));
                }
                info!(
                    "[poller] waiting for validation of {} (attempt {})",
                    pending.join(", "),
                    attempt
                );
                Ok(Step::Retry(format!("pending: {}", pending.join(", "))))
            },
        )?;

        match finished {
            Finished::Ready(details) => Ok(evaluate(&details)),
            Finished::OutOfBudget { attempts } => {
                self.hand_off(request, attempts)?;
                Ok(ValidationState::HandedOff)
            }
        }
    }

    fn hand_off(&self, request: &ProvisioningRequest, attempts: u32) -> Result<(), ProvisionError> {
        self.collaborators
            .continuation
            .invoke_continuation(request.payload())
            .map_err(|err| ProvisionError::provider("invoke continuation", err))?;
        warn!(
            "[poller] still pending after {} checks with {}s left, handed off",
            attempts,
            self.collaborators.budget.remaining().as_secs()
        );
        Ok(())
    }
}

fn evaluate(details: &CertificateDetails) -> ValidationState {
    let unvalidated = details.unvalidated_domains();
    if unvalidated.is_empty() {
        info!("[poller] all domains of {} validated", details.handle);
        return ValidationState::Validated;
    }

    let listed: Vec<String> = unvalidated
        .iter()
        .map(|(domain, status)| format!("{domain} ({status})"))
        .collect();
    let reason = format!(
        "One or more domains failed to validate: {}",
        listed.join(", ")
    );
    error!("[poller] {}", reason);
    ValidationState::Failed { reason }
}
