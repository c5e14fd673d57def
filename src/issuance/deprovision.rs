use log::{info, warn};

use crate::config::ProvisionerConfig;
use crate::core::errors::{ErrorClass, ProvisionError, RequestError, classify};
use crate::core::types::CertificateHandle;
use crate::providers::Collaborators;

use super::records::DnsRecordManager;
use super::retry::{Step, retry_with_policy};

/// Tears down a certificate and the validation records published for it.
pub struct Deprovisioner<'a> {
    collaborators: &'a Collaborators,
    config: &'a ProvisionerConfig,
}

impl<'a> Deprovisioner<'a> {
    pub fn new(collaborators: &'a Collaborators, config: &'a ProvisionerConfig) -> Self {
        Self {
            collaborators,
            config,
        }
    }

    /// Removes the validation records from `zone_id`, then deletes the certificate.
    ///
    /// The records are not stored anywhere; describing the certificate yields the same
    /// records the create published. Physical ids that never named a certificate and
    /// certificates the authority no longer knows are already deprovisioned.
    pub fn deprovision(&self, physical_id: &str, zone_id: &str) -> Result<(), ProvisionError> {
        let handle = CertificateHandle::new(physical_id);
        if !handle.is_certificate_arn() {
            warn!(
                "[deprovision] physical id {} is not a certificate ARN, nothing to delete",
                physical_id
            );
            return Ok(());
        }

        let details = match self.collaborators.authority.describe_certificate(&handle) {
            Ok(details) => details,
            Err(err) if classify(&err) == ErrorClass::NotFound => {
                info!("[deprovision] certificate {} is already gone: {}", handle, err);
                return Ok(());
            }
            Err(err) => return Err(ProvisionError::provider("describe certificate", err)),
        };

        let records = details.assigned_validation_records(self.config.record_ttl_secs());
        if !records.is_empty() && zone_id.trim().is_empty() {
            return Err(RequestError::MissingHostedZone.into());
        }
        DnsRecordManager::new(self.collaborators, self.config)
            .remove_validation_records(zone_id, &records)?;

        self.delete_certificate(&handle)
    }

    /// Deletes the certificate, waiting out "in use" rejections.
    ///
    /// A certificate stays in use until the resources referencing it (load balancers,
    /// distributions) are deleted, which CloudFormation may still be doing in parallel.
    /// There is no attempt cap.
    fn delete_certificate(&self, handle: &CertificateHandle) -> Result<(), ProvisionError> {
        const OPERATION: &str = "delete certificate";

        retry_with_policy(
            self.collaborators.clock.as_ref(),
            self.collaborators.budget.as_ref(),
            &self.config.delete_policy(),
            OPERATION,
            |attempt| match self.collaborators.authority.delete_certificate(handle) {
                Ok(()) => Ok(Step::Ready(())),
                Err(err) if classify(&err) == ErrorClass::ResourceBusy => {
                    info!(
                        "[deprovision] {} still in use (attempt {}): {}",
                        handle, attempt, err
                    );
                    Ok(Step::Retry(err.to_string()))
                }
                Err(err) => Err(ProvisionError::provider(OPERATION, err)),
            },
        )?
        .into_ready(OPERATION)?;

        info!("[deprovision] deleted certificate {}", handle);
        Ok(())
    }
}
