use std::slice;

use log::{debug, info};

use crate::config::ProvisionerConfig;
use crate::core::errors::{ErrorClass, ProvisionError, classify};
use crate::core::types::{CertificateHandle, ChangeAction, DnsValidationRecord};
use crate::providers::Collaborators;

use super::retry::{Step, retry_with_policy};

/// Derives validation records from the authority and publishes or removes them.
pub struct DnsRecordManager<'a> {
    collaborators: &'a Collaborators,
    config: &'a ProvisionerConfig,
}

impl<'a> DnsRecordManager<'a> {
    pub fn new(collaborators: &'a Collaborators, config: &'a ProvisionerConfig) -> Self {
        Self {
            collaborators,
            config,
        }
    }

    /// Waits until the authority has assigned a challenge record to every domain.
    ///
    /// A freshly requested certificate is described before its challenges are populated.
    /// There is no attempt cap: the wait ends when the records appear or the invocation is
    /// killed by its runtime.
    pub fn fetch_validation_records(
        &self,
        handle: &CertificateHandle,
    ) -> Result<Vec<DnsValidationRecord>, ProvisionError> {
        const OPERATION: &str = "fetch validation records";
        let ttl = self.config.record_ttl_secs();

        let records = retry_with_policy(
            self.collaborators.clock.as_ref(),
            self.collaborators.budget.as_ref(),
            &self.config.record_policy(),
            OPERATION,
            |attempt| {
                let details = self
                    .collaborators
                    .authority
                    .describe_certificate(handle)
                    .map_err(|err| ProvisionError::provider("describe certificate", err))?;
                match details.complete_validation_records(ttl) {
                    Some(records) => Ok(Step::Ready(records)),
                    None => {
                        info!(
                            "[dns-records] waiting for validation records of {} (attempt {})",
                            handle, attempt
                        );
                        Ok(Step::Retry("validation records not assigned yet".to_string()))
                    }
                }
            },
        )?
        .into_ready(OPERATION)?;

        debug!(
            "[dns-records] {} validation record(s) for {}",
            records.len(),
            handle
        );
        Ok(records)
    }

    /// Publishes all records in one CREATE batch; records that already exist are fine.
    pub fn upsert_validation_records(
        &self,
        zone_id: &str,
        records: &[DnsValidationRecord],
    ) -> Result<(), ProvisionError> {
        self.apply(
            "publish validation records",
            zone_id,
            ChangeAction::Create,
            records,
            ErrorClass::AlreadyExists,
        )?;
        info!(
            "[dns-records] published {} record(s) in zone {}",
            records.len(),
            zone_id
        );
        Ok(())
    }

    /// Removes all records in one DELETE batch; records that are already gone are fine.
    pub fn remove_validation_records(
        &self,
        zone_id: &str,
        records: &[DnsValidationRecord],
    ) -> Result<(), ProvisionError> {
        self.apply(
            "remove validation records",
            zone_id,
            ChangeAction::Delete,
            records,
            ErrorClass::NotFound,
        )?;
        info!(
            "[dns-records] removed {} record(s) from zone {}",
            records.len(),
            zone_id
        );
        Ok(())
    }

    /// Applies `records` as one batch, treating `tolerated` as success.
    ///
    /// A batch is all-or-nothing, so when a multi-record batch is rejected for one record
    /// the records are re-applied one at a time to get the others through.
    fn apply(
        &self,
        operation: &'static str,
        zone_id: &str,
        action: ChangeAction,
        records: &[DnsValidationRecord],
        tolerated: ErrorClass,
    ) -> Result<(), ProvisionError> {
        // Route 53 rejects empty batches.
        if records.is_empty() {
            return Ok(());
        }

        let zone = self.collaborators.zone.as_ref();
        let err = match zone.apply_changes(zone_id, action, records) {
            Ok(()) => return Ok(()),
            Err(err) if classify(&err) == tolerated => err,
            Err(err) => return Err(ProvisionError::provider(operation, err)),
        };

        debug!("[dns-records] {} tolerated: {}", operation, err);
        if records.len() == 1 {
            return Ok(());
        }

        info!(
            "[dns-records] {} batch rejected ({:?}), applying {} records individually",
            operation,
            tolerated,
            records.len()
        );
        for record in records {
            match zone.apply_changes(zone_id, action, slice::from_ref(record)) {
                Ok(()) => {}
                Err(err) if classify(&err) == tolerated => {
                    debug!("[dns-records] {} tolerated for {}: {}", operation, record.name, err);
                }
                Err(err) => return Err(ProvisionError::provider(operation, err)),
            }
        }
        Ok(())
    }
}
