use aws_sdk_route53::Client;
use aws_sdk_route53::types::{Change, ChangeBatch, ResourceRecord, ResourceRecordSet, RrType};
use log::info;

use crate::core::errors::{ProviderError, ProviderErrorCode};
use crate::core::types::{ChangeAction, DnsValidationRecord};

use super::DnsZoneClient;
use super::aws::{AwsRuntime, sdk_error};

/// Route 53 hosted zone holding the validation CNAMEs.
pub struct Route53Zone {
    aws: AwsRuntime,
    client: Client,
}

impl Route53Zone {
    pub fn new(aws: &AwsRuntime) -> Self {
        Self {
            client: Client::new(aws.sdk_config()),
            aws: aws.clone(),
        }
    }
}

impl DnsZoneClient for Route53Zone {
    fn apply_changes(
        &self,
        zone_id: &str,
        action: ChangeAction,
        records: &[DnsValidationRecord],
    ) -> Result<(), ProviderError> {
        let change_batch = build_change_batch(action, records)?;
        self.aws
            .block_on(
                self.client
                    .change_resource_record_sets()
                    .hosted_zone_id(zone_id)
                    .change_batch(change_batch)
                    .send(),
            )
            .map_err(sdk_error)?;

        info!(
            "[route53] {:?} of {} validation records submitted to {}",
            action,
            records.len(),
            zone_id
        );
        Ok(())
    }
}

fn build_change_batch(
    action: ChangeAction,
    records: &[DnsValidationRecord],
) -> Result<ChangeBatch, ProviderError> {
    let route53_action = match action {
        ChangeAction::Create => aws_sdk_route53::types::ChangeAction::Create,
        ChangeAction::Delete => aws_sdk_route53::types::ChangeAction::Delete,
    };

    let changes = records
        .iter()
        .map(|record| {
            Change::builder()
                .action(route53_action.clone())
                .resource_record_set(cname_record_set(record)?)
                .build()
                .map_err(|e| build_error("Change", e))
        })
        .collect::<Result<Vec<_>, _>>()?;

    ChangeBatch::builder()
        .comment("ACM DNS validation records")
        .set_changes(Some(changes))
        .build()
        .map_err(|e| build_error("ChangeBatch", e))
}

fn cname_record_set(record: &DnsValidationRecord) -> Result<ResourceRecordSet, ProviderError> {
    ResourceRecordSet::builder()
        .name(&record.name)
        .set_resource_records(Some(vec![
            ResourceRecord::builder()
                .value(&record.value)
                .build()
                .map_err(|e| build_error("ResourceRecord", e))?,
        ]))
        .ttl(record.ttl)
        .set_type(Some(RrType::Cname))
        .build()
        .map_err(|e| build_error("ResourceRecordSet", e))
}

fn build_error(what: &str, err: impl std::fmt::Display) -> ProviderError {
    ProviderError::new(
        ProviderErrorCode::Service("InvalidInput".to_string()),
        format!("Failed to build {what}: {err}"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_set_is_a_single_value_cname() {
        let record = DnsValidationRecord::new("_a.example.com.", "_x.acm-validations.aws.", 600);
        let set = cname_record_set(&record).unwrap();
        assert_eq!(set.name(), "_a.example.com.");
        assert_eq!(set.r#type(), &RrType::Cname);
        assert_eq!(set.ttl(), Some(600));
        assert_eq!(set.resource_records().len(), 1);
        assert_eq!(set.resource_records()[0].value(), "_x.acm-validations.aws.");
    }

    #[test]
    fn one_change_per_record() {
        let records = vec![
            DnsValidationRecord::new("_a.example.com.", "_x.acm-validations.aws.", 600),
            DnsValidationRecord::new("_b.example.com.", "_y.acm-validations.aws.", 600),
        ];
        let batch = build_change_batch(ChangeAction::Delete, &records).unwrap();
        assert_eq!(batch.changes().len(), 2);
        assert!(
            batch
                .changes()
                .iter()
                .all(|change| change.action() == &aws_sdk_route53::types::ChangeAction::Delete)
        );
    }
}
