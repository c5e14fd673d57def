use aws_sdk_acm::Client;
use aws_sdk_acm::types::ValidationMethod;
use log::{debug, info};

use crate::core::errors::{ProviderError, ProviderErrorCode};
use crate::core::types::{
    CertificateDetails, CertificateHandle, CertificateRequest, ChallengeRecord, DomainValidation,
    ValidationStatus,
};

use super::CertificateAuthorityClient;
use super::aws::{AwsRuntime, sdk_error};

/// AWS Certificate Manager, DNS validation only.
pub struct AcmAuthority {
    aws: AwsRuntime,
    client: Client,
}

impl AcmAuthority {
    pub fn new(aws: &AwsRuntime) -> Self {
        Self {
            client: Client::new(aws.sdk_config()),
            aws: aws.clone(),
        }
    }
}

impl CertificateAuthorityClient for AcmAuthority {
    fn request_certificate(
        &self,
        request: &CertificateRequest,
    ) -> Result<CertificateHandle, ProviderError> {
        let mut call = self
            .client
            .request_certificate()
            .domain_name(&request.primary_host)
            .validation_method(ValidationMethod::Dns)
            .idempotency_token(request.token.as_str());
        if !request.alternate_hosts.is_empty() {
            call = call.set_subject_alternative_names(Some(request.alternate_hosts.clone()));
        }

        let output = self.aws.block_on(call.send()).map_err(sdk_error)?;
        let arn = output.certificate_arn().ok_or_else(|| {
            ProviderError::new(
                ProviderErrorCode::Service("MissingCertificateArn".to_string()),
                "RequestCertificate returned no certificate ARN",
            )
        })?;
        info!("[acm] requested {} for {}", arn, request.primary_host);
        Ok(CertificateHandle::new(arn))
    }

    fn describe_certificate(
        &self,
        handle: &CertificateHandle,
    ) -> Result<CertificateDetails, ProviderError> {
        let output = self
            .aws
            .block_on(
                self.client
                    .describe_certificate()
                    .certificate_arn(handle.arn())
                    .send(),
            )
            .map_err(sdk_error)?;

        let validations = output
            .certificate()
            .map(|certificate| {
                certificate
                    .domain_validation_options()
                    .iter()
                    .map(|option| DomainValidation {
                        domain_name: option.domain_name().to_string(),
                        status: option
                            .validation_status()
                            .map(|status| ValidationStatus::parse(status.as_str())),
                        challenge: option.resource_record().map(|record| ChallengeRecord {
                            name: record.name().to_string(),
                            value: record.value().to_string(),
                        }),
                    })
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();
        debug!(
            "[acm] {} has {} domain validation entries",
            handle,
            validations.len()
        );

        Ok(CertificateDetails {
            handle: handle.clone(),
            validations,
        })
    }

    fn delete_certificate(&self, handle: &CertificateHandle) -> Result<(), ProviderError> {
        self.aws
            .block_on(
                self.client
                    .delete_certificate()
                    .certificate_arn(handle.arn())
                    .send(),
            )
            .map_err(sdk_error)?;
        Ok(())
    }
}
