use log::{info, warn};

use crate::config::ProvisionerConfig;
use crate::core::errors::{ErrorClass, ProvisionError, classify};
use crate::core::types::{CertificateHandle, CertificateRequest, IdempotencyToken};
use crate::providers::Collaborators;

use super::retry::{Step, retry_with_policy};

const OPERATION: &str = "request certificate";

/// Issues the certificate request, retrying only while the authority throttles.
pub struct CertificateRequester<'a> {
    collaborators: &'a Collaborators,
    config: &'a ProvisionerConfig,
}

impl<'a> CertificateRequester<'a> {
    pub fn new(collaborators: &'a Collaborators, config: &'a ProvisionerConfig) -> Self {
        Self {
            collaborators,
            config,
        }
    }

    /// Requests one certificate covering `primary` and every alternate.
    ///
    /// The idempotency token makes repeated calls (retries, continuations) return the
    /// certificate created by the first call. A certificate may exist at the authority even
    /// if a later step fails; the returned handle is what a delete cleans up with.
    pub fn request_certificate(
        &self,
        primary: &str,
        alternates: &[String],
        token: &IdempotencyToken,
    ) -> Result<CertificateHandle, ProvisionError> {
        let request = CertificateRequest {
            primary_host: primary.to_string(),
            alternate_hosts: alternates.to_vec(),
            token: token.clone(),
        };

        let handle = retry_with_policy(
            self.collaborators.clock.as_ref(),
            self.collaborators.budget.as_ref(),
            &self.config.throttle_policy(),
            OPERATION,
            |attempt| match self.collaborators.authority.request_certificate(&request) {
                Ok(handle) => Ok(Step::Ready(handle)),
                Err(err) if classify(&err) == ErrorClass::Throttled => {
                    warn!("[requester] throttled on attempt {}: {}", attempt, err);
                    Ok(Step::Retry(err.to_string()))
                }
                Err(err) => Err(ProvisionError::provider(OPERATION, err)),
            },
        )?
        .into_ready(OPERATION)?;

        info!(
            "[requester] certificate {} requested for {} (+{} alternate names)",
            handle,
            primary,
            alternates.len()
        );
        Ok(handle)
    }
}
