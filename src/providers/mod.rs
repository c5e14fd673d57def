use std::sync::Arc;
use std::time::Duration;

use log::warn;
use serde_json::Value;

use crate::config::ProvisionerConfig;
use crate::core::errors::ProviderError;
use crate::core::types::{
    CertificateDetails, CertificateHandle, CertificateRequest, ChangeAction, DnsValidationRecord,
    ProvisioningOutcome, ProvisioningRequest,
};

mod acm;
mod aws;
mod budget;
mod cfn_response;
pub(crate) mod http;
mod lambda;
mod route53;

pub use acm::AcmAuthority;
pub use aws::AwsRuntime;
pub use budget::{DeadlineBudget, SystemClock};
pub use cfn_response::{CfnResponseSignaler, ResponseDocument};
pub use lambda::{LambdaContinuation, UnavailableContinuation};
pub use route53::Route53Zone;

/// Certificate authority operations, addressed by certificate handle.
pub trait CertificateAuthorityClient: Send + Sync {
    fn request_certificate(
        &self,
        request: &CertificateRequest,
    ) -> Result<CertificateHandle, ProviderError>;
    fn describe_certificate(
        &self,
        handle: &CertificateHandle,
    ) -> Result<CertificateDetails, ProviderError>;
    fn delete_certificate(&self, handle: &CertificateHandle) -> Result<(), ProviderError>;
}

/// Applies change batches to one hosted zone. A batch is a single transaction.
pub trait DnsZoneClient: Send + Sync {
    fn apply_changes(
        &self,
        zone_id: &str,
        action: ChangeAction,
        records: &[DnsValidationRecord],
    ) -> Result<(), ProviderError>;
}

/// Dispatches a fresh, asynchronous invocation carrying `payload` unchanged.
pub trait ContinuationInvoker: Send + Sync {
    fn invoke_continuation(&self, payload: &Value) -> Result<(), ProviderError>;
}

/// Delivers the final outcome of a logical operation to the orchestrating engine.
pub trait CompletionSignaler: Send + Sync {
    fn signal(
        &self,
        request: &ProvisioningRequest,
        outcome: &ProvisioningOutcome,
    ) -> Result<(), ProviderError>;
}

/// Remaining wall-clock time of the current invocation.
pub trait InvocationBudgetSource: Send + Sync {
    fn remaining(&self) -> Duration;
}

/// Every wait of the provisioner goes through this, so tests can run on virtual time.
pub trait Clock: Send + Sync {
    fn sleep(&self, duration: Duration);
}

/// Collaborators built once per process and shared by every component.
#[derive(Clone)]
pub struct Collaborators {
    pub authority: Arc<dyn CertificateAuthorityClient>,
    pub zone: Arc<dyn DnsZoneClient>,
    pub continuation: Arc<dyn ContinuationInvoker>,
    pub signaler: Arc<dyn CompletionSignaler>,
    pub budget: Arc<dyn InvocationBudgetSource>,
    pub clock: Arc<dyn Clock>,
}

impl Collaborators {
    /// Production wiring: ACM, Route 53, Lambda and the CloudFormation response URL.
    pub fn aws(aws: &AwsRuntime, config: &ProvisionerConfig) -> Self {
        let log_stream = config
            .log_stream_name
            .clone()
            .unwrap_or_else(|| "acm-cert-provisioner".to_string());
        Self {
            authority: Arc::new(AcmAuthority::new(aws)),
            zone: Arc::new(Route53Zone::new(aws)),
            continuation: continuation_for(aws, config),
            signaler: Arc::new(CfnResponseSignaler::new(log_stream, config.http_timeout)),
            budget: Arc::new(DeadlineBudget::from_config(config)),
            clock: Arc::new(SystemClock),
        }
    }
}

fn continuation_for(aws: &AwsRuntime, config: &ProvisionerConfig) -> Arc<dyn ContinuationInvoker> {
    match config.function_name.as_deref() {
        Some(function_name) => Arc::new(LambdaContinuation::new(aws, function_name)),
        None => {
            warn!("[continuation] AWS_LAMBDA_FUNCTION_NAME is not set; hand-offs will fail");
            Arc::new(UnavailableContinuation::new(
                "cannot hand off: AWS_LAMBDA_FUNCTION_NAME is not set",
            ))
        }
    }
}
