use aws_sdk_lambda::Client;
use aws_sdk_lambda::primitives::Blob;
use aws_sdk_lambda::types::InvocationType;
use log::info;
use serde_json::Value;

use crate::core::errors::{ProviderError, ProviderErrorCode};

use super::ContinuationInvoker;
use super::aws::{AwsRuntime, sdk_error};

/// Re-invokes the running Lambda function asynchronously with the original event.
pub struct LambdaContinuation {
    aws: AwsRuntime,
    client: Client,
    function_name: String,
}

impl LambdaContinuation {
    pub fn new(aws: &AwsRuntime, function_name: impl Into<String>) -> Self {
        Self {
            client: Client::new(aws.sdk_config()),
            aws: aws.clone(),
            function_name: function_name.into(),
        }
    }
}

impl ContinuationInvoker for LambdaContinuation {
    fn invoke_continuation(&self, payload: &Value) -> Result<(), ProviderError> {
        let body = serde_json::to_vec(payload).map_err(|err| {
            ProviderError::new(
                ProviderErrorCode::Service("InvalidRequestContent".to_string()),
                format!("Failed to serialize continuation payload: {err}"),
            )
        })?;

        let output = self
            .aws
            .block_on(
                self.client
                    .invoke()
                    .function_name(&self.function_name)
                    .invocation_type(InvocationType::Event)
                    .payload(Blob::new(body))
                    .send(),
            )
            .map_err(sdk_error)?;

        info!(
            "[continuation] queued {} (status {})",
            self.function_name,
            output.status_code()
        );
        Ok(())
    }
}

/// Stands in when no function name is known; every hand-off fails.
pub struct UnavailableContinuation {
    reason: String,
}

impl UnavailableContinuation {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl ContinuationInvoker for UnavailableContinuation {
    fn invoke_continuation(&self, _payload: &Value) -> Result<(), ProviderError> {
        Err(ProviderError::new(
            ProviderErrorCode::Service("ContinuationUnavailable".to_string()),
            self.reason.clone(),
        ))
    }
}
