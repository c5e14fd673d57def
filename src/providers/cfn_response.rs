use std::time::Duration;

use log::{debug, info};
use reqwest::header::CONTENT_TYPE;
use serde::Serialize;

use crate::core::errors::ProviderError;
use crate::core::types::{OutcomeData, OutcomeStatus, ProvisioningOutcome, ProvisioningRequest};

use super::CompletionSignaler;
use super::http::{HttpClient, status_error};

/// Reasons longer than this are cut; the whole response body is capped at 4096 bytes.
const MAX_REASON_LEN: usize = 1024;

/// Body PUT to the pre-signed response URL of a custom resource request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResponseDocument {
    pub status: OutcomeStatus,
    pub reason: String,
    pub physical_resource_id: String,
    pub stack_id: String,
    pub request_id: String,
    pub logical_resource_id: String,
    pub no_echo: bool,
    pub data: OutcomeData,
}

impl ResponseDocument {
    /// Builds the response for `outcome`. Missing physical ids and reasons fall back to
    /// the log stream of the invocation.
    pub fn new(
        request: &ProvisioningRequest,
        outcome: &ProvisioningOutcome,
        log_stream: &str,
    ) -> Self {
        let reason = match outcome.reason.as_deref() {
            Some(reason) if !reason.is_empty() => truncate(reason, MAX_REASON_LEN),
            _ => format!("See the details in CloudWatch Log Stream: {log_stream}"),
        };
        let physical_resource_id = outcome
            .physical_id
            .clone()
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| log_stream.to_string());

        Self {
            status: outcome.status,
            reason,
            physical_resource_id,
            stack_id: request.stack_id.clone(),
            request_id: request.request_id.clone(),
            logical_resource_id: request.logical_resource_id.clone(),
            no_echo: false,
            data: outcome.data.clone(),
        }
    }
}

fn truncate(text: &str, max_len: usize) -> String {
    if text.len() <= max_len {
        return text.to_string();
    }
    let mut end = max_len;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}

/// Signals completion by uploading a [`ResponseDocument`] to the request's response URL.
pub struct CfnResponseSignaler {
    log_stream: String,
    timeout: Duration,
}

impl CfnResponseSignaler {
    pub fn new(log_stream: impl Into<String>, timeout: Duration) -> Self {
        Self {
            log_stream: log_stream.into(),
            timeout,
        }
    }
}

impl CompletionSignaler for CfnResponseSignaler {
    fn signal(
        &self,
        request: &ProvisioningRequest,
        outcome: &ProvisioningOutcome,
    ) -> Result<(), ProviderError> {
        if request.response_url.trim().is_empty() {
            return Err(ProviderError::transport("request carries no ResponseURL"));
        }

        let document = ResponseDocument::new(request, outcome, &self.log_stream);
        let body = serde_json::to_string(&document).map_err(|err| {
            ProviderError::transport(format!("Failed to serialize response document: {err}"))
        })?;
        debug!("[cfn-response] response body: {}", body);

        // The URL is pre-signed without a content type; sending one breaks the signature.
        let response = HttpClient::shared(self.timeout)
            .put(&request.response_url)
            .header(CONTENT_TYPE, "")
            .body(body)
            .send()
            .map_err(|err| ProviderError::transport(format!("response upload failed: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(status_error("response URL", status, response.text().ok()));
        }
        info!(
            "[cfn-response] {:?} delivered for {} ({})",
            document.status, document.logical_resource_id, status
        );
        Ok(())
    }
}
