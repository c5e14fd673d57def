use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::errors::RequestError;

/// Kind of lifecycle event CloudFormation sent for the custom resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestKind {
    Create,
    Update,
    Delete,
}

impl RequestKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestKind::Create => "Create",
            RequestKind::Update => "Update",
            RequestKind::Delete => "Delete",
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CustomResourceEvent {
    request_type: RequestKind,
    stack_id: String,
    logical_resource_id: String,
    #[serde(default)]
    request_id: String,
    #[serde(rename = "ResponseURL", default)]
    response_url: String,
    #[serde(default)]
    physical_resource_id: Option<String>,
    #[serde(default)]
    resource_properties: ResourceProperties,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ResourceProperties {
    #[serde(default)]
    host_names: Vec<String>,
    #[serde(default)]
    hosted_zone_id: String,
}

/// One CloudFormation custom-resource invocation.
///
/// The original JSON payload is kept verbatim: a continuation must receive exactly what
/// CloudFormation sent, including fields this crate does not interpret.
#[derive(Debug, Clone)]
pub struct ProvisioningRequest {
    pub kind: RequestKind,
    pub stack_id: String,
    pub logical_resource_id: String,
    pub request_id: String,
    pub response_url: String,
    /// Primary host name first, then the subject alternative names.
    pub host_names: Vec<String>,
    pub hosted_zone_id: String,
    pub physical_resource_id: Option<String>,
    payload: Value,
}

impl ProvisioningRequest {
    pub fn from_payload(payload: Value) -> Result<Self, RequestError> {
        let event = CustomResourceEvent::deserialize(&payload)?;
        Ok(Self {
            kind: event.request_type,
            stack_id: event.stack_id,
            logical_resource_id: event.logical_resource_id,
            request_id: event.request_id,
            response_url: event.response_url,
            host_names: event.resource_properties.host_names,
            hosted_zone_id: event.resource_properties.hosted_zone_id,
            physical_resource_id: event.physical_resource_id,
            payload,
        })
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, RequestError> {
        let payload: Value = serde_json::from_slice(bytes)?;
        Self::from_payload(payload)
    }

    /// The payload exactly as received.
    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// Payload safe for logs: the presigned response URL is a bearer credential.
    pub fn redacted_payload(&self) -> Value {
        let mut copy = self.payload.clone();
        if let Some(url) = copy.get_mut("ResponseURL") {
            *url = Value::String("<redacted>".to_string());
        }
        copy
    }

    pub fn primary_host(&self) -> Option<&str> {
        self.host_names.first().map(String::as_str)
    }

    pub fn alternate_hosts(&self) -> &[String] {
        self.host_names.get(1..).unwrap_or_default()
    }

    pub fn idempotency_token(&self) -> IdempotencyToken {
        IdempotencyToken::derive(&self.stack_id, &self.logical_resource_id)
    }
}

/// Stable request token that lets ACM deduplicate certificate requests.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdempotencyToken(String);

impl IdempotencyToken {
    /// ACM caps idempotency tokens at 32 characters.
    pub const MAX_LEN: usize = 32;

    /// Keeps the last 32 alphanumeric characters of the stack id followed by the logical id.
    ///
    /// The tail is used because stack ids share a long `arn:aws:cloudformation:` prefix
    /// while their uniqueness lives in the trailing stack UUID.
    pub fn derive(stack_id: &str, logical_resource_id: &str) -> Self {
        let alnum: Vec<char> = stack_id
            .chars()
            .chain(logical_resource_id.chars())
            .filter(|ch| ch.is_alphanumeric())
            .collect();
        let start = alnum.len().saturating_sub(Self::MAX_LEN);
        Self(alnum[start..].iter().collect())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdempotencyToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Authority-assigned certificate identifier (an ACM ARN once issued).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CertificateHandle(String);

impl CertificateHandle {
    pub fn new(arn: impl Into<String>) -> Self {
        Self(arn.into())
    }

    pub fn arn(&self) -> &str {
        &self.0
    }

    /// False for physical ids that never named a certificate, such as the log stream name
    /// reported when a create failed before issuance.
    pub fn is_certificate_arn(&self) -> bool {
        self.0.starts_with("arn:") && self.0.contains(":certificate/")
    }
}

impl fmt::Display for CertificateHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Input of a single certificate issuance call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateRequest {
    pub primary_host: String,
    pub alternate_hosts: Vec<String>,
    pub token: IdempotencyToken,
}

/// Per-domain validation status as reported by the authority.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationStatus {
    PendingValidation,
    Success,
    Failed,
    Other(String),
}

impl ValidationStatus {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "PENDING_VALIDATION" => ValidationStatus::PendingValidation,
            "SUCCESS" => ValidationStatus::Success,
            "FAILED" => ValidationStatus::Failed,
            other => ValidationStatus::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ValidationStatus::PendingValidation => "PENDING_VALIDATION",
            ValidationStatus::Success => "SUCCESS",
            ValidationStatus::Failed => "FAILED",
            ValidationStatus::Other(raw) => raw,
        }
    }
}

/// CNAME name/value pair the authority asks to be published for one domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeRecord {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainValidation {
    pub domain_name: String,
    /// `None` until the authority starts validating the domain.
    pub status: Option<ValidationStatus>,
    /// `None` until the authority assigns the challenge record.
    pub challenge: Option<ChallengeRecord>,
}

impl DomainValidation {
    pub fn is_pending(&self) -> bool {
        matches!(
            self.status,
            None | Some(ValidationStatus::PendingValidation)
        )
    }
}

/// Snapshot of a certificate returned by a describe call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateDetails {
    pub handle: CertificateHandle,
    pub validations: Vec<DomainValidation>,
}

impl CertificateDetails {
    pub fn pending_domains(&self) -> Vec<&str> {
        self.validations
            .iter()
            .filter(|validation| validation.is_pending())
            .map(|validation| validation.domain_name.as_str())
            .collect()
    }

    /// Domains whose status is anything but `SUCCESS`, with that status.
    pub fn unvalidated_domains(&self) -> Vec<(&str, &str)> {
        self.validations
            .iter()
            .filter(|validation| validation.status != Some(ValidationStatus::Success))
            .map(|validation| {
                let status = validation
                    .status
                    .as_ref()
                    .map(ValidationStatus::as_str)
                    .unwrap_or("UNKNOWN");
                (validation.domain_name.as_str(), status)
            })
            .collect()
    }

    /// All validation records, or `None` while any challenge is still unassigned.
    pub fn complete_validation_records(&self, ttl: i64) -> Option<Vec<DnsValidationRecord>> {
        if self.validations.is_empty()
            || self
                .validations
                .iter()
                .any(|validation| validation.challenge.is_none())
        {
            return None;
        }
        Some(self.assigned_validation_records(ttl))
    }

    /// Records for every challenge assigned so far, one per distinct record name.
    pub fn assigned_validation_records(&self, ttl: i64) -> Vec<DnsValidationRecord> {
        let mut records: Vec<DnsValidationRecord> = Vec::new();
        for challenge in self
            .validations
            .iter()
            .filter_map(|validation| validation.challenge.as_ref())
        {
            // A wildcard and its apex share one challenge record.
            if let Some(existing) = records.iter_mut().find(|record| record.name == challenge.name)
            {
                existing.value = challenge.value.clone();
                continue;
            }
            records.push(DnsValidationRecord::new(&challenge.name, &challenge.value, ttl));
        }
        records
    }
}

/// CNAME record published in the hosted zone to prove control of a domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsValidationRecord {
    pub name: String,
    pub value: String,
    pub ttl: i64,
}

impl DnsValidationRecord {
    pub const RECORD_TYPE: &'static str = "CNAME";

    pub fn new(name: &str, value: &str, ttl: i64) -> Self {
        Self {
            name: name.to_string(),
            value: value.to_string(),
            ttl,
        }
    }
}

/// Change-batch action applied to validation records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeAction {
    Create,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutcomeStatus {
    Success,
    Failed,
}

/// Attributes exposed to the template through `Fn::GetAtt`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeData {
    #[serde(rename = "Arn", skip_serializing_if = "Option::is_none")]
    pub certificate_arn: Option<String>,
}

/// Final result of a logical provisioning operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisioningOutcome {
    pub status: OutcomeStatus,
    pub reason: Option<String>,
    pub data: OutcomeData,
    /// `None` lets the signaler substitute its own fallback id.
    pub physical_id: Option<String>,
}

impl ProvisioningOutcome {
    pub fn success(physical_id: Option<String>, data: OutcomeData) -> Self {
        Self {
            status: OutcomeStatus::Success,
            reason: None,
            data,
            physical_id,
        }
    }

    pub fn failed(physical_id: Option<String>, reason: impl Into<String>) -> Self {
        Self {
            status: OutcomeStatus::Failed,
            reason: Some(reason.into()),
            data: OutcomeData::default(),
            physical_id,
        }
    }

    /// Outcome carrying the issued certificate as physical id and `Arn` attribute.
    pub fn for_certificate(handle: &CertificateHandle) -> Self {
        Self::success(
            Some(handle.arn().to_string()),
            OutcomeData {
                certificate_arn: Some(handle.arn().to_string()),
            },
        )
    }

    /// FAILED outcome that still names the certificate, so a stack rollback deletes it.
    pub fn for_unvalidated_certificate(
        handle: &CertificateHandle,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            status: OutcomeStatus::Failed,
            reason: Some(reason.into()),
            ..Self::for_certificate(handle)
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == OutcomeStatus::Success
    }
}

/// What one invocation did with its request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// Terminal: this invocation owns the completion signal.
    Signal(ProvisioningOutcome),
    /// A continuation took over; this invocation must stay silent.
    HandedOff,
}
