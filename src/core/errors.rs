use thiserror::Error;

/// Structured condition reported by a collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderErrorCode {
    Throttling,
    ResourceInUse,
    AlreadyExists,
    NotFound,
    /// Any other service-reported error code.
    Service(String),
    /// No service code: network, timeout or SDK construction failures.
    Transport,
}

/// Error returned by the certificate authority, DNS zone and runtime collaborators.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ProviderError {
    pub code: ProviderErrorCode,
    pub message: String,
}

impl ProviderError {
    pub fn new(code: ProviderErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Maps an AWS error code onto a [`ProviderErrorCode`].
    pub fn from_service(code: Option<&str>, message: impl Into<String>) -> Self {
        let code = match code {
            Some("ThrottlingException" | "Throttling" | "TooManyRequestsException") => {
                ProviderErrorCode::Throttling
            }
            Some("PriorRequestNotComplete") => ProviderErrorCode::Throttling,
            Some("ResourceInUseException") => ProviderErrorCode::ResourceInUse,
            Some("ResourceNotFoundException") => ProviderErrorCode::NotFound,
            Some(other) => ProviderErrorCode::Service(other.to_string()),
            None => ProviderErrorCode::Transport,
        };
        Self::new(code, message)
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::Transport, message)
    }
}

/// How the provisioner reacts to a [`ProviderError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Bounded retry with linear backoff.
    Throttled,
    /// Unbounded retry at a fixed interval.
    ResourceBusy,
    /// Creating something that is already there counts as success.
    AlreadyExists,
    /// Removing something that is already gone counts as success.
    NotFound,
    Fatal,
}

/// Classifies a provider error.
///
/// The structured code wins. Codes that carry no meaning of their own (Route 53 reports
/// duplicates as a generic `InvalidChangeBatch`) fall back to matching the provider's
/// message text. That fallback is fragile: it breaks if AWS rewords the messages.
pub fn classify(err: &ProviderError) -> ErrorClass {
    match &err.code {
        ProviderErrorCode::Throttling => ErrorClass::Throttled,
        ProviderErrorCode::ResourceInUse => ErrorClass::ResourceBusy,
        ProviderErrorCode::AlreadyExists => ErrorClass::AlreadyExists,
        ProviderErrorCode::NotFound => ErrorClass::NotFound,
        ProviderErrorCode::Service(_) | ProviderErrorCode::Transport => {
            classify_message(&err.message)
        }
    }
}

fn classify_message(message: &str) -> ErrorClass {
    let trimmed = message.trim_end();
    if trimmed.contains("ThrottlingException") {
        ErrorClass::Throttled
    } else if trimmed.contains("is in use") {
        ErrorClass::ResourceBusy
    } else if trimmed.contains("but it already exists") {
        ErrorClass::AlreadyExists
    } else if trimmed.contains("but it was not found") {
        ErrorClass::NotFound
    } else {
        ErrorClass::Fatal
    }
}

/// Request payload problems detected before any provider call.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("malformed provisioning request: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("HostNames must contain at least one host name")]
    MissingHostNames,
    #[error("invalid host name {name:?}: {reason}")]
    InvalidHostName { name: String, reason: String },
    #[error("HostedZoneId is required")]
    MissingHostedZone,
    #[error("PhysicalResourceId is required for {0} requests")]
    MissingPhysicalId(&'static str),
}

/// Any error that ends a provisioning operation.
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error(transparent)]
    Request(#[from] RequestError),
    #[error("{operation} failed: {source}")]
    Provider {
        operation: &'static str,
        #[source]
        source: ProviderError,
    },
    #[error("{operation} still failing after {retries} retries: {last}")]
    RetriesExhausted {
        operation: &'static str,
        retries: u32,
        last: String,
    },
    #[error("{operation} ran out of invocation time after {attempts} attempt(s)")]
    BudgetExhausted {
        operation: &'static str,
        attempts: u32,
    },
}

impl ProvisionError {
    pub fn provider(operation: &'static str, source: ProviderError) -> Self {
        Self::Provider { operation, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structured_codes_take_precedence() {
        let err = ProviderError::new(ProviderErrorCode::ResourceInUse, "anything");
        assert_eq!(classify(&err), ErrorClass::ResourceBusy);
        let err = ProviderError::from_service(Some("ThrottlingException"), "Rate exceeded");
        assert_eq!(classify(&err), ErrorClass::Throttled);
    }

    #[test]
    fn route53_duplicate_falls_back_to_message() {
        let err = ProviderError::from_service(
            Some("InvalidChangeBatch"),
            "[Tried to create resource record set [name='_x.a.example.com.', type='CNAME'] but it already exists]",
        );
        assert_eq!(classify(&err), ErrorClass::AlreadyExists);
    }

    #[test]
    fn route53_missing_record_falls_back_to_message() {
        let err = ProviderError::from_service(
            Some("InvalidChangeBatch"),
            "[Tried to delete resource record set [name='_x.a.example.com.', type='CNAME'] but it was not found]",
        );
        assert_eq!(classify(&err), ErrorClass::NotFound);
    }

    #[test]
    fn acm_in_use_message_is_busy() {
        let err = ProviderError::transport(
            "Certificate arn:aws:acm:us-east-1:123456789012:certificate/abc is in use.",
        );
        assert_eq!(classify(&err), ErrorClass::ResourceBusy);
    }

    #[test]
    fn unknown_errors_are_fatal() {
        let err = ProviderError::from_service(Some("AccessDeniedException"), "not allowed");
        assert_eq!(classify(&err), ErrorClass::Fatal);
        assert_eq!(
            err.code,
            ProviderErrorCode::Service("AccessDeniedException".to_string())
        );
    }

    #[test]
    fn provision_error_describes_operation() {
        let err = ProvisionError::provider(
            "delete certificate",
            ProviderError::transport("connection reset"),
        );
        assert_eq!(err.to_string(), "delete certificate failed: connection reset");
    }
}
