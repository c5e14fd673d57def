use crate::core::errors::RequestError;

/// Checks a host name list before it is sent to the authority.
///
/// Names are validated, not rewritten: ACM receives them exactly as the template wrote
/// them so the certificate's subject matches what the stack author expects.
pub fn validate_host_names(host_names: &[String]) -> Result<(), RequestError> {
    if host_names.is_empty() {
        return Err(RequestError::MissingHostNames);
    }
    for name in host_names {
        normalize_host_name(name)?;
    }
    Ok(())
}

/// ASCII, lowercase form of a host name; a leading `*.` wildcard label is kept.
pub fn normalize_host_name(input: &str) -> Result<String, RequestError> {
    let invalid = |reason: String| RequestError::InvalidHostName {
        name: input.to_string(),
        reason,
    };
    let trimmed = input.trim().trim_end_matches('.');
    let (wildcard, rest) = match trimmed.strip_prefix("*.") {
        Some(rest) => (true, rest),
        None => (false, trimmed),
    };
    if rest.is_empty() {
        return Err(invalid("host name is empty".to_string()));
    }
    let ascii = idna::domain_to_ascii(rest).map_err(|err| invalid(err.to_string()))?;
    if ascii.contains('*') {
        return Err(invalid("wildcards are only allowed as the leftmost label".to_string()));
    }
    let ascii = ascii.to_lowercase();
    Ok(if wildcard { format!("*.{ascii}") } else { ascii })
}
