use std::sync::OnceLock;
use std::time::Duration;

use log::warn;
use reqwest::StatusCode;
use reqwest::blocking::Client;

use crate::core::errors::ProviderError;

pub struct HttpClient;

impl HttpClient {
    /// Process-wide blocking client. The timeout of the first caller wins.
    pub fn shared(timeout: Duration) -> &'static Client {
        static CLIENT: OnceLock<Client> = OnceLock::new();
        CLIENT.get_or_init(|| {
            reqwest::blocking::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_else(|err| {
                    warn!("[http] failed to build shared client: {err}");
                    reqwest::blocking::Client::new()
                })
        })
    }
}

pub fn status_error(target: &str, status: StatusCode, body: Option<String>) -> ProviderError {
    if status == StatusCode::FORBIDDEN {
        // Pre-signed URLs answer 403 once they expire.
        return ProviderError::transport(format!("{target} rejected the request: {status}"));
    }
    match body.filter(|body| !body.trim().is_empty()) {
        Some(body) => ProviderError::transport(format!("{target} error {status}: {body}")),
        None => ProviderError::transport(format!("{target} error: {status}")),
    }
}
