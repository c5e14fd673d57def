use std::time::Duration;

use log::warn;

use crate::issuance::retry::{Backoff, RetryPolicy};

const DEFAULT_THROTTLE_BACKOFF_SECS: u64 = 5;
const DEFAULT_THROTTLE_MAX_RETRIES: u32 = 10;
const DEFAULT_RECORD_POLL_INTERVAL_SECS: u64 = 2;
const DEFAULT_VALIDATION_POLL_INTERVAL_SECS: u64 = 15;
const DEFAULT_HANDOFF_RESERVE_SECS: u64 = 20;
const DEFAULT_DELETE_RETRY_INTERVAL_SECS: u64 = 5;
const DEFAULT_RECORD_TTL_SECS: u64 = 600;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 15;
const DEFAULT_INVOCATION_BUDGET_SECS: u64 = 900;

/// Timing and identity settings for one provisioner process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionerConfig {
    /// Step of the linear backoff applied to throttled certificate requests.
    pub throttle_backoff: Duration,
    /// Retries allowed for a throttled certificate request before giving up.
    pub throttle_max_retries: u32,
    /// Wait between describes while the authority has not assigned validation records.
    pub record_poll_interval: Duration,
    /// Wait between describes while validation is pending.
    pub validation_poll_interval: Duration,
    /// Remaining invocation time at or below which polling hands off to a continuation.
    pub handoff_reserve: Duration,
    /// Wait between certificate deletions rejected because the certificate is in use.
    pub delete_retry_interval: Duration,
    /// TTL of the published CNAME validation records.
    pub record_ttl: Duration,
    /// Timeout of the completion-signal HTTP request.
    pub http_timeout: Duration,
    /// Function re-invoked for continuations.
    pub function_name: Option<String>,
    /// Log stream of the current invocation, used as fallback physical id.
    pub log_stream_name: Option<String>,
    /// Absolute invocation deadline in epoch milliseconds, when the runtime provides one.
    pub deadline_ms: Option<i64>,
    /// Wall-clock budget measured from process start when no deadline is given.
    /// Must not exceed the function timeout, or the runtime kills the invocation before it
    /// hands off and no completion signal is ever sent.
    pub invocation_budget: Duration,
}

impl Default for ProvisionerConfig {
    fn default() -> Self {
        Self {
            throttle_backoff: Duration::from_secs(DEFAULT_THROTTLE_BACKOFF_SECS),
            throttle_max_retries: DEFAULT_THROTTLE_MAX_RETRIES,
            record_poll_interval: Duration::from_secs(DEFAULT_RECORD_POLL_INTERVAL_SECS),
            validation_poll_interval: Duration::from_secs(DEFAULT_VALIDATION_POLL_INTERVAL_SECS),
            handoff_reserve: Duration::from_secs(DEFAULT_HANDOFF_RESERVE_SECS),
            delete_retry_interval: Duration::from_secs(DEFAULT_DELETE_RETRY_INTERVAL_SECS),
            record_ttl: Duration::from_secs(DEFAULT_RECORD_TTL_SECS),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            function_name: None,
            log_stream_name: None,
            deadline_ms: None,
            invocation_budget: Duration::from_secs(DEFAULT_INVOCATION_BUDGET_SECS),
        }
    }
}

impl ProvisionerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let secs = |key: &str, default: u64| {
            Duration::from_secs(resolve_positive(&lookup, key, default))
        };
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        Self {
            throttle_backoff: secs(
                "PROVISIONER_THROTTLE_BACKOFF_SECS",
                DEFAULT_THROTTLE_BACKOFF_SECS,
            ),
            throttle_max_retries: resolve_positive(
                &lookup,
                "PROVISIONER_THROTTLE_MAX_RETRIES",
                u64::from(DEFAULT_THROTTLE_MAX_RETRIES),
            )
            .try_into()
            .unwrap_or(DEFAULT_THROTTLE_MAX_RETRIES),
            record_poll_interval: secs(
                "PROVISIONER_RECORD_POLL_INTERVAL_SECS",
                DEFAULT_RECORD_POLL_INTERVAL_SECS,
            ),
            validation_poll_interval: secs(
                "PROVISIONER_VALIDATION_POLL_INTERVAL_SECS",
                DEFAULT_VALIDATION_POLL_INTERVAL_SECS,
            ),
            handoff_reserve: secs("PROVISIONER_HANDOFF_RESERVE_SECS", DEFAULT_HANDOFF_RESERVE_SECS),
            delete_retry_interval: secs(
                "PROVISIONER_DELETE_RETRY_INTERVAL_SECS",
                DEFAULT_DELETE_RETRY_INTERVAL_SECS,
            ),
            record_ttl: secs("PROVISIONER_RECORD_TTL_SECS", DEFAULT_RECORD_TTL_SECS),
            http_timeout: secs("PROVISIONER_HTTP_TIMEOUT_SECS", DEFAULT_HTTP_TIMEOUT_SECS),
            function_name: non_empty("AWS_LAMBDA_FUNCTION_NAME"),
            log_stream_name: non_empty("AWS_LAMBDA_LOG_STREAM_NAME"),
            deadline_ms: non_empty("PROVISIONER_DEADLINE_MS").and_then(|raw| {
                raw.trim()
                    .parse::<i64>()
                    .map_err(|err| {
                        warn!("[config] ignoring PROVISIONER_DEADLINE_MS {raw:?}: {err}")
                    })
                    .ok()
            }),
            invocation_budget: secs(
                "PROVISIONER_INVOCATION_BUDGET_SECS",
                DEFAULT_INVOCATION_BUDGET_SECS,
            ),
        }
    }

    pub fn throttle_policy(&self) -> RetryPolicy {
        RetryPolicy::new(Backoff::Linear(self.throttle_backoff))
            .with_max_retries(self.throttle_max_retries)
    }

    pub fn record_policy(&self) -> RetryPolicy {
        RetryPolicy::new(Backoff::Fixed(self.record_poll_interval))
    }

    pub fn validation_policy(&self) -> RetryPolicy {
        RetryPolicy::new(Backoff::Fixed(self.validation_poll_interval))
            .with_budget_reserve(self.handoff_reserve)
    }

    pub fn delete_policy(&self) -> RetryPolicy {
        RetryPolicy::new(Backoff::Fixed(self.delete_retry_interval))
    }

    /// TTL in the unit Route 53 expects.
    pub fn record_ttl_secs(&self) -> i64 {
        i64::try_from(self.record_ttl.as_secs()).unwrap_or(i64::from(u32::MAX))
    }
}

fn resolve_positive<F>(lookup: &F, key: &str, default: u64) -> u64
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return default;
    };
    match raw.trim().parse::<u64>() {
        Ok(0) | Err(_) => {
            warn!("[config] invalid value for {key}: {raw:?}; using default {default}");
            default
        }
        Ok(value) => value,
    }
}
