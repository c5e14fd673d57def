use std::time::Duration;

use log::{debug, info, warn};

use crate::core::errors::ProvisionError;
use crate::providers::{Clock, InvocationBudgetSource};

/// Delay applied before the n-th retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    Fixed(Duration),
    /// `retry × step`: 5s, 10s, 15s… for a 5s step.
    Linear(Duration),
}

impl Backoff {
    pub fn delay(&self, retry: u32) -> Duration {
        match self {
            Backoff::Fixed(interval) => *interval,
            Backoff::Linear(step) => step.saturating_mul(retry),
        }
    }
}

/// How an operation is repeated until it reports ready.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub backoff: Backoff,
    /// `None` retries forever.
    pub max_retries: Option<u32>,
    /// Stop instead of sleeping once the invocation has this much time left or less.
    pub budget_reserve: Option<Duration>,
}

impl RetryPolicy {
    pub fn new(backoff: Backoff) -> Self {
        Self {
            backoff,
            max_retries: None,
            budget_reserve: None,
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    pub fn with_budget_reserve(mut self, reserve: Duration) -> Self {
        self.budget_reserve = Some(reserve);
        self
    }
}

/// Result of a single attempt.
#[derive(Debug)]
pub enum Step<T> {
    Ready(T),
    /// Not there yet; the string says why and ends up in the logs.
    Retry(String),
}

/// How a retry loop ended without error.
#[derive(Debug, PartialEq, Eq)]
pub enum Finished<T> {
    Ready(T),
    /// The budget reserve was reached while the operation was still not ready.
    OutOfBudget { attempts: u32 },
}

impl<T> Finished<T> {
    /// The ready value, treating an exhausted budget as an error.
    pub fn into_ready(self, operation: &'static str) -> Result<T, ProvisionError> {
        match self {
            Finished::Ready(value) => Ok(value),
            Finished::OutOfBudget { attempts } => {
                Err(ProvisionError::BudgetExhausted { operation, attempts })
            }
        }
    }
}

/// Runs `attempt_fn` until it returns [`Step::Ready`], sleeping on `clock` between attempts.
///
/// The closure receives the 1-based attempt number and decides itself which provider errors
/// are worth another attempt:
/// - `Ok(Step::Ready(_))` finishes the loop
/// - `Ok(Step::Retry(_))` sleeps according to the policy and tries again
/// - `Err(_)` fails immediately
///
/// With `max_retries` set, a retry request beyond the cap fails with
/// [`ProvisionError::RetriesExhausted`]. With `budget_reserve` set, the budget is checked
/// before each sleep and the loop ends with [`Finished::OutOfBudget`] once the remaining
/// time is at or below the reserve.
pub fn retry_with_policy<T, F>(
    clock: &dyn Clock,
    budget: &dyn InvocationBudgetSource,
    policy: &RetryPolicy,
    operation: &'static str,
    mut attempt_fn: F,
) -> Result<Finished<T>, ProvisionError>
where
    F: FnMut(u32) -> Result<Step<T>, ProvisionError>,
{
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        debug!("[retry] {} attempt {}", operation, attempt);

        let reason = match attempt_fn(attempt)? {
            Step::Ready(value) => {
                if attempt > 1 {
                    debug!("[retry] {} ready after {} attempts", operation, attempt);
                }
                return Ok(Finished::Ready(value));
            }
            Step::Retry(reason) => reason,
        };

        let retry = attempt;
        if let Some(max_retries) = policy.max_retries
            && retry > max_retries
        {
            warn!(
                "[retry] {} giving up after {} retries: {}",
                operation, max_retries, reason
            );
            return Err(ProvisionError::RetriesExhausted {
                operation,
                retries: max_retries,
                last: reason,
            });
        }

        if let Some(reserve) = policy.budget_reserve {
            let remaining = budget.remaining();
            if remaining <= reserve {
                info!(
                    "[retry] {} not ready after {} attempts with {}s of invocation time left",
                    operation,
                    attempt,
                    remaining.as_secs()
                );
                return Ok(Finished::OutOfBudget { attempts: attempt });
            }
        }

        let delay = policy.backoff.delay(retry);
        debug!(
            "[retry] {} not ready ({}), waiting {}s before retry {}",
            operation,
            reason,
            delay.as_secs(),
            retry
        );
        clock.sleep(delay);
    }
}
