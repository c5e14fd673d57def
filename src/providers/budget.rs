use std::time::{Duration, Instant};

use chrono::Utc;
use log::warn;

use crate::config::ProvisionerConfig;

use super::{Clock, InvocationBudgetSource};

/// Real wall-clock sleeps.
pub struct SystemClock;

impl Clock for SystemClock {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Time left until a fixed deadline of the current invocation.
#[derive(Debug, Clone, Copy)]
pub struct DeadlineBudget {
    deadline: Instant,
}

impl DeadlineBudget {
    pub fn new(deadline: Instant) -> Self {
        Self { deadline }
    }

    /// Deadline `budget` from now.
    pub fn after(budget: Duration) -> Self {
        Self::new(Instant::now() + budget)
    }

    /// Deadline given as wall-clock epoch milliseconds, as Lambda reports it.
    pub fn from_epoch_millis(deadline_ms: i64) -> Self {
        let left_ms = deadline_ms.saturating_sub(Utc::now().timestamp_millis()).max(0);
        Self::after(Duration::from_millis(left_ms.unsigned_abs()))
    }

    /// Prefers the absolute deadline; otherwise counts `invocation_budget` from now.
    pub fn from_config(config: &ProvisionerConfig) -> Self {
        match config.deadline_ms {
            Some(deadline_ms) => Self::from_epoch_millis(deadline_ms),
            None => {
                warn!(
                    "[budget] PROVISIONER_DEADLINE_MS not set; assuming {}s of invocation time, \
                     hand-off fails if the function timeout is shorter",
                    config.invocation_budget.as_secs()
                );
                Self::after(config.invocation_budget)
            }
        }
    }
}

impl InvocationBudgetSource for DeadlineBudget {
    fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }
}
