use std::{env, time::Duration};

use rand::Rng;

/// Retry policy for acquiring the transfer lock pair.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// Lock-pair attempts before giving up
    pub max_attempts: u32,
    /// How long a single attempt waits for each transfer lock
    pub lock_wait: Duration,
    /// First backoff ceiling, doubled on every failed attempt
    pub base_backoff: Duration,
    /// Upper bound for any single backoff
    pub max_backoff: Duration,
    /// Overall deadline for lock acquisition
    pub timeout: Duration,
}

fn env_u64(key: &str) -> Option<u64> {
    env::var(key).ok().and_then(|s| s.parse().ok())
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            max_attempts: env_u64("LEDGER_TRANSFER_MAX_ATTEMPTS")
                .map(|v| v.clamp(1, u32::MAX as u64) as u32)
                .unwrap_or(100),
            lock_wait: Duration::from_millis(env_u64("LEDGER_TRANSFER_LOCK_WAIT_MS").unwrap_or(5)),
            base_backoff: Duration::from_millis(
                env_u64("LEDGER_TRANSFER_BASE_BACKOFF_MS").unwrap_or(1),
            ),
            max_backoff: Duration::from_millis(
                env_u64("LEDGER_TRANSFER_MAX_BACKOFF_MS").unwrap_or(50),
            ),
            timeout: Duration::from_millis(env_u64("LEDGER_TRANSFER_TIMEOUT_MS").unwrap_or(5000)),
        }
    }
}

impl LedgerConfig {
    /// Create a configuration from `LEDGER_TRANSFER_*` environment variables
    pub fn from_env() -> Self {
        Self::default()
    }

    pub fn new(
        max_attempts: u32,
        lock_wait: Duration,
        base_backoff: Duration,
        max_backoff: Duration,
        timeout: Duration,
    ) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            lock_wait,
            base_backoff,
            max_backoff,
            timeout,
        }
    }

    /// Ceiling for the sleep after the given failed attempt (1-based).
    pub fn backoff_ceiling(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(31);
        self.base_backoff
            .saturating_mul(1 << shift)
            .min(self.max_backoff)
    }

    /// Random sleep in `0..=backoff_ceiling(attempt)`.
    ///
    /// Jitter keeps two transfers over the same pair from retrying in lockstep.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let ceiling = self.backoff_ceiling(attempt).as_micros() as u64;
        Duration::from_micros(rand::thread_rng().gen_range(0..=ceiling))
    }
}
