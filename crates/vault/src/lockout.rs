//! Failed-attempt lockout policy.
//!
//! A pure mapping from the failed-attempt counter to a lock duration. The
//! counter itself lives in the metadata record and is only ever reset by a
//! correct PIN, so the lock keeps escalating across expiries.

use std::time::Duration;

use crate::error::VaultError;

/// Lockout thresholds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockoutPolicy {
    /// Attempts at which the short lock starts.
    pub short_threshold: u32,
    /// Short lock length.
    pub short_lock: Duration,
    /// Attempts at which the long lock starts.
    pub long_threshold: u32,
    /// Long lock length.
    pub long_lock: Duration,
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self {
            short_threshold: 3,
            short_lock: Duration::from_secs(60),
            long_threshold: 5,
            long_lock: Duration::from_secs(5 * 60),
        }
    }
}

impl From<&ledgerlock_config::LockoutConfig> for LockoutPolicy {
    fn from(cfg: &ledgerlock_config::LockoutConfig) -> Self {
        Self {
            short_threshold: cfg.short_threshold,
            short_lock: Duration::from_secs(cfg.short_lock_minutes * 60),
            long_threshold: cfg.long_threshold,
            long_lock: Duration::from_secs(cfg.long_lock_minutes * 60),
        }
    }
}

impl LockoutPolicy {
    /// Lock duration for a failed-attempt count, `None` below the first threshold.
    ///
    /// Monotonic in `attempts` as long as `long_threshold > short_threshold`
    /// and `long_lock >= short_lock` (enforced by config validation).
    #[must_use]
    pub fn lock_duration(&self, attempts: u32) -> Option<Duration> {
        if attempts >= self.long_threshold {
            Some(self.long_lock)
        } else if attempts >= self.short_threshold {
            Some(self.short_lock)
        } else {
            None
        }
    }

    /// The new `lock_until` deadline after a failure brought the counter to `attempts`.
    ///
    /// Returns 0 (no lock) below the first threshold.
    #[must_use]
    pub fn lock_until(&self, attempts: u32, now_ms: u64) -> u64 {
        self.lock_duration(attempts)
            .map(|d| now_ms.saturating_add(d.as_millis() as u64))
            .unwrap_or(0)
    }

    /// Reject immediately while a lock is active. Read-only.
    pub fn check(lock_until_ms: u64, now_ms: u64) -> Result<(), VaultError> {
        if now_ms < lock_until_ms {
            return Err(VaultError::LockedOut {
                remaining_minutes: remaining_minutes(lock_until_ms - now_ms),
            });
        }
        Ok(())
    }
}

/// Whole minutes, rounded up, so a 10-second remainder still reads "1 minute".
fn remaining_minutes(ms: u64) -> u64 {
    ms.div_ceil(60_000)
}
