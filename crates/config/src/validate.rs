//! Semantic checks that serde cannot express.

use crate::{error::Error, schema::LedgerlockConfig};

/// Smallest Argon2 memory cost accepted outside tests (KiB).
const MIN_M_COST: u32 = 8 * 1024;

/// Reject configurations that would weaken or break the vault.
///
/// The lockout schedule must escalate: the long lock starts after more
/// failures than the short lock and lasts at least as long.
pub fn validate(config: &LedgerlockConfig) -> Result<(), Error> {
    let mut problems = Vec::new();
    let lockout = &config.lockout;

    if lockout.short_threshold == 0 {
        problems.push("lockout.short_threshold must be at least 1".to_string());
    }
    if lockout.long_threshold <= lockout.short_threshold {
        problems.push(format!(
            "lockout.long_threshold ({}) must be greater than lockout.short_threshold ({})",
            lockout.long_threshold, lockout.short_threshold
        ));
    }
    if lockout.long_lock_minutes < lockout.short_lock_minutes {
        problems.push(format!(
            "lockout.long_lock_minutes ({}) must not be shorter than lockout.short_lock_minutes ({})",
            lockout.long_lock_minutes, lockout.short_lock_minutes
        ));
    }

    let kdf = &config.kdf;
    if kdf.m_cost < MIN_M_COST {
        problems.push(format!("kdf.m_cost must be at least {MIN_M_COST} KiB"));
    }
    if kdf.t_cost == 0 || kdf.p_cost == 0 {
        problems.push("kdf.t_cost and kdf.p_cost must be at least 1".to_string());
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(Error::Invalid(problems))
    }
}
