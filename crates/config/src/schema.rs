/// Config schema types (vault, key derivation, lockout).
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerlockConfig {
    pub vault: VaultConfig,
    pub kdf: KdfConfig,
    pub lockout: LockoutConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    /// Inactivity timeout for newly created vaults. 0 disables auto-lock.
    pub auto_lock_minutes: u32,
    /// SQLite database file. Defaults to `<data_dir>/ledgerlock.db`.
    pub database_path: Option<PathBuf>,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            auto_lock_minutes: 5,
            database_path: None,
        }
    }
}

/// Argon2id cost parameters used when a vault is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KdfConfig {
    /// Memory cost in KiB.
    pub m_cost: u32,
    pub t_cost: u32,
    pub p_cost: u32,
}

impl Default for KdfConfig {
    fn default() -> Self {
        Self {
            m_cost: 65536,
            t_cost: 3,
            p_cost: 1,
        }
    }
}

/// Failed-attempt thresholds and lock lengths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockoutConfig {
    pub short_threshold: u32,
    pub short_lock_minutes: u64,
    pub long_threshold: u32,
    pub long_lock_minutes: u64,
}

impl Default for LockoutConfig {
    fn default() -> Self {
        Self {
            short_threshold: 3,
            short_lock_minutes: 1,
            long_threshold: 5,
            long_lock_minutes: 5,
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_gives_defaults() {
        let cfg: LedgerlockConfig = toml::from_str("").unwrap();
        assert_eq!(cfg, LedgerlockConfig::default());
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let cfg: LedgerlockConfig = toml::from_str(
            r#"
            [lockout]
            long_lock_minutes = 30
            "#,
        )
        .unwrap();
        assert_eq!(cfg.lockout.long_lock_minutes, 30);
        assert_eq!(cfg.lockout.short_threshold, 3);
        assert_eq!(cfg.kdf.m_cost, 65536);
    }
}
