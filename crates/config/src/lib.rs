//! Configuration loading, validation and env substitution.
//!
//! Config files: `ledgerlock.toml`, `ledgerlock.yaml`, or `ledgerlock.json`
//! Searched in `./` then `~/.config/ledgerlock/`.
//!
//! Supports `${ENV_VAR}` and `${ENV_VAR:-default}` substitution before parsing.

pub mod env_subst;
pub mod error;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    error::Error,
    loader::{
        clear_data_dir, config_dir, data_dir, database_path, discover_and_load, load_config,
        set_data_dir,
    },
    schema::{KdfConfig, LedgerlockConfig, LockoutConfig, VaultConfig},
    validate::validate,
};
