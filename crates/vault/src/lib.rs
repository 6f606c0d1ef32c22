//! PIN-gated encryption-at-rest vault for ledger data.
//!
//! A random data key encrypts each business domain (transactions, inventory,
//! credits, profits, settings, profile) with XChaCha20-Poly1305. The data key
//! is wrapped under an unlock key derived from the user's PIN via Argon2id,
//! and optionally escrowed behind a platform biometric key. Trait-based
//! [`Cipher`] and store designs allow swapping the encryption and storage
//! backends.

pub mod autolock;
pub mod biometric;
pub mod clock;
pub mod domain;
pub mod error;
pub mod kdf;
pub mod key_wrap;
pub mod lockout;
pub mod meta;
pub mod migration;
pub mod records;
pub mod session;
pub mod store;
pub mod store_memory;
pub mod store_sqlite;
pub mod traits;
pub mod vault;
pub mod xchacha20;

pub use {
    biometric::{BiometricAuthenticator, NoBiometrics},
    clock::{Clock, ManualClock, SystemClock},
    domain::Domain,
    error::VaultError,
    kdf::KdfParams,
    lockout::LockoutPolicy,
    migration::{MigrationReport, MigrationService},
    records::DomainRecord,
    store::{BlobStore, MetaStore, VaultStore},
    store_memory::InMemoryStore,
    store_sqlite::SqliteStore,
    traits::Cipher,
    vault::{SecurityStatus, Vault, VaultOptions, VaultStatus},
    xchacha20::XChaCha20Poly1305Cipher,
};

/// Run database migrations for the vault crate.
///
/// Creates the `vault_metadata` and `kv_store` tables.
pub async fn run_migrations(pool: &sqlx::SqlitePool) -> Result<(), VaultError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}
