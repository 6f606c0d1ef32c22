//! In-memory unlock session: the only place the unwrapped data key lives.
//!
//! Owned by one [`Vault`](crate::Vault) instance, never global, so several
//! vaults can coexist in one process (tests do exactly that).

use {
    tokio::sync::{RwLock, RwLockReadGuard},
    zeroize::Zeroizing,
};

use crate::error::VaultError;

/// A borrowed data key. Holding it keeps the session from being cleared, so
/// an operation that captured the key finishes with that key before any lock
/// takes effect.
pub type SessionKey<'a> = RwLockReadGuard<'a, Zeroizing<[u8; 32]>>;

/// The data key while unlocked, `None` while locked.
#[derive(Default)]
pub struct Session {
    dek: RwLock<Option<Zeroizing<[u8; 32]>>>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the data key. Replaces (and zeroizes) any previous key.
    pub async fn open(&self, dek: Zeroizing<[u8; 32]>) {
        *self.dek.write().await = Some(dek);
    }

    /// Drop the data key. Waits for in-flight holders of [`SessionKey`].
    ///
    /// Returns whether the session was open.
    pub async fn clear(&self) -> bool {
        self.dek.write().await.take().is_some()
    }

    pub async fn is_open(&self) -> bool {
        self.dek.read().await.is_some()
    }

    /// Borrow the data key, failing fast with [`VaultError::Locked`].
    pub async fn key(&self) -> Result<SessionKey<'_>, VaultError> {
        let guard = self.dek.read().await;
        RwLockReadGuard::try_map(guard, |dek| dek.as_ref()).map_err(|_| VaultError::Locked)
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, std::sync::Arc, std::time::Duration};

    #[tokio::test]
    async fn locked_by_default() {
        let session = Session::new();
        assert!(!session.is_open().await);
        assert!(matches!(session.key().await, Err(VaultError::Locked)));
    }

    #[tokio::test]
    async fn open_then_clear() {
        let session = Session::new();
        session.open(Zeroizing::new([7u8; 32])).await;
        assert_eq!(**session.key().await.unwrap(), [7u8; 32]);

        assert!(session.clear().await);
        assert!(!session.clear().await);
        assert!(matches!(session.key().await, Err(VaultError::Locked)));
    }

    #[tokio::test]
    async fn clear_waits_for_captured_key() {
        let session = Arc::new(Session::new());
        session.open(Zeroizing::new([1u8; 32])).await;

        let key = session.key().await.unwrap();
        let clearer = {
            let session = Arc::clone(&session);
            tokio::spawn(async move { session.clear().await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!clearer.is_finished());
        assert_eq!(**key, [1u8; 32]);
        drop(key);

        assert!(clearer.await.unwrap());
        assert!(!session.is_open().await);
    }

    #[tokio::test]
    async fn independent_sessions() {
        let a = Session::new();
        let b = Session::new();
        a.open(Zeroizing::new([1u8; 32])).await;
        assert!(a.is_open().await);
        assert!(!b.is_open().await);
    }
}
