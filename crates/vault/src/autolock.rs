//! Inactivity auto-lock: one cancellable delayed task per vault.

use std::{
    sync::{
        Arc, Mutex, Weak,
        atomic::{AtomicU32, AtomicU64, Ordering},
    },
    time::Duration,
};

use tokio::task::JoinHandle;

#[cfg(feature = "metrics")]
use ledgerlock_metrics::{counter, gauge, vault as vault_metrics};

use crate::session::Session;

/// Clears a [`Session`] after a period without vault activity.
///
/// [`arm`](Self::arm) is the single rearm operation: it cancels whatever was
/// pending and schedules a fresh deadline. A duration of 0 minutes disables
/// the timer.
pub struct AutoLockTimer {
    minutes: AtomicU32,
    generation: Arc<AtomicU64>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl AutoLockTimer {
    pub fn new(minutes: u32) -> Self {
        Self {
            minutes: AtomicU32::new(minutes),
            generation: Arc::new(AtomicU64::new(0)),
            handle: Mutex::new(None),
        }
    }

    /// Configured duration in minutes (0 = never).
    pub fn minutes(&self) -> u32 {
        self.minutes.load(Ordering::SeqCst)
    }

    /// Change the duration. Applies from the next [`arm`](Self::arm); a
    /// pending deadline is left as it was.
    pub fn set_minutes(&self, minutes: u32) {
        self.minutes.store(minutes, Ordering::SeqCst);
    }

    /// Cancel any pending deadline and schedule a new one.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn arm(&self, session: &Arc<Session>) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let mut slot = self.handle.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = slot.take() {
            previous.abort();
        }

        let minutes = self.minutes();
        if minutes == 0 {
            return;
        }

        let delay = Duration::from_secs(u64::from(minutes) * 60);
        let current = Arc::clone(&self.generation);
        let session: Weak<Session> = Arc::downgrade(session);
        *slot = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // A rearm that raced the wakeup wins.
            if current.load(Ordering::SeqCst) != generation {
                return;
            }
            let Some(session) = session.upgrade() else {
                return;
            };
            if session.clear().await {
                #[cfg(feature = "metrics")]
                {
                    counter!(vault_metrics::AUTO_LOCKS_TOTAL).increment(1);
                    gauge!(vault_metrics::UNLOCKED).set(0.0);
                }

                #[cfg(feature = "tracing")]
                tracing::info!(minutes, "vault auto-locked after inactivity");
            }
        }));
    }

    /// Cancel the pending deadline, if any.
    pub fn cancel(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        let mut slot = self.handle.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(handle) = slot.take() {
            handle.abort();
        }
    }

    /// Whether a deadline is pending.
    pub fn is_armed(&self) -> bool {
        let slot = self.handle.lock().unwrap_or_else(|e| e.into_inner());
        slot.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for AutoLockTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}
