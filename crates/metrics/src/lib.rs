//! Metrics facade for ledgerlock.
//!
//! Library crates record through the `metrics` macros re-exported here; the
//! embedding application decides whether a recorder is installed. Without
//! one every call is a no-op.
//!
//! ```rust,ignore
//! use ledgerlock_metrics::{counter, vault};
//!
//! counter!(vault::UNLOCK_ATTEMPTS_TOTAL, "result" => "success").increment(1);
//! ```

mod definitions;

pub use definitions::*;

pub use metrics::{counter, gauge, histogram};
