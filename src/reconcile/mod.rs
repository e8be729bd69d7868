//! Status Reconciliation
//!
//! Two independent signal paths converge on the fax record store:
//! webhooks pushed by the carrier and periodic poll sweeps. Both are
//! replayed through [`ReconcileEngine`], which journals webhook events
//! for dedup and funnels every proposed transition into the store's
//! conditional write. Ordering across the two paths comes from the
//! status rank, not from arrival time.

pub mod engine;
pub mod poller;

// Re-exports for convenience
pub use engine::{ReconcileEngine, Reconciled};
pub use poller::{StatusPoller, SweepStats};
