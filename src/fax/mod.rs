//! Fax Transmission Lifecycle
//!
//! Owns the canonical status model and the submission service that
//! drives a document from API request to carrier acceptance.
//!
//! # Lifecycle
//!
//! ```text
//! QUEUED → PROCESSING → SENDING → DELIVERED
//!                          ↓    ↘ FAILED / BUSY / NO_ANSWER / CANCELLED
//! ```
//!
//! # Safety Invariants
//!
//! 1. **One call per submit**: `FaxService::send` issues exactly one
//!    carrier API call per invocation; retries happen above it
//! 2. **Monotonic status**: rank never decreases, terminal records
//!    never change again
//! 3. **First-write-wins timestamps**: `sent_at` / `completed_at` keep
//!    the earliest observed value

pub mod error;
pub mod service;
pub mod status;
pub mod types;

// Re-exports for convenience
pub use error::FaxError;
pub use service::{FaxService, RetryPolicy};
pub use status::FaxStatus;
pub use types::{
    AttachmentRef, Document, FaxRecord, SendRequest, StatusUpdate, WebhookEvent,
};
