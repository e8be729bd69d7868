//! Fax Record Persistence
//!
//! The persistence gateway behind both signal paths. All state updates go
//! through one atomic conditional write; that write, not an in-process
//! lock, is the record-level serialization point, so webhook handling and
//! poll sweeps may run in separate processes.

#[cfg(test)]
mod integration_tests;
pub mod memory;
pub mod postgres;

pub use memory::MemoryFaxStore;
pub use postgres::PgFaxStore;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::carrier::CarrierKind;
use crate::fax::types::{FaxRecord, StatusUpdate, WebhookEvent};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Corrupt record {external_id}: {reason}")]
    Corrupt { external_id: String, reason: String },

    #[error("Encoding error: {0}")]
    Encoding(String),
}

#[async_trait]
pub trait FaxStore: Send + Sync {
    /// Insert a new record, returning its engine-assigned id. Idempotent
    /// on `(carrier, external_id)`: re-creating an already tracked fax
    /// returns the existing id.
    async fn create(&self, record: &FaxRecord) -> Result<Uuid, StoreError>;

    /// Look up by the carrier-assigned id. External ids are only unique
    /// within one carrier, so the pair is the key.
    async fn get_by_external_id(
        &self,
        carrier: CarrierKind,
        external_id: &str,
    ) -> Result<Option<FaxRecord>, StoreError>;

    /// Conditional status write: applies only while the stored record is
    /// non-terminal and the incoming status does not regress the
    /// lifecycle. `false` means the guard rejected it.
    ///
    /// Timestamps are first-write-wins and cost/pages never decrease, so
    /// whichever signal path loses a race cannot clobber facts.
    async fn update_if_active(
        &self,
        carrier: CarrierKind,
        external_id: &str,
        update: &StatusUpdate,
    ) -> Result<bool, StoreError>;

    /// Append the event to the audit log if its id is new.
    /// `true` = recorded, `false` = duplicate event id.
    async fn record_webhook_event(&self, event: &WebhookEvent) -> Result<bool, StoreError>;
}
