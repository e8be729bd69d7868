//! In-memory Fax Store
//!
//! Backs tests and single-process deployments. Applies the same
//! transition guard as the PostgreSQL store so the two are
//! interchangeable behind [`FaxStore`].

use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{FaxStore, StoreError};
use crate::carrier::CarrierKind;
use crate::fax::status::TERMINAL_RANK;
use crate::fax::types::{FaxRecord, StatusUpdate, WebhookEvent};

// External ids are only unique within one carrier, hence the pair key
#[derive(Default)]
pub struct MemoryFaxStore {
    records: Mutex<HashMap<(CarrierKind, String), FaxRecord>>,
    events: Mutex<HashMap<String, WebhookEvent>>,
}

impl MemoryFaxStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored webhook events, duplicates excluded.
    pub async fn event_count(&self) -> usize {
        self.events.lock().await.len()
    }
}

#[async_trait::async_trait]
impl FaxStore for MemoryFaxStore {
    async fn create(&self, record: &FaxRecord) -> Result<Uuid, StoreError> {
        let mut records = self.records.lock().await;
        let key = (record.carrier, record.external_id.clone());
        if let Some(existing) = records.get(&key) {
            return Ok(existing.id);
        }
        records.insert(key, record.clone());
        Ok(record.id)
    }

    async fn get_by_external_id(
        &self,
        carrier: CarrierKind,
        external_id: &str,
    ) -> Result<Option<FaxRecord>, StoreError> {
        Ok(self
            .records
            .lock()
            .await
            .get(&(carrier, external_id.to_string()))
            .cloned())
    }

    async fn update_if_active(
        &self,
        carrier: CarrierKind,
        external_id: &str,
        update: &StatusUpdate,
    ) -> Result<bool, StoreError> {
        let mut records = self.records.lock().await;
        let Some(record) = records.get_mut(&(carrier, external_id.to_string())) else {
            return Ok(false);
        };
        if record.status.rank() >= TERMINAL_RANK || record.status.rank() > update.status.rank() {
            return Ok(false);
        }

        record.status = update.status;
        record.original_status = update.original_status.clone();
        record.cost = match (record.cost, update.cost) {
            (Some(current), Some(new)) => Some(current.max(new)),
            (current, new) => new.or(current),
        };
        record.pages = match (record.pages, update.pages) {
            (Some(current), Some(new)) => Some(current.max(new)),
            (current, new) => new.or(current),
        };
        record.sent_at = record.sent_at.or(update.sent_at);
        record.completed_at = record.completed_at.or(update.completed_at);
        Ok(true)
    }

    async fn record_webhook_event(&self, event: &WebhookEvent) -> Result<bool, StoreError> {
        let mut events = self.events.lock().await;
        if events.contains_key(&event.event_id) {
            return Ok(false);
        }
        events.insert(event.event_id.clone(), event.clone());
        Ok(true)
    }
}
