//! Reconciliation Engine
//!
//! Applies carrier status signals to stored fax records. A signal is
//! mapped to the canonical status, then handed to the store's
//! conditional write, which only accepts it when the record is still
//! active and the rank does not regress. Everything else is reported
//! back as a distinct outcome so callers can account for it.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::carrier::{CarrierKind, PolledFax, status_map};
use crate::fax::types::{StatusUpdate, WebhookEvent};
use crate::store::{FaxStore, StoreError};

/// Outcome of one reconciliation attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciled {
    /// Transition accepted and written
    Applied,
    /// Webhook event id seen before, acknowledged without reapplying
    Duplicate,
    /// Local record already terminal, signal dropped
    AlreadyTerminal,
    /// Signal lost to a higher-ranked status, discarded
    Superseded,
    /// No record under that external id
    Unknown,
}

pub struct ReconcileEngine {
    store: Arc<dyn FaxStore>,
    carrier: CarrierKind,
}

impl ReconcileEngine {
    pub fn new(store: Arc<dyn FaxStore>, carrier: CarrierKind) -> Self {
        Self { store, carrier }
    }

    pub fn carrier(&self) -> CarrierKind {
        self.carrier
    }

    /// Apply a webhook event.
    ///
    /// The event is journaled before any state change; a replayed
    /// event id is acknowledged as [`Reconciled::Duplicate`] and the
    /// record is left alone.
    pub async fn apply_webhook(&self, event: &WebhookEvent) -> Result<Reconciled, StoreError> {
        if !self.store.record_webhook_event(event).await? {
            debug!("Webhook {} already processed", event.event_id);
            return Ok(Reconciled::Duplicate);
        }

        let Some(record) = self
            .store
            .get_by_external_id(self.carrier, &event.external_id)
            .await?
        else {
            warn!(
                "Webhook {} references unknown fax {}",
                event.event_id, event.external_id
            );
            return Ok(Reconciled::Unknown);
        };

        let status = status_map::map_raw(self.carrier, &event.raw_status);
        let update = StatusUpdate::from_signal(
            status,
            &event.raw_status,
            event.cost,
            event.pages,
            event.occurred_at,
        );

        if self
            .store
            .update_if_active(self.carrier, &event.external_id, &update)
            .await?
        {
            info!(
                "Fax {}: {} -> {} (webhook {})",
                event.external_id, record.status, status, event.event_id
            );
            return Ok(Reconciled::Applied);
        }

        if record.status.is_terminal() {
            debug!(
                "Fax {} already terminal ({}), webhook status '{}' dropped",
                event.external_id, record.status, event.raw_status
            );
            Ok(Reconciled::AlreadyTerminal)
        } else {
            info!(
                "Fax {} kept {} over late webhook status '{}'",
                event.external_id, record.status, event.raw_status
            );
            Ok(Reconciled::Superseded)
        }
    }

    /// Apply one polled snapshot.
    ///
    /// Polling backstops webhooks, so most snapshots describe records
    /// that are already terminal; those are skipped before touching
    /// the store's write path.
    pub async fn apply_polled(&self, polled: &PolledFax) -> Result<Reconciled, StoreError> {
        let Some(record) = self
            .store
            .get_by_external_id(self.carrier, &polled.external_id)
            .await?
        else {
            debug!("Polled fax {} is not tracked here", polled.external_id);
            return Ok(Reconciled::Unknown);
        };

        if record.status.is_terminal() {
            return Ok(Reconciled::AlreadyTerminal);
        }

        let status = status_map::map_raw(self.carrier, &polled.raw_status);
        let update = StatusUpdate::from_signal(
            status,
            &polled.raw_status,
            polled.cost,
            polled.pages,
            polled.completed_at,
        );

        if self
            .store
            .update_if_active(self.carrier, &polled.external_id, &update)
            .await?
        {
            info!(
                "Fax {}: {} -> {} (poll)",
                polled.external_id, record.status, status
            );
            Ok(Reconciled::Applied)
        } else {
            info!(
                "Fax {} kept {} over polled status '{}'",
                polled.external_id, record.status, polled.raw_status
            );
            Ok(Reconciled::Superseded)
        }
    }
}
