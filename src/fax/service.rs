//! Fax Submission Service
//!
//! Drives one send request through payload build, carrier submission
//! and record creation. The adapter makes exactly one API call per
//! submit invocation; retry lives here, and only transport errors are
//! retried. A rejection or an ambiguous 2xx response must never
//! trigger a second submission.

use std::sync::Arc;

use chrono::Utc;
use tokio::time::{Duration, sleep};
use tracing::{info, warn};
use uuid::Uuid;

use crate::carrier::{CarrierAccepted, CarrierClient, CarrierError, CarrierPayload};
use crate::store::FaxStore;

use super::error::FaxError;
use super::types::{FaxRecord, SendRequest};

/// Retry policy for transport failures during submission
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total submit attempts, first try included
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles each further attempt
    pub base_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 100,
        }
    }
}

pub struct FaxService {
    carrier: Arc<dyn CarrierClient>,
    store: Arc<dyn FaxStore>,
    retry: RetryPolicy,
}

impl FaxService {
    pub fn new(carrier: Arc<dyn CarrierClient>, store: Arc<dyn FaxStore>) -> Self {
        Self::with_retry(carrier, store, RetryPolicy::default())
    }

    pub fn with_retry(
        carrier: Arc<dyn CarrierClient>,
        store: Arc<dyn FaxStore>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            carrier,
            store,
            retry,
        }
    }

    /// Submit a fax and persist its initial record.
    ///
    /// Returns the stored record; if the carrier id was already
    /// tracked, the original record id is handed back.
    pub async fn send(&self, request: SendRequest) -> Result<FaxRecord, FaxError> {
        let payload = self.build_payload(&request).await?;
        let accepted = self.submit_with_retry(&payload).await?;

        let record = FaxRecord {
            id: Uuid::new_v4(),
            carrier: self.carrier.kind(),
            external_id: accepted.external_id.clone(),
            status: self.carrier.map_status(&accepted.raw_status),
            original_status: accepted.raw_status.clone(),
            recipients: request.recipients.clone(),
            attachments: request
                .documents
                .iter()
                .map(|d| d.as_attachment_ref())
                .collect(),
            cost: None,
            pages: None,
            created_at: Utc::now(),
            sent_at: None,
            completed_at: None,
        };

        let id = self.store.create(&record).await?;
        info!(
            "Fax {} accepted by {} as {} ({})",
            id, record.carrier, record.external_id, record.status
        );

        Ok(FaxRecord { id, ..record })
    }

    /// Build the carrier payload, retrying URL issuance once.
    ///
    /// Signing and upload failures happen before any carrier call, so
    /// one retry cannot double-send; everything else surfaces as-is.
    async fn build_payload(&self, request: &SendRequest) -> Result<CarrierPayload, FaxError> {
        match self.carrier.build_payload(request).await {
            Err(e @ (CarrierError::Signing(_) | CarrierError::Storage(_))) => {
                warn!("Payload build failed ({}), retrying once", e);
                Ok(self.carrier.build_payload(request).await?)
            }
            other => Ok(other?),
        }
    }

    async fn submit_with_retry(
        &self,
        payload: &CarrierPayload,
    ) -> Result<CarrierAccepted, FaxError> {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut delay_ms = self.retry.base_delay_ms;
        let mut attempt = 0;

        loop {
            attempt += 1;
            match self.carrier.submit(payload).await {
                Ok(accepted) => return Ok(accepted),
                Err(e) if e.is_retryable() && attempt < max_attempts => {
                    warn!(
                        "Submit attempt {}/{} failed: {}. Retrying in {}ms",
                        attempt, max_attempts, e, delay_ms
                    );
                    sleep(Duration::from_millis(delay_ms)).await;
                    delay_ms *= 2;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::carrier::{CarrierKind, MockCarrier};
    use crate::fax::status::FaxStatus;
    use crate::fax::types::Document;
    use crate::store::MemoryFaxStore;

    fn request() -> SendRequest {
        SendRequest {
            recipients: vec!["+15551234567".to_string()],
            documents: vec![Document::Inline {
                filename: "claim.pdf".to_string(),
                content_type: "application/pdf".to_string(),
                bytes: vec![0u8; 64],
            }],
            sender_id: None,
            client_reference: Some("case-42".to_string()),
        }
    }

    fn service(carrier: Arc<MockCarrier>, store: Arc<MemoryFaxStore>) -> FaxService {
        FaxService::with_retry(
            carrier,
            store,
            RetryPolicy {
                max_attempts: 3,
                base_delay_ms: 1,
            },
        )
    }

    #[tokio::test]
    async fn send_creates_queued_record() {
        let carrier = Arc::new(MockCarrier::new(CarrierKind::Notifyre));
        carrier.set_external_id("fax-abc-123");
        let store = Arc::new(MemoryFaxStore::new());
        let svc = service(carrier.clone(), store.clone());

        let record = svc.send(request()).await.unwrap();

        assert_eq!(record.external_id, "fax-abc-123");
        assert_eq!(record.status, FaxStatus::Queued);
        assert_eq!(record.attachments.len(), 1);
        assert_eq!(carrier.submit_count(), 1);

        let stored = store
            .get_by_external_id(CarrierKind::Notifyre, "fax-abc-123")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.id, record.id);
    }

    #[tokio::test]
    async fn transport_failures_are_retried() {
        let carrier = Arc::new(MockCarrier::new(CarrierKind::Telnyx));
        carrier.fail_transport_times(2);
        let store = Arc::new(MemoryFaxStore::new());
        let svc = service(carrier.clone(), store);

        let record = svc.send(request()).await.unwrap();

        assert_eq!(carrier.submit_count(), 3);
        assert_eq!(record.status, FaxStatus::Queued);
    }

    #[tokio::test]
    async fn transport_exhaustion_surfaces() {
        let carrier = Arc::new(MockCarrier::new(CarrierKind::Notifyre));
        carrier.fail_transport_times(10);
        let store = Arc::new(MemoryFaxStore::new());
        let svc = service(carrier.clone(), store);

        let err = svc.send(request()).await.unwrap_err();

        assert!(matches!(err, FaxError::Transport(_)));
        assert_eq!(carrier.submit_count(), 3);
    }

    #[tokio::test]
    async fn rejection_is_never_retried() {
        let carrier = Arc::new(MockCarrier::new(CarrierKind::Notifyre));
        carrier.reject_with(422, "unroutable number");
        let store = Arc::new(MemoryFaxStore::new());
        let svc = service(carrier.clone(), store);

        let err = svc.send(request()).await.unwrap_err();

        assert!(matches!(err, FaxError::CarrierRejected { status: 422, .. }));
        assert_eq!(carrier.submit_count(), 1);
    }

    #[tokio::test]
    async fn invalid_request_never_reaches_the_carrier() {
        let carrier = Arc::new(MockCarrier::new(CarrierKind::Notifyre));
        let store = Arc::new(MemoryFaxStore::new());
        let svc = service(carrier.clone(), store);

        let mut bad = request();
        bad.recipients.clear();
        let err = svc.send(bad).await.unwrap_err();

        assert!(matches!(err, FaxError::Validation(_)));
        assert_eq!(carrier.submit_count(), 0);
    }
}
