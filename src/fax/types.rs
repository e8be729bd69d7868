use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

use crate::carrier::CarrierKind;
use crate::fax::status::FaxStatus;

/// One fax transmission attempt, keyed internally by `id` and externally
/// by the carrier-assigned `external_id`.
#[derive(Debug, Clone, Serialize)]
pub struct FaxRecord {
    /// Engine-assigned, stable across all status changes
    pub id: Uuid,
    pub carrier: CarrierKind,
    /// Carrier-assigned identifier; with `carrier`, the reconciliation key
    pub external_id: String,
    pub status: FaxStatus,
    /// Last raw carrier status observed, kept verbatim for audit
    pub original_status: String,
    /// Ordered destination numbers, immutable after creation
    pub recipients: Vec<String>,
    pub attachments: Vec<AttachmentRef>,
    /// Filled by terminal or near-terminal signals; never decreases
    pub cost: Option<Decimal>,
    pub pages: Option<i32>,
    pub created_at: DateTime<Utc>,
    /// When transmission began; first write wins
    pub sent_at: Option<DateTime<Utc>>,
    /// When a terminal status was reached; first write wins
    pub completed_at: Option<DateTime<Utc>>,
}

/// What was submitted for a fax, recorded on the fax row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AttachmentRef {
    Inline { filename: String, size_bytes: u64 },
    External { url: String },
}

/// A document to transmit: either raw bytes carried in the request, or a
/// reference the carrier fetches itself.
#[derive(Debug, Clone)]
pub enum Document {
    Inline {
        filename: String,
        content_type: String,
        bytes: Vec<u8>,
    },
    External {
        url: Url,
    },
}

impl Document {
    /// Payload size for ceiling checks; external references are fetched
    /// by the carrier and have no local size.
    pub fn size_bytes(&self) -> Option<u64> {
        match self {
            Document::Inline { bytes, .. } => Some(bytes.len() as u64),
            Document::External { .. } => None,
        }
    }

    pub fn as_attachment_ref(&self) -> AttachmentRef {
        match self {
            Document::Inline {
                filename, bytes, ..
            } => AttachmentRef::Inline {
                filename: filename.clone(),
                size_bytes: bytes.len() as u64,
            },
            Document::External { url } => AttachmentRef::External {
                url: url.to_string(),
            },
        }
    }
}

/// A user-initiated send request, carrier-agnostic
#[derive(Debug, Clone)]
pub struct SendRequest {
    pub recipients: Vec<String>,
    pub documents: Vec<Document>,
    /// Caller-visible sender line shown to the destination
    pub sender_id: Option<String>,
    /// Opaque caller tag echoed through carrier payloads
    pub client_reference: Option<String>,
}

/// A status callback pushed by a carrier, already authenticated and
/// parsed by the HTTP layer. Append-only audit record; `event_id` is
/// the dedup key.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookEvent {
    /// Carrier-assigned delivery id, unique per event
    pub event_id: String,
    /// Carrier-assigned fax id this event refers to
    pub external_id: String,
    pub event_type: String,
    pub raw_status: String,
    pub cost: Option<Decimal>,
    pub pages: Option<i32>,
    /// Carrier-reported time of the underlying transition
    pub occurred_at: Option<DateTime<Utc>>,
    /// Full payload as received, kept verbatim
    pub payload: serde_json::Value,
    pub received_at: DateTime<Utc>,
}

/// Conditional-write payload for one status transition
#[derive(Debug, Clone)]
pub struct StatusUpdate {
    pub status: FaxStatus,
    pub original_status: String,
    pub cost: Option<Decimal>,
    pub pages: Option<i32>,
    pub sent_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl StatusUpdate {
    /// Build the write for a mapped signal, deriving the timestamp facts
    /// from the canonical status: `sent_at` once transmission starts,
    /// `completed_at` once terminal.
    pub fn from_signal(
        status: FaxStatus,
        raw_status: &str,
        cost: Option<Decimal>,
        pages: Option<i32>,
        occurred_at: Option<DateTime<Utc>>,
    ) -> Self {
        let at = occurred_at.unwrap_or_else(Utc::now);
        StatusUpdate {
            status,
            original_status: raw_status.to_string(),
            cost,
            pages,
            sent_at: (status.rank() >= FaxStatus::Sending.rank()).then_some(at),
            completed_at: status.is_terminal().then_some(at),
        }
    }
}
