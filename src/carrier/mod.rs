//! Carrier Adapters
//!
//! One adapter per fax carrier, all behind the `CarrierClient` trait so the
//! submission service and the poll sweeper never see provider specifics.
//! Exactly one carrier API call per `submit`; retry lives with the caller.

pub mod notifyre;
pub mod selector;
pub mod status_map;
pub mod telnyx;

pub use notifyre::NotifyreClient;
pub use selector::build_carrier;
pub use telnyx::TelnyxClient;

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::fax::status::FaxStatus;
use crate::fax::types::{Document, SendRequest};
use crate::storage::{SigningError, StorageError};

/// Supported carriers. Closed set; adding a carrier means adding a variant
/// and an adapter, and the compiler finds every dispatch site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CarrierKind {
    Notifyre,
    Telnyx,
}

impl CarrierKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CarrierKind::Notifyre => "notifyre",
            CarrierKind::Telnyx => "telnyx",
        }
    }
}

impl fmt::Display for CarrierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for CarrierKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "notifyre" => Ok(CarrierKind::Notifyre),
            "telnyx" => Ok(CarrierKind::Telnyx),
            _ => Err(format!("Unknown carrier: {}", s)),
        }
    }
}

#[derive(Debug, Error)]
pub enum CarrierError {
    /// Malformed request, rejected before any API call
    #[error("Invalid request: {0}")]
    Invalid(String),

    /// Network-level failure or timeout; the call may not have reached
    /// the carrier, safe to retry
    #[error("Transport error: {0}")]
    Transport(String),

    /// The carrier processed and refused the request; not retryable
    #[error("Carrier rejected the request (HTTP {status}): {body}")]
    Rejected { status: u16, body: String },

    /// A success response without a usable fax id is always an error
    #[error("Success response missing the carrier fax id")]
    MissingExternalId,

    #[error("Signing error: {0}")]
    Signing(#[from] SigningError),

    #[error("Object storage error: {0}")]
    Storage(#[from] StorageError),
}

impl CarrierError {
    /// Only transport failures are safe to retry blindly
    #[inline]
    pub fn is_retryable(&self) -> bool {
        matches!(self, CarrierError::Transport(_))
    }
}

/// Provider-specific request body, ready to submit. The JSON value is the
/// exact body that goes over the wire; everything before this point is typed.
#[derive(Debug, Clone)]
pub struct CarrierPayload {
    pub kind: CarrierKind,
    pub body: serde_json::Value,
}

/// Result of an accepted submission
#[derive(Debug, Clone)]
pub struct CarrierAccepted {
    /// Carrier-assigned fax id; the reconciliation key
    pub external_id: String,
    /// Initial raw status string from the carrier, kept for audit
    pub raw_status: String,
    /// Full response body as received
    pub raw_response: serde_json::Value,
}

/// One carrier-side fax snapshot from the polling path
#[derive(Debug, Clone)]
pub struct PolledFax {
    pub external_id: String,
    pub raw_status: String,
    pub cost: Option<Decimal>,
    pub pages: Option<i32>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Unified interface over fax carrier APIs
#[async_trait]
pub trait CarrierClient: Send + Sync {
    /// Which carrier this adapter talks to
    fn kind(&self) -> CarrierKind;

    /// Validate the request and build the provider-specific payload.
    /// URL-based carriers upload and grant document access here.
    async fn build_payload(&self, req: &SendRequest) -> Result<CarrierPayload, CarrierError>;

    /// Submit a built payload. Exactly one API call; no internal retry.
    async fn submit(&self, payload: &CarrierPayload) -> Result<CarrierAccepted, CarrierError>;

    /// Map a raw carrier status string to the canonical status
    fn map_status(&self, raw: &str) -> FaxStatus;

    /// Fetch carrier-side fax records created within the trailing window
    async fn list_recent(&self, lookback: chrono::Duration)
    -> Result<Vec<PolledFax>, CarrierError>;
}

/// Carrier-independent request validation: at least one recipient and one
/// document, plausible destination numbers, inline payload under the
/// carrier's ceiling. Violations are rejected, never silently dropped.
pub fn validate_request(req: &SendRequest, max_inline_bytes: u64) -> Result<(), CarrierError> {
    if req.recipients.is_empty() {
        return Err(CarrierError::Invalid(
            "At least one recipient is required".to_string(),
        ));
    }
    for number in &req.recipients {
        if !is_plausible_number(number) {
            return Err(CarrierError::Invalid(format!(
                "Recipient is not a plausible E.164 number: {}",
                number
            )));
        }
    }
    if req.documents.is_empty() {
        return Err(CarrierError::Invalid(
            "At least one document is required".to_string(),
        ));
    }
    let inline_total: u64 = req.documents.iter().filter_map(Document::size_bytes).sum();
    if inline_total > max_inline_bytes {
        return Err(CarrierError::Invalid(format!(
            "Inline documents total {} bytes, carrier ceiling is {}",
            inline_total, max_inline_bytes
        )));
    }
    Ok(())
}

/// Optional leading '+', then 7 to 15 digits
fn is_plausible_number(number: &str) -> bool {
    let digits = number.strip_prefix('+').unwrap_or(number);
    (7..=15).contains(&digits.len()) && digits.bytes().all(|b| b.is_ascii_digit())
}

/// Mock carrier for testing the service and the sweeper
#[cfg(test)]
pub mod mock {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const MOCK_CEILING_BYTES: u64 = 10 * 1024 * 1024;

    pub struct MockCarrier {
        kind: CarrierKind,
        submit_count: AtomicUsize,
        /// Fail this many submits with a transport error before accepting
        transport_failures: AtomicUsize,
        /// When set, every submit is rejected with this status/body
        reject: Mutex<Option<(u16, String)>>,
        accept_external_id: Mutex<String>,
        polled: Mutex<Vec<PolledFax>>,
        last_payload: Mutex<Option<CarrierPayload>>,
    }

    impl MockCarrier {
        pub fn new(kind: CarrierKind) -> Self {
            Self {
                kind,
                submit_count: AtomicUsize::new(0),
                transport_failures: AtomicUsize::new(0),
                reject: Mutex::new(None),
                accept_external_id: Mutex::new("fax-mock-1".to_string()),
                polled: Mutex::new(Vec::new()),
                last_payload: Mutex::new(None),
            }
        }

        pub fn fail_transport_times(&self, n: usize) {
            self.transport_failures.store(n, Ordering::SeqCst);
        }

        pub fn reject_with(&self, status: u16, body: &str) {
            *self.reject.lock().unwrap() = Some((status, body.to_string()));
        }

        pub fn set_external_id(&self, id: &str) {
            *self.accept_external_id.lock().unwrap() = id.to_string();
        }

        pub fn set_polled(&self, faxes: Vec<PolledFax>) {
            *self.polled.lock().unwrap() = faxes;
        }

        pub fn submit_count(&self) -> usize {
            self.submit_count.load(Ordering::SeqCst)
        }

        pub fn last_payload(&self) -> Option<CarrierPayload> {
            self.last_payload.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CarrierClient for MockCarrier {
        fn kind(&self) -> CarrierKind {
            self.kind
        }

        async fn build_payload(&self, req: &SendRequest) -> Result<CarrierPayload, CarrierError> {
            validate_request(req, MOCK_CEILING_BYTES)?;
            let payload = CarrierPayload {
                kind: self.kind,
                body: serde_json::json!({
                    "recipients": req.recipients,
                    "documents": req.documents.len(),
                }),
            };
            *self.last_payload.lock().unwrap() = Some(payload.clone());
            Ok(payload)
        }

        async fn submit(&self, _payload: &CarrierPayload) -> Result<CarrierAccepted, CarrierError> {
            self.submit_count.fetch_add(1, Ordering::SeqCst);

            let remaining = self.transport_failures.load(Ordering::SeqCst);
            if remaining > 0 {
                self.transport_failures.store(remaining - 1, Ordering::SeqCst);
                return Err(CarrierError::Transport(
                    "mock connection reset".to_string(),
                ));
            }
            if let Some((status, body)) = self.reject.lock().unwrap().clone() {
                return Err(CarrierError::Rejected { status, body });
            }
            Ok(CarrierAccepted {
                external_id: self.accept_external_id.lock().unwrap().clone(),
                raw_status: "queued".to_string(),
                raw_response: serde_json::json!({"id": "mock"}),
            })
        }

        fn map_status(&self, raw: &str) -> FaxStatus {
            status_map::map_raw(self.kind, raw)
        }

        async fn list_recent(
            &self,
            _lookback: chrono::Duration,
        ) -> Result<Vec<PolledFax>, CarrierError> {
            Ok(self.polled.lock().unwrap().clone())
        }
    }
}

#[cfg(test)]
pub use mock::MockCarrier;

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn inline_request(recipients: &[&str], doc_bytes: usize) -> SendRequest {
        SendRequest {
            recipients: recipients.iter().map(|s| s.to_string()).collect(),
            documents: vec![Document::Inline {
                filename: "doc.pdf".to_string(),
                content_type: "application/pdf".to_string(),
                bytes: vec![0u8; doc_bytes],
            }],
            sender_id: None,
            client_reference: None,
        }
    }

    #[test]
    fn test_carrier_kind_parse() {
        assert_eq!("notifyre".parse::<CarrierKind>(), Ok(CarrierKind::Notifyre));
        assert_eq!("Telnyx".parse::<CarrierKind>(), Ok(CarrierKind::Telnyx));
        assert_eq!("NOTIFYRE".parse::<CarrierKind>(), Ok(CarrierKind::Notifyre));
        assert!("efax".parse::<CarrierKind>().is_err());
    }

    #[test]
    fn test_carrier_kind_display() {
        assert_eq!(CarrierKind::Notifyre.to_string(), "notifyre");
        assert_eq!(CarrierKind::Telnyx.to_string(), "telnyx");
    }

    #[test]
    fn test_validate_rejects_empty_recipients() {
        let mut req = inline_request(&["+15551234567"], 10);
        req.recipients.clear();
        assert!(matches!(
            validate_request(&req, 1024),
            Err(CarrierError::Invalid(_))
        ));
    }

    #[test]
    fn test_validate_rejects_bad_number() {
        for bad in ["12345", "+1-555-123-4567", "fax me", "+123456789012345678"] {
            let req = inline_request(&[bad], 10);
            assert!(
                matches!(validate_request(&req, 1024), Err(CarrierError::Invalid(_))),
                "accepted bad number {:?}",
                bad
            );
        }
    }

    #[test]
    fn test_validate_accepts_plausible_numbers() {
        for good in ["+15551234567", "15551234567", "+442071838750"] {
            let req = inline_request(&[good], 10);
            assert!(validate_request(&req, 1024).is_ok(), "rejected {:?}", good);
        }
    }

    #[test]
    fn test_validate_rejects_empty_documents() {
        let mut req = inline_request(&["+15551234567"], 10);
        req.documents.clear();
        assert!(matches!(
            validate_request(&req, 1024),
            Err(CarrierError::Invalid(_))
        ));
    }

    #[test]
    fn test_validate_enforces_inline_ceiling() {
        let req = inline_request(&["+15551234567"], 2048);
        assert!(matches!(
            validate_request(&req, 1024),
            Err(CarrierError::Invalid(_))
        ));
        assert!(validate_request(&req, 4096).is_ok());
    }

    #[test]
    fn test_external_documents_skip_ceiling() {
        let req = SendRequest {
            recipients: vec!["+15551234567".to_string()],
            documents: vec![Document::External {
                url: Url::parse("https://store.example.com/doc.pdf").unwrap(),
            }],
            sender_id: None,
            client_reference: None,
        };
        assert!(validate_request(&req, 1).is_ok());
    }
}
