//! Carrier Status Vocabularies
//!
//! Pure, total mappers from raw carrier status strings to the canonical
//! lifecycle. Matching is case-insensitive on a trimmed input. Unrecognized
//! values map to FAILED (fail closed) so a terminal-looking signal from a
//! newer carrier vocabulary can never strand a record in an active state.

use tracing::warn;

use super::CarrierKind;
use crate::fax::status::FaxStatus;

/// Dispatch to the vocabulary of the given carrier
pub fn map_raw(kind: CarrierKind, raw: &str) -> FaxStatus {
    match kind {
        CarrierKind::Notifyre => map_notifyre(raw),
        CarrierKind::Telnyx => map_telnyx(raw),
    }
}

/// Notifyre sent-fax statuses
pub fn map_notifyre(raw: &str) -> FaxStatus {
    match raw.trim().to_lowercase().as_str() {
        "preparing" => FaxStatus::Processing,
        "queued" => FaxStatus::Queued,
        "in progress" => FaxStatus::Sending,
        "successful" => FaxStatus::Delivered,
        "failed" => FaxStatus::Failed,
        "failed - busy" => FaxStatus::Busy,
        "failed - no answer" => FaxStatus::NoAnswer,
        "cancelled" => FaxStatus::Cancelled,
        other => unmapped(CarrierKind::Notifyre, other),
    }
}

/// Telnyx fax lifecycle statuses. The carrier reports line-level outcomes
/// (busy, no answer) alongside fax statuses; both arrive through the same
/// status field.
pub fn map_telnyx(raw: &str) -> FaxStatus {
    match raw.trim().to_lowercase().as_str() {
        "queued" => FaxStatus::Queued,
        "media.processed" => FaxStatus::Processing,
        "originated" => FaxStatus::Sending,
        "sending" => FaxStatus::Sending,
        "delivered" => FaxStatus::Delivered,
        "failed" => FaxStatus::Failed,
        // US spelling on the wire
        "canceled" => FaxStatus::Cancelled,
        "busy" => FaxStatus::Busy,
        "no_answer" => FaxStatus::NoAnswer,
        other => unmapped(CarrierKind::Telnyx, other),
    }
}

fn unmapped(carrier: CarrierKind, raw: &str) -> FaxStatus {
    warn!(
        carrier = carrier.as_str(),
        raw_status = raw,
        "Unrecognized carrier status, mapping to failed"
    );
    FaxStatus::Failed
}
