//! Canonical Fax Lifecycle States
//!
//! Stored in PostgreSQL as lowercase text; `as_str` is the storage form.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Rank shared by every terminal status
pub const TERMINAL_RANK: u8 = 3;

/// Canonical fax transmission status.
///
/// Every carrier vocabulary maps into this set. Terminal states:
/// DELIVERED, FAILED, BUSY, NO_ANSWER, CANCELLED.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaxStatus {
    /// Accepted by the carrier, not yet processing
    Queued,

    /// Carrier is preparing the document for transmission
    Processing,

    /// Transmission to the destination in progress
    Sending,

    /// Terminal: received by the destination
    Delivered,

    /// Terminal: transmission failed (also the fallback for
    /// unrecognized carrier statuses)
    Failed,

    /// Terminal: destination line busy
    Busy,

    /// Terminal: destination did not pick up
    NoAnswer,

    /// Terminal: cancelled before completion
    Cancelled,
}

impl FaxStatus {
    /// Check if this is a terminal status (record becomes immutable)
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            FaxStatus::Delivered
                | FaxStatus::Failed
                | FaxStatus::Busy
                | FaxStatus::NoAnswer
                | FaxStatus::Cancelled
        )
    }

    /// Monotonic progress rank.
    ///
    /// A status write is applied only when the incoming rank is >= the
    /// stored rank, so late-arriving signals can never move a record
    /// backwards. All terminal statuses share the top rank.
    #[inline]
    pub fn rank(&self) -> u8 {
        match self {
            FaxStatus::Queued => 0,
            FaxStatus::Processing => 1,
            FaxStatus::Sending => 2,
            _ => TERMINAL_RANK,
        }
    }

    /// Canonical lowercase name, used for storage and wire payloads
    pub fn as_str(&self) -> &'static str {
        match self {
            FaxStatus::Queued => "queued",
            FaxStatus::Processing => "processing",
            FaxStatus::Sending => "sending",
            FaxStatus::Delivered => "delivered",
            FaxStatus::Failed => "failed",
            FaxStatus::Busy => "busy",
            FaxStatus::NoAnswer => "no_answer",
            FaxStatus::Cancelled => "cancelled",
        }
    }

    /// Convert from the canonical stored name
    pub fn from_canonical(s: &str) -> Option<Self> {
        match s {
            "queued" => Some(FaxStatus::Queued),
            "processing" => Some(FaxStatus::Processing),
            "sending" => Some(FaxStatus::Sending),
            "delivered" => Some(FaxStatus::Delivered),
            "failed" => Some(FaxStatus::Failed),
            "busy" => Some(FaxStatus::Busy),
            "no_answer" => Some(FaxStatus::NoAnswer),
            "cancelled" => Some(FaxStatus::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for FaxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
