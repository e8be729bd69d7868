//! Fax Submission Error Taxonomy
//!
//! One user-visible error enum for the send path; every variant carries a
//! stable kind tag for API responses.

use thiserror::Error;

use crate::carrier::CarrierError;
use crate::store::StoreError;

/// Errors surfaced by `FaxService::send`
#[derive(Error, Debug)]
pub enum FaxError {
    // === Caller's fault, never retried ===
    #[error("Invalid send request: {0}")]
    Validation(String),

    // === Retryable upstream failures ===
    #[error("Carrier transport failure: {0}")]
    Transport(String),

    // === Carrier refused, surfaced as-is ===
    #[error("Carrier rejected the fax (HTTP {status}): {body}")]
    CarrierRejected { status: u16, body: String },

    #[error("Carrier accepted the fax but returned no fax id")]
    MissingExternalId,

    #[error("Signed URL issuance failed: {0}")]
    Signing(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl FaxError {
    /// Stable taxonomy tag for API responses
    pub fn kind(&self) -> &'static str {
        match self {
            FaxError::Validation(_) => "VALIDATION",
            FaxError::Transport(_) => "TRANSPORT",
            FaxError::CarrierRejected { .. } => "CARRIER_REJECTED",
            FaxError::MissingExternalId => "MISSING_EXTERNAL_ID",
            FaxError::Signing(_) => "SIGNING",
            FaxError::Database(_) => "DATABASE_ERROR",
        }
    }

    /// HTTP status suggestion for the API layer
    pub fn http_status(&self) -> u16 {
        match self {
            FaxError::Validation(_) => 400,
            FaxError::CarrierRejected { .. } => 422,
            FaxError::Transport(_) | FaxError::MissingExternalId => 502,
            FaxError::Signing(_) | FaxError::Database(_) => 500,
        }
    }
}

impl From<CarrierError> for FaxError {
    fn from(e: CarrierError) -> Self {
        match e {
            CarrierError::Invalid(msg) => FaxError::Validation(msg),
            CarrierError::Transport(msg) => FaxError::Transport(msg),
            CarrierError::Rejected { status, body } => FaxError::CarrierRejected { status, body },
            CarrierError::MissingExternalId => FaxError::MissingExternalId,
            CarrierError::Signing(e) => FaxError::Signing(e.to_string()),
            CarrierError::Storage(e) => FaxError::Signing(e.to_string()),
        }
    }
}

impl From<StoreError> for FaxError {
    fn from(e: StoreError) -> Self {
        FaxError::Database(e.to_string())
    }
}
