//! Provider Selection
//!
//! The active carrier is a closed enum parsed once at config load and
//! matched exhaustively here; no string-keyed runtime registry.

use std::sync::Arc;

use super::{CarrierClient, CarrierError, CarrierKind, NotifyreClient, TelnyxClient};
use crate::config::AppConfig;
use crate::storage::S3Store;

/// Construct the adapter for the configured carrier, wiring in whatever
/// collaborators that carrier needs.
pub fn build_carrier(cfg: &AppConfig) -> Result<Arc<dyn CarrierClient>, CarrierError> {
    match cfg.carrier {
        CarrierKind::Notifyre => Ok(Arc::new(NotifyreClient::new(cfg.notifyre.clone())?)),
        CarrierKind::Telnyx => {
            let store = S3Store::new(&cfg.object_store)?;
            Ok(Arc::new(TelnyxClient::new(
                cfg.telnyx.clone(),
                Arc::new(store),
                chrono::Duration::seconds(cfg.object_store.url_ttl_secs as i64),
            )?))
        }
    }
}
