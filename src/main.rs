//! faxgate daemon
//!
//! Loads configuration, connects the record store, builds the
//! configured carrier adapter and runs the reconciliation poll loop.
//!
//! ```text
//! ┌──────────┐    ┌───────────┐    ┌───────────┐    ┌──────────┐
//! │  Config  │───▶│  Carrier  │───▶│ Reconcile │───▶│ Postgres │
//! │  (YAML)  │    │  Adapter  │    │  Engine   │    │  Store   │
//! └──────────┘    └───────────┘    └───────────┘    └──────────┘
//! ```
//!
//! Webhook ingestion runs in the HTTP layer that embeds this crate;
//! the daemon itself only sweeps the carrier listing.

use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use faxgate::config::AppConfig;
use faxgate::reconcile::{ReconcileEngine, StatusPoller};
use faxgate::store::PgFaxStore;
use faxgate::{build_carrier, logging};

fn get_env() -> String {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if (args[i] == "--env" || args[i] == "-e") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }
    "dev".to_string()
}

/// Full config path override (--config argument)
fn get_config_override() -> Option<String> {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if args[i] == "--config" && i + 1 < args.len() {
            return Some(args[i + 1].clone());
        }
    }
    None
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path =
        get_config_override().unwrap_or_else(|| format!("config/{}.yaml", get_env()));
    let config = AppConfig::from_file(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path))?;

    let _log_guard = logging::init_logging(&config.logging);

    info!(
        "Starting faxgate (carrier: {}, config: {})",
        config.carrier, config_path
    );

    let store = Arc::new(
        PgFaxStore::connect(&config.database.url)
            .await
            .context("Failed to connect to the fax record database")?,
    );
    let carrier = build_carrier(&config).context("Failed to build carrier adapter")?;

    let engine = ReconcileEngine::new(store, carrier.kind());
    let poller = StatusPoller::new(carrier, engine, &config.poll);

    poller.run().await
}
