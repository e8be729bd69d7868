//! faxgate - Fax Transmission Lifecycle & Status Reconciliation
//!
//! Submits outbound faxes through interchangeable carrier adapters and
//! reconciles each transmission's delivery lifecycle from two
//! independent signal paths (carrier webhooks and poll sweeps) into a
//! single monotonic status per record.
//!
//! # Modules
//!
//! - [`fax`] - Canonical status model, record types, submission service
//! - [`carrier`] - Carrier adapters (Notifyre, Telnyx) behind one trait
//! - [`storage`] - S3-compatible object store and signed-URL issuance
//! - [`reconcile`] - Reconciliation engine and poll sweeper
//! - [`store`] - Fax record persistence (PostgreSQL, in-memory)
//! - [`config`] - YAML application configuration
//! - [`logging`] - Rolling-file tracing setup

pub mod carrier;
pub mod config;
pub mod fax;
pub mod logging;
pub mod reconcile;
pub mod storage;
pub mod store;

// Convenient re-exports at crate root
pub use carrier::{CarrierClient, CarrierError, CarrierKind, build_carrier};
pub use config::AppConfig;
pub use fax::{FaxError, FaxRecord, FaxService, FaxStatus, SendRequest};
pub use reconcile::{ReconcileEngine, Reconciled, StatusPoller, SweepStats};
pub use storage::{ObjectStore, SignedUrl};
pub use store::{FaxStore, MemoryFaxStore, PgFaxStore, StoreError};
