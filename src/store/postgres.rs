//! PostgreSQL Fax Store
//!
//! Two tables: `fax_records_tb` (one row per transmission, unique on
//! `(carrier, external_id)` since carriers assign ids independently,
//! with a `status_rank` column mirroring the lifecycle rank) and
//! `fax_webhook_events_tb` (append-only audit, unique on `event_id`).
//! Schema migrations live with the deployment.

use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row;
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

use super::{FaxStore, StoreError};
use crate::carrier::CarrierKind;
use crate::fax::status::{FaxStatus, TERMINAL_RANK};
use crate::fax::types::{AttachmentRef, FaxRecord, StatusUpdate, WebhookEvent};

pub struct PgFaxStore {
    pool: PgPool,
}

impl PgFaxStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await?;

        info!("PostgreSQL connection pool established");
        Ok(Self { pool })
    }

    fn row_to_record(&self, row: &sqlx::postgres::PgRow) -> Result<FaxRecord, StoreError> {
        let external_id: String = row.get("external_id");

        let id_str: String = row.get("id");
        let id = Uuid::parse_str(&id_str).map_err(|e| StoreError::Corrupt {
            external_id: external_id.clone(),
            reason: format!("Bad record id: {}", e),
        })?;

        let carrier_str: String = row.get("carrier");
        let carrier: CarrierKind = carrier_str.parse().map_err(|e: String| StoreError::Corrupt {
            external_id: external_id.clone(),
            reason: e,
        })?;

        let status_str: String = row.get("status");
        let status =
            FaxStatus::from_canonical(&status_str).ok_or_else(|| StoreError::Corrupt {
                external_id: external_id.clone(),
                reason: format!("Unknown status: {}", status_str),
            })?;

        let attachments_json: String = row.get("attachments");
        let attachments: Vec<AttachmentRef> =
            serde_json::from_str(&attachments_json).map_err(|e| StoreError::Corrupt {
                external_id: external_id.clone(),
                reason: format!("Bad attachments: {}", e),
            })?;

        Ok(FaxRecord {
            id,
            carrier,
            external_id,
            status,
            original_status: row.get("original_status"),
            recipients: row.get("recipients"),
            attachments,
            cost: row.get("cost"),
            pages: row.get("pages"),
            created_at: row.get("created_at"),
            sent_at: row.get("sent_at"),
            completed_at: row.get("completed_at"),
        })
    }
}

#[async_trait::async_trait]
impl FaxStore for PgFaxStore {
    async fn create(&self, record: &FaxRecord) -> Result<Uuid, StoreError> {
        let attachments = serde_json::to_string(&record.attachments)
            .map_err(|e| StoreError::Encoding(e.to_string()))?;

        let result = sqlx::query(
            r#"
            INSERT INTO fax_records_tb
                (id, carrier, external_id, status, status_rank, original_status,
                 recipients, attachments, cost, pages,
                 created_at, sent_at, completed_at, updated_at)
            VALUES
                ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, NOW())
            ON CONFLICT (carrier, external_id) DO NOTHING
            "#,
        )
        .bind(record.id.to_string())
        .bind(record.carrier.as_str())
        .bind(&record.external_id)
        .bind(record.status.as_str())
        .bind(record.status.rank() as i16)
        .bind(&record.original_status)
        .bind(&record.recipients)
        .bind(attachments)
        .bind(record.cost)
        .bind(record.pages)
        .bind(record.created_at)
        .bind(record.sent_at)
        .bind(record.completed_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            return Ok(record.id);
        }

        // Already tracked under this carrier's external id; hand back the original
        info!(
            carrier = %record.carrier,
            external_id = %record.external_id,
            "Fax already tracked, returning existing record"
        );
        let id_str: String = sqlx::query_scalar(
            "SELECT id FROM fax_records_tb WHERE carrier = $1 AND external_id = $2",
        )
        .bind(record.carrier.as_str())
        .bind(&record.external_id)
        .fetch_one(&self.pool)
        .await?;
        Uuid::parse_str(&id_str).map_err(|e| StoreError::Corrupt {
            external_id: record.external_id.clone(),
            reason: format!("Bad record id: {}", e),
        })
    }

    async fn get_by_external_id(
        &self,
        carrier: CarrierKind,
        external_id: &str,
    ) -> Result<Option<FaxRecord>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, carrier, external_id, status, original_status,
                   recipients, attachments, cost, pages,
                   created_at, sent_at, completed_at
            FROM fax_records_tb
            WHERE carrier = $1 AND external_id = $2
            "#,
        )
        .bind(carrier.as_str())
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(self.row_to_record(&row)?)),
            None => Ok(None),
        }
    }

    async fn update_if_active(
        &self,
        carrier: CarrierKind,
        external_id: &str,
        update: &StatusUpdate,
    ) -> Result<bool, StoreError> {
        // GREATEST ignores NULL, so cost/pages only ever move up;
        // COALESCE keeps the first-written timestamps
        let result = sqlx::query(
            r#"
            UPDATE fax_records_tb
            SET status = $3,
                status_rank = $4,
                original_status = $5,
                cost = GREATEST(cost, $6),
                pages = GREATEST(pages, $7),
                sent_at = COALESCE(sent_at, $8),
                completed_at = COALESCE(completed_at, $9),
                updated_at = NOW()
            WHERE carrier = $1
              AND external_id = $2
              AND status_rank < $10
              AND status_rank <= $4
            "#,
        )
        .bind(carrier.as_str())
        .bind(external_id)
        .bind(update.status.as_str())
        .bind(update.status.rank() as i16)
        .bind(&update.original_status)
        .bind(update.cost)
        .bind(update.pages)
        .bind(update.sent_at)
        .bind(update.completed_at)
        .bind(TERMINAL_RANK as i16)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn record_webhook_event(&self, event: &WebhookEvent) -> Result<bool, StoreError> {
        let payload = serde_json::to_string(&event.payload)
            .map_err(|e| StoreError::Encoding(e.to_string()))?;

        let result = sqlx::query(
            r#"
            INSERT INTO fax_webhook_events_tb
                (event_id, external_id, event_type, raw_status,
                 cost, pages, occurred_at, payload, received_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (event_id) DO NOTHING
            "#,
        )
        .bind(&event.event_id)
        .bind(&event.external_id)
        .bind(&event.event_type)
        .bind(&event.raw_status)
        .bind(event.cost)
        .bind(event.pages)
        .bind(event.occurred_at)
        .bind(payload)
        .bind(event.received_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
