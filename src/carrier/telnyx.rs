//! Telnyx Carrier Adapter
//!
//! URL adapter: the carrier fetches the document over HTTP, so
//! `build_payload` first uploads inline bytes to the object store and
//! grants a signed GET, then references that URL in the create body.
//! One recipient and one document per fax; bearer auth.

use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use super::status_map;
use super::{
    CarrierAccepted, CarrierClient, CarrierError, CarrierKind, CarrierPayload, PolledFax,
    validate_request,
};
use crate::config::TelnyxConfig;
use crate::fax::status::FaxStatus;
use crate::fax::types::{Document, SendRequest};
use crate::storage::ObjectStore;

/// Carrier-imposed ceiling on the fetched document
pub const MAX_DOCUMENT_BYTES: u64 = 50 * 1024 * 1024;

/// Largest page size the fax listing accepts
const LIST_PAGE_SIZE: u32 = 250;

pub struct TelnyxClient {
    config: TelnyxConfig,
    store: Arc<dyn ObjectStore>,
    /// Validity of document grants handed to the carrier
    url_ttl: chrono::Duration,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct CreateFaxBody {
    connection_id: String,
    media_url: String,
    to: String,
    from: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    client_state: Option<String>,
}

#[derive(Deserialize)]
struct CreateFaxResponse {
    data: Option<FaxData>,
}

#[derive(Deserialize)]
struct FaxData {
    id: Option<String>,
    #[serde(default)]
    status: String,
}

#[derive(Deserialize)]
struct ListFaxesResponse {
    #[serde(default)]
    data: Vec<ListedFax>,
    meta: Option<ListMeta>,
}

#[derive(Deserialize)]
struct ListMeta {
    #[serde(default)]
    total_pages: u64,
}

#[derive(Deserialize)]
struct ListedFax {
    id: String,
    #[serde(default)]
    status: String,
    page_count: Option<i32>,
}

impl TelnyxClient {
    pub fn new(
        config: TelnyxConfig,
        store: Arc<dyn ObjectStore>,
        url_ttl: chrono::Duration,
    ) -> Result<Self, CarrierError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| CarrierError::Transport(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            config,
            store,
            url_ttl,
            client,
        })
    }

    /// Make the document fetchable by the carrier and return its URL.
    /// External references pass through untouched.
    async fn media_url(&self, doc: &Document) -> Result<String, CarrierError> {
        match doc {
            Document::External { url } => Ok(url.to_string()),
            Document::Inline {
                filename,
                content_type,
                bytes,
            } => {
                let key = format!("outbound/{}/{}", Uuid::new_v4(), filename);
                self.store.put(&key, bytes, content_type).await?;
                let grant = self.store.grant_get(&key, self.url_ttl).await?;
                debug!(
                    key = key.as_str(),
                    expires_at = %grant.expires_at,
                    "Granted document access"
                );
                Ok(grant.url.to_string())
            }
        }
    }
}

#[async_trait]
impl CarrierClient for TelnyxClient {
    fn kind(&self) -> CarrierKind {
        CarrierKind::Telnyx
    }

    async fn build_payload(&self, req: &SendRequest) -> Result<CarrierPayload, CarrierError> {
        validate_request(req, MAX_DOCUMENT_BYTES)?;
        // one destination and one media_url per created fax; fanning out
        // here would break the one-call-per-submit contract
        if req.recipients.len() != 1 {
            return Err(CarrierError::Invalid(format!(
                "Telnyx takes a single recipient per fax, got {}",
                req.recipients.len()
            )));
        }
        if req.documents.len() != 1 {
            return Err(CarrierError::Invalid(format!(
                "Telnyx takes a single document per fax, got {}",
                req.documents.len()
            )));
        }

        let media_url = self.media_url(&req.documents[0]).await?;
        let body = CreateFaxBody {
            connection_id: self.config.connection_id.clone(),
            media_url,
            to: req.recipients[0].clone(),
            from: req
                .sender_id
                .clone()
                .unwrap_or_else(|| self.config.from_number.clone()),
            client_state: req
                .client_reference
                .as_ref()
                .map(|r| BASE64.encode(r.as_bytes())),
        };

        let body = serde_json::to_value(&body)
            .map_err(|e| CarrierError::Invalid(format!("Payload serialization: {}", e)))?;
        Ok(CarrierPayload {
            kind: CarrierKind::Telnyx,
            body,
        })
    }

    async fn submit(&self, payload: &CarrierPayload) -> Result<CarrierAccepted, CarrierError> {
        let url = format!("{}/v2/faxes", self.config.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&payload.body)
            .send()
            .await
            .map_err(|e| CarrierError::Transport(format!("Submit failed: {}", e)))?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CarrierError::Rejected { status, body });
        }
        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|_| CarrierError::MissingExternalId)?;

        parse_create_response(body)
    }

    fn map_status(&self, raw: &str) -> FaxStatus {
        status_map::map_telnyx(raw)
    }

    async fn list_recent(
        &self,
        lookback: chrono::Duration,
    ) -> Result<Vec<PolledFax>, CarrierError> {
        let from = Utc::now() - lookback;
        let url = format!("{}/v2/faxes", self.config.base_url.trim_end_matches('/'));
        let created_after = from.to_rfc3339_opts(SecondsFormat::Secs, true);

        // The listing is paginated; a busy lookback window spans pages
        let mut polled = Vec::new();
        let mut page = 1u64;
        loop {
            let response = self
                .client
                .get(&url)
                .bearer_auth(&self.config.api_key)
                .query(&[
                    ("filter[created_at][gte]", created_after.clone()),
                    ("page[size]", LIST_PAGE_SIZE.to_string()),
                    ("page[number]", page.to_string()),
                ])
                .send()
                .await
                .map_err(|e| CarrierError::Transport(format!("List failed: {}", e)))?;

            let status = response.status().as_u16();
            if !response.status().is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(CarrierError::Rejected { status, body });
            }
            let body: serde_json::Value = response
                .json()
                .await
                .map_err(|e| CarrierError::Transport(format!("Failed to read response: {}", e)))?;

            let (batch, total_pages) = parse_list_page(body)?;
            let exhausted = batch.is_empty() || page >= total_pages;
            polled.extend(batch);
            if exhausted {
                break;
            }
            page += 1;
        }

        debug!(count = polled.len(), pages = page, "Fetched faxes from telnyx");
        Ok(polled)
    }
}

/// Interpret a 2xx create response. Missing id never passes; retrying a
/// parse failure could double-send.
fn parse_create_response(body: serde_json::Value) -> Result<CarrierAccepted, CarrierError> {
    let parsed: CreateFaxResponse =
        serde_json::from_value(body.clone()).map_err(|_| CarrierError::MissingExternalId)?;
    let data = parsed.data.ok_or(CarrierError::MissingExternalId)?;
    let external_id = data
        .id
        .filter(|id| !id.is_empty())
        .ok_or(CarrierError::MissingExternalId)?;
    let raw_status = if data.status.is_empty() {
        "queued".to_string()
    } else {
        data.status
    };
    Ok(CarrierAccepted {
        external_id,
        raw_status,
        raw_response: body,
    })
}

/// One page of the fax listing plus how many pages the carrier reports.
/// Listings without pagination metadata count as a single page.
fn parse_list_page(body: serde_json::Value) -> Result<(Vec<PolledFax>, u64), CarrierError> {
    let parsed: ListFaxesResponse = serde_json::from_value(body)
        .map_err(|e| CarrierError::Transport(format!("Unexpected list response: {}", e)))?;
    let total_pages = parsed.meta.map(|m| m.total_pages).unwrap_or(1).max(1);
    let faxes = parsed
        .data
        .into_iter()
        .map(|fax| PolledFax {
            external_id: fax.id,
            raw_status: fax.status,
            cost: None,
            pages: fax.page_count,
            completed_at: None,
        })
        .collect();
    Ok((faxes, total_pages))
}
