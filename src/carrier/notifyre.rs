//! Notifyre Carrier Adapter
//!
//! Inline adapter: documents travel base64-encoded inside the submit body,
//! so no signed URL issuance is involved. Multiple recipients go out in a
//! single API call. Auth is the `x-api-token` header.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::status_map;
use super::{
    CarrierAccepted, CarrierClient, CarrierError, CarrierKind, CarrierPayload, PolledFax,
    validate_request,
};
use crate::config::NotifyreConfig;
use crate::fax::status::FaxStatus;
use crate::fax::types::{Document, SendRequest};

/// Carrier-imposed ceiling on the inline document payload
pub const MAX_INLINE_BYTES: u64 = 100 * 1024 * 1024;

pub struct NotifyreClient {
    config: NotifyreConfig,
    client: reqwest::Client,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct SendFaxBody {
    faxes: FaxesBody,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct FaxesBody {
    recipients: Vec<RecipientBody>,
    #[serde(skip_serializing_if = "Option::is_none")]
    send_from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    client_reference: Option<String>,
    documents: Vec<DocumentBody>,
    is_high_quality: bool,
}

#[derive(Serialize)]
struct RecipientBody {
    #[serde(rename = "Type")]
    kind: &'static str,
    #[serde(rename = "Value")]
    value: String,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct DocumentBody {
    filename: String,
    data: String,
}

/// Envelope around every Notifyre response
#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ApiResponse<T> {
    payload: Option<T>,
    success: bool,
    #[serde(default)]
    message: String,
}

#[derive(Deserialize)]
struct SendFaxPayload {
    #[serde(rename = "FaxID")]
    fax_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SentFaxesPayload {
    faxes: Vec<SentFax>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SentFax {
    #[serde(rename = "ID")]
    id: String,
    status: String,
    cost: Option<Decimal>,
    pages: Option<i32>,
    completed_date_utc: Option<i64>,
}

impl NotifyreClient {
    pub fn new(config: NotifyreConfig) -> Result<Self, CarrierError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| CarrierError::Transport(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { config, client })
    }
}

#[async_trait]
impl CarrierClient for NotifyreClient {
    fn kind(&self) -> CarrierKind {
        CarrierKind::Notifyre
    }

    async fn build_payload(&self, req: &SendRequest) -> Result<CarrierPayload, CarrierError> {
        validate_request(req, MAX_INLINE_BYTES)?;

        let mut documents = Vec::with_capacity(req.documents.len());
        for doc in &req.documents {
            match doc {
                Document::Inline {
                    filename, bytes, ..
                } => documents.push(DocumentBody {
                    filename: filename.clone(),
                    data: BASE64.encode(bytes),
                }),
                Document::External { url } => {
                    return Err(CarrierError::Invalid(format!(
                        "Notifyre takes inline documents only, got URL reference {}",
                        url
                    )));
                }
            }
        }

        let body = SendFaxBody {
            faxes: FaxesBody {
                recipients: req
                    .recipients
                    .iter()
                    .map(|number| RecipientBody {
                        kind: "fax_number",
                        value: number.clone(),
                    })
                    .collect(),
                send_from: req.sender_id.clone(),
                client_reference: req.client_reference.clone(),
                documents,
                is_high_quality: false,
            },
        };

        let body = serde_json::to_value(&body)
            .map_err(|e| CarrierError::Invalid(format!("Payload serialization: {}", e)))?;
        Ok(CarrierPayload {
            kind: CarrierKind::Notifyre,
            body,
        })
    }

    async fn submit(&self, payload: &CarrierPayload) -> Result<CarrierAccepted, CarrierError> {
        let url = format!("{}/fax/send", self.config.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .header("x-api-token", &self.config.api_key)
            .json(&payload.body)
            .send()
            .await
            .map_err(|e| CarrierError::Transport(format!("Submit failed: {}", e)))?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CarrierError::Rejected { status, body });
        }

        // The carrier accepted; an unreadable body must not come back
        // as retryable or a second submit could double-send
        let body: serde_json::Value = match response.json().await {
            Ok(body) => body,
            Err(e) => {
                warn!("Accepted submit returned unreadable body: {}", e);
                return Err(CarrierError::MissingExternalId);
            }
        };

        parse_send_response(status, body)
    }

    fn map_status(&self, raw: &str) -> FaxStatus {
        status_map::map_notifyre(raw)
    }

    async fn list_recent(
        &self,
        lookback: chrono::Duration,
    ) -> Result<Vec<PolledFax>, CarrierError> {
        let to = Utc::now();
        let from = to - lookback;
        let url = format!("{}/fax/send", self.config.base_url.trim_end_matches('/'));

        let response = self
            .client
            .get(&url)
            .header("x-api-token", &self.config.api_key)
            .query(&[
                ("fromDate", from.timestamp().to_string()),
                ("toDate", to.timestamp().to_string()),
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

        let polled = parse_list_response(body)?;
        debug!(count = polled.len(), "Fetched sent faxes from notifyre");
        Ok(polled)
    }
}

/// Interpret a 2xx submit response. A success envelope without a usable
/// fax id never passes; retrying it could double-send.
fn parse_send_response(
    status: u16,
    body: serde_json::Value,
) -> Result<CarrierAccepted, CarrierError> {
    let parsed: ApiResponse<SendFaxPayload> = serde_json::from_value(body.clone())
        .map_err(|_| CarrierError::MissingExternalId)?;

    if !parsed.success {
        return Err(CarrierError::Rejected {
            status,
            body: parsed.message,
        });
    }
    let external_id = parsed
        .payload
        .and_then(|p| p.fax_id)
        .filter(|id| !id.is_empty())
        .ok_or(CarrierError::MissingExternalId)?;

    Ok(CarrierAccepted {
        external_id,
        // acceptance puts the fax at the head of the carrier queue
        raw_status: "queued".to_string(),
        raw_response: body,
    })
}

fn parse_list_response(body: serde_json::Value) -> Result<Vec<PolledFax>, CarrierError> {
    let parsed: ApiResponse<SentFaxesPayload> = serde_json::from_value(body)
        .map_err(|e| CarrierError::Transport(format!("Unexpected list response: {}", e)))?;
    if !parsed.success {
        return Err(CarrierError::Rejected {
            status: 200,
            body: parsed.message,
        });
    }

    let faxes = parsed.payload.map(|p| p.faxes).unwrap_or_default();
    Ok(faxes
        .into_iter()
        .map(|fax| PolledFax {
            external_id: fax.id,
            raw_status: fax.status,
            cost: fax.cost,
            pages: fax.pages,
            completed_at: fax
                .completed_date_utc
                .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0)),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use url::Url;

    fn client() -> NotifyreClient {
        NotifyreClient::new(NotifyreConfig {
            base_url: "https://api.notifyre.test".to_string(),
            api_key: "token".to_string(),
            timeout_secs: 30,
        })
        .unwrap()
    }

    fn inline_request() -> SendRequest {
        SendRequest {
            recipients: vec!["+15551234567".to_string(), "+15557654321".to_string()],
            documents: vec![Document::Inline {
                filename: "claim.pdf".to_string(),
                content_type: "application/pdf".to_string(),
                bytes: b"%PDF-1.4 fake".to_vec(),
            }],
            sender_id: None,
            client_reference: Some("case-42".to_string()),
        }
    }

    #[tokio::test]
    async fn test_build_payload_shape() {
        let payload = client().build_payload(&inline_request()).await.unwrap();
        assert_eq!(payload.kind, CarrierKind::Notifyre);

        let faxes = &payload.body["Faxes"];
        assert_eq!(faxes["Recipients"][0]["Type"], "fax_number");
        assert_eq!(faxes["Recipients"][0]["Value"], "+15551234567");
        assert_eq!(faxes["Recipients"][1]["Value"], "+15557654321");
        assert_eq!(faxes["ClientReference"], "case-42");
        assert_eq!(faxes["Documents"][0]["Filename"], "claim.pdf");
        assert_eq!(
            faxes["Documents"][0]["Data"],
            BASE64.encode(b"%PDF-1.4 fake")
        );
    }

    #[tokio::test]
    async fn test_build_payload_rejects_url_documents() {
        let mut req = inline_request();
        req.documents = vec![Document::External {
            url: Url::parse("https://store.example.com/doc.pdf").unwrap(),
        }];
        let err = client().build_payload(&req).await.unwrap_err();
        assert!(matches!(err, CarrierError::Invalid(_)));
    }

    #[test]
    fn test_parse_send_response() {
        let accepted = parse_send_response(
            200,
            json!({
                "Payload": {"FaxID": "8f7e6d5c"},
                "Success": true,
                "StatusCode": 200,
                "Message": "OK"
            }),
        )
        .unwrap();
        assert_eq!(accepted.external_id, "8f7e6d5c");
        assert_eq!(accepted.raw_status, "queued");
    }

    #[test]
    fn test_parse_send_response_missing_id() {
        let err = parse_send_response(
            200,
            json!({"Payload": {}, "Success": true, "Message": "OK"}),
        )
        .unwrap_err();
        assert!(matches!(err, CarrierError::MissingExternalId));

        let err = parse_send_response(
            200,
            json!({"Payload": {"FaxID": ""}, "Success": true, "Message": "OK"}),
        )
        .unwrap_err();
        assert!(matches!(err, CarrierError::MissingExternalId));
    }

    #[test]
    fn test_parse_send_response_carrier_failure() {
        let err = parse_send_response(
            200,
            json!({"Payload": null, "Success": false, "Message": "Invalid recipient"}),
        )
        .unwrap_err();
        match err {
            CarrierError::Rejected { body, .. } => assert_eq!(body, "Invalid recipient"),
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_list_response() {
        let polled = parse_list_response(json!({
            "Payload": {
                "Faxes": [
                    {
                        "ID": "fax-1",
                        "Status": "successful",
                        "Cost": 0.07,
                        "Pages": 2,
                        "CompletedDateUtc": 1760000000_i64
                    },
                    {"ID": "fax-2", "Status": "in progress"}
                ]
            },
            "Success": true,
            "Message": "OK"
        }))
        .unwrap();

        assert_eq!(polled.len(), 2);
        assert_eq!(polled[0].external_id, "fax-1");
        assert_eq!(polled[0].raw_status, "successful");
        assert_eq!(polled[0].cost, Some(Decimal::new(7, 2)));
        assert_eq!(polled[0].pages, Some(2));
        assert!(polled[0].completed_at.is_some());
        assert_eq!(polled[1].external_id, "fax-2");
        assert!(polled[1].cost.is_none());
    }
}
