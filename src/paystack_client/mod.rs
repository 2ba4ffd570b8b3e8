// Paystack transaction verification client

use std::time::Duration;

use serde::Deserialize;

use crate::gate::payment::{
    GatewayError, PaymentGateway, TransactionStatus, TransactionVerification,
};

#[derive(Clone, Debug)]
pub struct PaystackClient {
    base_url: reqwest::Url,
    secret_key: Option<String>,
    client: reqwest::Client,
}

impl PaystackClient {
    /// Create a new client with the given base URL (e.g. "https://api.paystack.co").
    /// Every request is bounded by `timeout`.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        let base_url_str = base_url.into();
        tracing::debug!(base_url = %base_url_str, timeout_ms = timeout.as_millis() as u64, "creating PaystackClient");
        let base_url = reqwest::Url::parse(base_url_str.trim_end_matches('/'))?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("Paystack base URL {base_url_str} cannot be a base");
        }
        Ok(PaystackClient {
            base_url,
            secret_key: None,
            client,
        })
    }

    /// Return a client with the provided secret key set (Bearer)
    pub fn with_secret_key(mut self, secret_key: impl Into<String>) -> Self {
        self.secret_key = Some(secret_key.into());
        self
    }

    /// URL for `segments` under the base path, each segment percent-encoded.
    fn url(&self, segments: &[&str]) -> reqwest::Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn auth_header(&self) -> Option<(String, String)> {
        self.secret_key
            .as_ref()
            .map(|k| ("Authorization".to_string(), format!("Bearer {}", k)))
    }

    /// GET /transaction/verify/:reference
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn verify(&self, reference: &str) -> Result<VerifyResponse, GatewayError> {
        let url = self.url(&["transaction", "verify", reference]);
        tracing::debug!(%url, "GET transaction verify");
        let mut req = self.client.get(url);
        if let Some((k, v)) = self.auth_header() {
            req = req.header(&k, &v);
        }
        let resp = req
            .send()
            .await
            .map_err(|e| GatewayError::Unreachable(e.to_string()))?;
        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| GatewayError::Unreachable(e.to_string()))?;

        // Paystack answers unknown references with a 4xx and a regular envelope,
        // so the body is parsed whatever the status.
        match serde_json::from_str::<VerifyResponse>(&body) {
            Ok(parsed) => Ok(parsed),
            Err(e) if status.is_server_error() => {
                tracing::warn!(%status, error = %e, "Paystack server error");
                Err(GatewayError::Unreachable(format!("HTTP {status}")))
            }
            Err(e) => {
                let snippet_len = body.len().min(500);
                let snippet = body.get(..snippet_len).unwrap_or_default();
                tracing::error!(%status, error = %e, body_snippet = %snippet, "failed to parse VerifyResponse");
                Err(GatewayError::Malformed(e.to_string()))
            }
        }
    }
}

#[async_trait::async_trait]
impl PaymentGateway for PaystackClient {
    async fn verify_transaction(
        &self,
        reference: &str,
    ) -> Result<TransactionVerification, GatewayError> {
        self.verify(reference).await?.into_verification(reference)
    }
}

#[derive(Debug, Deserialize, PartialEq)]
pub struct VerifyResponse {
    pub status: bool,
    pub message: Option<String>,
    pub data: Option<VerifyData>,
}

#[derive(Debug, Deserialize, PartialEq)]
pub struct VerifyData {
    pub status: String,
    pub reference: String,
    /// Smallest currency unit
    pub amount: i64,
    pub currency: Option<String>,
    pub paid_at: Option<String>,
    pub gateway_response: Option<String>,
    // allow extra fields
    #[serde(flatten)]
    pub extra: std::collections::HashMap<String, serde_json::Value>,
}

impl VerifyResponse {
    /// A `false` envelope means Paystack does not know or did not accept the
    /// reference; that is a failed transaction, not a transport problem.
    pub fn into_verification(
        self,
        requested_reference: &str,
    ) -> Result<TransactionVerification, GatewayError> {
        if !self.status {
            tracing::debug!(message = self.message.as_deref().unwrap_or(""), "Paystack rejected verification");
            return Ok(TransactionVerification {
                status: TransactionStatus::Failure,
                attributed_amount: 0,
                attributed_reference: requested_reference.to_string(),
                currency: None,
                attributed_viewer: None,
                attributed_document: None,
            });
        }
        let data = self
            .data
            .ok_or_else(|| GatewayError::Malformed("successful envelope without data".into()))?;
        tracing::debug!(
            status = %data.status,
            paid_at = data.paid_at.as_deref().unwrap_or(""),
            gateway_response = data.gateway_response.as_deref().unwrap_or(""),
            "Paystack verification result"
        );
        let status = if data.status == "success" {
            TransactionStatus::Success
        } else {
            TransactionStatus::Failure
        };
        let metadata = data.purchase_metadata();
        Ok(TransactionVerification {
            status,
            attributed_amount: data.amount,
            attributed_reference: data.reference,
            currency: data.currency,
            attributed_viewer: metadata.user_id,
            attributed_document: metadata.book_id,
        })
    }
}

/// The `metadata` the checkout attaches to a transaction.
#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseMetadata {
    #[serde(default, deserialize_with = "id_string")]
    pub book_id: Option<String>,
    #[serde(default, deserialize_with = "id_string")]
    pub user_id: Option<String>,
}

// checkouts send ids as strings, older ones as numbers
fn id_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

impl VerifyData {
    /// Paystack hands metadata back either as an object or as a JSON-encoded
    /// string; anything else carries no purchase.
    pub fn purchase_metadata(&self) -> PurchaseMetadata {
        let parsed = match self.extra.get("metadata") {
            Some(serde_json::Value::Object(map)) => {
                serde_json::from_value(serde_json::Value::Object(map.clone()))
            }
            Some(serde_json::Value::String(s)) if !s.trim().is_empty() => serde_json::from_str(s),
            _ => return PurchaseMetadata::default(),
        };
        parsed.unwrap_or_else(|e| {
            tracing::warn!(error = %e, reference = %self.reference, "unreadable transaction metadata");
            PurchaseMetadata::default()
        })
    }
}
