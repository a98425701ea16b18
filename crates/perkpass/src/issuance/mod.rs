//! Pass issuance through the external badge service.
//!
//! The issuer validates the member's identity fields, builds the pass-upsert
//! payload with every benefit counter initialized to its monthly cap, and
//! submits it through the [`BadgeGateway`] seam. Transport failures retry
//! with a short backoff; upstream rejections do not (the remote already saw
//! the request).

mod gateway;

pub use gateway::{BadgeGateway, HttpBadgeGateway};

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::catalog::BenefitCatalog;
use crate::config::BadgeConfig;
use crate::redemption::PassId;

/// Identity fields collected from the pass-creation form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuanceRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub member_id: String,
}

impl IssuanceRequest {
    fn validate(&self) -> Result<(), IssuanceError> {
        if self.name.trim().is_empty() {
            return Err(IssuanceError::MissingField { field: "name" });
        }
        if self.email.trim().is_empty() {
            return Err(IssuanceError::MissingField { field: "email" });
        }
        if self.member_id.trim().is_empty() {
            return Err(IssuanceError::MissingField { field: "memberId" });
        }
        Ok(())
    }
}

/// Normalized result of a pass upsert.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PassRecord {
    pub pass_id: PassId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    /// Untouched remote response, forwarded to the caller.
    pub raw: Value,
}

/// Error enumeration for issuance failures.
#[derive(Debug, thiserror::Error)]
pub enum IssuanceError {
    #[error("badge API credentials are not configured")]
    NotConfigured,
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },
    #[error("badge API transport failure: {0}")]
    Transport(String),
    #[error("badge API rejected the request (status {status}): {detail}")]
    Upstream { status: u16, detail: String },
}

/// Translates member identity into badge upsert calls.
pub struct PassIssuer<G> {
    gateway: G,
    template_id: String,
    catalog: Arc<BenefitCatalog>,
    max_attempts: u32,
    retry_backoff: Duration,
}

impl<G> PassIssuer<G>
where
    G: BadgeGateway,
{
    const DEFAULT_MAX_ATTEMPTS: u32 = 3;
    const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_millis(250);

    pub fn new(
        gateway: G,
        config: &BadgeConfig,
        catalog: Arc<BenefitCatalog>,
    ) -> Result<Self, IssuanceError> {
        let template_id = config
            .template_id
            .clone()
            .ok_or(IssuanceError::NotConfigured)?;
        Ok(Self {
            gateway,
            template_id,
            catalog,
            max_attempts: Self::DEFAULT_MAX_ATTEMPTS,
            retry_backoff: Self::DEFAULT_RETRY_BACKOFF,
        })
    }

    pub fn with_retry(mut self, max_attempts: u32, backoff: Duration) -> Self {
        self.max_attempts = max_attempts.max(1);
        self.retry_backoff = backoff;
        self
    }

    /// Issue (or re-issue) a pass for the member. Upserts are idempotent by
    /// member id, which is what makes the transport retry safe.
    pub async fn issue(&self, request: &IssuanceRequest) -> Result<PassRecord, IssuanceError> {
        request.validate()?;
        let payload = self.build_payload(request);

        let mut attempt = 0;
        let data = loop {
            attempt += 1;
            match self.gateway.upsert_pass(payload.clone()).await {
                Ok(data) => break data,
                Err(IssuanceError::Transport(detail)) if attempt < self.max_attempts => {
                    tracing::warn!(attempt, %detail, "badge upsert transport failure, retrying");
                    tokio::time::sleep(self.retry_backoff).await;
                }
                Err(err) => return Err(err),
            }
        };

        Ok(normalize_record(&request.member_id, data))
    }

    fn build_payload(&self, request: &IssuanceRequest) -> Value {
        let mut pass_attributes = Map::new();
        pass_attributes.insert("holder_name".to_string(), json!(request.name));
        pass_attributes.insert("display_name".to_string(), json!(request.name));
        pass_attributes.insert("pass_id".to_string(), json!(request.member_id));
        pass_attributes.insert("member_id".to_string(), json!(request.member_id));
        for (counter, max_per_month) in self.catalog.counters() {
            pass_attributes.insert(counter.0.clone(), json!(max_per_month.to_string()));
        }

        json!({
            "passTemplateId": self.template_id,
            "user": {
                "id": format!("user_{}", request.member_id),
                "attributes": {
                    "name": request.name,
                    "email": request.email,
                    "memberId": request.member_id,
                    "holder_name": request.name,
                    "display_name": request.name,
                    "pass_id": request.member_id,
                },
            },
            "pass": {
                "id": request.member_id,
                "attributes": Value::Object(pass_attributes),
            },
        })
    }
}

fn normalize_record(member_id: &str, data: Value) -> PassRecord {
    let pass_id = data
        .get("pass")
        .and_then(|pass| pass.get("id"))
        .and_then(Value::as_str)
        .unwrap_or(member_id)
        .to_string();
    let download_url = data
        .get("downloadUrl")
        .or_else(|| data.get("pass").and_then(|pass| pass.get("downloadUrl")))
        .and_then(Value::as_str)
        .map(str::to_string);

    PassRecord {
        pass_id: PassId(pass_id),
        download_url,
        raw: data,
    }
}
