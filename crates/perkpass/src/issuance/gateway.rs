use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;

use crate::config::BadgeConfig;

use super::IssuanceError;

/// Outbound seam for the badge pass-upsert RPC, kept behind a trait so the
/// issuer and its tests never need the network.
#[async_trait]
pub trait BadgeGateway: Send + Sync {
    async fn upsert_pass(&self, payload: Value) -> Result<Value, IssuanceError>;
}

#[async_trait]
impl<G> BadgeGateway for std::sync::Arc<G>
where
    G: BadgeGateway,
{
    async fn upsert_pass(&self, payload: Value) -> Result<Value, IssuanceError> {
        (**self).upsert_pass(payload).await
    }
}

/// reqwest-backed gateway with bearer auth and a bounded request timeout.
pub struct HttpBadgeGateway {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl HttpBadgeGateway {
    pub fn from_config(config: &BadgeConfig) -> Result<Self, IssuanceError> {
        let api_key = config
            .api_key
            .clone()
            .ok_or(IssuanceError::NotConfigured)?;
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| IssuanceError::Transport(err.to_string()))?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key,
        })
    }
}

#[async_trait]
impl BadgeGateway for HttpBadgeGateway {
    async fn upsert_pass(&self, payload: Value) -> Result<Value, IssuanceError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|err| IssuanceError::Transport(err.to_string()))?;

        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|err| IssuanceError::Transport(err.to_string()))?;

        if status.is_success() {
            Ok(body)
        } else {
            Err(IssuanceError::Upstream {
                status: status.as_u16(),
                detail: summarize_error_body(&body, status),
            })
        }
    }
}

fn summarize_error_body(body: &Value, status: StatusCode) -> String {
    body.get("error")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("upstream error")
                .to_string()
        })
}
