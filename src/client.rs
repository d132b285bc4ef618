//! HTTP gateway to the complaint API, used by the console front-end.
//!
//! Connectivity failures are mapped to [`GatewayError::Unreachable`] so
//! the front-end renders a "could not reach service" message instead of
//! crashing.

use async_trait::async_trait;
use std::time::Duration;

use crate::controller::{ComplaintsGateway, GatewayError};
use crate::models::{Complaint, CreateAck, NewComplaint};

pub struct HttpComplaintsClient {
    base_url: String,
    client: reqwest::Client,
}

impl HttpComplaintsClient {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }
}

/// Pull `error.field` / `error.message` out of a 422 body, falling back
/// to the raw text.
fn parse_validation_body(body: &str) -> GatewayError {
    if let Ok(json) = serde_json::from_str::<serde_json::Value>(body) {
        let field = json["error"]["field"].as_str().unwrap_or("input");
        let message = json["error"]["message"].as_str().unwrap_or("invalid value");
        return GatewayError::Validation {
            field: field.to_string(),
            message: message.to_string(),
        };
    }
    GatewayError::Validation {
        field: "input".to_string(),
        message: body.to_string(),
    }
}

#[async_trait]
impl ComplaintsGateway for HttpComplaintsClient {
    async fn create(&self, new: &NewComplaint) -> Result<CreateAck, GatewayError> {
        let resp = self
            .client
            .post(format!("{}/complaints", self.base_url))
            .json(new)
            .send()
            .await
            .map_err(|e| GatewayError::Unreachable(e.to_string()))?;

        let status = resp.status();
        if status.is_success() {
            return resp
                .json::<CreateAck>()
                .await
                .map_err(|e| GatewayError::Failed(format!("malformed response: {}", e)));
        }

        let body = resp.text().await.unwrap_or_default();
        if status.as_u16() == 422 {
            return Err(parse_validation_body(&body));
        }
        Err(GatewayError::Failed(format!("status {}", status)))
    }

    async fn fetch(&self, id: &str) -> Result<Complaint, GatewayError> {
        let resp = self
            .client
            .get(format!("{}/complaints/{}", self.base_url, id))
            .send()
            .await
            .map_err(|e| GatewayError::Unreachable(e.to_string()))?;

        let status = resp.status();
        if status.is_success() {
            return resp
                .json::<Complaint>()
                .await
                .map_err(|e| GatewayError::Failed(format!("malformed response: {}", e)));
        }
        if status.as_u16() == 404 {
            return Err(GatewayError::NotFound);
        }
        Err(GatewayError::Failed(format!("status {}", status)))
    }
}
