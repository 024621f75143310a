//! Home Assistant REST client.
//!
//! Implements [`HomeControl`] over the Home Assistant HTTP API:
//! `POST /api/services/{domain}/{service}` for actions and
//! `GET /api/states` for the device snapshot. Authentication is a
//! long-lived access token sent as a bearer header.

use async_trait::async_trait;
use hearth_agent::{DeviceState, HomeControl, HomeError};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Timeout for every hub request.
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Entity domains exposed to the assistant.
const CONTROLLED_DOMAINS: [&str; 2] = ["light", "climate"];

/// One entity from `GET /api/states`.
#[derive(Debug, Deserialize)]
struct HassState {
    entity_id: String,
    state: String,
    #[serde(default)]
    attributes: Value,
}

/// Home Assistant hub client.
pub struct HassControl {
    client: Client,
    base_url: String,
    token: String,
}

impl HassControl {
    /// Create a client for the hub at `base_url`.
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Result<Self, HomeError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| HomeError::Network(format!("failed to create HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl HomeControl for HassControl {
    async fn call_service(
        &self,
        domain: &str,
        service: &str,
        data: Value,
    ) -> Result<(), HomeError> {
        let url = self.url(&format!("/api/services/{}/{}", domain, service));
        debug!(%url, "calling home assistant service");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&data)
            .send()
            .await
            .map_err(|e| HomeError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(HomeError::Service(format!(
                "hub returned {}: {}",
                status,
                body.chars().take(200).collect::<String>()
            )));
        }
        Ok(())
    }

    async fn device_states(&self) -> Result<Vec<DeviceState>, HomeError> {
        let response = self
            .client
            .get(self.url("/api/states"))
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| HomeError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(HomeError::Service(format!("hub returned {}", status)));
        }

        let states: Vec<HassState> = response
            .json()
            .await
            .map_err(|e| HomeError::Service(format!("bad states payload: {}", e)))?;

        Ok(states
            .into_iter()
            .filter(|s| {
                CONTROLLED_DOMAINS
                    .iter()
                    .any(|d| s.entity_id.starts_with(&format!("{}.", d)))
            })
            .filter(|s| s.state != "unavailable")
            .map(|s| {
                let friendly_name = s
                    .attributes
                    .get("friendly_name")
                    .and_then(Value::as_str)
                    .unwrap_or(&s.entity_id)
                    .to_string();
                let mut device = DeviceState::new(s.entity_id, friendly_name, s.state);
                if let Some(area) = s.attributes.get("area").and_then(Value::as_str) {
                    device = device.with_area(area);
                }
                device
            })
            .collect())
    }
}
