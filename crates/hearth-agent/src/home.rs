//! Home control seam.
//!
//! The agent never talks to a smart-home hub directly; it goes through
//! the [`HomeControl`] trait so tests can script device behavior and
//! deployments can swap hubs.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Errors from the home-control backend.
#[derive(Debug, Error)]
pub enum HomeError {
    /// The hub rejected the service call.
    #[error("Service call failed: {0}")]
    Service(String),

    /// The hub could not be reached.
    #[error("Home network error: {0}")]
    Network(String),

    /// The target device exists but cannot act right now.
    #[error("Device unavailable: {0}")]
    Unavailable(String),
}

/// A device visible to the assistant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceState {
    /// Stable entity id, `domain.object_id`.
    pub entity_id: String,
    /// Domain half of the entity id (`light`, `climate`).
    pub domain: String,
    /// Display name shown to the model.
    pub friendly_name: String,
    /// Current state string (`on`, `off`, `21.5`).
    pub state: String,
    /// Room or area, when the hub reports one.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub area: Option<String>,
}

impl DeviceState {
    /// Create a device state without an area.
    pub fn new(
        entity_id: impl Into<String>,
        friendly_name: impl Into<String>,
        state: impl Into<String>,
    ) -> Self {
        let entity_id = entity_id.into();
        let domain = entity_id.split('.').next().unwrap_or_default().to_string();
        Self {
            entity_id,
            domain,
            friendly_name: friendly_name.into(),
            state: state.into(),
            area: None,
        }
    }

    /// Set the area.
    pub fn with_area(mut self, area: impl Into<String>) -> Self {
        self.area = Some(area.into());
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Trait
// ─────────────────────────────────────────────────────────────────────────────

/// Abstraction over the smart-home hub.
#[async_trait]
pub trait HomeControl: Send + Sync {
    /// Invoke a service in a domain with call data. `data` always
    /// carries an `entity_id` key naming the target.
    async fn call_service(
        &self,
        domain: &str,
        service: &str,
        data: Value,
    ) -> std::result::Result<(), HomeError>;

    /// Snapshot of the devices exposed to the assistant.
    async fn device_states(&self) -> std::result::Result<Vec<DeviceState>, HomeError>;
}

/// Shared handle to a home-control backend.
pub type SharedHome = Arc<dyn HomeControl>;

// ─────────────────────────────────────────────────────────────────────────────
// Mock
// ─────────────────────────────────────────────────────────────────────────────

/// One recorded service call, for test assertions.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceInvocation {
    pub domain: String,
    pub service: String,
    pub data: Value,
}

/// Scriptable in-memory home for tests.
///
/// Every service call is recorded. Entities listed in
/// `fail_with` reject calls with the scripted error message.
pub struct MockHomeControl {
    devices: Vec<DeviceState>,
    fail_with: HashMap<String, String>,
    fail_device_states: Option<String>,
    invocations: Mutex<Vec<ServiceInvocation>>,
}

impl MockHomeControl {
    /// Create a mock exposing the given devices.
    pub fn new(devices: Vec<DeviceState>) -> Self {
        Self {
            devices,
            fail_with: HashMap::new(),
            fail_device_states: None,
            invocations: Mutex::new(Vec::new()),
        }
    }

    /// Script a failure for calls targeting `entity_id`.
    pub fn fail_entity(mut self, entity_id: impl Into<String>, message: impl Into<String>) -> Self {
        self.fail_with.insert(entity_id.into(), message.into());
        self
    }

    /// Script `device_states` itself to fail.
    pub fn fail_device_states(mut self, message: impl Into<String>) -> Self {
        self.fail_device_states = Some(message.into());
        self
    }

    /// All service calls made so far, in order.
    pub fn invocations(&self) -> Vec<ServiceInvocation> {
        self.invocations.lock().clone()
    }

    /// Number of service calls made so far.
    pub fn invocation_count(&self) -> usize {
        self.invocations.lock().len()
    }
}

#[async_trait]
impl HomeControl for MockHomeControl {
    async fn call_service(
        &self,
        domain: &str,
        service: &str,
        data: Value,
    ) -> std::result::Result<(), HomeError> {
        self.invocations.lock().push(ServiceInvocation {
            domain: domain.to_string(),
            service: service.to_string(),
            data: data.clone(),
        });

        let entity = data
            .get("entity_id")
            .and_then(Value::as_str)
            .unwrap_or_default();
        if let Some(message) = self.fail_with.get(entity) {
            return Err(HomeError::Service(message.clone()));
        }
        Ok(())
    }

    async fn device_states(&self) -> std::result::Result<Vec<DeviceState>, HomeError> {
        if let Some(message) = &self.fail_device_states {
            return Err(HomeError::Network(message.clone()));
        }
        Ok(self.devices.clone())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn demo_devices() -> Vec<DeviceState> {
        vec![
            DeviceState::new("light.desk_lamp", "Desk Lamp", "on").with_area("Office"),
            DeviceState::new("climate.living_room", "Living Room Thermostat", "20.0"),
        ]
    }

    #[test]
    fn test_device_state_derives_domain() {
        let device = DeviceState::new("light.desk_lamp", "Desk Lamp", "on");
        assert_eq!(device.domain, "light");
    }

    #[tokio::test]
    async fn test_mock_records_invocations() {
        let home = MockHomeControl::new(demo_devices());
        home.call_service("light", "turn_off", json!({"entity_id": "light.desk_lamp"}))
            .await
            .unwrap();

        let calls = home.invocations();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].domain, "light");
        assert_eq!(calls[0].service, "turn_off");
        assert_eq!(calls[0].data["entity_id"], "light.desk_lamp");
    }

    #[tokio::test]
    async fn test_mock_scripted_failure() {
        let home = MockHomeControl::new(demo_devices())
            .fail_entity("light.desk_lamp", "bulb not responding");

        let err = home
            .call_service("light", "turn_on", json!({"entity_id": "light.desk_lamp"}))
            .await
            .unwrap_err();
        assert!(matches!(err, HomeError::Service(_)));
        // The failed call is still recorded.
        assert_eq!(home.invocation_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_device_states() {
        let home = MockHomeControl::new(demo_devices());
        let states = home.device_states().await.unwrap();
        assert_eq!(states.len(), 2);
        assert_eq!(states[0].area.as_deref(), Some("Office"));

        let home = MockHomeControl::new(vec![]).fail_device_states("hub offline");
        assert!(home.device_states().await.is_err());
    }
}
