//! In-memory demo home.
//!
//! Lets the assistant run end-to-end without a hub: a handful of
//! devices whose states actually change when services are called.

use async_trait::async_trait;
use hearth_agent::{DeviceState, HomeControl, HomeError};
use parking_lot::Mutex;
use serde_json::Value;
use tracing::info;

/// A mutable in-memory home with a few demo devices.
pub struct DemoHome {
    devices: Mutex<Vec<DeviceState>>,
}

impl DemoHome {
    /// Create the demo home with its default devices.
    pub fn new() -> Self {
        Self {
            devices: Mutex::new(vec![
                DeviceState::new("light.desk_lamp", "Desk Lamp", "on").with_area("Office"),
                DeviceState::new("light.kitchen", "Kitchen Light", "off").with_area("Kitchen"),
                DeviceState::new("light.porch", "Porch Light", "off"),
                DeviceState::new("climate.living_room", "Living Room Thermostat", "20.0")
                    .with_area("Living Room"),
            ]),
        }
    }
}

impl Default for DemoHome {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HomeControl for DemoHome {
    async fn call_service(
        &self,
        domain: &str,
        service: &str,
        data: Value,
    ) -> Result<(), HomeError> {
        let entity_id = data
            .get("entity_id")
            .and_then(Value::as_str)
            .ok_or_else(|| HomeError::Service("missing entity_id".to_string()))?;

        let mut devices = self.devices.lock();
        let device = devices
            .iter_mut()
            .find(|d| d.entity_id == entity_id)
            .ok_or_else(|| HomeError::Unavailable(entity_id.to_string()))?;

        match (domain, service) {
            ("light", "turn_on") => device.state = "on".to_string(),
            ("light", "turn_off") => device.state = "off".to_string(),
            ("climate", "set_temperature") => {
                let temperature = data
                    .get("temperature")
                    .and_then(Value::as_f64)
                    .ok_or_else(|| HomeError::Service("missing temperature".to_string()))?;
                device.state = format!("{}", temperature);
            }
            _ => {
                return Err(HomeError::Service(format!(
                    "unsupported service {}.{}",
                    domain, service
                )))
            }
        }
        info!(%entity_id, state = %device.state, "demo device updated");
        Ok(())
    }

    async fn device_states(&self) -> Result<Vec<DeviceState>, HomeError> {
        Ok(self.devices.lock().clone())
    }
}
