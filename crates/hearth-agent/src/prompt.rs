//! System prompt construction.
//!
//! Rebuilt at the start of every turn so the model always sees the
//! current device snapshot.

use crate::home::DeviceState;
use std::fmt::Write;

/// Build the system prompt from the current device snapshot.
pub fn build_system_prompt(devices: &[DeviceState]) -> String {
    format!(
        "You are a voice assistant controlling a smart home.\n\
         Answer questions about the home truthfully and concisely.\n\
         When the user asks you to control a device, call the matching tool.\n\
         Use the EXACT entity_id values listed below; never invent entity ids.\n\
         Only control devices that appear in the list.\n\n\
         Devices:\n{}",
        format_devices(devices)
    )
}

/// Render the device list, one line per device.
fn format_devices(devices: &[DeviceState]) -> String {
    if devices.is_empty() {
        return "No devices are currently exposed to the assistant.".to_string();
    }
    let mut out = String::new();
    for device in devices {
        let _ = write!(
            out,
            "- {} ({}) is {}",
            device.friendly_name, device.entity_id, device.state
        );
        if let Some(area) = &device.area {
            let _ = write!(out, " [{}]", area);
        }
        out.push('\n');
    }
    out.pop();
    out
}
