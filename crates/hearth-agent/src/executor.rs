//! Tool execution.
//!
//! The executor validates canonical tool calls and dispatches them to
//! the home backend, sequentially and in order. It never fails the
//! turn: validation and execution problems become failed
//! [`ToolResult`]s whose content the model can read back.

use crate::home::SharedHome;
use crate::tools;
use crate::types::{ToolCall, ToolResult};
use serde_json::{json, Value};
use tracing::{info, warn};

/// Validates and executes tool calls against a [`HomeControl`] backend.
///
/// [`HomeControl`]: crate::home::HomeControl
pub struct ToolExecutor {
    home: SharedHome,
}

impl ToolExecutor {
    /// Create an executor over the given home backend.
    pub fn new(home: SharedHome) -> Self {
        Self { home }
    }

    /// Execute calls one at a time, in order. Always returns one
    /// result per call.
    pub async fn execute_all(&self, calls: &[ToolCall]) -> Vec<ToolResult> {
        let mut results = Vec::with_capacity(calls.len());
        for call in calls {
            results.push(self.execute(call).await);
        }
        results
    }

    /// Execute a single call.
    pub async fn execute(&self, call: &ToolCall) -> ToolResult {
        let dispatch = match validate(call) {
            Ok(dispatch) => dispatch,
            Err(reason) => {
                warn!(tool = %call.name, %reason, "rejected tool call");
                return ToolResult::failure(&call.id, format!("Invalid tool call: {}", reason));
            }
        };

        info!(
            tool = %call.name,
            entity_id = %dispatch.entity_id,
            "executing tool call"
        );
        match self
            .home
            .call_service(dispatch.domain, dispatch.service, dispatch.data)
            .await
        {
            Ok(()) => ToolResult::success(&call.id, dispatch.success_text),
            Err(err) => {
                warn!(tool = %call.name, entity_id = %dispatch.entity_id, error = %err, "tool call failed");
                ToolResult::failure(
                    &call.id,
                    format!("Failed to control {}: {}", dispatch.entity_id, err),
                )
            }
        }
    }
}

/// A validated call, ready for the home backend.
struct Dispatch {
    domain: &'static str,
    service: &'static str,
    entity_id: String,
    data: Value,
    success_text: String,
}

fn validate(call: &ToolCall) -> Result<Dispatch, String> {
    if !tools::is_known_tool(&call.name) {
        return Err(format!("unknown tool '{}'", call.name));
    }

    let entity_id = call
        .entity_id()
        .ok_or_else(|| "missing entity_id".to_string())?
        .to_string();

    match call.name.as_str() {
        tools::LIGHT_TURN_ON => {
            require_domain(&entity_id, "light")?;
            let mut data = json!({"entity_id": entity_id});
            let mut success_text = format!("Successfully turned on {}", entity_id);
            if let Some(brightness) = call.arguments.get("brightness").and_then(Value::as_i64) {
                data["brightness"] = brightness.into();
                success_text = format!(
                    "Successfully turned on {} (brightness {})",
                    entity_id, brightness
                );
            }
            Ok(Dispatch {
                domain: "light",
                service: "turn_on",
                success_text,
                entity_id,
                data,
            })
        }
        tools::LIGHT_TURN_OFF => {
            require_domain(&entity_id, "light")?;
            Ok(Dispatch {
                domain: "light",
                service: "turn_off",
                data: json!({"entity_id": entity_id}),
                success_text: format!("Successfully turned off {}", entity_id),
                entity_id,
            })
        }
        tools::CLIMATE_SET_TEMPERATURE => {
            require_domain(&entity_id, "climate")?;
            let temperature = call
                .arguments
                .get("temperature")
                .and_then(Value::as_f64)
                .ok_or_else(|| "missing or non-numeric temperature".to_string())?;
            Ok(Dispatch {
                domain: "climate",
                service: "set_temperature",
                data: json!({"entity_id": entity_id, "temperature": temperature}),
                success_text: format!(
                    "Successfully set temperature for {} to {}",
                    entity_id, temperature
                ),
                entity_id,
            })
        }
        _ => unreachable!("is_known_tool covers every dispatched name"),
    }
}

fn require_domain(entity_id: &str, domain: &str) -> Result<(), String> {
    let actual = entity_id.split('.').next().unwrap_or_default();
    if actual == domain {
        Ok(())
    } else {
        Err(format!(
            "entity '{}' is not in the {} domain",
            entity_id, domain
        ))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
