//! The tool catalog advertised to the model.
//!
//! Tool names use flat `domain_service` identifiers because several
//! model families mangle dotted names in tool schemas.

use hearth_llm::ToolDefinition;
use serde_json::json;

/// Turn a light on, optionally at a brightness.
pub const LIGHT_TURN_ON: &str = "light_turn_on";
/// Turn a light off.
pub const LIGHT_TURN_OFF: &str = "light_turn_off";
/// Set a thermostat target temperature.
pub const CLIMATE_SET_TEMPERATURE: &str = "climate_set_temperature";

/// Returns true for names the executor can dispatch.
pub fn is_known_tool(name: &str) -> bool {
    matches!(
        name,
        LIGHT_TURN_ON | LIGHT_TURN_OFF | CLIMATE_SET_TEMPERATURE
    )
}

/// The full tool catalog, sent with the first chat request of a turn.
pub fn catalog() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition::new(
            LIGHT_TURN_ON,
            "Turn on a light. Optionally set its brightness.",
            json!({
                "type": "object",
                "properties": {
                    "entity_id": {
                        "type": "string",
                        "description": "Entity id of the light, e.g. light.desk_lamp"
                    },
                    "brightness": {
                        "type": "integer",
                        "description": "Brightness from 0 (off) to 255 (full)",
                        "minimum": 0,
                        "maximum": 255
                    }
                },
                "required": ["entity_id"]
            }),
        ),
        ToolDefinition::new(
            LIGHT_TURN_OFF,
            "Turn off a light.",
            json!({
                "type": "object",
                "properties": {
                    "entity_id": {
                        "type": "string",
                        "description": "Entity id of the light, e.g. light.desk_lamp"
                    }
                },
                "required": ["entity_id"]
            }),
        ),
        ToolDefinition::new(
            CLIMATE_SET_TEMPERATURE,
            "Set the target temperature of a thermostat.",
            json!({
                "type": "object",
                "properties": {
                    "entity_id": {
                        "type": "string",
                        "description": "Entity id of the thermostat, e.g. climate.living_room"
                    },
                    "temperature": {
                        "type": "number",
                        "description": "Target temperature in the home's configured unit"
                    }
                },
                "required": ["entity_id", "temperature"]
            }),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_names() {
        let defs = catalog();
        let names: Vec<&str> = defs.iter().map(|t| t.name()).collect();
        assert_eq!(
            names,
            vec![LIGHT_TURN_ON, LIGHT_TURN_OFF, CLIMATE_SET_TEMPERATURE]
        );
        for name in names {
            assert!(is_known_tool(name));
        }
        assert!(!is_known_tool("vacuum_start"));
    }

    #[test]
    fn test_brightness_schema_bounds() {
        let catalog = catalog();
        let turn_on = serde_json::to_value(&catalog[0]).unwrap();
        let brightness = &turn_on["function"]["parameters"]["properties"]["brightness"];
        assert_eq!(brightness["minimum"], 0);
        assert_eq!(brightness["maximum"], 255);
    }
}
