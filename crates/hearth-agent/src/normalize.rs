//! Tool-call normalization.
//!
//! Local models disagree about how tool calls are encoded. Three
//! formats show up in practice:
//!
//! 1. The structured `tool_calls` array on the response message.
//! 2. A flat JSON object in the content, keyed by entity
//!    (`{"type": "light", "light.desk_lamp": "off"}`), sometimes
//!    wrapped in a markdown fence.
//! 3. Inline `<tool_call>{...}</tool_call>` tags mixed into prose.
//!
//! [`normalize`] folds all three into canonical [`ToolCall`]s. It is a
//! total function: malformed input never errors, it degrades into
//! residual text plus [`Anomaly`] records so the caller can log what
//! was dropped.

use crate::types::ToolCall;
use crate::tools;
use hearth_llm::ChatResponse;
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;
use tracing::debug;

/// Inclusive upper bound for light brightness.
const BRIGHTNESS_MAX: i64 = 255;

/// Fenced JSON block, with or without a `json` language tag.
static JSON_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```(?:json)?\s*(.*?)\s*```").unwrap());

/// One inline tool-call span.
static INLINE_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<tool_call>\s*(.*?)\s*</tool_call>").unwrap());

// ─────────────────────────────────────────────────────────────────────────────
// Output Types
// ─────────────────────────────────────────────────────────────────────────────

/// Why a fragment of model output could not become a tool call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnomalyKind {
    /// A flat-dict `type` named a domain we do not control.
    UnknownDomain,
    /// A flat-dict value named an action the domain does not support.
    UnknownAction,
    /// A value had the wrong shape for its slot.
    MalformedValue,
    /// A numeric argument fell outside its valid range and was clamped.
    OutOfRange,
    /// An inline tag span was not valid JSON or lacked a tool name.
    UnparseableSpan,
    /// A structured call carried arguments that could not be decoded.
    UnparseableArguments,
}

impl std::fmt::Display for AnomalyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::UnknownDomain => "unknown domain",
            Self::UnknownAction => "unknown action",
            Self::MalformedValue => "malformed value",
            Self::OutOfRange => "out of range",
            Self::UnparseableSpan => "unparseable span",
            Self::UnparseableArguments => "unparseable arguments",
        };
        f.write_str(s)
    }
}

/// A record of model output that was dropped or adjusted during
/// normalization. Carried for logging; never surfaced to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anomaly {
    /// What went wrong.
    pub kind: AnomalyKind,
    /// The offending fragment or a short description of it.
    pub detail: String,
}

impl Anomaly {
    fn new(kind: AnomalyKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }
}

/// The outcome of normalizing one model response.
#[derive(Debug, Clone, Default)]
pub struct Normalized {
    /// Canonical tool calls, in the order the model emitted them.
    pub calls: Vec<ToolCall>,
    /// Content left over after tool-call extraction.
    pub residual: String,
    /// Fragments that were dropped or adjusted.
    pub anomalies: Vec<Anomaly>,
}

impl Normalized {
    /// True when no tool calls were recovered.
    pub fn is_plain_text(&self) -> bool {
        self.calls.is_empty()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Entry Point
// ─────────────────────────────────────────────────────────────────────────────

/// Normalize a model response into canonical tool calls.
///
/// Detection order: the structured `tool_calls` array wins outright;
/// otherwise the content is probed for a flat entity dict, then for
/// inline `<tool_call>` tags. Content that yields no calls is returned
/// verbatim as residual text.
pub fn normalize(response: &ChatResponse) -> Normalized {
    let mut out = Normalized::default();
    let content = response.content();

    if let Some(wire_calls) = response
        .message
        .tool_calls
        .as_ref()
        .filter(|c| !c.is_empty())
    {
        for wire in wire_calls {
            match decode_arguments(&wire.function.arguments) {
                Some(args) => out.calls.push(ToolCall::new(&wire.function.name, args)),
                None => out.anomalies.push(Anomaly::new(
                    AnomalyKind::UnparseableArguments,
                    wire.function.arguments.to_string(),
                )),
            }
        }
        out.residual = content.to_string();
        clamp_brightness(&mut out);
        return out;
    }

    if let Some(dict) = extract_json_object(content).filter(is_flat_dict) {
        from_flat_dict(&dict, &mut out);
        clamp_brightness(&mut out);
        return out;
    }

    if INLINE_TAG.is_match(content) {
        from_inline_tags(content, &mut out);
        clamp_brightness(&mut out);
        return out;
    }

    out.residual = content.to_string();
    out
}

// ─────────────────────────────────────────────────────────────────────────────
// Structured Format
// ─────────────────────────────────────────────────────────────────────────────

/// Arguments arrive either as a JSON object or as a string holding
/// JSON. Anything else is rejected.
fn decode_arguments(raw: &Value) -> Option<Value> {
    match raw {
        Value::Object(_) => Some(raw.clone()),
        Value::String(s) => serde_json::from_str::<Value>(s)
            .ok()
            .filter(|v| v.is_object()),
        Value::Null => Some(Value::Object(serde_json::Map::new())),
        _ => None,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Flat-Dict Format
// ─────────────────────────────────────────────────────────────────────────────

/// Pull a JSON object out of the content, stripping a markdown fence
/// when one is present.
fn extract_json_object(content: &str) -> Option<Value> {
    let candidate = match JSON_FENCE.captures(content) {
        Some(caps) => caps.get(1).map(|m| m.as_str()).unwrap_or(""),
        None => content.trim(),
    };
    serde_json::from_str::<Value>(candidate)
        .ok()
        .filter(|v| v.is_object())
}

/// A flat dict is an object with a string `type` naming the domain, no
/// nested `tool_calls`, and at least one key that looks like an entity
/// reference or a device action.
fn is_flat_dict(value: &Value) -> bool {
    let Some(map) = value.as_object() else {
        return false;
    };
    if !map.get("type").map(Value::is_string).unwrap_or(false) {
        return false;
    }
    if map.contains_key("tool_calls") {
        return false;
    }
    map.keys().any(|k| {
        k.contains('.') || matches!(k.as_str(), "on" | "off" | "brightness" | "temperature")
    })
}

/// Keys that carry prose or metadata rather than entity actions.
fn is_meta_key(key: &str) -> bool {
    matches!(key, "type" | "content" | "text" | "__reasoning__")
}

fn from_flat_dict(dict: &Value, out: &mut Normalized) {
    let Some(map) = dict.as_object() else {
        return;
    };
    let domain = map
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    // A flat dict may smuggle prose alongside the actions.
    if let Some(text) = map
        .get("content")
        .or_else(|| map.get("text"))
        .and_then(Value::as_str)
    {
        out.residual = text.to_string();
    }

    for (key, value) in map {
        if is_meta_key(key) {
            continue;
        }
        // Bare keys are qualified with the declared domain.
        let entity_id = if key.contains('.') {
            key.clone()
        } else {
            format!("{}.{}", domain, key)
        };

        match domain.as_str() {
            "light" => from_flat_light(&entity_id, value, out),
            "climate" => from_flat_climate(&entity_id, value, out),
            other => {
                debug!(domain = %other, key = %key, "flat dict names an uncontrolled domain");
                out.anomalies.push(Anomaly::new(
                    AnomalyKind::UnknownDomain,
                    format!("{}: {}", other, key),
                ));
            }
        }
    }
}

fn from_flat_light(entity_id: &str, value: &Value, out: &mut Normalized) {
    match value {
        Value::String(action) => match action.to_ascii_lowercase().as_str() {
            "on" => out.calls.push(ToolCall::new(
                tools::LIGHT_TURN_ON,
                serde_json::json!({"entity_id": entity_id}),
            )),
            "off" => out.calls.push(ToolCall::new(
                tools::LIGHT_TURN_OFF,
                serde_json::json!({"entity_id": entity_id}),
            )),
            other => out.anomalies.push(Anomaly::new(
                AnomalyKind::UnknownAction,
                format!("{}: {}", entity_id, other),
            )),
        },
        // A bare number means brightness, which implies turning on.
        Value::Number(n) => out.calls.push(ToolCall::new(
            tools::LIGHT_TURN_ON,
            serde_json::json!({"entity_id": entity_id, "brightness": n}),
        )),
        Value::Object(fields) => {
            let state = fields.get("state").and_then(Value::as_str).unwrap_or("on");
            if state.eq_ignore_ascii_case("off") {
                out.calls.push(ToolCall::new(
                    tools::LIGHT_TURN_OFF,
                    serde_json::json!({"entity_id": entity_id}),
                ));
                return;
            }
            let mut args = serde_json::json!({"entity_id": entity_id});
            if let Some(brightness) = fields.get("brightness").and_then(Value::as_i64) {
                args["brightness"] = brightness.into();
            }
            out.calls.push(ToolCall::new(tools::LIGHT_TURN_ON, args));
        }
        other => out.anomalies.push(Anomaly::new(
            AnomalyKind::MalformedValue,
            format!("{}: {}", entity_id, other),
        )),
    }
}

fn from_flat_climate(entity_id: &str, value: &Value, out: &mut Normalized) {
    let temperature = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Object(fields) => fields.get("temperature").and_then(Value::as_f64),
        _ => None,
    };
    match temperature {
        Some(t) => out.calls.push(ToolCall::new(
            tools::CLIMATE_SET_TEMPERATURE,
            serde_json::json!({"entity_id": entity_id, "temperature": t}),
        )),
        None => out.anomalies.push(Anomaly::new(
            AnomalyKind::MalformedValue,
            format!("{}: {}", entity_id, value),
        )),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Inline-Tag Format
// ─────────────────────────────────────────────────────────────────────────────

fn from_inline_tags(content: &str, out: &mut Normalized) {
    for caps in INLINE_TAG.captures_iter(content) {
        let span = caps.get(1).map(|m| m.as_str()).unwrap_or("");
        match parse_inline_span(span) {
            Some(call) => out.calls.push(call),
            None => out
                .anomalies
                .push(Anomaly::new(AnomalyKind::UnparseableSpan, span)),
        }
    }
    let stripped = INLINE_TAG.replace_all(content, "");
    out.residual = stripped.trim().to_string();
}

/// Inline spans come in two shapes: `{"name": ..., "arguments": ...}`
/// or the nested `{"function": {"name": ..., "arguments": ...}}`.
fn parse_inline_span(span: &str) -> Option<ToolCall> {
    let value: Value = serde_json::from_str(span).ok()?;
    let obj = value.as_object()?;
    let func = obj
        .get("function")
        .and_then(Value::as_object)
        .unwrap_or(obj);
    let name = func.get("name")?.as_str()?;
    if name.is_empty() {
        return None;
    }
    let args = func
        .get("arguments")
        .or_else(|| func.get("parameters"))
        .cloned()
        .unwrap_or(Value::Null);
    let args = decode_arguments(&args)?;
    Some(ToolCall::new(name, args))
}

// ─────────────────────────────────────────────────────────────────────────────
// Shared Postprocessing
// ─────────────────────────────────────────────────────────────────────────────

/// Clamp brightness arguments into `0..=255`, recording an anomaly for
/// each value that had to move.
fn clamp_brightness(out: &mut Normalized) {
    let mut clamped = Vec::new();
    for call in &mut out.calls {
        let Some(raw) = call.arguments.get("brightness").and_then(Value::as_i64) else {
            continue;
        };
        let bounded = raw.clamp(0, BRIGHTNESS_MAX);
        if bounded != raw {
            call.arguments["brightness"] = bounded.into();
            clamped.push(Anomaly::new(
                AnomalyKind::OutOfRange,
                format!("brightness {} clamped to {}", raw, bounded),
            ));
        }
    }
    out.anomalies.extend(clamped);
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
