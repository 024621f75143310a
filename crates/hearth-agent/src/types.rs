//! Core types for the agent: canonical tool calls, conversations, and
//! turn outcomes.

use hearth_llm::{Message, SamplingOptions};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─────────────────────────────────────────────────────────────────────────────
// Conversation Identity
// ─────────────────────────────────────────────────────────────────────────────

/// Stable identifier for one conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(Uuid);

impl ConversationId {
    /// Generate a fresh conversation id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConversationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ConversationId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Canonical Tool Calls
// ─────────────────────────────────────────────────────────────────────────────

/// A canonical, encoding-independent tool call.
///
/// Produced only by the normalizer; immutable once created.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    /// Unique id tying results back to this call.
    pub id: String,
    /// Name of the action to invoke (e.g. `light_turn_off`).
    pub name: String,
    /// Arguments as a JSON object.
    pub arguments: serde_json::Value,
}

impl ToolCall {
    /// Create a tool call with a generated id.
    pub fn new(name: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self {
            id: format!("call_{}", Uuid::new_v4().simple()),
            name: name.into(),
            arguments,
        }
    }

    /// The `entity_id` argument, when present and a string.
    pub fn entity_id(&self) -> Option<&str> {
        self.arguments.get("entity_id").and_then(|v| v.as_str())
    }
}

/// The outcome of executing one tool call.
///
/// Produced only by the executor. Failures are carried here as
/// human-readable content, never as errors.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolResult {
    /// Id of the originating tool call.
    pub tool_call_id: String,
    /// Whether the action took effect.
    pub success: bool,
    /// Human-readable outcome text.
    pub content: String,
}

impl ToolResult {
    /// Create a successful result.
    pub fn success(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            success: true,
            content: content.into(),
        }
    }

    /// Create a failed result.
    pub fn failure(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            success: false,
            content: content.into(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Conversation
// ─────────────────────────────────────────────────────────────────────────────

/// One conversation's ordered message history.
///
/// The message list may start with a pinned system prompt; the system
/// prompt is exempt from the non-system message cap.
#[derive(Debug, Clone)]
pub struct Conversation {
    /// Stable conversation id.
    pub id: ConversationId,
    /// Ordered messages, system prompt (if any) first.
    pub messages: Vec<Message>,
}

impl Conversation {
    /// Create an empty conversation.
    pub fn new(id: ConversationId) -> Self {
        Self {
            id,
            messages: Vec::new(),
        }
    }

    /// Append a message.
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// The most recent `limit` non-system messages, in order.
    pub fn recent(&self, limit: usize) -> Vec<Message> {
        let non_system: Vec<&Message> =
            self.messages.iter().filter(|m| !m.is_system()).collect();
        let start = non_system.len().saturating_sub(limit);
        non_system[start..].iter().map(|m| (*m).clone()).collect()
    }

    /// Count of non-system messages.
    pub fn non_system_len(&self) -> usize {
        self.messages.iter().filter(|m| !m.is_system()).count()
    }

    /// Truncate to the most recent `max_non_system` non-system
    /// messages, keeping a leading system prompt pinned.
    pub fn truncate(&mut self, max_non_system: usize) {
        let system = self
            .messages
            .first()
            .filter(|m| m.is_system())
            .cloned();

        let non_system: Vec<Message> = self
            .messages
            .iter()
            .filter(|m| !m.is_system())
            .cloned()
            .collect();
        let start = non_system.len().saturating_sub(max_non_system);

        self.messages = system.into_iter().chain(non_system[start..].iter().cloned()).collect();
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Agent Configuration & Turn Outcome
// ─────────────────────────────────────────────────────────────────────────────

/// Number of non-system messages retained per conversation.
pub const DEFAULT_MAX_HISTORY: usize = 10;

/// Configuration for the agent loop.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Model name sent with every chat request.
    pub model: String,
    /// Sampling options forwarded to the backend.
    pub sampling: SamplingOptions,
    /// Non-system message cap per conversation.
    pub max_history: usize,
}

impl AgentConfig {
    /// Create a config for the given model with default sampling.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            sampling: SamplingOptions::default(),
            max_history: DEFAULT_MAX_HISTORY,
        }
    }
}

/// The result of processing one user utterance.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    /// Final user-facing reply; never empty.
    pub reply: String,
    /// Conversation the turn belongs to (freshly created when the
    /// caller passed none).
    pub conversation_id: ConversationId,
    /// Results of any tool calls executed this turn, in call order.
    pub tool_results: Vec<ToolResult>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
