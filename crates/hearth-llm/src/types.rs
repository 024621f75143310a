//! Wire types for the Ollama `/api/chat` endpoint.
//!
//! These mirror the native Ollama chat contract: an ordered message
//! list with sampling options and optional tool schemas going out, an
//! assistant message (possibly carrying structured tool calls) coming
//! back.

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Messages
// ─────────────────────────────────────────────────────────────────────────────

/// Role of a conversation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System prompt, pinned first in the conversation.
    System,
    /// End-user utterance.
    User,
    /// Model output.
    Assistant,
    /// Tool execution result fed back to the model.
    Tool,
}

/// A single conversation message.
///
/// Ordering is significant; a `Vec<Message>` represents conversation
/// order. Tool-role messages carry the id of the tool call they answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Who produced this message.
    pub role: Role,
    /// Message text.
    pub content: String,
    /// For tool-role messages, the originating tool call id.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub tool_call_id: Option<String>,
}

impl Message {
    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
            tool_call_id: None,
        }
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            tool_call_id: None,
        }
    }

    /// Create an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            tool_call_id: None,
        }
    }

    /// Create a tool result message tied to a tool call.
    pub fn tool(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: content.into(),
            tool_call_id: Some(tool_call_id.into()),
        }
    }

    /// Returns true for the system prompt message.
    pub fn is_system(&self) -> bool {
        self.role == Role::System
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Request
// ─────────────────────────────────────────────────────────────────────────────

/// Model sampling options, passed through to Ollama verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplingOptions {
    /// Sampling temperature.
    pub temperature: f32,
    /// Nucleus sampling threshold.
    pub top_p: f32,
    /// Top-k sampling cutoff.
    pub top_k: u32,
    /// Context window size in tokens.
    pub num_ctx: u32,
}

impl Default for SamplingOptions {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_p: 0.9,
            top_k: 40,
            num_ctx: 8192,
        }
    }
}

/// A tool schema advertised to the model.
///
/// Serializes as `{"type": "function", "function": {...}}`, the shape
/// Ollama's tool-capable models expect.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    #[serde(rename = "type")]
    kind: String,
    function: ToolFunction,
}

/// The function payload of a tool schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolFunction {
    /// Tool name the model must echo back.
    pub name: String,
    /// Human-readable description steering tool selection.
    pub description: String,
    /// JSON-Schema parameter description.
    pub parameters: serde_json::Value,
}

impl ToolDefinition {
    /// Create a new function tool schema.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        Self {
            kind: "function".to_string(),
            function: ToolFunction {
                name: name.into(),
                description: description.into(),
                parameters,
            },
        }
    }

    /// Tool name.
    pub fn name(&self) -> &str {
        &self.function.name
    }

    /// Tool description.
    pub fn description(&self) -> &str {
        &self.function.description
    }
}

/// A chat completion request.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    /// Model to run.
    pub model: String,
    /// Ordered conversation messages.
    pub messages: Vec<Message>,
    /// Always false; token-by-token delivery is not supported.
    pub stream: bool,
    /// Sampling options.
    pub options: SamplingOptions,
    /// Tool schemas the model may call, omitted when none are offered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolDefinition>>,
}

impl ChatRequest {
    /// Create a request with default sampling options and no tools.
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            stream: false,
            options: SamplingOptions::default(),
            tools: None,
        }
    }

    /// Set sampling options.
    pub fn with_options(mut self, options: SamplingOptions) -> Self {
        self.options = options;
        self
    }

    /// Offer tool schemas to the model.
    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = Some(tools);
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Response
// ─────────────────────────────────────────────────────────────────────────────

/// A structured tool call in a chat response (the "standard" encoding).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireToolCall {
    /// The requested function invocation.
    pub function: WireFunction,
}

/// The function part of a wire tool call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireFunction {
    /// Name of the tool to invoke.
    pub name: String,
    /// Arguments, either a JSON object or a string-encoded object
    /// depending on the model family.
    #[serde(default)]
    pub arguments: serde_json::Value,
}

/// The assistant message inside a chat response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseMessage {
    /// Role, normally `assistant`.
    #[serde(default = "default_role")]
    pub role: Role,
    /// Response text; may be empty when the model only issued tool calls.
    #[serde(default)]
    pub content: String,
    /// Structured tool calls, when the model emitted the standard encoding.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub tool_calls: Option<Vec<WireToolCall>>,
}

fn default_role() -> Role {
    Role::Assistant
}

/// A chat completion response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Model that produced the response.
    #[serde(default)]
    pub model: String,
    /// The assistant message.
    pub message: ResponseMessage,
    /// True once the full (non-streamed) response is complete.
    #[serde(default)]
    pub done: bool,
    /// Prompt token count, when the server reports it.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub prompt_eval_count: Option<u64>,
    /// Completion token count, when the server reports it.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub eval_count: Option<u64>,
}

impl ChatResponse {
    /// Build a plain text response (used by tests and mocks).
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            model: "mock-model".to_string(),
            message: ResponseMessage {
                role: Role::Assistant,
                content: content.into(),
                tool_calls: None,
            },
            done: true,
            prompt_eval_count: None,
            eval_count: None,
        }
    }

    /// Build a response carrying structured tool calls (tests and mocks).
    pub fn with_tool_calls(content: impl Into<String>, calls: Vec<WireToolCall>) -> Self {
        Self {
            model: "mock-model".to_string(),
            message: ResponseMessage {
                role: Role::Assistant,
                content: content.into(),
                tool_calls: Some(calls),
            },
            done: true,
            prompt_eval_count: None,
            eval_count: None,
        }
    }

    /// Response text content.
    pub fn content(&self) -> &str {
        &self.message.content
    }

    /// Returns true if the response carries structured tool calls.
    pub fn has_tool_calls(&self) -> bool {
        self.message
            .tool_calls
            .as_ref()
            .is_some_and(|calls| !calls.is_empty())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
