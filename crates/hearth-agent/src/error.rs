//! Error types for the agent crate.

use hearth_llm::LlmError;
use thiserror::Error;

/// Result type alias using the agent error type.
pub type Result<T> = std::result::Result<T, AgentError>;

/// Errors that abort a conversation turn.
///
/// Tool execution and parsing problems never appear here; they are
/// absorbed into tool results and anomalies so the turn still
/// completes. Only a failed model exchange or bad configuration stops
/// a turn.
#[derive(Debug, Error)]
pub enum AgentError {
    /// The model exchange failed (transport, timeout, or server error).
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    /// Agent configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl AgentError {
    /// Returns true if the caller may retry the turn.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Llm(err) => err.is_retryable(),
            Self::Config(_) => false,
        }
    }
}
