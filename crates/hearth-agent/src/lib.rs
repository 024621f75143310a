//! Agent core for Hearth.
//!
//! This crate owns the conversation turn: it normalizes the model's
//! heterogeneous tool-call encodings into canonical calls, executes
//! them against a [`HomeControl`] collaborator, strips internal
//! reasoning from the user-facing reply, and keeps a bounded
//! per-conversation history.
//!
//! The entry point is [`Agent::process`], which takes one user
//! utterance and returns one final reply.

pub mod agent;
pub mod error;
pub mod executor;
pub mod filter;
pub mod history;
pub mod home;
pub mod normalize;
pub mod prompt;
pub mod tools;
pub mod types;

pub use agent::{Agent, AgentBuilder};
pub use error::{AgentError, Result};
pub use executor::ToolExecutor;
pub use filter::filter_reasoning;
pub use history::HistoryStore;
pub use home::{DeviceState, HomeControl, HomeError, MockHomeControl, ServiceInvocation, SharedHome};
pub use normalize::{normalize, Anomaly, AnomalyKind, Normalized};
pub use types::{AgentConfig, Conversation, ConversationId, ToolCall, ToolResult, TurnOutcome};
