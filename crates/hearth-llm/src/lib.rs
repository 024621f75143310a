//! Chat backend abstraction for Hearth.
//!
//! This crate provides the wire types and transport for talking to a
//! locally hosted Ollama server, behind a [`ChatBackend`] trait so the
//! agent loop can be tested against a mock.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │  ChatBackend trait                  │
//! │  - chat() -> ChatResponse           │
//! │  - health_check()                   │
//! └─────────────────────────────────────┘
//!            │              │
//!            ▼              ▼
//!     ┌────────────┐  ┌────────────┐
//!     │   Ollama   │  │    Mock    │
//!     └────────────┘  └────────────┘
//! ```

pub mod backend;
pub mod error;
pub mod ollama;
pub mod types;

pub use backend::{ChatBackend, MockBackend, MockResponse, SharedBackend};
pub use error::{LlmError, Result};
pub use ollama::{ModelInfo, OllamaBackend, OllamaConfig};
pub use types::{
    ChatRequest, ChatResponse, Message, ResponseMessage, Role, SamplingOptions, ToolDefinition,
    WireFunction, WireToolCall,
};
