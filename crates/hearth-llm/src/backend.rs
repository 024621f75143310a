//! Chat backend trait and mock implementation.
//!
//! The [`ChatBackend`] trait is the seam between the agent loop and the
//! model server; [`MockBackend`] provides scripted responses for
//! deterministic tests of the loop.

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::{LlmError, Result};
use crate::types::{ChatRequest, ChatResponse};

// ─────────────────────────────────────────────────────────────────────────────
// Chat Backend Trait
// ─────────────────────────────────────────────────────────────────────────────

/// Trait for chat model backends.
///
/// The agent treats both operations as blocking calls with explicit
/// timeouts owned by the implementation: a long one for a full chat
/// exchange, a short one for the lightweight health check.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Execute a chat request and return the full response.
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse>;

    /// Check that the backend is reachable and properly configured.
    async fn health_check(&self) -> Result<()>;

    /// Get the name of this backend.
    fn name(&self) -> &str;
}

/// A backend that can be shared across threads.
pub type SharedBackend = Arc<dyn ChatBackend>;

// ─────────────────────────────────────────────────────────────────────────────
// Mock Backend
// ─────────────────────────────────────────────────────────────────────────────

/// A scripted result returned by [`MockBackend`].
#[derive(Debug)]
pub enum MockResponse {
    /// A successful chat response.
    Success(ChatResponse),
    /// A backend failure.
    Error(LlmError),
}

/// A mock backend for testing purposes.
///
/// Returns pre-configured results in order and logs every request it
/// receives, so tests can assert on both sides of the exchange.
#[derive(Debug)]
pub struct MockBackend {
    name: String,
    results: std::sync::Mutex<Vec<MockResponse>>,
    request_log: std::sync::Mutex<Vec<ChatRequest>>,
}

impl MockBackend {
    /// Create a mock backend from successful responses.
    pub fn new(responses: Vec<ChatResponse>) -> Self {
        Self::with_results(responses.into_iter().map(MockResponse::Success).collect())
    }

    /// Create a mock backend from mixed success/error results.
    pub fn with_results(results: Vec<MockResponse>) -> Self {
        Self {
            name: "mock".to_string(),
            results: std::sync::Mutex::new(results),
            request_log: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Create a mock backend with a single text response.
    pub fn with_text(text: impl Into<String>) -> Self {
        Self::new(vec![ChatResponse::text(text)])
    }

    /// Get all requests that were made to this backend.
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.request_log.lock().unwrap().clone()
    }

    /// Get the number of requests made.
    pub fn request_count(&self) -> usize {
        self.request_log.lock().unwrap().len()
    }
}

#[async_trait]
impl ChatBackend for MockBackend {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse> {
        self.request_log.lock().unwrap().push(request);

        let mut results = self.results.lock().unwrap();
        if results.is_empty() {
            return Err(LlmError::Backend(
                "MockBackend: no more responses available".to_string(),
            ));
        }
        match results.remove(0) {
            MockResponse::Success(response) => Ok(response),
            MockResponse::Error(err) => Err(err),
        }
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
