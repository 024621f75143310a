//! The conversation turn loop.
//!
//! [`Agent::process`] takes one user utterance and runs the full turn:
//! build the system prompt from the live device snapshot, exchange
//! with the model (offering the tool catalog), normalize and execute
//! any tool calls, feed the results back for exactly one follow-up
//! exchange, and return a cleaned, never-empty reply.

use crate::error::{AgentError, Result};
use crate::executor::ToolExecutor;
use crate::filter::filter_reasoning;
use crate::history::HistoryStore;
use crate::home::SharedHome;
use crate::normalize::{normalize, Normalized};
use crate::prompt::build_system_prompt;
use crate::tools;
use crate::types::{AgentConfig, ConversationId, ToolCall, ToolResult, TurnOutcome};
use hearth_llm::{ChatRequest, Message, SamplingOptions, SharedBackend};
use tracing::{info, warn};

/// Reply used when the model returns nothing and no tools ran.
const EMPTY_REPLY: &str = "I'm sorry, I didn't come up with a response. Please try again.";

// ─────────────────────────────────────────────────────────────────────────────
// Agent
// ─────────────────────────────────────────────────────────────────────────────

/// The conversation agent.
pub struct Agent {
    backend: SharedBackend,
    home: SharedHome,
    executor: ToolExecutor,
    history: HistoryStore,
    config: AgentConfig,
}

impl Agent {
    /// Start building an agent.
    pub fn builder() -> AgentBuilder {
        AgentBuilder::default()
    }

    /// Process one user utterance and return the final reply.
    ///
    /// Passing `None` for the conversation id starts a new
    /// conversation; the id actually used comes back in the outcome.
    pub async fn process(
        &self,
        conversation_id: Option<ConversationId>,
        user_text: &str,
    ) -> Result<TurnOutcome> {
        let (id, handle) = self.history.get_or_create(conversation_id);
        let mut conversation = handle.lock().await;

        // The hub being unreachable should not kill the conversation;
        // the model just sees an empty device list.
        let devices = match self.home.device_states().await {
            Ok(devices) => devices,
            Err(err) => {
                warn!(conversation_id = %id, error = %err, "device snapshot failed");
                Vec::new()
            }
        };

        let mut messages = vec![Message::system(build_system_prompt(&devices))];
        messages.extend(conversation.recent(self.config.max_history));
        messages.push(Message::user(user_text));

        info!(conversation_id = %id, "sending chat request");
        let first = self
            .backend
            .chat(
                ChatRequest::new(&self.config.model, messages.clone())
                    .with_options(self.config.sampling)
                    .with_tools(tools::catalog()),
            )
            .await?;

        let first_norm = normalize(&first);
        log_anomalies(&id, &first_norm);

        let (reply, results) = if first_norm.calls.is_empty() {
            let reply = filter_reasoning(&first_norm.residual);
            let reply = if reply.is_empty() {
                warn!(conversation_id = %id, "model returned an empty response");
                EMPTY_REPLY.to_string()
            } else {
                reply
            };
            (reply, Vec::new())
        } else {
            self.tool_round_trip(&id, messages, first_norm).await?
        };

        conversation.push(Message::user(user_text));
        for result in &results {
            conversation.push(Message::tool(&result.tool_call_id, &result.content));
        }
        conversation.push(Message::assistant(&reply));
        conversation.truncate(self.config.max_history);

        Ok(TurnOutcome {
            reply,
            conversation_id: id,
            tool_results: results,
        })
    }

    /// Execute the turn's tool calls and run the single follow-up
    /// exchange that lets the model phrase the outcome.
    async fn tool_round_trip(
        &self,
        id: &ConversationId,
        mut messages: Vec<Message>,
        first_norm: Normalized,
    ) -> Result<(String, Vec<ToolResult>)> {
        let results = self.executor.execute_all(&first_norm.calls).await;

        messages.push(Message::assistant(&first_norm.residual));
        for result in &results {
            messages.push(Message::tool(&result.tool_call_id, &result.content));
        }

        // The follow-up request offers no tools; one round trip per
        // turn is a hard limit.
        let second = self
            .backend
            .chat(
                ChatRequest::new(&self.config.model, messages)
                    .with_options(self.config.sampling),
            )
            .await?;

        let second_norm = normalize(&second);
        log_anomalies(id, &second_norm);
        if !second_norm.calls.is_empty() {
            warn!(
                conversation_id = %id,
                count = second_norm.calls.len(),
                "model requested more tool calls after results; ignoring them"
            );
        }

        let reply = filter_reasoning(&second_norm.residual);
        let reply = if reply.is_empty() {
            fallback_reply(&first_norm.calls, &results)
        } else {
            reply
        };
        Ok((reply, results))
    }
}

fn log_anomalies(id: &ConversationId, normalized: &Normalized) {
    for anomaly in &normalized.anomalies {
        warn!(
            conversation_id = %id,
            kind = %anomaly.kind,
            detail = %anomaly.detail,
            "dropped or adjusted model output"
        );
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Fallback Reply
// ─────────────────────────────────────────────────────────────────────────────

/// Deterministic reply synthesized from the tool results when the
/// model has nothing usable to say about them.
fn fallback_reply(calls: &[ToolCall], results: &[ToolResult]) -> String {
    let mut effects = Vec::new();
    let mut failures = Vec::new();
    for (call, result) in calls.iter().zip(results) {
        if result.success {
            effects.push(effect_phrase(call));
        } else {
            failures.push(result.content.clone());
        }
    }

    match (effects.is_empty(), failures.is_empty()) {
        (false, true) => format!("Done! I've {}.", join_natural(&effects)),
        (false, false) => format!(
            "Done! I've {}. However, there was a problem: {}",
            join_natural(&effects),
            failures.join("; ")
        ),
        (true, false) => format!("I'm sorry, that didn't work: {}", failures.join("; ")),
        (true, true) => EMPTY_REPLY.to_string(),
    }
}

fn effect_phrase(call: &ToolCall) -> String {
    let entity = call.entity_id().unwrap_or("the device");
    match call.name.as_str() {
        tools::LIGHT_TURN_ON => format!("turned on {}", entity),
        tools::LIGHT_TURN_OFF => format!("turned off {}", entity),
        tools::CLIMATE_SET_TEMPERATURE => match call
            .arguments
            .get("temperature")
            .and_then(serde_json::Value::as_f64)
        {
            Some(t) => format!("set {} to {}\u{00b0}", entity, t),
            None => format!("adjusted {}", entity),
        },
        _ => format!("adjusted {}", entity),
    }
}

/// "a", "a and b", "a, b and c".
fn join_natural(parts: &[String]) -> String {
    match parts {
        [] => String::new(),
        [only] => only.clone(),
        [rest @ .., last] => format!("{} and {}", rest.join(", "), last),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Builder
// ─────────────────────────────────────────────────────────────────────────────

/// Builder for [`Agent`].
#[derive(Default)]
pub struct AgentBuilder {
    backend: Option<SharedBackend>,
    home: Option<SharedHome>,
    model: Option<String>,
    sampling: Option<SamplingOptions>,
    max_history: Option<usize>,
    max_conversations: Option<usize>,
}

impl AgentBuilder {
    /// Set the chat backend (required).
    pub fn backend(mut self, backend: SharedBackend) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Set the home-control backend (required).
    pub fn home(mut self, home: SharedHome) -> Self {
        self.home = Some(home);
        self
    }

    /// Set the model name (required).
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Override the default sampling options.
    pub fn sampling(mut self, sampling: SamplingOptions) -> Self {
        self.sampling = Some(sampling);
        self
    }

    /// Override the per-conversation history cap.
    pub fn max_history(mut self, max_history: usize) -> Self {
        self.max_history = Some(max_history);
        self
    }

    /// Override the number of retained conversations.
    pub fn max_conversations(mut self, max_conversations: usize) -> Self {
        self.max_conversations = Some(max_conversations);
        self
    }

    /// Build the agent.
    pub fn build(self) -> Result<Agent> {
        let backend = self
            .backend
            .ok_or_else(|| AgentError::Config("no chat backend configured".to_string()))?;
        let home = self
            .home
            .ok_or_else(|| AgentError::Config("no home backend configured".to_string()))?;
        let model = self
            .model
            .filter(|m| !m.is_empty())
            .ok_or_else(|| AgentError::Config("no model configured".to_string()))?;

        let mut config = AgentConfig::new(model);
        if let Some(sampling) = self.sampling {
            config.sampling = sampling;
        }
        if let Some(max_history) = self.max_history {
            config.max_history = max_history;
        }
        let history = match self.max_conversations {
            Some(cap) => HistoryStore::new(cap),
            None => HistoryStore::default(),
        };

        Ok(Agent {
            backend,
            executor: ToolExecutor::new(home.clone()),
            home,
            history,
            config,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::home::{DeviceState, MockHomeControl};
    use hearth_llm::{ChatResponse, LlmError, MockBackend, MockResponse};
    use std::sync::Arc;

    fn demo_home() -> MockHomeControl {
        MockHomeControl::new(vec![
            DeviceState::new("light.desk_lamp", "Desk Lamp", "on").with_area("Office"),
            DeviceState::new("climate.living_room", "Thermostat", "20.0"),
        ])
    }

    fn agent_with(
        backend: MockBackend,
        home: MockHomeControl,
    ) -> (Agent, Arc<MockBackend>, Arc<MockHomeControl>) {
        let backend = Arc::new(backend);
        let home = Arc::new(home);
        let agent = Agent::builder()
            .backend(backend.clone())
            .home(home.clone())
            .model("test-model")
            .build()
            .unwrap();
        (agent, backend, home)
    }

    #[tokio::test]
    async fn test_plain_text_turn() {
        let backend = MockBackend::with_text("The desk lamp is on.");
        let (agent, backend, home) = agent_with(backend, demo_home());

        let outcome = agent.process(None, "is the desk lamp on?").await.unwrap();

        assert_eq!(outcome.reply, "The desk lamp is on.");
        assert!(outcome.tool_results.is_empty());
        assert_eq!(backend.request_count(), 1);
        assert_eq!(home.invocation_count(), 0);
    }

    #[tokio::test]
    async fn test_system_prompt_carries_device_snapshot() {
        let backend = MockBackend::with_text("ok");
        let (agent, backend, _home) = agent_with(backend, demo_home());

        agent.process(None, "hello").await.unwrap();

        let request = &backend.requests()[0];
        assert!(request.messages[0].is_system());
        assert!(request.messages[0].content.contains("light.desk_lamp"));
        assert!(request.tools.is_some());
    }

    #[tokio::test]
    async fn test_flat_dict_tool_round_trip() {
        let backend = MockBackend::new(vec![
            ChatResponse::text(r#"{"type": "light", "light.desk_lamp": "off"}"#),
            ChatResponse::text("The desk lamp is now off."),
        ]);
        let (agent, backend, home) = agent_with(backend, demo_home());

        let outcome = agent
            .process(None, "turn off the desk lamp")
            .await
            .unwrap();

        assert_eq!(outcome.reply, "The desk lamp is now off.");
        assert_eq!(outcome.tool_results.len(), 1);
        assert!(outcome.tool_results[0].success);

        let invocations = home.invocations();
        assert_eq!(invocations.len(), 1);
        assert_eq!(invocations[0].service, "turn_off");

        // Exactly one follow-up exchange, and it offers no tools.
        let requests = backend.requests();
        assert_eq!(requests.len(), 2);
        assert!(requests[1].tools.is_none());
        // The follow-up sees the tool result.
        assert!(requests[1]
            .messages
            .iter()
            .any(|m| m.content.contains("Successfully turned off light.desk_lamp")));
    }

    #[tokio::test]
    async fn test_fallback_when_follow_up_is_all_reasoning() {
        let backend = MockBackend::new(vec![
            ChatResponse::text(r#"{"type": "light", "light.desk_lamp": "off"}"#),
            ChatResponse::text("<think>the user wanted the lamp off and it is off now"),
        ]);
        let (agent, _backend, _home) = agent_with(backend, demo_home());

        let outcome = agent
            .process(None, "turn off the desk lamp")
            .await
            .unwrap();

        assert_eq!(outcome.reply, "Done! I've turned off light.desk_lamp.");
    }

    #[tokio::test]
    async fn test_fallback_joins_multiple_effects() {
        let backend = MockBackend::new(vec![
            ChatResponse::text(
                "<tool_call>{\"name\": \"light_turn_off\", \"arguments\": {\"entity_id\": \"light.desk_lamp\"}}</tool_call>\n<tool_call>{\"name\": \"climate_set_temperature\", \"arguments\": {\"entity_id\": \"climate.living_room\", \"temperature\": 19.0}}</tool_call>",
            ),
            ChatResponse::text(""),
        ]);
        let (agent, _backend, _home) = agent_with(backend, demo_home());

        let outcome = agent.process(None, "goodnight").await.unwrap();

        assert_eq!(
            outcome.reply,
            "Done! I've turned off light.desk_lamp and set climate.living_room to 19\u{00b0}."
        );
    }

    #[tokio::test]
    async fn test_fallback_reports_failures() {
        let backend = MockBackend::new(vec![
            ChatResponse::text(r#"{"type": "light", "light.desk_lamp": "on"}"#),
            ChatResponse::text(""),
        ]);
        let home = demo_home().fail_entity("light.desk_lamp", "bulb not responding");
        let (agent, _backend, _home) = agent_with(backend, home);

        let outcome = agent.process(None, "turn on the desk lamp").await.unwrap();

        assert!(outcome.reply.starts_with("I'm sorry, that didn't work:"));
        assert!(outcome.reply.contains("bulb not responding"));
        assert!(!outcome.tool_results[0].success);
    }

    #[tokio::test]
    async fn test_fallback_summarizes_mixed_outcomes() {
        let backend = MockBackend::new(vec![
            ChatResponse::text(
                r#"{"type": "light", "light.desk_lamp": "off", "light.kitchen": "off"}"#,
            ),
            ChatResponse::text(""),
        ]);
        let home = MockHomeControl::new(vec![
            DeviceState::new("light.desk_lamp", "Desk Lamp", "on"),
            DeviceState::new("light.kitchen", "Kitchen Light", "on"),
        ])
        .fail_entity("light.kitchen", "bulb not responding");
        let (agent, _backend, _home) = agent_with(backend, home);

        let outcome = agent.process(None, "lights out").await.unwrap();

        // Both outcomes appear and the turn still completes.
        assert_eq!(outcome.tool_results.len(), 2);
        assert!(outcome.reply.contains("turned off light.desk_lamp"));
        assert!(outcome.reply.contains("However, there was a problem"));
        assert!(outcome.reply.contains("bulb not responding"));
    }

    #[tokio::test]
    async fn test_follow_up_tool_calls_are_never_executed() {
        let backend = MockBackend::new(vec![
            ChatResponse::text(r#"{"type": "light", "light.desk_lamp": "off"}"#),
            ChatResponse::text(r#"{"type": "light", "light.desk_lamp": "on"}"#),
        ]);
        let (agent, backend, home) = agent_with(backend, demo_home());

        let outcome = agent
            .process(None, "turn off the desk lamp")
            .await
            .unwrap();

        // Only the first turn's call reached the home, and there was
        // no third model exchange.
        assert_eq!(home.invocation_count(), 1);
        assert_eq!(backend.request_count(), 2);
        assert_eq!(outcome.reply, "Done! I've turned off light.desk_lamp.");
    }

    #[tokio::test]
    async fn test_reasoning_stripped_from_reply() {
        let backend =
            MockBackend::with_text("<think>they asked about the lamp</think>\nIt's on.");
        let (agent, _backend, _home) = agent_with(backend, demo_home());

        let outcome = agent.process(None, "is the lamp on?").await.unwrap();
        assert_eq!(outcome.reply, "It's on.");
    }

    #[tokio::test]
    async fn test_empty_response_without_tools_gets_apology() {
        let backend = MockBackend::with_text("<think>hmm");
        let (agent, _backend, _home) = agent_with(backend, demo_home());

        let outcome = agent.process(None, "hello?").await.unwrap();
        assert!(!outcome.reply.is_empty());
        assert!(outcome.reply.contains("try again"));
    }

    #[tokio::test]
    async fn test_transport_error_aborts_turn() {
        let backend = MockBackend::with_results(vec![MockResponse::Error(LlmError::Network(
            "connection refused".to_string(),
        ))]);
        let (agent, _backend, _home) = agent_with(backend, demo_home());

        let err = agent.process(None, "hello").await.unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_history_threads_through_turns() {
        let backend = MockBackend::new(vec![
            ChatResponse::text("Hello!"),
            ChatResponse::text("I already said hello."),
        ]);
        let (agent, backend, _home) = agent_with(backend, demo_home());

        let first = agent.process(None, "hi").await.unwrap();
        let second = agent
            .process(Some(first.conversation_id), "say it again")
            .await
            .unwrap();
        assert_eq!(second.conversation_id, first.conversation_id);

        // The second request carries the first exchange.
        let request = &backend.requests()[1];
        let contents: Vec<&str> = request.messages.iter().map(|m| m.content.as_str()).collect();
        assert!(contents.contains(&"hi"));
        assert!(contents.contains(&"Hello!"));
    }

    #[tokio::test]
    async fn test_history_is_capped() {
        let responses: Vec<ChatResponse> =
            (0..9).map(|i| ChatResponse::text(format!("reply {}", i))).collect();
        let (agent, backend, _home) = agent_with(MockBackend::new(responses), demo_home());

        let first = agent.process(None, "turn 0").await.unwrap();
        for i in 1..9 {
            agent
                .process(Some(first.conversation_id), &format!("turn {}", i))
                .await
                .unwrap();
        }

        // 9 turns produced 18 non-system messages; the final request
        // may carry at most 10 of them plus the system prompt and the
        // new user message.
        let last = backend.requests().last().unwrap().clone();
        assert!(last.messages.len() <= 12);
        // Oldest messages fell off.
        assert!(!last.messages.iter().any(|m| m.content == "turn 0"));
    }

    #[tokio::test]
    async fn test_history_retains_exactly_ten_messages() {
        let responses: Vec<ChatResponse> =
            (0..11).map(|i| ChatResponse::text(format!("reply {}", i))).collect();
        let (agent, _backend, _home) = agent_with(MockBackend::new(responses), demo_home());

        let first = agent.process(None, "turn 0").await.unwrap();
        for i in 1..11 {
            agent
                .process(Some(first.conversation_id), &format!("turn {}", i))
                .await
                .unwrap();
        }

        // 11 turns produced 22 messages; the store keeps exactly the
        // most recent 10.
        let (_, handle) = agent.history.get_or_create(Some(first.conversation_id));
        let conversation = handle.lock().await;
        assert_eq!(conversation.non_system_len(), 10);
        assert_eq!(conversation.messages[0].content, "turn 6");
        assert_eq!(conversation.messages.last().unwrap().content, "reply 10");
    }

    #[tokio::test]
    async fn test_device_snapshot_failure_is_not_fatal() {
        let backend = MockBackend::with_text("I can't see any devices right now.");
        let home = MockHomeControl::new(vec![]).fail_device_states("hub offline");
        let (agent, backend, _home) = agent_with(backend, home);

        let outcome = agent.process(None, "turn off the lamp").await.unwrap();
        assert!(!outcome.reply.is_empty());
        assert!(backend.requests()[0].messages[0]
            .content
            .contains("No devices are currently exposed"));
    }

    #[test]
    fn test_builder_requires_backend_home_and_model() {
        let Err(err) = Agent::builder().build() else {
            panic!("builder without backend must fail");
        };
        assert!(matches!(err, AgentError::Config(_)));

        let Err(err) = Agent::builder()
            .backend(Arc::new(MockBackend::with_text("ok")))
            .home(Arc::new(demo_home()))
            .model("")
            .build()
        else {
            panic!("builder with empty model must fail");
        };
        assert!(matches!(err, AgentError::Config(_)));
    }

    #[test]
    fn test_join_natural() {
        let one = vec!["a".to_string()];
        let two = vec!["a".to_string(), "b".to_string()];
        let three = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        assert_eq!(join_natural(&one), "a");
        assert_eq!(join_natural(&two), "a and b");
        assert_eq!(join_natural(&three), "a, b and c");
    }
}
