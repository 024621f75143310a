//! CLI command handlers.

pub mod ask;
pub mod chat;
pub mod status;

use anyhow::Result;
use hearth_agent::{Agent, SharedHome};
use hearth_llm::{OllamaBackend, OllamaConfig};
use std::sync::Arc;
use tracing::info;

use crate::client::{DemoHome, HassControl};
use crate::config::HearthConfig;

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Loaded configuration.
    pub config: HearthConfig,
    /// Output as JSON for scripting.
    pub json_output: bool,
    /// Verbose output enabled.
    pub verbose: bool,
}

impl Context {
    /// Build the Ollama backend from configuration.
    pub fn backend(&self) -> Result<OllamaBackend> {
        let mut ollama = OllamaConfig::from_env(self.config.model());
        if let Some(url) = &self.config.ollama.url {
            ollama = ollama.with_base_url(url);
        }
        Ok(OllamaBackend::new(ollama)?)
    }

    /// Build the home backend: the configured hub, or the demo home
    /// when none is configured.
    pub fn home(&self) -> Result<SharedHome> {
        match (&self.config.home.url, &self.config.home.token) {
            (Some(url), Some(token)) => {
                info!(%url, "connecting to home assistant");
                Ok(Arc::new(HassControl::new(url, token)?))
            }
            (Some(_), None) => anyhow::bail!("home.url is set but home.token is missing"),
            _ => {
                info!("no hub configured; using the built-in demo home");
                Ok(Arc::new(DemoHome::new()))
            }
        }
    }

    /// Build the full agent.
    pub fn agent(&self) -> Result<Agent> {
        let mut builder = Agent::builder()
            .backend(Arc::new(self.backend()?))
            .home(self.home()?)
            .model(self.config.model())
            .sampling(self.config.sampling());
        if let Some(max_history) = self.config.agent.max_history {
            builder = builder.max_history(max_history);
        }
        if let Some(max_conversations) = self.config.agent.max_conversations {
            builder = builder.max_conversations(max_conversations);
        }
        Ok(builder.build()?)
    }
}
