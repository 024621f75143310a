//! Configuration loading.
//!
//! Settings come from a TOML file (default
//! `~/.config/hearth/config.toml`), with every field optional and
//! falling back to a sensible default. CLI flags override the file.

use anyhow::{Context as _, Result};
use hearth_llm::SamplingOptions;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default model when neither the file nor the CLI names one.
const DEFAULT_MODEL: &str = "qwen3";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HearthConfig {
    /// Ollama connection settings.
    #[serde(default)]
    pub ollama: OllamaSection,
    /// Smart-home hub settings; absent means the built-in demo home.
    #[serde(default)]
    pub home: HomeSection,
    /// Agent loop settings.
    #[serde(default)]
    pub agent: AgentSection,
}

/// `[ollama]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OllamaSection {
    /// Base URL of the Ollama server.
    pub url: Option<String>,
    /// Model to run.
    pub model: Option<String>,
}

/// `[home]` section. When `url` is unset the assistant runs against an
/// in-memory demo home.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HomeSection {
    /// Base URL of the Home Assistant instance.
    pub url: Option<String>,
    /// Long-lived access token.
    pub token: Option<String>,
}

/// `[agent]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AgentSection {
    /// Non-system messages retained per conversation.
    pub max_history: Option<usize>,
    /// Conversations retained before LRU eviction.
    pub max_conversations: Option<usize>,
    /// Sampling temperature.
    pub temperature: Option<f32>,
    /// Nucleus sampling threshold.
    pub top_p: Option<f32>,
    /// Top-k sampling cutoff.
    pub top_k: Option<u32>,
    /// Context window size in tokens.
    pub num_ctx: Option<u32>,
}

impl HearthConfig {
    /// Load configuration from the given path, or from the default
    /// location when none is given. A missing file yields defaults; a
    /// malformed file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match Self::default_path() {
                Some(path) => path,
                None => return Ok(Self::default()),
            },
        };
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read config at {}", path.display()))?;
        toml::from_str(&raw)
            .with_context(|| format!("failed to parse config at {}", path.display()))
    }

    /// Default config file location.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("hearth").join("config.toml"))
    }

    /// Effective model name.
    pub fn model(&self) -> &str {
        self.ollama.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }

    /// Effective sampling options.
    pub fn sampling(&self) -> SamplingOptions {
        let mut options = SamplingOptions::default();
        if let Some(t) = self.agent.temperature {
            options.temperature = t;
        }
        if let Some(p) = self.agent.top_p {
            options.top_p = p;
        }
        if let Some(k) = self.agent.top_k {
            options.top_k = k;
        }
        if let Some(n) = self.agent.num_ctx {
            options.num_ctx = n;
        }
        options
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_empty() {
        let config: HearthConfig = toml::from_str("").unwrap();
        assert_eq!(config.model(), DEFAULT_MODEL);
        assert!(config.home.url.is_none());
        assert_eq!(config.sampling().temperature, 0.7);
    }

    #[test]
    fn test_full_file_parses() {
        let raw = r#"
            [ollama]
            url = "http://192.168.1.10:11434"
            model = "gemma3"

            [home]
            url = "http://homeassistant.local:8123"
            token = "abc123"

            [agent]
            max_history = 6
            temperature = 0.2
        "#;
        let config: HearthConfig = toml::from_str(raw).unwrap();
        assert_eq!(config.model(), "gemma3");
        assert_eq!(config.home.url.as_deref(), Some("http://homeassistant.local:8123"));
        assert_eq!(config.agent.max_history, Some(6));
        assert_eq!(config.sampling().temperature, 0.2);
        assert_eq!(config.sampling().top_k, 40);
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let raw = "[ollama]\nmodle = \"typo\"\n";
        assert!(toml::from_str::<HearthConfig>(raw).is_err());
    }

    #[test]
    fn test_load_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = HearthConfig::load(Some(&dir.path().join("nope.toml"))).unwrap();
        assert_eq!(config.model(), DEFAULT_MODEL);
    }

    #[test]
    fn test_load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[ollama]\nmodel = \"gemma3\"\n").unwrap();

        let config = HearthConfig::load(Some(&path)).unwrap();
        assert_eq!(config.model(), "gemma3");
    }

    #[test]
    fn test_load_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[ollama\nbroken").unwrap();

        assert!(HearthConfig::load(Some(&path)).is_err());
    }
}
