//! Configuration loading, validation, and management for Warden.
//!
//! Loads configuration from `~/.warden/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.warden/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Which provider implementation to talk to
    #[serde(default)]
    pub provider: ProviderKind,

    /// Base URL of the provider
    #[serde(default = "default_provider_url")]
    pub provider_url: String,

    /// API key (ignored by Ollama)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Model name passed to the provider
    #[serde(default = "default_model")]
    pub model: String,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Max tokens per LLM response
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Provider request timeout; a stuck call blocks the turn until this fires
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Associative memory store settings
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Rate limiting, anomaly scoring, and output validation
    #[serde(default)]
    pub defense: DefenseConfig,

    /// Conversation history sizing
    #[serde(default)]
    pub context: ContextConfig,

    /// Orchestrator settings
    #[serde(default)]
    pub agent: AgentSettings,
}

/// Supported LLM provider backends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// Ollama's native `/api/chat` endpoint
    #[default]
    Ollama,
    /// Any `/v1/chat/completions` endpoint
    OpenaiCompat,
}

fn default_provider_url() -> String {
    "http://localhost:11434".into()
}
fn default_model() -> String {
    "mistral:7b".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    1000
}
fn default_request_timeout() -> u64 {
    30
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("provider", &self.provider)
            .field("provider_url", &self.provider_url)
            .field("api_key", &redact(&self.api_key))
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("memory", &self.memory)
            .field("defense", &self.defense)
            .field("context", &self.context)
            .field("agent", &self.agent)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// `host:port` of the Hippocampus RESP server
    #[serde(default = "default_memory_address")]
    pub address: String,

    #[serde(default = "default_memory_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_epsilon")]
    pub epsilon: f32,

    #[serde(default = "default_threshold")]
    pub threshold: f32,

    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

fn default_memory_address() -> String {
    "127.0.0.1:6379".into()
}
fn default_memory_timeout() -> u64 {
    5
}
fn default_epsilon() -> f32 {
    0.3
}
fn default_threshold() -> f32 {
    0.5
}
fn default_top_k() -> usize {
    5
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            address: default_memory_address(),
            timeout_secs: default_memory_timeout(),
            epsilon: default_epsilon(),
            threshold: default_threshold(),
            top_k: default_top_k(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefenseConfig {
    #[serde(default = "default_rate_window")]
    pub rate_limit_window_secs: u64,

    #[serde(default = "default_rate_max")]
    pub rate_limit_max: usize,

    /// Scores strictly above this wrap the message with the canary
    #[serde(default = "default_anomaly_threshold")]
    pub anomaly_threshold: f64,

    /// Case-insensitive phrases whose presence in a reply forces a reset
    #[serde(default = "default_forbidden_phrases")]
    pub forbidden_phrases: Vec<String>,

    /// Audit entries kept in memory across all agents; older ones are evicted
    #[serde(default = "default_audit_capacity")]
    pub audit_capacity: usize,
}

/// Longest accepted rate-limit window.
pub const MAX_RATE_WINDOW_SECS: u64 = 86_400;

fn default_rate_window() -> u64 {
    60
}
fn default_rate_max() -> usize {
    10
}
fn default_anomaly_threshold() -> f64 {
    0.7
}
fn default_audit_capacity() -> usize {
    1000
}

/// Reply fragments that indicate a successful jailbreak.
pub fn default_forbidden_phrases() -> Vec<String> {
    [
        "i am now dan",
        "do anything now",
        "arr matey",
        "i will ignore",
        "as an admin",
        "without restrictions",
        "i've been hacked",
        "i have been hacked",
        "new role:",
        "system override",
        "ignoring guidelines",
        "ignoring my training",
        "evil ai",
        "malicious",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

impl Default for DefenseConfig {
    fn default() -> Self {
        Self {
            rate_limit_window_secs: default_rate_window(),
            rate_limit_max: default_rate_max(),
            anomaly_threshold: default_anomaly_threshold(),
            forbidden_phrases: default_forbidden_phrases(),
            audit_capacity: default_audit_capacity(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Entries of the context view sent to the model
    #[serde(default = "default_window_messages")]
    pub window_messages: usize,

    /// Per-entry cap for the context view and recall results
    #[serde(default = "default_max_chars")]
    pub max_chars_per_message: usize,

    /// Recall depth cap, as a multiple of `window_messages`
    #[serde(default = "default_max_expansion")]
    pub max_expansion: usize,
}

fn default_window_messages() -> usize {
    10
}
fn default_max_chars() -> usize {
    500
}
fn default_max_expansion() -> usize {
    4
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            window_messages: default_window_messages(),
            max_chars_per_message: default_max_chars(),
            max_expansion: default_max_expansion(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSettings {
    /// Model/tool rounds allowed per turn
    #[serde(default = "default_max_tool_rounds")]
    pub max_tool_rounds: u32,

    /// Replace the built-in support persona entirely
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt_override: Option<String>,
}

fn default_max_tool_rounds() -> u32 {
    5
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_tool_rounds: default_max_tool_rounds(),
            system_prompt_override: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.warden/config.toml).
    ///
    /// Environment overrides (highest priority):
    /// - `WARDEN_PROVIDER_URL`
    /// - `WARDEN_MODEL`
    /// - `WARDEN_API_KEY`
    /// - `WARDEN_HIPPOCAMPUS_ADDR`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("WARDEN_PROVIDER_URL") {
            self.provider_url = url;
        }
        if let Ok(model) = std::env::var("WARDEN_MODEL") {
            self.model = model;
        }
        if self.api_key.is_none() {
            self.api_key = std::env::var("WARDEN_API_KEY").ok();
        }
        if let Ok(addr) = std::env::var("WARDEN_HIPPOCAMPUS_ADDR") {
            self.memory.address = addr;
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".warden")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::ValidationError(
                "temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if !(0.0..=1.0).contains(&self.defense.anomaly_threshold) {
            return Err(ConfigError::ValidationError(
                "defense.anomaly_threshold must be between 0.0 and 1.0".into(),
            ));
        }

        if self.defense.rate_limit_max == 0 || self.defense.rate_limit_window_secs == 0 {
            return Err(ConfigError::ValidationError(
                "defense.rate_limit_max and defense.rate_limit_window_secs must be > 0".into(),
            ));
        }

        if self.defense.rate_limit_window_secs > MAX_RATE_WINDOW_SECS {
            return Err(ConfigError::ValidationError(format!(
                "defense.rate_limit_window_secs must be at most {MAX_RATE_WINDOW_SECS}"
            )));
        }

        if self.context.window_messages == 0
            || self.context.max_chars_per_message == 0
            || self.context.max_expansion == 0
        {
            return Err(ConfigError::ValidationError(
                "context sizes must all be > 0".into(),
            ));
        }

        if self.agent.max_tool_rounds == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_tool_rounds must be > 0".into(),
            ));
        }

        Ok(())
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            provider_url: default_provider_url(),
            api_key: None,
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            request_timeout_secs: default_request_timeout(),
            memory: MemoryConfig::default(),
            defense: DefenseConfig::default(),
            context: ContextConfig::default(),
            agent: AgentSettings::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
