//! Configuration management for Leo services.
//!
//! Services share one configuration file at `~/.leo/config.json`.
//!
//! # Configuration Priority
//!
//! 1. Environment variables
//! 2. Explicit config file values
//! 3. Default values
//!
//! # Environment Variable Mapping
//!
//! - `LEO_BIND_ADDRESS` → network.bind
//! - `LEO_PORT` (or `PORT`) → network.port
//! - `GEMINI_API_KEY` (or `GOOGLE_API_KEY`) → gemini.api_key
//! - `LEO_GEMINI_MODEL` → gemini.model
//! - `LEO_LOG_LEVEL` → observability.log_level
//! - `LEO_LOG_FORMAT` → observability.log_format

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Get the configuration directory path.
pub fn config_dir() -> PathBuf {
    directories::UserDirs::new().map_or_else(
        || PathBuf::from(".leo"),
        |dirs| dirs.home_dir().join(".leo"),
    )
}

/// Get the configuration file path.
pub fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

// ============================================================================
// Network Configuration
// ============================================================================

/// Where the HTTP server listens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Bind address. `127.0.0.1` by default; use `0.0.0.0` for device testing.
    #[serde(default = "default_bind_address")]
    pub bind: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind: default_bind_address(),
            port: default_port(),
        }
    }
}

fn default_bind_address() -> String {
    "127.0.0.1".into()
}

fn default_port() -> u16 {
    3001
}

// ============================================================================
// Gemini Configuration
// ============================================================================

/// Upstream Gemini settings. Generation and safety values are sent verbatim
/// with every request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    /// API key, sent as the `key` query parameter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_gemini_model")]
    pub model: String,

    #[serde(default = "default_gemini_base_url")]
    pub base_url: String,

    /// Whole-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_temperature")]
    pub temperature: f64,

    #[serde(default = "default_top_k")]
    pub top_k: u32,

    #[serde(default = "default_top_p")]
    pub top_p: f64,

    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: i64,

    /// Threshold applied to every harm category
    #[serde(default = "default_safety_threshold")]
    pub safety_threshold: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_gemini_model(),
            base_url: default_gemini_base_url(),
            timeout_secs: default_timeout_secs(),
            temperature: default_temperature(),
            top_k: default_top_k(),
            top_p: default_top_p(),
            max_output_tokens: default_max_output_tokens(),
            safety_threshold: default_safety_threshold(),
        }
    }
}

fn default_gemini_model() -> String {
    "gemini-1.5-flash".into()
}

fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com".into()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_temperature() -> f64 {
    0.7
}

fn default_top_k() -> u32 {
    40
}

fn default_top_p() -> f64 {
    0.95
}

fn default_max_output_tokens() -> i64 {
    1024
}

fn default_safety_threshold() -> String {
    "BLOCK_MEDIUM_AND_ABOVE".into()
}

// ============================================================================
// Chat Configuration
// ============================================================================

/// Default persona for the Leo assistant.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are Leo Assistant, the helpful guide inside the Leo Clubs app. \
Leo Clubs are the youth service network of Lions Clubs International, organized into clubs and districts. \
Help members with questions about service projects, events, leadership development, club membership, \
and using the app. Keep answers concise, friendly, and encouraging. \
If a question is unrelated to Leo Clubs or community service, answer briefly and steer back to how Leos can help.";

/// Replies used when the upstream model cannot be reached.
pub const DEFAULT_FALLBACK_RESPONSES: [&str; 3] = [
    "I'm having trouble connecting right now. Please try again in a moment.",
    "Sorry, I couldn't come up with an answer just now. Could you ask again shortly?",
    "Leo Assistant is taking a short break. Please try again in a few minutes, and keep up the great service!",
];

/// Conversation behaviour of the chat relay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Persona instruction placed at the top of every prompt
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Maximum stored turns per session
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    /// Most recent turns included in the prompt
    #[serde(default = "default_prompt_turns")]
    pub prompt_turns: usize,

    #[serde(default = "default_fallback_responses")]
    pub fallback_responses: Vec<String>,

    /// Fixed seed for fallback selection; random when unset
    #[serde(default)]
    pub fallback_seed: Option<u64>,

    /// Request body cap for the HTTP API
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            system_prompt: default_system_prompt(),
            history_limit: default_history_limit(),
            prompt_turns: default_prompt_turns(),
            fallback_responses: default_fallback_responses(),
            fallback_seed: None,
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

fn default_system_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.into()
}

fn default_history_limit() -> usize {
    20
}

fn default_prompt_turns() -> usize {
    10
}

fn default_fallback_responses() -> Vec<String> {
    DEFAULT_FALLBACK_RESPONSES.iter().map(|s| (*s).to_string()).collect()
}

fn default_max_body_bytes() -> usize {
    64 * 1024
}

// ============================================================================
// Observability Configuration
// ============================================================================

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level", alias = "level")]
    pub log_level: String,

    /// Log format (json, pretty)
    #[serde(default = "default_log_format", alias = "format")]
    pub log_format: String,

    /// Additional module targets pinned to `warn`.
    #[serde(default)]
    pub excluded_targets: Vec<String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
            excluded_targets: vec![],
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "pretty".into()
}

// ============================================================================
// Root Configuration
// ============================================================================

/// Root configuration structure for Leo services.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub network: NetworkConfig,

    #[serde(default)]
    pub gemini: GeminiConfig,

    #[serde(default)]
    pub chat: ChatConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Load configuration from the default path.
    pub fn load() -> Result<Self> {
        let path = config_path();
        if !path.exists() {
            tracing::info!("Config file not found, using defaults");
            return Ok(Self::default());
        }

        Self::load_from(&path)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    /// Load configuration with environment variable overrides.
    pub fn load_with_env() -> Result<Self> {
        let mut config = Self::load()?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary key lookup.
    ///
    /// Numeric values that fail to parse are ignored.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(bind) = lookup("LEO_BIND_ADDRESS") {
            self.network.bind = bind;
        }
        if let Some(port) = lookup("LEO_PORT").or_else(|| lookup("PORT")) {
            if let Ok(p) = port.parse() {
                self.network.port = p;
            }
        }

        if let Some(key) = lookup("GEMINI_API_KEY").or_else(|| lookup("GOOGLE_API_KEY")) {
            if !key.is_empty() {
                self.gemini.api_key = Some(key);
            }
        }
        if let Some(model) = lookup("LEO_GEMINI_MODEL") {
            self.gemini.model = model;
        }

        if let Some(level) = lookup("LEO_LOG_LEVEL") {
            self.observability.log_level = level;
        }
        if let Some(format) = lookup("LEO_LOG_FORMAT") {
            self.observability.log_format = format;
        }
    }

    /// Reject settings the relay cannot run with.
    pub fn validate(&self) -> crate::error::Result<()> {
        use crate::error::Error;

        if self.gemini.timeout_secs == 0 {
            return Err(Error::Config("gemini.timeout_secs must be greater than 0".into()));
        }
        if self.gemini.model.trim().is_empty() {
            return Err(Error::Config("gemini.model must not be empty".into()));
        }
        if self.chat.prompt_turns > self.chat.history_limit {
            return Err(Error::Config(format!(
                "chat.prompt_turns ({}) exceeds chat.history_limit ({})",
                self.chat.prompt_turns, self.chat.history_limit
            )));
        }
        Ok(())
    }

    /// Address string for the HTTP listener.
    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.network.bind, self.network.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.network.bind, "127.0.0.1");
        assert_eq!(config.network.port, 3001);
        assert_eq!(config.gemini.timeout_secs, 30);
        assert_eq!(config.gemini.top_k, 40);
        assert_eq!(config.chat.history_limit, 20);
        assert_eq!(config.chat.prompt_turns, 10);
        assert_eq!(config.chat.fallback_responses.len(), 3);
        assert_eq!(config.chat.fallback_seed, None);
        assert_eq!(config.observability.log_level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"gemini": {"model": "gemini-pro"}, "network": {"port": 8080}}"#)
                .unwrap();
        assert_eq!(config.gemini.model, "gemini-pro");
        assert_eq!(config.gemini.timeout_secs, 30);
        assert_eq!(config.network.port, 8080);
        assert_eq!(config.network.bind, "127.0.0.1");
        assert_eq!(config.chat.history_limit, 20);
    }

    #[test]
    fn test_observability_aliases() {
        let config: Config =
            serde_json::from_str(r#"{"observability": {"level": "debug", "format": "json"}}"#)
                .unwrap();
        assert_eq!(config.observability.log_level, "debug");
        assert_eq!(config.observability.log_format, "json");
    }

    #[test]
    fn test_fallback_seed_from_json() {
        let config: Config =
            serde_json::from_str(r#"{"chat": {"fallback_seed": 7}}"#).unwrap();
        assert_eq!(config.chat.fallback_seed, Some(7));
        assert_eq!(config.chat.history_limit, 20);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"chat": {{"history_limit": 8, "prompt_turns": 4}}}}"#).unwrap();

        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.chat.history_limit, 8);
        assert_eq!(config.chat.prompt_turns, 4);
        assert_eq!(config.chat.fallback_seed, None);
    }

    #[test]
    fn test_load_from_invalid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();

        let err = Config::load_from(file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config"));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config.apply_overrides_from(lookup_from(&[
            ("LEO_BIND_ADDRESS", "0.0.0.0"),
            ("LEO_PORT", "4000"),
            ("GOOGLE_API_KEY", "google-key"),
            ("LEO_GEMINI_MODEL", "gemini-2.0-flash"),
            ("LEO_LOG_FORMAT", "json"),
        ]));

        assert_eq!(config.network.bind, "0.0.0.0");
        assert_eq!(config.network.port, 4000);
        assert_eq!(config.gemini.api_key.as_deref(), Some("google-key"));
        assert_eq!(config.gemini.model, "gemini-2.0-flash");
        assert_eq!(config.observability.log_format, "json");
        assert_eq!(config.listen_address(), "0.0.0.0:4000");
    }

    #[test]
    fn test_gemini_key_takes_priority() {
        let mut config = Config::default();
        config.apply_overrides_from(lookup_from(&[
            ("GEMINI_API_KEY", "gemini-key"),
            ("GOOGLE_API_KEY", "google-key"),
        ]));
        assert_eq!(config.gemini.api_key.as_deref(), Some("gemini-key"));
    }

    #[test]
    fn test_bad_port_is_ignored() {
        let mut config = Config::default();
        config.apply_overrides_from(lookup_from(&[("LEO_PORT", "not-a-port"), ("PORT", "5000")]));
        assert_eq!(config.network.port, 3001);

        config.apply_overrides_from(lookup_from(&[("PORT", "5000")]));
        assert_eq!(config.network.port, 5000);
    }

    #[test]
    fn test_validate_rejects_bad_settings() {
        let mut config = Config::default();
        config.gemini.timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.chat.prompt_turns = 30;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.gemini.model = "  ".into();
        assert!(config.validate().is_err());
    }
}
