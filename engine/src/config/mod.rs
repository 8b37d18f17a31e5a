//! Configuration management
//!
//! This module handles loading, validation, and management of the Sahara configuration.
//! Configuration is stored in TOML format at ~/.sahara/config.toml.
//!
//! # Configuration Sections
//!
//! - **core**: Log level, output directory for report bundles
//! - **llm**: Persona models, fallbacks, per-call timeout, provider endpoints
//! - **orchestration**: Iteration cap and continuation limits
//! - **search**: Optional SearxNG backend for orchestrator search queries
//!
//! API keys are never stored here. Each provider section may name an
//! environment variable (`api_key_env`) that is read once at startup when the
//! OS keychain has no entry for that provider.
//!
//! # Examples
//!
//! ```no_run
//! use sahara_engine::config::Config;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load_or_create()?;
//! println!("Orchestrator model: {}", config.llm.roles.orchestrator);
//! println!("Iteration cap: {}", config.orchestration.max_iterations);
//! # Ok(())
//! # }
//! ```

use sdk::errors::EngineError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::agent::RoleModels;
use crate::llm::{GenerationParams, ModelRef, ProviderKind};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Core settings
    #[serde(default)]
    pub core: CoreConfig,

    /// LLM provider configuration
    #[serde(default)]
    pub llm: LLMConfig,

    /// Orchestration loop limits
    #[serde(default)]
    pub orchestration: OrchestrationConfig,

    /// Search backend
    #[serde(default)]
    pub search: SearchConfig,
}

/// Core configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Directory where report bundles are written (supports ~ expansion)
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMConfig {
    /// Model used by each persona
    #[serde(default)]
    pub roles: RoleModels,

    /// Models tried in order when a persona's model fails
    #[serde(default)]
    pub fallback: Vec<ModelRef>,

    /// Per-call timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Upper bound on generated tokens per call
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,

    /// Ollama provider settings
    #[serde(default = "ProviderConfig::ollama")]
    pub ollama: ProviderConfig,

    /// OpenAI provider settings
    #[serde(default = "ProviderConfig::openai")]
    pub openai: ProviderConfig,

    /// Anthropic provider settings
    #[serde(default = "ProviderConfig::anthropic")]
    pub anthropic: ProviderConfig,

    /// Gemini provider settings
    #[serde(default = "ProviderConfig::gemini")]
    pub gemini: ProviderConfig,
}

/// Endpoint settings for one provider
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProviderConfig {
    /// Base URL for the provider API
    pub base_url: String,

    /// Environment variable consulted when the keychain has no key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
}

/// Orchestration loop limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestrationConfig {
    /// Maximum orchestrator plan calls per run
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// A completion at least this many characters long is treated as truncated
    #[serde(default = "default_truncation_threshold")]
    pub truncation_threshold: usize,

    /// Maximum "continue" follow-ups per completion
    #[serde(default = "default_max_continuations")]
    pub max_continuations: usize,

    /// Ask the orchestrator for search queries by default
    #[serde(default)]
    pub allow_search: bool,
}

/// Search backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Resolve orchestrator search queries against the backend
    #[serde(default)]
    pub enabled: bool,

    /// SearxNG base URL
    #[serde(default = "default_search_base_url")]
    pub base_url: String,

    /// Number of hits passed to the executor
    #[serde(default = "default_search_max_results")]
    pub max_results: usize,

    /// Request timeout in seconds
    #[serde(default = "default_search_timeout_secs")]
    pub timeout_secs: u64,
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("~/.sahara/reports")
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_output_tokens() -> u32 {
    4096
}

fn default_max_iterations() -> usize {
    10
}

fn default_truncation_threshold() -> usize {
    4000
}

fn default_max_continuations() -> usize {
    3
}

fn default_search_base_url() -> String {
    "http://localhost:8888".to_string()
}

fn default_search_max_results() -> usize {
    5
}

fn default_search_timeout_secs() -> u64 {
    15
}

impl ProviderConfig {
    fn ollama() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            api_key_env: None,
        }
    }

    fn openai() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key_env: Some("OPENAI_API_KEY".to_string()),
        }
    }

    fn anthropic() -> Self {
        Self {
            base_url: "https://api.anthropic.com/v1".to_string(),
            api_key_env: Some("ANTHROPIC_API_KEY".to_string()),
        }
    }

    fn gemini() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            api_key_env: Some("GEMINI_API_KEY".to_string()),
        }
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            output_dir: default_output_dir(),
        }
    }
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            roles: RoleModels::default(),
            fallback: Vec::new(),
            timeout_secs: default_timeout_secs(),
            temperature: default_temperature(),
            max_output_tokens: default_max_output_tokens(),
            ollama: ProviderConfig::ollama(),
            openai: ProviderConfig::openai(),
            anthropic: ProviderConfig::anthropic(),
            gemini: ProviderConfig::gemini(),
        }
    }
}

impl LLMConfig {
    /// Endpoint settings for a provider kind
    pub fn provider(&self, kind: ProviderKind) -> &ProviderConfig {
        match kind {
            ProviderKind::Ollama => &self.ollama,
            ProviderKind::OpenAI => &self.openai,
            ProviderKind::Anthropic => &self.anthropic,
            ProviderKind::Gemini => &self.gemini,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn generation_params(&self) -> GenerationParams {
        GenerationParams {
            temperature: self.temperature,
            max_output_tokens: self.max_output_tokens,
        }
    }

    /// Provider kinds referenced by the persona models or fallbacks
    pub fn referenced_providers(&self) -> Vec<ProviderKind> {
        let mut kinds: Vec<ProviderKind> = Vec::new();
        for model in self.roles.iter().chain(self.fallback.iter()) {
            if !kinds.contains(&model.provider) {
                kinds.push(model.provider);
            }
        }
        kinds
    }
}

impl Default for OrchestrationConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            truncation_threshold: default_truncation_threshold(),
            max_continuations: default_max_continuations(),
            allow_search: false,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: default_search_base_url(),
            max_results: default_search_max_results(),
            timeout_secs: default_search_timeout_secs(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            core: CoreConfig::default(),
            llm: LLMConfig::default(),
            orchestration: OrchestrationConfig::default(),
            search: SearchConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default location (~/.sahara/config.toml)
    ///
    /// If the configuration file doesn't exist, creates a default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration file cannot be read or written
    /// - TOML parsing fails
    /// - Validation fails
    pub fn load_or_create() -> Result<Self, EngineError> {
        let config_path = Self::default_config_path()?;

        if config_path.exists() {
            Self::load_from_path(&config_path)
        } else {
            Self::create_default(&config_path)
        }
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, EngineError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("Failed to read config file: {}", e)))?;

        Self::from_toml_str(&contents)
    }

    /// Parse and validate configuration text
    pub fn from_toml_str(contents: &str) -> Result<Self, EngineError> {
        let mut config: Config = toml::from_str(contents)
            .map_err(|e| EngineError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate_and_process()?;

        Ok(config)
    }

    /// Create default configuration and save to path
    fn create_default(path: &Path) -> Result<Self, EngineError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                EngineError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let toml_string = toml::to_string_pretty(&Self::default())
            .map_err(|e| EngineError::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, toml_string)
            .map_err(|e| EngineError::Config(format!("Failed to write config file: {}", e)))?;

        tracing::info!("Wrote default configuration to {}", path.display());

        let mut config = Self::default();
        config.validate_and_process()?;
        Ok(config)
    }

    /// Get the default configuration file path (~/.sahara/config.toml)
    pub fn default_config_path() -> Result<PathBuf, EngineError> {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(".sahara").join("config.toml"))
    }

    /// Validate and process configuration
    ///
    /// This method:
    /// - Validates the log level
    /// - Validates loop limits and generation parameters
    /// - Expands ~ in the output directory
    fn validate_and_process(&mut self) -> Result<(), EngineError> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.core.log_level.as_str()) {
            return Err(EngineError::Config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.core.log_level,
                valid_log_levels.join(", ")
            )));
        }

        if self.orchestration.max_iterations == 0 {
            return Err(EngineError::Config(
                "orchestration.max_iterations must be at least 1".to_string(),
            ));
        }
        if self.orchestration.truncation_threshold == 0 {
            return Err(EngineError::Config(
                "orchestration.truncation_threshold must be at least 1".to_string(),
            ));
        }

        if self.llm.timeout_secs == 0 {
            return Err(EngineError::Config(
                "llm.timeout_secs must be at least 1".to_string(),
            ));
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(EngineError::Config(
                "llm.temperature must be between 0.0 and 2.0".to_string(),
            ));
        }

        if self.search.timeout_secs == 0 {
            return Err(EngineError::Config(
                "search.timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.search.enabled && self.search.base_url.trim().is_empty() {
            return Err(EngineError::Config(
                "search.base_url is required when search is enabled".to_string(),
            ));
        }

        self.core.output_dir = expand_path(&self.core.output_dir)?;

        Ok(())
    }
}

/// Expand ~ in path to user's home directory
fn expand_path(path: &Path) -> Result<PathBuf, EngineError> {
    let path_str = path
        .to_str()
        .ok_or_else(|| EngineError::Config("Invalid UTF-8 in path".to_string()))?;

    if let Some(rest) = path_str.strip_prefix("~/") {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(rest))
    } else if path_str == "~" {
        dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))
    } else {
        Ok(path.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::Persona;

    #[test]
    fn test_default_config_creation() {
        let config = Config::default();

        assert_eq!(config.core.log_level, "info");
        assert_eq!(config.orchestration.max_iterations, 10);
        assert_eq!(config.orchestration.truncation_threshold, 4000);
        assert_eq!(
            config.llm.roles.model_for(Persona::Orchestrator).to_string(),
            "gemini/gemini-1.5-flash-latest"
        );
        assert!(!config.search.enabled);
    }

    #[test]
    fn test_expand_path_with_tilde() {
        let path = PathBuf::from("~/test");
        let expanded = expand_path(&path).unwrap();

        let home = dirs::home_dir().unwrap();
        assert_eq!(expanded, home.join("test"));
    }

    #[test]
    fn test_expand_path_without_tilde() {
        let path = PathBuf::from("/absolute/path");
        assert_eq!(expand_path(&path).unwrap(), path);
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_string = toml::to_string(&config).unwrap();

        let deserialized: Config = toml::from_str(&toml_string).unwrap();
        assert_eq!(config.core.log_level, deserialized.core.log_level);
        assert_eq!(config.llm.roles, deserialized.llm.roles);
        assert_eq!(config.llm.gemini, deserialized.llm.gemini);
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config.llm.timeout_secs, 120);
        assert_eq!(config.orchestration.max_continuations, 3);
    }

    #[test]
    fn test_invalid_log_level_rejected() {
        let err = Config::from_toml_str("[core]\nlog_level = \"loud\"\n").unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
    }

    #[test]
    fn test_zero_iterations_rejected() {
        let err = Config::from_toml_str("[orchestration]\nmax_iterations = 0\n").unwrap_err();
        assert!(err.to_string().contains("max_iterations"));
    }

    #[test]
    fn test_zero_search_timeout_rejected() {
        let err = Config::from_toml_str("[search]\nenabled = true\ntimeout_secs = 0\n").unwrap_err();
        assert!(err.to_string().contains("search.timeout_secs"));

        let config = Config::from_toml_str("[search]\ntimeout_secs = 1\n").unwrap();
        assert_eq!(config.search.timeout_secs, 1);
    }

    #[test]
    fn test_unknown_role_provider_rejected() {
        let err = Config::from_toml_str("[llm.roles]\nexecutor = \"mistral/large\"\n").unwrap_err();
        assert!(err.to_string().contains("unknown provider"));
    }

    #[test]
    fn test_referenced_providers_deduplicated() {
        let config = Config::from_toml_str(
            r#"
[llm]
fallback = ["ollama/llama3.1:8b", "gemini/gemini-1.5-pro"]
"#,
        )
        .unwrap();

        let kinds = config.llm.referenced_providers();
        assert_eq!(kinds, vec![ProviderKind::Gemini, ProviderKind::Ollama]);
    }
}
