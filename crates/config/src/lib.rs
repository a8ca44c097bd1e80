//! Configuration loading, validation, and management for specplan.
//!
//! Loads configuration from `~/.specplan/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use specplan_core::error::AppError;
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.specplan/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// LLM backend: `openai`, `anthropic`, `openrouter`, `ollama`, or any
    /// OpenAI-compatible name paired with `api_url`
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Model identifier passed to the backend
    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Overrides the provider's default base URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Max tokens per model response
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default)]
    pub plan: PlanConfig,

    #[serde(default)]
    pub summarizer: SummarizerConfig,

    #[serde(default)]
    pub sandbox: SandboxConfig,
}

fn default_provider() -> String {
    "openai".into()
}
fn default_model() -> String {
    "gpt-4o".into()
}
fn default_temperature() -> f32 {
    0.2
}
fn default_max_tokens() -> u32 {
    4096
}

/// Redact a secret for Debug output.
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
            .field("model", &self.model)
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("plan", &self.plan)
            .field("summarizer", &self.summarizer)
            .field("sandbox", &self.sandbox)
            .finish()
    }
}

/// How a planning run ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationMode {
    /// The model must call `submit_plan`
    #[default]
    SubmitTool,
    /// The model's final text is parsed as the plan
    FinalText,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanConfig {
    /// Hard cap on loop iterations per run
    #[serde(default = "default_plan_max_steps")]
    pub max_steps: u32,

    /// Steps allowed for exploration before submission is forced
    #[serde(default = "default_explore_steps")]
    pub explore_steps: u32,

    #[serde(default)]
    pub termination: TerminationMode,

    /// Largest file `view_file` returns in full
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: usize,
}

fn default_plan_max_steps() -> u32 {
    25
}
fn default_explore_steps() -> u32 {
    18
}
fn default_max_file_bytes() -> usize {
    64 * 1024
}

impl Default for PlanConfig {
    fn default() -> Self {
        Self {
            max_steps: default_plan_max_steps(),
            explore_steps: default_explore_steps(),
            termination: TerminationMode::default(),
            max_file_bytes: default_max_file_bytes(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummarizerConfig {
    #[serde(default = "default_summarizer_temperature")]
    pub temperature: f32,

    #[serde(default = "default_summarizer_max_tokens")]
    pub max_tokens: u32,
}

fn default_summarizer_temperature() -> f32 {
    0.0
}
fn default_summarizer_max_tokens() -> u32 {
    512
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            temperature: default_summarizer_temperature(),
            max_tokens: default_summarizer_max_tokens(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SandboxConfig {
    /// Path prefixes `view_file` never reads, relative to the workspace
    /// root or absolute (`~` expands)
    #[serde(default = "default_forbidden_paths")]
    pub forbidden_paths: Vec<String>,
}

fn default_forbidden_paths() -> Vec<String> {
    vec![
        ".git".into(),
        ".env".into(),
        "~/.ssh".into(),
        "~/.gnupg".into(),
        "~/.aws".into(),
    ]
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            forbidden_paths: default_forbidden_paths(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.specplan/config.toml).
    ///
    /// Also checks environment variables:
    /// - `SPECPLAN_API_KEY` (highest priority), then `OPENAI_API_KEY` or
    ///   `ANTHROPIC_API_KEY` depending on the provider
    /// - `SPECPLAN_PROVIDER`, `SPECPLAN_MODEL`
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with_env(&Self::config_dir().join("config.toml"))
    }

    /// Load from `path`, then apply environment overrides.
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load_from(path)?;
        config.apply_env(|key| std::env::var(key).ok());
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

    /// Apply environment overrides read through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(provider) = lookup("SPECPLAN_PROVIDER") {
            self.provider = provider;
        }

        if let Some(model) = lookup("SPECPLAN_MODEL") {
            self.model = model;
        }

        if let Some(key) = lookup("SPECPLAN_API_KEY") {
            self.api_key = Some(key);
        } else if self.api_key.is_none() {
            let provider_var = match self.provider.as_str() {
                "anthropic" => "ANTHROPIC_API_KEY",
                "openrouter" => "OPENROUTER_API_KEY",
                _ => "OPENAI_API_KEY",
            };
            self.api_key = lookup(provider_var);
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".specplan")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.provider.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "provider must not be empty".into(),
            ));
        }

        if self.model.trim().is_empty() {
            return Err(ConfigError::ValidationError("model must not be empty".into()));
        }

        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::ValidationError(
                "temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if !(0.0..=2.0).contains(&self.summarizer.temperature) {
            return Err(ConfigError::ValidationError(
                "summarizer.temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.plan.max_steps == 0 {
            return Err(ConfigError::ValidationError(
                "plan.max_steps must be at least 1".into(),
            ));
        }

        if self.plan.explore_steps >= self.plan.max_steps {
            return Err(ConfigError::ValidationError(
                "plan.explore_steps must be less than plan.max_steps".into(),
            ));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }

    /// The effective configuration as TOML, with the API key redacted.
    pub fn to_redacted_toml(&self) -> String {
        let mut shown = self.clone();
        if shown.api_key.is_some() {
            shown.api_key = Some("[REDACTED]".into());
        }
        toml::to_string_pretty(&shown).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            api_key: None,
            api_url: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            plan: PlanConfig::default(),
            summarizer: SummarizerConfig::default(),
            sandbox: SandboxConfig::default(),
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

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use specplan_core::error::ErrorCode;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert_eq!(config.provider, "openai");
        assert_eq!(config.plan.max_steps, 25);
        assert_eq!(config.plan.explore_steps, 18);
        assert!((config.temperature - 0.2).abs() < f32::EPSILON);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.provider, config.provider);
        assert_eq!(parsed.plan.termination, TerminationMode::SubmitTool);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "provider = \"anthropic\"\nmodel = \"claude-sonnet-4-20250514\"\n\n[plan]\ntermination = \"final_text\"\n",
        )
        .unwrap();
        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.provider, "anthropic");
        assert_eq!(config.plan.termination, TerminationMode::FinalText);
        assert_eq!(config.plan.max_steps, 25);
        assert_eq!(config.max_tokens, 4096);
    }

    #[test]
    fn invalid_temperature_rejected() {
        let config = AppConfig {
            temperature: 5.0,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn explore_steps_must_leave_room_to_submit() {
        let mut config = AppConfig::default();
        config.plan.explore_steps = config.plan.max_steps;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("explore_steps"));
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let result = AppConfig::load_from(Path::new("/nonexistent/config.toml"));
        let config = result.unwrap();
        assert_eq!(config.provider, "openai");
    }

    #[test]
    fn malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "provider = [").unwrap();
        match AppConfig::load_from(&path).unwrap_err() {
            ConfigError::ParseError { .. } => {}
            other => panic!("Expected ParseError, got: {other}"),
        }
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = AppConfig::default();
        config.apply_env(env(&[
            ("SPECPLAN_PROVIDER", "anthropic"),
            ("SPECPLAN_MODEL", "claude-sonnet-4-20250514"),
            ("ANTHROPIC_API_KEY", "sk-ant"),
            ("OPENAI_API_KEY", "sk-openai"),
        ]));
        assert_eq!(config.provider, "anthropic");
        assert_eq!(config.model, "claude-sonnet-4-20250514");
        assert_eq!(config.api_key.as_deref(), Some("sk-ant"));
    }

    #[test]
    fn specplan_key_wins_over_file_and_provider_key() {
        let mut config = AppConfig {
            api_key: Some("from-file".into()),
            ..AppConfig::default()
        };
        config.apply_env(env(&[("OPENAI_API_KEY", "sk-openai")]));
        assert_eq!(config.api_key.as_deref(), Some("from-file"));

        config.apply_env(env(&[("SPECPLAN_API_KEY", "sk-specplan")]));
        assert_eq!(config.api_key.as_deref(), Some("sk-specplan"));
    }

    #[test]
    fn debug_redacts_api_key() {
        let config = AppConfig {
            api_key: Some("sk-secret".into()),
            ..AppConfig::default()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("[REDACTED]"));
        assert!(!config.to_redacted_toml().contains("sk-secret"));
    }

    #[test]
    fn config_error_maps_to_config_code() {
        let err: AppError = ConfigError::ValidationError("bad".into()).into();
        assert_eq!(err.code, ErrorCode::ConfigError);
    }
}
