//! Configuration loading, validation, and management for LlamaChat.
//!
//! Loads configuration from `~/.llamachat/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use llamachat_core::session::{self, Settings};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.llamachat/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Model identifier passed to the runtime
    #[serde(default = "default_model")]
    pub model: String,

    /// Default sampling temperature (0.0–1.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Default max tokens per response
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// CPU worker threads for the runtime
    #[serde(default = "default_num_thread", skip_serializing_if = "Option::is_none")]
    pub num_thread: Option<u32>,

    /// Accelerator count / offloaded layers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_gpu: Option<u32>,

    /// Base URL of the Ollama server
    #[serde(default = "default_ollama_url")]
    pub ollama_url: String,

    /// Upper bound on a single model invocation
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Prefer incremental responses when the caller supports them
    #[serde(default = "default_true")]
    pub streaming: bool,

    /// First assistant turn of every conversation
    #[serde(default = "default_greeting")]
    pub greeting: String,

    /// Context assembly limits
    #[serde(default)]
    pub context: ContextConfig,

    /// Gateway configuration
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Persisted question log
    #[serde(default)]
    pub questions: QuestionLogConfig,
}

fn default_model() -> String {
    "llama3:8b".into()
}
fn default_temperature() -> f32 {
    0.75
}
fn default_max_tokens() -> u32 {
    512
}
fn default_num_thread() -> Option<u32> {
    Some(4)
}
fn default_ollama_url() -> String {
    "http://localhost:11434".into()
}
fn default_request_timeout_secs() -> u64 {
    120
}
fn default_greeting() -> String {
    llamachat_core::DEFAULT_GREETING.into()
}
fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    /// How many documents may contribute to one prompt
    #[serde(default = "default_max_documents")]
    pub max_documents: usize,

    /// Characters taken from each contributing document
    #[serde(default = "default_max_chars_per_document")]
    pub max_chars_per_document: usize,

    /// Characters of context allowed in one prompt
    #[serde(default = "default_max_context_chars")]
    pub max_context_chars: usize,

    /// Pages read from each PDF (0 = all pages)
    #[serde(default = "default_max_pdf_pages")]
    pub max_pdf_pages: usize,
}

fn default_max_documents() -> usize {
    3
}
fn default_max_chars_per_document() -> usize {
    2000
}
fn default_max_context_chars() -> usize {
    4000
}
fn default_max_pdf_pages() -> usize {
    10
}

impl ContextConfig {
    /// Page cap handed to the extractor; `None` reads every page.
    pub fn pdf_page_limit(&self) -> Option<usize> {
        (self.max_pdf_pages > 0).then_some(self.max_pdf_pages)
    }
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_documents: default_max_documents(),
            max_chars_per_document: default_max_chars_per_document(),
            max_context_chars: default_max_context_chars(),
            max_pdf_pages: default_max_pdf_pages(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    /// Request body limit for uploads
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,

    /// Live sessions kept in memory before the least recently active is evicted
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
}

fn default_port() -> u16 {
    8501
}
fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_max_upload_bytes() -> usize {
    20 * 1024 * 1024
}
fn default_max_sessions() -> usize {
    256
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            max_upload_bytes: default_max_upload_bytes(),
            max_sessions: default_max_sessions(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionLogConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Override the file location (default: `~/.llamachat/questions.txt`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl Default for QuestionLogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.llamachat/config.toml).
    ///
    /// Environment overrides:
    /// - `LLAMACHAT_MODEL`
    /// - `LLAMACHAT_OLLAMA_URL`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        Self::load_with_overrides(&config_path, |key| std::env::var(key).ok())
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        Self::load_with_overrides(path, |_| None)
    }

    /// Read the file, apply overrides from `lookup`, then validate the result.
    pub fn load_with_overrides(
        path: &Path,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut config = Self::read_file(path)?;

        if let Some(model) = lookup("LLAMACHAT_MODEL") {
            config.model = model;
        }

        if let Some(url) = lookup("LLAMACHAT_OLLAMA_URL") {
            config.ollama_url = url;
        }

        config.validate()?;
        Ok(config)
    }

    fn read_file(path: &Path) -> Result<Self, ConfigError> {
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

        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".llamachat")
    }

    /// Where user questions are appended.
    pub fn question_log_path(&self) -> PathBuf {
        self.questions
            .path
            .clone()
            .unwrap_or_else(|| Self::config_dir().join("questions.txt"))
    }

    /// Settings every new session starts with.
    pub fn session_settings(&self) -> Settings {
        Settings {
            model: self.model.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            num_thread: self.num_thread,
            num_gpu: self.num_gpu,
        }
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        session::validate_temperature(self.temperature)
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?;
        session::validate_max_tokens(self.max_tokens)
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?;

        if self.model.trim().is_empty() {
            return Err(ConfigError::ValidationError("model must not be empty".into()));
        }

        if self.ollama_url.trim().is_empty() {
            return Err(ConfigError::ValidationError("ollama_url must not be empty".into()));
        }

        if self.request_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "request_timeout_secs must be > 0".into(),
            ));
        }

        let ctx = &self.context;
        if ctx.max_documents == 0 || ctx.max_chars_per_document == 0 || ctx.max_context_chars == 0 {
            return Err(ConfigError::ValidationError(
                "context limits must be > 0".into(),
            ));
        }

        if ctx.max_chars_per_document > ctx.max_context_chars {
            return Err(ConfigError::ValidationError(
                "max_chars_per_document must not exceed max_context_chars".into(),
            ));
        }

        Ok(())
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            num_thread: default_num_thread(),
            num_gpu: None,
            ollama_url: default_ollama_url(),
            request_timeout_secs: default_request_timeout_secs(),
            streaming: true,
            greeting: default_greeting(),
            context: ContextConfig::default(),
            gateway: GatewayConfig::default(),
            questions: QuestionLogConfig::default(),
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
