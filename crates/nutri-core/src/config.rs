//! Nutri Configuration Management
//!
//! Handles configuration from environment variables and config files
//! with sensible defaults for development.

use crate::Polarity;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Longest accepted fallback timeout, in seconds
pub const MAX_TIMEOUT_SECS: f64 = 300.0;

/// Largest accepted fallback quota per minute
pub const MAX_RATE_PER_MINUTE: usize = 10_000;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Dataset location and ingestion policy
    pub dataset: DatasetConfig,

    /// External model configuration
    pub llm: LlmConfig,

    /// Fallback call quota
    pub rate_limit: RateLimitConfig,

    /// Response and filter caches
    pub cache: CacheConfig,

    /// Answer composition
    pub answer: AnswerConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    ///
    /// `from_env` is this with `std::env::var`; tests pass a map.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        // Dataset
        if let Some(dir) = lookup("NUTRI_DATA_DIR") {
            config.dataset.root = PathBuf::from(dir);
        }
        if let Some(path) = lookup("NUTRI_MANIFEST") {
            config.dataset.manifest_path = Some(PathBuf::from(path));
        }

        // LLM
        if let Some(provider) = lookup("LLM_PROVIDER") {
            config.llm.provider = provider.parse()?;
        }
        if let Some(key) = lookup("UPSTAGE_API_KEY").or_else(|| lookup("OPENAI_API_KEY")) {
            if !key.trim().is_empty() {
                config.llm.api_key = Some(key);
            }
        }
        if let Some(url) = lookup("UPSTAGE_BASE_URL") {
            config.llm.base_url = url;
        }
        if let Some(url) = lookup("OLLAMA_URL") {
            config.llm.ollama_url = url;
        }
        if let Some(model) = lookup("SOLAR_MODEL") {
            config.llm.model = model;
        }
        if let Some(tokens) = lookup("SOLAR_MAX_TOKENS") {
            config.llm.max_tokens = parse_value("SOLAR_MAX_TOKENS", &tokens)?;
        }
        if let Some(timeout) = lookup("AI_TIMEOUT_SECONDS") {
            config.llm.timeout_secs = parse_value("AI_TIMEOUT_SECONDS", &timeout)?;
        }

        // Rate limit
        if let Some(quota) = lookup("CHATBOT_RATE_LIMIT_PER_MIN") {
            config.rate_limit.per_minute = parse_value("CHATBOT_RATE_LIMIT_PER_MIN", &quota)?;
        }

        // Cache
        if let Some(ttl) = lookup("CACHE_TTL_SECONDS") {
            config.cache.ttl_secs = parse_value("CACHE_TTL_SECONDS", &ttl)?;
        }

        // Logging
        if let Some(level) = lookup("LOG_LEVEL") {
            config.logging.level = level;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path,
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Merge with environment variables (env takes precedence)
    pub fn with_env_override(self) -> Result<Self, ConfigError> {
        self.with_override_from(|key| std::env::var(key).ok())
    }

    /// Merge with values from a lookup, only where the lookup differs from defaults
    pub fn with_override_from<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env_config = Self::from_lookup(lookup)?;
        let defaults = Self::default();

        if env_config.dataset.root != defaults.dataset.root {
            self.dataset.root = env_config.dataset.root;
        }
        if env_config.dataset.manifest_path.is_some() {
            self.dataset.manifest_path = env_config.dataset.manifest_path;
        }
        if env_config.llm.provider != defaults.llm.provider {
            self.llm.provider = env_config.llm.provider;
        }
        if env_config.llm.base_url != defaults.llm.base_url {
            self.llm.base_url = env_config.llm.base_url;
        }
        if env_config.llm.ollama_url != defaults.llm.ollama_url {
            self.llm.ollama_url = env_config.llm.ollama_url;
        }
        if env_config.llm.model != defaults.llm.model {
            self.llm.model = env_config.llm.model;
        }
        if env_config.llm.max_tokens != defaults.llm.max_tokens {
            self.llm.max_tokens = env_config.llm.max_tokens;
        }
        if env_config.llm.timeout_secs != defaults.llm.timeout_secs {
            self.llm.timeout_secs = env_config.llm.timeout_secs;
        }
        if env_config.rate_limit.per_minute != defaults.rate_limit.per_minute {
            self.rate_limit.per_minute = env_config.rate_limit.per_minute;
        }
        if env_config.cache.ttl_secs != defaults.cache.ttl_secs {
            self.cache.ttl_secs = env_config.cache.ttl_secs;
        }
        if env_config.logging.level != defaults.logging.level {
            self.logging.level = env_config.logging.level;
        }

        // Always use env for sensitive values
        if env_config.llm.api_key.is_some() {
            self.llm.api_key = env_config.llm.api_key;
        }

        Ok(self)
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=MAX_TIMEOUT_SECS).contains(&self.llm.timeout_secs) {
            return Err(ConfigError::InvalidValue {
                key: "llm.timeout_secs".to_string(),
                value: self.llm.timeout_secs.to_string(),
            });
        }
        if self.rate_limit.per_minute > MAX_RATE_PER_MINUTE {
            return Err(ConfigError::InvalidValue {
                key: "rate_limit.per_minute".to_string(),
                value: self.rate_limit.per_minute.to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.answer.fuzzy_threshold) {
            return Err(ConfigError::InvalidValue {
                key: "answer.fuzzy_threshold".to_string(),
                value: self.answer.fuzzy_threshold.to_string(),
            });
        }
        if self.answer.min_question_chars > self.answer.max_question_chars {
            return Err(ConfigError::InvalidValue {
                key: "answer.min_question_chars".to_string(),
                value: self.answer.min_question_chars.to_string(),
            });
        }
        Ok(())
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

/// Dataset configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    /// Root directory holding the dataset folders
    pub root: PathBuf,

    /// Optional TOML manifest replacing the built-in layout
    pub manifest_path: Option<PathBuf>,

    /// Polarity assigned to guidance rows whose type column is unrecognized
    pub unrecognized_polarity: Polarity,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("data"),
            manifest_path: None,
            unrecognized_polarity: Polarity::Dont,
        }
    }
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// LLM provider to use
    pub provider: LlmProvider,

    /// API key (Upstage or OpenAI)
    pub api_key: Option<String>,

    /// OpenAI-compatible API base URL
    pub base_url: String,

    /// Ollama server URL
    pub ollama_url: String,

    /// Model name to use
    pub model: String,

    /// Maximum tokens for completion
    pub max_tokens: u32,

    /// Temperature for generation
    pub temperature: f32,

    /// Hard wall-clock timeout for one fallback call, in seconds
    pub timeout_secs: f64,
}

impl LlmConfig {
    /// Fallback timeout as a duration, clamped to `0..=MAX_TIMEOUT_SECS`
    pub fn timeout(&self) -> Duration {
        let secs = if self.timeout_secs.is_nan() {
            0.0
        } else {
            self.timeout_secs.clamp(0.0, MAX_TIMEOUT_SECS)
        };
        Duration::from_secs_f64(secs)
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::Upstage,
            api_key: None,
            base_url: "https://api.upstage.ai/v1".to_string(),
            ollama_url: "http://localhost:11434".to_string(),
            model: "solar-pro3".to_string(),
            max_tokens: 300,
            temperature: 0.7,
            timeout_secs: 2.5,
        }
    }
}

/// Supported LLM providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    Upstage,
    OpenAI,
    Ollama,
}

impl std::str::FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "upstage" | "solar" => Ok(Self::Upstage),
            "openai" => Ok(Self::OpenAI),
            "ollama" => Ok(Self::Ollama),
            _ => Err(ConfigError::InvalidValue {
                key: "LLM_PROVIDER".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Rate limit configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Fallback calls allowed in any trailing 60 seconds
    pub per_minute: usize,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self { per_minute: 20 }
    }
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Response time-to-live in seconds
    pub ttl_secs: u64,

    /// Maximum number of cached answers
    pub max_capacity: u64,

    /// Maximum number of cached filter outcomes
    pub filter_capacity: usize,
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 3600,
            max_capacity: 1000,
            filter_capacity: 100,
        }
    }
}

/// Answer composition configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnswerConfig {
    /// Maximum entries in each of the dos/donts lists
    pub top_n: usize,

    /// Minimum similarity for fuzzy matches
    pub fuzzy_threshold: f64,

    /// Maximum fuzzy matches per keyword
    pub fuzzy_limit: usize,

    /// Shortest accepted question
    pub min_question_chars: usize,

    /// Longest accepted question
    pub max_question_chars: usize,
}

impl Default for AnswerConfig {
    fn default() -> Self {
        Self {
            top_n: 5,
            fuzzy_threshold: 0.75,
            fuzzy_limit: 10,
            min_question_chars: crate::MIN_QUESTION_CHARS,
            max_question_chars: crate::MAX_QUESTION_CHARS,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// JSON format for logs
    pub json_format: bool,

    /// Include file/line in logs
    pub include_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            include_location: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}
