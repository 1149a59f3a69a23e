#[cfg(test)]
mod tests;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

use crate::chunking::ChunkingConfig;

/// Top-level application configuration, persisted as `config.toml` under the
/// base directory. API keys are never stored here; they are resolved from the
/// environment at startup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub package: PackageTier,
    #[serde(skip)]
    pub base_dir: PathBuf,
}

/// Embedding provider settings. Any OpenAI-compatible `/embeddings` endpoint
/// works, including a local Ollama instance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub base_url: String,
    pub model: String,
    pub dimension: u32,
    pub batch_size: u32,
    pub timeout_secs: u64,
    /// Name of the environment variable holding the API key, if the provider
    /// requires one. Local providers may leave this unset.
    pub api_key_env: Option<String>,
}

impl Default for EmbeddingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434/v1".to_string(),
            model: "nomic-embed-text".to_string(),
            dimension: 768,
            batch_size: 16,
            timeout_secs: 30,
            api_key_env: None,
        }
    }
}

/// Generation provider settings for the primary/fallback chat models.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GenerationConfig {
    pub base_url: String,
    pub primary_model: String,
    /// Invoked once with the identical prompt when the primary model fails.
    pub fallback_model: Option<String>,
    pub temperature: f32,
    pub timeout_secs: u64,
    pub api_key_env: String,
}

impl Default for GenerationConfig {
    #[inline]
    fn default() -> Self {
        Self {
            base_url: "https://api.groq.com/openai/v1".to_string(),
            primary_model: "llama3-70b-8192".to_string(),
            fallback_model: None,
            temperature: 0.0,
            timeout_secs: 60,
            api_key_env: "GROQ_API_KEY".to_string(),
        }
    }
}

/// Subscription package for a deployment. The tier caps how many documents a
/// single ingestion batch may contain.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PackageTier {
    Basic,
    #[default]
    Standard,
    Premium,
}

impl PackageTier {
    /// Maximum documents per ingestion batch, `None` for unlimited.
    #[inline]
    pub fn max_docs(self) -> Option<usize> {
        match self {
            PackageTier::Basic => Some(1),
            PackageTier::Standard => Some(3),
            PackageTier::Premium => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid URL format: {0}")]
    InvalidUrl(String),
    #[error("Invalid model name: {0} (cannot be empty)")]
    InvalidModel(String),
    #[error("Invalid batch size: {0} (must be between 1 and 1000)")]
    InvalidBatchSize(u32),
    #[error("Invalid embedding dimension: {0} (must be between 64 and 4096)")]
    InvalidEmbeddingDimension(u32),
    #[error("Invalid timeout: {0} (must be between 1 and 600 seconds)")]
    InvalidTimeout(u64),
    #[error("Invalid temperature: {0} (must be between 0.0 and 2.0)")]
    InvalidTemperature(f32),
    #[error("Invalid chunk size: {0} (must be between 100 and 8000 characters)")]
    InvalidChunkSize(usize),
    #[error("Invalid chunk overlap: {overlap} (must be smaller than chunk size {size})")]
    InvalidChunkOverlap { overlap: usize, size: usize },
    #[error("Required API key environment variable '{0}' is not set")]
    MissingApiKey(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl Config {
    /// Load configuration from `<base_dir>/config.toml`, falling back to
    /// defaults when the file does not exist.
    #[inline]
    pub fn load<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let config_path = base_dir.as_ref().join("config.toml");

        if !config_path.exists() {
            return Ok(Self {
                embedding: EmbeddingConfig::default(),
                generation: GenerationConfig::default(),
                chunking: ChunkingConfig::default(),
                package: PackageTier::default(),
                base_dir: base_dir.as_ref().to_path_buf(),
            });
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;
        config.base_dir = base_dir.as_ref().to_path_buf();

        config
            .validate()
            .with_context(|| "Configuration validation failed")?;

        Ok(config)
    }

    #[inline]
    pub fn save(&self) -> Result<()> {
        self.validate()
            .context("Configuration validation failed before saving")?;

        fs::create_dir_all(&self.base_dir).with_context(|| {
            format!("Failed to create base directory: {}", self.base_dir.display())
        })?;

        let config_path = self.config_file_path();
        let content = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

        Ok(())
    }

    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.embedding.validate()?;
        self.generation.validate()?;
        self.validate_chunking_config()?;
        Ok(())
    }

    fn validate_chunking_config(&self) -> Result<(), ConfigError> {
        let chunking = &self.chunking;

        if !(100..=8000).contains(&chunking.chunk_size) {
            return Err(ConfigError::InvalidChunkSize(chunking.chunk_size));
        }

        // Overlap must be strictly smaller than the window or the stride
        // would be zero and chunking would never terminate.
        if chunking.overlap >= chunking.chunk_size {
            return Err(ConfigError::InvalidChunkOverlap {
                overlap: chunking.overlap,
                size: chunking.chunk_size,
            });
        }

        Ok(())
    }

    /// Verify that every required API key is present in the environment.
    /// Called once at startup so a missing secret surfaces as a clear
    /// configuration error rather than a failure on first use.
    #[inline]
    pub fn validate_secrets(&self) -> Result<(), ConfigError> {
        if let Some(var) = &self.embedding.api_key_env {
            if std::env::var(var).is_err() {
                return Err(ConfigError::MissingApiKey(var.clone()));
            }
        }
        if std::env::var(&self.generation.api_key_env).is_err() {
            return Err(ConfigError::MissingApiKey(
                self.generation.api_key_env.clone(),
            ));
        }
        Ok(())
    }

    #[inline]
    pub fn config_file_path(&self) -> PathBuf {
        self.base_dir.join("config.toml")
    }

    /// Root directory holding one vector store per tenant.
    #[inline]
    pub fn vector_db_path(&self) -> PathBuf {
        self.base_dir.join("vector_db")
    }

    /// Root directory holding per-tenant source documents for bootstrap
    /// ingestion (`businesses/<tenant>/{public_docs,admin_docs}`).
    #[inline]
    pub fn businesses_path(&self) -> PathBuf {
        self.base_dir.join("businesses")
    }
}

impl EmbeddingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        Url::parse(&self.base_url).map_err(|_| ConfigError::InvalidUrl(self.base_url.clone()))?;

        if self.model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(self.model.clone()));
        }

        if self.batch_size == 0 || self.batch_size > 1000 {
            return Err(ConfigError::InvalidBatchSize(self.batch_size));
        }

        if !(64..=4096).contains(&self.dimension) {
            return Err(ConfigError::InvalidEmbeddingDimension(self.dimension));
        }

        if self.timeout_secs == 0 || self.timeout_secs > 600 {
            return Err(ConfigError::InvalidTimeout(self.timeout_secs));
        }

        Ok(())
    }

    /// Resolve the API key from the environment, if one is configured.
    #[inline]
    pub fn api_key(&self) -> Result<Option<String>, ConfigError> {
        match &self.api_key_env {
            Some(var) => std::env::var(var)
                .map(Some)
                .map_err(|_| ConfigError::MissingApiKey(var.clone())),
            None => Ok(None),
        }
    }
}

impl GenerationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        Url::parse(&self.base_url).map_err(|_| ConfigError::InvalidUrl(self.base_url.clone()))?;

        if self.primary_model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(self.primary_model.clone()));
        }

        if let Some(fallback) = &self.fallback_model {
            if fallback.trim().is_empty() {
                return Err(ConfigError::InvalidModel(fallback.clone()));
            }
        }

        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::InvalidTemperature(self.temperature));
        }

        if self.timeout_secs == 0 || self.timeout_secs > 600 {
            return Err(ConfigError::InvalidTimeout(self.timeout_secs));
        }

        Ok(())
    }

    #[inline]
    pub fn api_key(&self) -> Result<String, ConfigError> {
        std::env::var(&self.api_key_env)
            .map_err(|_| ConfigError::MissingApiKey(self.api_key_env.clone()))
    }
}
