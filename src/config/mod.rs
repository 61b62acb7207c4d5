
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

pub const DEFAULT_EMBEDDING_DIMENSION: u32 = 768;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub ollama: OllamaConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    /// Path to the employee data file, relative to the base directory
    /// unless absolute.
    #[serde(default = "default_data_file")]
    pub data_file: PathBuf,
    #[serde(skip)]
    pub base_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OllamaConfig {
    pub protocol: String,
    pub host: String,
    pub port: u16,
    pub embedding_model: String,
    pub generation_model: String,
    pub batch_size: u32,
    pub embedding_dimension: u32,
}

/// Retrieval tuning knobs. The defaults (k = 5, threshold = 0.3) favor
/// recall over precision for small record sets; both can be overridden
/// per search call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetrievalConfig {
    pub k: usize,
    pub score_threshold: f32,
}

fn default_data_file() -> PathBuf {
    PathBuf::from("data/employees.json")
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            protocol: "http".to_string(),
            host: "localhost".to_string(),
            port: 11434,
            embedding_model: "nomic-embed-text:latest".to_string(),
            generation_model: "mistral:7b".to_string(),
            batch_size: 16,
            embedding_dimension: DEFAULT_EMBEDDING_DIMENSION,
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            k: 5,
            score_threshold: 0.3,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration directory not found or could not be created")]
    DirectoryError,
    #[error("Invalid URL format: {0}")]
    InvalidUrl(String),
    #[error("Invalid port: {0} (must be between 1 and 65535)")]
    InvalidPort(u16),
    #[error("Invalid batch size: {0} (must be between 1 and 1000)")]
    InvalidBatchSize(u32),
    #[error("Invalid model name: {0} (cannot be empty)")]
    InvalidModel(String),
    #[error("Invalid protocol: {0} (must be 'http' or 'https')")]
    InvalidProtocol(String),
    #[error("Invalid embedding dimension: {0} (must be between 64 and 4096)")]
    InvalidEmbeddingDimension(u32),
    #[error("Invalid result limit: {0} (must be between 1 and 100)")]
    InvalidResultLimit(usize),
    #[error("Invalid score threshold: {0} (must be between 0.0 and 1.0)")]
    InvalidScoreThreshold(f32),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

/// Resolve the base directory for config, data, and the vector store.
pub fn get_base_dir() -> Result<PathBuf, ConfigError> {
    let dir = dirs::data_local_dir()
        .ok_or(ConfigError::DirectoryError)?
        .join("employee-search");
    fs::create_dir_all(&dir).map_err(|_| ConfigError::DirectoryError)?;
    Ok(dir)
}

impl Config {
    #[inline]
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_path = config_dir.as_ref().join("config.toml");

        if !config_path.exists() {
            return Ok(Self {
                ollama: OllamaConfig::default(),
                retrieval: RetrievalConfig::default(),
                data_file: default_data_file(),
                base_dir: config_dir.as_ref().to_path_buf(),
            });
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;
        config.base_dir = config_dir.as_ref().to_path_buf();

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
            format!(
                "Failed to create config directory: {}",
                self.base_dir.display()
            )
        })?;

        let config_path = self.base_dir.join("config.toml");
        let content = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

        Ok(())
    }

    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.ollama.validate()?;
        self.retrieval.validate()?;
        Ok(())
    }

    #[inline]
    pub fn get_base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Get the path for the vector database directory
    #[inline]
    pub fn vector_database_path(&self) -> PathBuf {
        self.base_dir.join("vectors")
    }

    /// Resolve the employee data file path against the base directory.
    #[inline]
    pub fn data_file_path(&self) -> PathBuf {
        if self.data_file.is_absolute() {
            self.data_file.clone()
        } else {
            self.base_dir.join(&self.data_file)
        }
    }
}

impl OllamaConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.protocol != "http" && self.protocol != "https" {
            return Err(ConfigError::InvalidProtocol(self.protocol.clone()));
        }

        if self.port == 0 {
            return Err(ConfigError::InvalidPort(self.port));
        }

        let url_str = format!("{}://{}:{}", self.protocol, self.host, self.port);
        Url::parse(&url_str).map_err(|_| ConfigError::InvalidUrl(url_str))?;

        if self.embedding_model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(self.embedding_model.clone()));
        }

        if self.generation_model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(self.generation_model.clone()));
        }

        if self.batch_size == 0 || self.batch_size > 1000 {
            return Err(ConfigError::InvalidBatchSize(self.batch_size));
        }

        if !(64..=4096).contains(&self.embedding_dimension) {
            return Err(ConfigError::InvalidEmbeddingDimension(
                self.embedding_dimension,
            ));
        }

        Ok(())
    }

    pub fn ollama_url(&self) -> Result<Url, ConfigError> {
        let url_str = format!("{}://{}:{}", self.protocol, self.host, self.port);
        Url::parse(&url_str).map_err(|_| ConfigError::InvalidUrl(url_str))
    }
}

impl RetrievalConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.k == 0 || self.k > 100 {
            return Err(ConfigError::InvalidResultLimit(self.k));
        }

        if !(0.0..=1.0).contains(&self.score_threshold) {
            return Err(ConfigError::InvalidScoreThreshold(self.score_threshold));
        }

        Ok(())
    }
}
