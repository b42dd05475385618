use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub finbot: FinbotConfig,
    pub completion: CompletionConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
}

/// Store and process settings
#[derive(Debug, Clone, Deserialize)]
pub struct FinbotConfig {
    pub db_path: PathBuf,
    #[serde(default = "default_migrations_dir")]
    pub migrations_dir: PathBuf,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Completion backend configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CompletionConfig {
    /// Full URL of the generate endpoint, e.g. `http://localhost:11434/api/generate`
    pub url: String,
    pub model: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Context longer than this is cut before it goes into the prompt
    #[serde(default = "default_max_context_chars")]
    pub max_context_chars: usize,
}

/// Subgraph retrieval configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RetrievalConfig {
    #[serde(default = "default_row_limit")]
    pub row_limit: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            row_limit: default_row_limit(),
        }
    }
}

fn default_migrations_dir() -> PathBuf {
    PathBuf::from("migrations")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_max_context_chars() -> usize {
    4000
}

fn default_row_limit() -> usize {
    100
}

impl Config {
    /// Load configuration from file
    ///
    /// Loads environment variables from .env file (if present) before loading config.
    /// Looks for config file in this order:
    /// 1. Path specified in FINBOT_CONFIG environment variable
    /// 2. ./config.toml in current directory
    pub fn load() -> Result<Self> {
        // .env is optional
        let _ = dotenv::dotenv();

        let config_path = std::env::var("FINBOT_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config.toml"));

        Self::from_file(&config_path)
    }

    /// Load and validate configuration from an explicit path
    pub fn from_file(config_path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config: Config = toml::from_str(&config_str)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if self.completion.url.trim().is_empty() {
            anyhow::bail!("completion.url must not be empty");
        }

        if !self.completion.url.starts_with("http://") && !self.completion.url.starts_with("https://") {
            anyhow::bail!(
                "completion.url must be an http(s) URL, got: {}",
                self.completion.url
            );
        }

        if self.completion.model.trim().is_empty() {
            anyhow::bail!("completion.model must not be empty");
        }

        if self.completion.timeout_secs == 0 {
            anyhow::bail!("completion.timeout_secs must be greater than 0");
        }

        if self.completion.max_context_chars == 0 {
            anyhow::bail!("completion.max_context_chars must be greater than 0");
        }

        if self.retrieval.row_limit == 0 {
            anyhow::bail!("retrieval.row_limit must be greater than 0");
        }

        Ok(())
    }

    /// Get database path
    pub fn db_path(&self) -> &Path {
        &self.finbot.db_path
    }

    /// Get the directory holding the SQL migrations
    pub fn migrations_dir(&self) -> &Path {
        &self.finbot.migrations_dir
    }
}
