//! Configuration management for text2sql.
//!
//! Handles loading configuration from TOML files and environment variables.
//! Precedence, highest first: CLI flags, environment, config file, defaults.

use crate::error::{Result, Text2SqlError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

/// Main configuration structure for text2sql.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// HTTP listener settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// SQLite data store settings.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Language model provider settings.
    #[serde(default)]
    pub llm: LlmConfig,

    /// Pipeline behavior.
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerConfig {
    /// Returns the `host:port` string to bind.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// SQLite data store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite file.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,

    /// Maximum pooled connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// How long a request waits for a pooled connection, in seconds.
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,

    /// Deadline for a single statement, in seconds.
    #[serde(default = "default_query_timeout")]
    pub query_timeout_secs: u64,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("furniture.db")
}

fn default_max_connections() -> u32 {
    4
}

fn default_acquire_timeout() -> u64 {
    10
}

fn default_query_timeout() -> u64 {
    30
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            max_connections: default_max_connections(),
            acquire_timeout_secs: default_acquire_timeout(),
            query_timeout_secs: default_query_timeout(),
        }
    }
}

/// Language model provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// LLM provider: "openai", "ollama" or "mock".
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Model name (e.g., "gpt-4o-mini", "llama3.2:3b").
    #[serde(default)]
    pub model: Option<String>,

    /// API base URL; any OpenAI-compatible chat-completions endpoint works.
    #[serde(default)]
    pub base_url: Option<String>,

    /// Sampling temperature.
    #[serde(default)]
    pub temperature: f32,

    /// Maximum tokens per completion.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Deadline for one model call, in seconds.
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_max_tokens() -> u32 {
    2000
}

fn default_llm_timeout() -> u64 {
    60
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            base_url: None,
            temperature: 0.0,
            max_tokens: default_max_tokens(),
            timeout_secs: default_llm_timeout(),
        }
    }
}

/// Pipeline behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Row limit applied when a request does not name one.
    #[serde(default = "default_limit")]
    pub default_limit: u32,

    /// Also check statements with a full SQL parser.
    #[serde(default)]
    pub strict_safety: bool,

    /// File holding the schema description given to the model.
    #[serde(default)]
    pub schema_file: Option<PathBuf>,
}

fn default_limit() -> u32 {
    200
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            strict_safety: false,
            schema_file: None,
        }
    }
}

impl Config {
    /// Returns the default config file path for the current platform.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("text2sql")
            .join("config.toml")
    }

    /// Loads configuration from a TOML file.
    ///
    /// A missing file yields the defaults.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| Text2SqlError::config(format!("Failed to read config file: {e}")))?;

        let config = Self::parse_toml(&content, path)?;
        config.validate()?;
        Ok(config)
    }

    /// Parses configuration from a TOML string.
    fn parse_toml(content: &str, path: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|e| {
            Text2SqlError::config(format!(
                "Configuration error in {}:\n  {}",
                path.display(),
                e
            ))
        })
    }

    /// Applies environment variables on top of file values.
    ///
    /// Reads `TEXT2SQL_DB_PATH`, `TEXT2SQL_LLM_PROVIDER`, `TEXT2SQL_PORT` and
    /// `OPENAI_BASE_URL`.
    pub fn apply_env(&mut self) {
        if let Ok(path) = std::env::var("TEXT2SQL_DB_PATH") {
            self.database.path = PathBuf::from(path);
        }
        if let Ok(provider) = std::env::var("TEXT2SQL_LLM_PROVIDER") {
            self.llm.provider = provider;
        }
        if let Ok(port_str) = std::env::var("TEXT2SQL_PORT") {
            if let Ok(port) = port_str.parse() {
                self.server.port = port;
            }
        }
        if self.llm.base_url.is_none() {
            self.llm.base_url = std::env::var("OPENAI_BASE_URL").ok();
        }
    }

    /// Checks value ranges that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if !(1..=10_000).contains(&self.pipeline.default_limit) {
            return Err(Text2SqlError::config(format!(
                "pipeline.default_limit must be between 1 and 10000, got {}",
                self.pipeline.default_limit
            )));
        }
        if self.database.max_connections == 0 {
            return Err(Text2SqlError::config(
                "database.max_connections must be at least 1",
            ));
        }
        if self.llm.timeout_secs == 0 {
            return Err(Text2SqlError::config("llm.timeout_secs must be at least 1"));
        }
        if let Some(base_url) = &self.llm.base_url {
            Url::parse(base_url).map_err(|e| {
                Text2SqlError::config(format!("Invalid llm.base_url '{base_url}': {e}"))
            })?;
        }
        Ok(())
    }

    /// Reads the schema description for the SQL-generation prompt, if configured.
    pub fn load_schema(&self) -> Result<Option<String>> {
        let Some(path) = &self.pipeline.schema_file else {
            return Ok(None);
        };
        std::fs::read_to_string(path).map(Some).map_err(|e| {
            Text2SqlError::config(format!(
                "Failed to read schema file {}: {e}",
                path.display()
            ))
        })
    }
}
