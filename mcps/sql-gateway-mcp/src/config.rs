//! Configuration for the SQL gateway
//!
//! Built once at startup from an optional TOML file plus environment
//! overrides, then handed to the server. Nothing below `main` reads the
//! environment.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

const DEFAULT_BASE_URL: &str = "https://cdn.jsdelivr.net/pyodide/claude-local-files";

/// SQL gateway configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GatewayConfig {
    /// Database connection settings
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Inline output settings
    #[serde(default)]
    pub output: OutputConfig,

    /// Full result offload settings
    #[serde(default)]
    pub overflow: OverflowConfig,
}

/// Database connection configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Connection string, e.g. `sqlite:////var/data/app.db` or a plain path
    #[serde(default)]
    pub url: Option<String>,

    /// How long a connection waits on a locked database, in seconds
    /// Default: 30
    #[serde(default = "default_timeout")]
    pub busy_timeout_secs: u64,

    /// Open the query connection read-only too
    /// Default: false
    #[serde(default)]
    pub read_only: bool,
}

/// Inline output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Character budget for rendered rows
    /// Default: 4000
    #[serde(default = "default_max_response_chars")]
    pub max_response_chars: usize,
}

/// Overflow artifact configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OverflowConfig {
    /// Directory artifacts are written to; offload is off when unset
    #[serde(default)]
    pub directory: Option<PathBuf>,

    /// URL prefix under which the directory is served
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

fn default_timeout() -> u64 {
    30
}

fn default_max_response_chars() -> usize {
    4000
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            busy_timeout_secs: default_timeout(),
            read_only: false,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            max_response_chars: default_max_response_chars(),
        }
    }
}

impl Default for OverflowConfig {
    fn default() -> Self {
        Self {
            directory: None,
            base_url: default_base_url(),
        }
    }
}

impl GatewayConfig {
    /// Load configuration from file and environment
    ///
    /// Looks for a config file in:
    /// 1. `SQL_GATEWAY_CONFIG` environment variable (must exist)
    /// 2. `~/.binks/sql-gateway.toml` (optional)
    ///
    /// Then applies `DB_URL`, `DB_READ_ONLY`, `EXECUTE_QUERY_MAX_CHARS`,
    /// `CLAUDE_LOCAL_FILES_PATH` and `OVERFLOW_BASE_URL` on top.
    pub fn load() -> Result<Self> {
        let file = if let Ok(path) = std::env::var("SQL_GATEWAY_CONFIG") {
            let path = PathBuf::from(path);
            Some(read_file(&path)?)
        } else {
            match dirs::home_dir().map(|home| home.join(".binks").join("sql-gateway.toml")) {
                Some(path) if path.exists() => Some(read_file(&path)?),
                _ => None,
            }
        };

        Self::from_sources(file.as_deref(), |key| std::env::var(key).ok())
    }

    /// Build from TOML text (if any) and an environment lookup
    pub fn from_sources<F>(toml_text: Option<&str>, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config: Self = match toml_text {
            Some(text) => toml::from_str(text).context("Failed to parse gateway config")?,
            None => Self::default(),
        };

        if let Some(url) = env("DB_URL") {
            config.database.url = Some(url);
        }
        if let Some(flag) = env("DB_READ_ONLY") {
            config.database.read_only = parse_bool(&flag)
                .with_context(|| format!("Invalid DB_READ_ONLY value {:?}", flag))?;
        }
        if let Some(max) = env("EXECUTE_QUERY_MAX_CHARS") {
            config.output.max_response_chars = max
                .trim()
                .parse()
                .with_context(|| format!("Invalid EXECUTE_QUERY_MAX_CHARS value {:?}", max))?;
        }
        if let Some(dir) = env("CLAUDE_LOCAL_FILES_PATH").filter(|d| !d.is_empty()) {
            config.overflow.directory = Some(PathBuf::from(dir));
        }
        if let Some(base_url) = env("OVERFLOW_BASE_URL") {
            config.overflow.base_url = base_url;
        }

        config.validate()?;
        Ok(config)
    }

    /// The configured connection string
    pub fn database_url(&self) -> Result<&str> {
        self.database
            .url
            .as_deref()
            .context("No database configured: set DB_URL or database.url")
    }

    fn validate(&self) -> Result<()> {
        self.database_url()?;
        if self.output.max_response_chars == 0 {
            bail!("output.max_response_chars must be greater than zero");
        }
        Ok(())
    }
}

fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read config from {:?}", path))
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
