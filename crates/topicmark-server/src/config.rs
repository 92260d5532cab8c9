//! Configuration file management for topicmark.
//!
//! Provides a TOML-based config file at `~/.config/topicmark/config.toml` and
//! a resolution chain: CLI flag > env var > config file > default.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use topicmark_db::config::DbConfig;

/// Generation service used when nothing else is configured.
pub const DEFAULT_RAG_URL: &str = "http://localhost:8000";
pub const DEFAULT_RAG_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_BIND: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 3000;

pub const RAG_URL_ENV: &str = "TOPICMARK_RAG_URL";

// -----------------------------------------------------------------------
// Config file types
// -----------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigFile {
    pub database: DatabaseSection,
    #[serde(default)]
    pub rag: RagSection,
    #[serde(default)]
    pub server: ServerSection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseSection {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RagSection {
    pub url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for RagSection {
    fn default() -> Self {
        Self {
            url: DEFAULT_RAG_URL.to_owned(),
            timeout_secs: DEFAULT_RAG_TIMEOUT_SECS,
        }
    }
}

fn default_timeout_secs() -> u64 {
    DEFAULT_RAG_TIMEOUT_SECS
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerSection {
    pub bind: String,
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_owned(),
            port: DEFAULT_PORT,
        }
    }
}

// -----------------------------------------------------------------------
// Paths
// -----------------------------------------------------------------------

/// `$XDG_CONFIG_HOME/topicmark`, or `~/.config/topicmark` on every platform.
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("topicmark");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("topicmark")
}

pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

// -----------------------------------------------------------------------
// Read / write
// -----------------------------------------------------------------------

pub fn load_config() -> Result<ConfigFile> {
    read_config(&config_path())
}

pub fn read_config(path: &Path) -> Result<ConfigFile> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    toml::from_str(&contents).with_context(|| format!("failed to parse config file at {}", path.display()))
}

/// Write the config file to its standard location.
pub fn save_config(config: &ConfigFile) -> Result<PathBuf> {
    let path = config_path();
    write_config(&path, config)?;
    Ok(path)
}

/// Serialize `config` to `path`, creating parent dirs as needed. The file is
/// readable by its owner only on Unix.
pub fn write_config(path: &Path, config: &ConfigFile) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create config directory {}", dir.display()))?;
    }

    let contents = toml::to_string_pretty(config).context("failed to serialize config")?;
    std::fs::write(path, &contents)
        .with_context(|| format!("failed to write config file at {}", path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(path, perms)
            .with_context(|| format!("failed to set permissions on {}", path.display()))?;
    }

    Ok(())
}

// -----------------------------------------------------------------------
// Resolved config
// -----------------------------------------------------------------------

/// Values given on the command line; they win over everything else.
#[derive(Debug, Default, Clone, Copy)]
pub struct CliOverrides<'a> {
    pub database_url: Option<&'a str>,
    pub rag_url: Option<&'a str>,
}

#[derive(Debug, Clone)]
pub struct TopicmarkConfig {
    pub db_config: DbConfig,
    pub rag_url: String,
    pub rag_timeout: Duration,
    pub bind: String,
    pub port: u16,
}

impl TopicmarkConfig {
    /// Resolve against the process environment and the config file, if one
    /// exists.
    pub fn resolve(cli: CliOverrides<'_>) -> Result<Self> {
        let path = config_path();
        let file = if path.exists() {
            Some(read_config(&path)?)
        } else {
            None
        };
        Ok(Self::resolve_from(cli, |key| std::env::var(key).ok(), file.as_ref()))
    }

    /// - DB URL: CLI > `TOPICMARK_DATABASE_URL` > `database.url` > default
    /// - RAG URL: CLI > `TOPICMARK_RAG_URL` > `rag.url` > default
    pub fn resolve_from(
        cli: CliOverrides<'_>,
        env: impl Fn(&str) -> Option<String>,
        file: Option<&ConfigFile>,
    ) -> Self {
        let db_url = cli
            .database_url
            .map(str::to_owned)
            .or_else(|| env(DbConfig::ENV_VAR))
            .or_else(|| file.map(|f| f.database.url.clone()))
            .unwrap_or_else(|| DbConfig::DEFAULT_URL.to_owned());

        let rag = file.map(|f| f.rag.clone()).unwrap_or_default();
        let rag_url = cli
            .rag_url
            .map(str::to_owned)
            .or_else(|| env(RAG_URL_ENV))
            .unwrap_or(rag.url);

        let server = file.map(|f| f.server.clone()).unwrap_or_default();

        Self {
            db_config: DbConfig::new(db_url),
            rag_url,
            rag_timeout: Duration::from_secs(rag.timeout_secs),
            bind: server.bind,
            port: server.port,
        }
    }
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------
