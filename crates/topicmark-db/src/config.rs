use std::env;

/// Database configuration.
///
/// Reads from the `TOPICMARK_DATABASE_URL` environment variable, falling back
/// to `postgresql://localhost:5432/topicmark` when unset.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Full PostgreSQL connection URL.
    pub database_url: String,
}

impl DbConfig {
    /// The default connection URL used when no environment variable is set.
    pub const DEFAULT_URL: &str = "postgresql://localhost:5432/topicmark";

    /// Environment variable consulted by [`DbConfig::from_env`].
    pub const ENV_VAR: &str = "TOPICMARK_DATABASE_URL";

    /// Build a config from the environment.
    pub fn from_env() -> Self {
        let database_url =
            env::var(Self::ENV_VAR).unwrap_or_else(|_| Self::DEFAULT_URL.to_owned());
        Self { database_url }
    }

    /// Build a config from an explicit URL.
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
        }
    }

    /// Split the URL into server prefix, database path and query string.
    /// Path and query keep their leading `/` and `?`, or are empty.
    fn split_url(&self) -> (&str, &str, &str) {
        let (base, query) = match self.database_url.find('?') {
            Some(pos) => self.database_url.split_at(pos),
            None => (self.database_url.as_str(), ""),
        };
        let authority_start = base.find("://").map_or(0, |pos| pos + 3);
        match base[authority_start..].find('/') {
            Some(pos) => {
                let (server, path) = base.split_at(authority_start + pos);
                (server, path, query)
            }
            None => (base, "", query),
        }
    }

    /// Database name: the URL path without its leading `/` or query string.
    pub fn database_name(&self) -> Option<&str> {
        let (_, path, _) = self.split_url();
        let name = path.strip_prefix('/')?;
        if name.is_empty() || name.contains('/') {
            return None;
        }
        Some(name)
    }

    /// URL of the `postgres` maintenance database on the same server, with
    /// the original query parameters (`sslmode` and friends) kept. Used to
    /// issue `CREATE DATABASE` when the target does not exist yet.
    pub fn maintenance_url(&self) -> String {
        let (server, _, query) = self.split_url();
        format!("{server}/postgres{query}")
    }
}

impl Default for DbConfig {
    fn default() -> Self {
        Self::from_env()
    }
}
