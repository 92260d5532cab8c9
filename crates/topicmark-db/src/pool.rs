use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{Executor, PgPool};
use tracing::{debug, info};

use crate::config::DbConfig;

/// Migrations embedded at compile time from `crates/topicmark-db/migrations/`.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!();

/// Tables owned by topicmark, in the order `db-init` reports them.
pub const TABLES: [&str; 3] = ["lesson_plans", "topics", "users"];

/// Reported to the server as `application_name` so topicmark sessions are
/// identifiable in `pg_stat_activity`.
const APPLICATION_NAME: &str = "topicmark";

fn connect_options(url: &str) -> Result<PgConnectOptions> {
    let options = PgConnectOptions::from_str(url)
        .with_context(|| format!("invalid database URL {url}"))?;
    Ok(options.application_name(APPLICATION_NAME))
}

/// Create the pool shared by the HTTP handlers and CLI commands.
pub async fn create_pool(config: &DbConfig) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(10))
        .connect_with(connect_options(&config.database_url)?)
        .await
        .with_context(|| format!("failed to connect to database at {}", config.database_url))?;
    debug!(db = config.database_name().unwrap_or("?"), "connection pool ready");
    Ok(pool)
}

/// Run all pending embedded migrations against the pool.
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    MIGRATOR
        .run(pool)
        .await
        .context("failed to run database migrations")?;

    info!(embedded = MIGRATOR.iter().count(), "migrations applied");
    Ok(())
}

/// Applied and embedded migration counts. Call after [`run_migrations`];
/// the bookkeeping table does not exist before the first run.
pub async fn migration_status(pool: &PgPool) -> Result<(usize, usize)> {
    let applied: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations WHERE success")
            .fetch_one(pool)
            .await
            .context("failed to read migration history")?;
    Ok((usize::try_from(applied).unwrap_or(0), MIGRATOR.iter().count()))
}

/// `CREATE DATABASE` for `name`. The name cannot be a bind parameter, so it
/// is restricted to lowercase identifiers and quoted.
pub fn create_database_statement(name: &str) -> Result<String> {
    let valid = !name.is_empty()
        && name.len() <= 63
        && !name.starts_with(|c: char| c.is_ascii_digit())
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if !valid {
        anyhow::bail!("database name {name:?} must be a lowercase identifier of at most 63 bytes");
    }
    Ok(format!("CREATE DATABASE \"{name}\""))
}

/// Ensure the target database exists, creating it through the `postgres`
/// maintenance database when it is absent.
pub async fn ensure_database_exists(config: &DbConfig) -> Result<()> {
    let db_name = config
        .database_name()
        .context("could not determine database name from URL")?;
    let maintenance_url = config.maintenance_url();

    let maint_pool = PgPoolOptions::new()
        .max_connections(1)
        .acquire_timeout(Duration::from_secs(10))
        .connect_with(connect_options(&maintenance_url)?)
        .await
        .with_context(|| format!("failed to connect to maintenance database at {maintenance_url}"))?;

    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
            .bind(db_name)
            .fetch_one(&maint_pool)
            .await
            .context("failed to query pg_database")?;

    let result = if exists {
        info!(db = db_name, "database already exists");
        Ok(())
    } else {
        create_database(&maint_pool, db_name).await
    };

    maint_pool.close().await;
    result
}

async fn create_database(maint_pool: &PgPool, db_name: &str) -> Result<()> {
    let stmt = create_database_statement(db_name)?;
    maint_pool
        .execute(stmt.as_str())
        .await
        .with_context(|| format!("failed to create database {db_name}"))?;
    info!(db = db_name, "database created");
    Ok(())
}

/// Row count for each of [`TABLES`], for the `db-init` summary.
pub async fn table_counts(pool: &PgPool) -> Result<Vec<(String, i64)>> {
    let mut counts = Vec::with_capacity(TABLES.len());
    for table in TABLES {
        let query = format!("SELECT COUNT(*) FROM {table}");
        let count: i64 = sqlx::query_scalar(&query)
            .fetch_one(pool)
            .await
            .with_context(|| format!("failed to count rows in {table}; is the database migrated?"))?;
        counts.push((table.to_owned(), count));
    }
    Ok(counts)
}
