//! Throwaway PostgreSQL databases for topicmark integration tests.
//!
//! With `TOPICMARK_TEST_PG_URL` set, tests reuse that server. Otherwise a
//! container is started on first use and shared by every test in the binary.
//! Either way each test gets a freshly migrated database of its own.

use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::{Executor, PgPool};
use testcontainers::ContainerAsync;
use testcontainers::ImageExt;
use testcontainers::runners::AsyncRunner;
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;
use uuid::Uuid;

use topicmark_db::pool;

const EXTERNAL_URL_VAR: &str = "TOPICMARK_TEST_PG_URL";

struct SharedServer {
    root_url: String,
    _container: Option<ContainerAsync<Postgres>>,
}

static SERVER: OnceCell<SharedServer> = OnceCell::const_new();

async fn start_server() -> SharedServer {
    if let Ok(url) = std::env::var(EXTERNAL_URL_VAR) {
        return SharedServer {
            root_url: url.trim_end_matches('/').to_owned(),
            _container: None,
        };
    }

    let container = Postgres::default()
        .with_tag("17")
        .start()
        .await
        .expect("failed to start PostgreSQL container");
    let host = container.get_host().await.expect("container host");
    let port = container
        .get_host_port_ipv4(5432)
        .await
        .expect("container port");

    SharedServer {
        root_url: format!("postgresql://postgres:postgres@{host}:{port}"),
        _container: Some(container),
    }
}

/// Server root URL, without a database name.
pub async fn pg_url() -> &'static str {
    &SERVER.get_or_init(start_server).await.root_url
}

async fn maintenance_pool() -> PgPool {
    let url = format!("{}/postgres", pg_url().await);
    PgPoolOptions::new()
        .max_connections(1)
        .acquire_timeout(Duration::from_secs(30))
        .connect(&url)
        .await
        .expect("failed to connect to maintenance database")
}

/// Create a uniquely named database with all migrations applied.
///
/// Returns the pool and the database name to hand to [`drop_test_db`].
pub async fn create_test_db() -> (PgPool, String) {
    let db_name = format!("topicmark_test_{}", Uuid::new_v4().simple());

    let maint = maintenance_pool().await;
    maint
        .execute(format!("CREATE DATABASE {db_name}").as_str())
        .await
        .unwrap_or_else(|e| panic!("failed to create {db_name}: {e}"));
    maint.close().await;

    let url = format!("{}/{db_name}", pg_url().await);
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(30))
        .connect(&url)
        .await
        .unwrap_or_else(|e| panic!("failed to connect to {db_name}: {e}"));

    pool::run_migrations(&pool)
        .await
        .expect("migrations should apply cleanly");

    (pool, db_name)
}

/// Drop a database made by [`create_test_db`], kicking off any stragglers.
pub async fn drop_test_db(db_name: &str) {
    let maint = maintenance_pool().await;
    let terminate = format!(
        "SELECT pg_terminate_backend(pid) FROM pg_stat_activity \
         WHERE datname = '{db_name}' AND pid <> pg_backend_pid()"
    );
    let _ = maint.execute(terminate.as_str()).await;
    let _ = maint
        .execute(format!("DROP DATABASE IF EXISTS {db_name}").as_str())
        .await;
    maint.close().await;
}
