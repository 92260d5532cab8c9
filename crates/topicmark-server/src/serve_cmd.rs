//! `topicmark serve`: run the HTTP API until Ctrl-C.

use std::net::SocketAddr;

use anyhow::{Context, Result};

use crate::routes::{AppState, build_router};

pub async fn run_serve(state: AppState, bind: &str, port: u16) -> Result<()> {
    let rag_url = state.rag.base_url().to_owned();
    let app = build_router(state);
    let addr: SocketAddr = format!("{bind}:{port}")
        .parse()
        .with_context(|| format!("invalid bind address {bind}:{port}"))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(rag = %rag_url, "topicmark serve listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    tracing::info!("topicmark serve shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for Ctrl-C; shutting down");
    }
}
