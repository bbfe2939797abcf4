//! Demo HTTP server protected by the per-client rate limiter.

use axum::{extract::State, middleware, routing::get, Json, Router};
use clap::Parser;
use request_throttle::{rate_limit_middleware, HttpRateLimit, RateLimiter, ServerConfig, Sweeper};
use serde_json::{json, Value};
use std::net::SocketAddr;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ServerConfig::parse();
    let limiter = config.build_limiter()?;
    let sweeper = Sweeper::new(limiter.clone(), config.sweeper_config()?).start();
    let rate_limit = config.http_rate_limit(limiter.clone())?;

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(
        %addr,
        limit = config.rate_limit,
        window_secs = config.rate_limit_window_seconds,
        client_id_header = %config.client_id_header,
        "server listening"
    );

    axum::serve(
        listener,
        app(limiter, rate_limit).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    sweeper.shutdown().await?;
    info!("server stopped");
    Ok(())
}

fn app(limiter: RateLimiter, rate_limit: HttpRateLimit) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/stats", get(stats))
        .layer(middleware::from_fn_with_state(rate_limit, rate_limit_middleware))
        .with_state(limiter)
}

async fn root() -> Json<Value> {
    Json(json!({ "message": "hello" }))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn stats(State(limiter): State<RateLimiter>) -> Json<Value> {
    let snapshot = limiter.metrics().snapshot();
    Json(json!({
        "clients": limiter.client_count(),
        "requests_admitted": snapshot.requests_admitted,
        "requests_rejected": snapshot.requests_rejected,
        "rejection_rate": snapshot.rejection_rate(),
        "clients_evicted": snapshot.clients_evicted,
        "clients_swept": snapshot.clients_swept,
    }))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
