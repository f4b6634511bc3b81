mod app;
mod artifact_engine;
mod artifacts;
mod classifier;
mod config;
mod engine;
mod error;
mod render;
mod session;
mod types;
mod vectorizer;
mod view;

use axum::routing::get;
use axum_prometheus::PrometheusMetricLayer;
use clap::Parser;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use app::AppState;
use artifact_engine::ArtifactEngine;
use artifacts::Artifacts;
use config::{Config, SessionConfig};
use session::{SessionStore, SessionSweeper};
use view::ClassificationView;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,spam_detector=debug".into()),
        )
        .init();

    let config = Config::parse();
    tracing::info!("Starting spam detector with config: {:?}", config);

    // Artifacts are loaded exactly once; any failure aborts startup.
    tracing::info!("Loading artifacts...");
    let artifacts = Arc::new(Artifacts::load(&config.vectorizer_path, &config.model_path)?);
    tracing::info!(
        dimension = artifacts.vectorizer.dimension(),
        "Artifacts loaded successfully"
    );

    let session_config = SessionConfig::from(&config);
    let sessions = Arc::new(SessionStore::new(session_config.ttl));

    let sweeper = SessionSweeper::new(sessions.clone(), session_config.clone());
    tokio::spawn(async move {
        tracing::info!("Starting session sweeper");
        sweeper.run_forever().await;
    });

    let engine = Arc::new(ArtifactEngine::new(artifacts));
    let view = ClassificationView::new(engine, sessions, config.variant);

    let (prometheus_layer, metric_handle) = PrometheusMetricLayer::pair();

    let app = app::router(AppState::new(view))
        .route("/metrics", get(|| async move { metric_handle.render() }))
        .layer(prometheus_layer)
        .layer(TraceLayer::new_for_http());

    let listener = TcpListener::bind(&config.server_address()).await?;
    tracing::info!("Server running on http://{}", config.server_address());
    tracing::info!(
        "Variant: {:?}, session TTL: {:?}",
        config.variant,
        session_config.ttl
    );

    axum::serve(listener, app).await?;
    Ok(())
}
