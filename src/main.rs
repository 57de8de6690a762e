//! PPTX MCP Server
//!
//! Storage and download service for generated PowerPoint presentations using
//! Rust + Actix-Web. Presentations live on local disk, a mounted persistent disk or
//! an S3-compatible bucket, and are served back through stable download links.

use actix_web::{web, App, HttpServer, middleware};
use anyhow::Context;
use std::net::TcpListener;
use std::time::Instant;
use tracing::{info, warn};
use tracing_actix_web::TracingLogger;

mod api;
mod config;
mod storage;

use crate::config::Settings;
use crate::storage::{HealthReporter, PresentationStore, StorageRouter, UrlResolver};

/// Application state shared across all handlers
pub struct AppState {
    pub store: PresentationStore,
    pub health: HealthReporter,
    pub started_at: Instant,
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing subscriber for structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("pptx_mcp_server=info".parse()?)
                .add_directive("actix_web=info".parse()?)
        )
        .json()
        .init();

    // Load configuration; an incomplete storage setup is fatal
    let settings = Settings::load().context("Failed to load configuration")?;
    let storage_config = settings
        .storage_config()
        .context("Invalid storage configuration")?;
    info!(backend = %storage_config.backend.kind(), "Storage configuration loaded");

    let bind_addr = settings.bind_address();
    let listener = TcpListener::bind(&bind_addr)
        .with_context(|| format!("Failed to bind {}", bind_addr))?;
    let bound = listener.local_addr()?;

    info!(
        "Starting PPTX MCP Server v{} on {}",
        env!("CARGO_PKG_VERSION"),
        bound
    );

    let urls = UrlResolver::from_config(&storage_config, bound)?;
    info!(
        base_url = urls.base_url(),
        source = urls.source().as_str(),
        "Download links resolved"
    );

    let router = StorageRouter::from_config(&storage_config).await?;
    let health = HealthReporter::new(router.clone(), settings.health_probe_interval());

    // An unusable backend is reported through /health rather than stopping startup
    let startup = health.probe().await;
    if !startup.healthy {
        warn!(
            reason = startup.reason.as_deref().unwrap_or("unknown"),
            "Starting with unhealthy storage"
        );
    }

    // Create shared application state
    let app_state = web::Data::new(AppState {
        store: PresentationStore::new(router, urls),
        health,
        started_at: Instant::now(),
    });

    let max_upload_bytes = settings.max_upload_bytes;
    let workers = settings.workers.unwrap_or_else(|| num_cpus::get() * 2);

    // Configure and start HTTP server
    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .app_data(web::PayloadConfig::new(max_upload_bytes))
            .wrap(TracingLogger::default())
            .wrap(middleware::Compress::default())
            .wrap(
                middleware::DefaultHeaders::new()
                    .add(("X-Service", "pptx-mcp-server"))
                    .add(("X-Version", env!("CARGO_PKG_VERSION")))
                    .add(("Access-Control-Allow-Origin", "*"))
                    .add(("Access-Control-Allow-Methods", "GET, HEAD, POST, DELETE, OPTIONS"))
                    .add(("Access-Control-Allow-Headers", "Content-Type"))
            )
            // Routes
            .configure(api::configure_routes)
    })
    .workers(workers)
    .listen(listener)?
    .run()
    .await?;

    Ok(())
}
