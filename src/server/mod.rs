use crate::config::Config;
use crate::metrics::MetricsLedger;
use crate::providers::{create_provider, MediaProvider};
use anyhow::{Context, Result};
use axum::{
    http::{header, Method},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod error;
pub mod routes_metrics;
pub mod routes_providers;

/// Shared application context
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<Config>,
    pub metrics: Arc<MetricsLedger>,
    /// Enabled provider clients keyed by instance name.
    pub providers: Arc<HashMap<String, Arc<dyn MediaProvider>>>,
}

impl AppContext {
    pub fn new(config: Config) -> Result<Self> {
        let metrics = Arc::new(MetricsLedger::new());
        let mut providers = HashMap::new();
        for entry in config.providers.iter().filter(|p| p.enabled) {
            providers.insert(entry.name.clone(), create_provider(entry, metrics.clone())?);
        }

        Ok(Self {
            config: Arc::new(config),
            metrics,
            providers: Arc::new(providers),
        })
    }
}

/// Create the Axum router with all routes
pub fn create_router(ctx: AppContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/health", get(health))
        .nest(
            "/api",
            routes_metrics::metrics_routes().merge(routes_providers::provider_routes()),
        )
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Bind and serve until the process is stopped.
pub async fn start_server(config: Config) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    let ctx = AppContext::new(config)?;
    tracing::info!(
        providers = ctx.providers.len(),
        "Starting medley server on {}",
        addr
    );

    let app = create_router(ctx);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind server address")?;
    axum::serve(listener, app).await.context("Server error")
}
