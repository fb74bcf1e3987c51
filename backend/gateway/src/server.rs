//! Main HTTP gateway server.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, instrument};

use pantry_config::ServerConfig;
use pantry_pipeline::ReceiptPipeline;

use crate::health_api;
use crate::planning;
use crate::uploads;

/// Room for multipart boundaries and headers on top of the file itself.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Application state shared across routes.
#[derive(Clone)]
pub struct GatewayState {
    pub pipeline: Arc<ReceiptPipeline>,
    pub max_upload_bytes: usize,
}

impl GatewayState {
    pub fn new(pipeline: Arc<ReceiptPipeline>, server: &ServerConfig) -> Self {
        Self {
            pipeline,
            max_upload_bytes: server.max_upload_bytes,
        }
    }
}

/// Build the router with every route and layer.
pub fn build_router(state: GatewayState, cors_permissive: bool) -> Router {
    let body_limit = state.max_upload_bytes.saturating_add(MULTIPART_OVERHEAD_BYTES);

    let api = Router::new()
        .route("/receipts/upload", post(uploads::upload_receipt))
        .route("/planning/suggestions", post(planning::meal_suggestions))
        .route("/integrations/health", get(health_api::integrations_health))
        .layer(DefaultBodyLimit::max(body_limit));

    let app = Router::new()
        .route("/", get(health_api::root))
        .route("/health", get(health_api::health))
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    if cors_permissive {
        app.layer(CorsLayer::permissive())
    } else {
        app
    }
}

/// Bind and serve until ctrl-c.
#[instrument(skip_all, fields(addr = %addr))]
pub async fn start_server(addr: SocketAddr, state: GatewayState, cors_permissive: bool) -> Result<()> {
    let app = build_router(state, cors_permissive);

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Gateway HTTP server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Gateway server failed")?;

    info!("Gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received");
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    use pantry_core::{TextCompleter, TextExtractor};
    use pantry_pipeline::{PipelineOptions, RetryPolicy};

    /// Serve the router on an ephemeral port and return its base URL.
    pub async fn spawn_gateway(
        extractor: Arc<dyn TextExtractor>,
        completer: Arc<dyn TextCompleter>,
        max_upload_bytes: usize,
    ) -> String {
        let options = PipelineOptions {
            retry: RetryPolicy::none(),
            ..Default::default()
        };
        let pipeline = Arc::new(ReceiptPipeline::new(extractor, completer, options));
        let state = GatewayState {
            pipeline,
            max_upload_bytes,
        };

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, build_router(state, true)).await.unwrap();
        });
        format!("http://{addr}")
    }
}
