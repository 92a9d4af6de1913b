use std::sync::Arc;

use anyhow::Result;
use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use ksign_core::Pipeline;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::envelope::SignEnvelope;
use crate::error::AppError;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pipeline: Arc<Pipeline>,
    secret: Arc<str>,
}

impl AppState {
    /// Creates state from a pipeline and the configured shared secret.
    pub fn new(pipeline: Arc<Pipeline>, secret: impl Into<String>) -> Self {
        Self {
            pipeline,
            secret: Arc::from(secret.into()),
        }
    }
}

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { Json(serde_json::json!({ "Hello": "World" })) }))
        .route("/healthcheck", get(|| async { (StatusCode::OK, "Ok") }))
        .route("/sign", post(sign_handler))
        .route("/sign/", post(sign_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Binds the configured address and serves until Ctrl-C.
pub async fn run(config: ServerConfig) -> Result<()> {
    let state = AppState::new(Arc::new(config.ksi.pipeline()), config.secret.clone());

    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port)).await?;
    tracing::info!(
        addr = %listener.local_addr()?,
        aggregator = %config.ksi.aggr_url,
        profile = %config.ksi.canonical_profile,
        "ksign-server listening"
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("ksign-server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

async fn sign_handler(State(state): State<AppState>, body: Bytes) -> Result<Response, AppError> {
    let envelope = SignEnvelope::from_slice(&body)?;
    envelope.authenticate(&state.secret)?;
    let document = envelope.into_document()?;

    let pipeline = Arc::clone(&state.pipeline);
    let signed = tokio::task::spawn_blocking(move || pipeline.sign_document(document))
        .await
        .map_err(|err| AppError::Internal(format!("signing task failed: {err}")))??;

    Ok((
        [(header::CONTENT_TYPE, "application/json")],
        signed.envelope_bytes(),
    )
        .into_response())
}
