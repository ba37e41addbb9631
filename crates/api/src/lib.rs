//! HTTP API server with observability for the booking saga orchestrator.
//!
//! Provides REST endpoints to start, inspect and cancel flight bookings,
//! with structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use booking_saga::{
    Collaborators, CommandRegistry, HttpAllocationClient, HttpPaymentClient, HttpSeatClient,
    InMemoryBookingStore, SagaConfig, SagaOrchestrator,
};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::{CollaboratorMode, Config};
use error::StartupError;
use routes::bookings::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(routes::health::check))
        .route("/metrics", get(routes::metrics::get))
        .route("/api/bookings", get(routes::bookings::list))
        .route("/api/bookings/start", post(routes::bookings::start))
        .route("/api/bookings/{id}", get(routes::bookings::get))
        .route("/api/bookings/{id}/cancel", post(routes::bookings::cancel))
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates application state backed by in-memory collaborators and the
/// default pipeline.
pub fn create_default_state(metrics: PrometheusHandle) -> Result<Arc<AppState>, StartupError> {
    let orchestrator = build_orchestrator(Collaborators::in_memory(), SagaConfig::default())?;
    Ok(Arc::new(AppState {
        orchestrator,
        metrics,
    }))
}

/// Creates application state from the loaded configuration.
pub fn create_state(
    config: &Config,
    metrics: PrometheusHandle,
) -> Result<Arc<AppState>, StartupError> {
    let collaborators = match config.collaborators {
        CollaboratorMode::Http => Collaborators::new(
            Arc::new(HttpSeatClient::new(
                config.seat_service_url.as_str(),
                config.service_timeout,
            )?),
            Arc::new(HttpPaymentClient::new(
                config.payment_service_url.as_str(),
                config.service_timeout,
            )?),
            Arc::new(HttpAllocationClient::new(
                config.allocation_service_url.as_str(),
                config.service_timeout,
            )?),
        ),
        CollaboratorMode::InMemory => Collaborators::in_memory(),
    };
    tracing::info!(
        mode = ?config.collaborators,
        steps = ?config.steps,
        timeout_ms = config.service_timeout.as_millis() as u64,
        "configuring saga orchestrator"
    );

    let orchestrator = build_orchestrator(collaborators, config.saga_config())?;
    Ok(Arc::new(AppState {
        orchestrator,
        metrics,
    }))
}

fn build_orchestrator(
    collaborators: Collaborators,
    config: SagaConfig,
) -> Result<SagaOrchestrator, StartupError> {
    Ok(SagaOrchestrator::new(
        Arc::new(InMemoryBookingStore::new()),
        collaborators,
        CommandRegistry::with_defaults(),
        config,
    )?)
}
