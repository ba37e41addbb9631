//! Booking endpoints: start, inspect and cancel booking sagas.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use booking_saga::{Booking, BookingStatus, NewBooking, SagaOrchestrator, Step};
use metrics_exporter_prometheus::PrometheusHandle;
use saga_common::BookingId;
use serde::Serialize;

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: SagaOrchestrator,
    pub metrics: PrometheusHandle,
}

// -- Response types --

#[derive(Debug, Serialize)]
pub struct StartBookingResponse {
    pub booking_id: String,
    pub status: BookingStatus,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct CancellationResponse {
    pub booking_id: String,
    pub status: BookingStatus,
    pub message: String,
    pub compensation_steps: Vec<Step>,
}

// -- Handlers --

/// POST /api/bookings/start — record a booking and run its saga in the background.
#[tracing::instrument(skip(state, req))]
pub async fn start(
    State(state): State<Arc<AppState>>,
    Json(req): Json<NewBooking>,
) -> Result<(StatusCode, Json<StartBookingResponse>), ApiError> {
    validate(&req)?;

    let booking = state.orchestrator.start_booking(req).await?;

    let response = StartBookingResponse {
        booking_id: booking.id().to_string(),
        status: booking.status(),
        message: "Booking process started".to_string(),
    };

    Ok((StatusCode::ACCEPTED, Json(response)))
}

/// GET /api/bookings — list every booking, oldest first.
#[tracing::instrument(skip(state))]
pub async fn list(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Booking>>, ApiError> {
    Ok(Json(state.orchestrator.list_bookings().await?))
}

/// GET /api/bookings/:id — current snapshot of one booking.
#[tracing::instrument(skip(state))]
pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Booking>, ApiError> {
    let booking_id = parse_booking_id(&id)?;
    Ok(Json(state.orchestrator.get_booking(booking_id).await?))
}

/// POST /api/bookings/:id/cancel — cancel a booking and compensate in the background.
#[tracing::instrument(skip(state))]
pub async fn cancel(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<CancellationResponse>, ApiError> {
    let booking_id = parse_booking_id(&id)?;
    let outcome = state.orchestrator.cancel_booking(booking_id).await?;

    let (message, compensation_steps) = if outcome.already_cancelled {
        ("Booking already cancelled", outcome.booking.steps().to_vec())
    } else {
        ("Booking cancellation started", Vec::new())
    };

    Ok(Json(CancellationResponse {
        booking_id: booking_id.to_string(),
        status: outcome.booking.status(),
        message: message.to_string(),
        compensation_steps,
    }))
}

fn validate(req: &NewBooking) -> Result<(), ApiError> {
    let required = [
        ("passenger_name", &req.passenger_name),
        ("flight_number", &req.flight_number),
        ("seat_number", &req.seat_number),
    ];
    if let Some((field, _)) = required.iter().find(|(_, value)| value.trim().is_empty()) {
        return Err(ApiError::BadRequest(format!("{field} must not be empty")));
    }

    let payment = &req.payment_details;
    if !payment.amount.is_finite() || payment.amount <= 0.0 {
        return Err(ApiError::BadRequest(
            "payment amount must be positive".to_string(),
        ));
    }
    if payment.currency.len() != 3 || !payment.currency.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(ApiError::BadRequest(format!(
            "invalid currency code: {:?}",
            payment.currency
        )));
    }
    Ok(())
}

fn parse_booking_id(id: &str) -> Result<BookingId, ApiError> {
    id.parse()
        .map_err(|e| ApiError::BadRequest(format!("Invalid ID format: {e}")))
}
