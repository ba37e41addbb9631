//! Seat service trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use async_trait::async_trait;
use saga_common::{BookingId, TransactionResult, TransactionStatus};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::Faults;
use crate::booking_saga::SEAT_SERVICE;
use crate::error::ServiceError;

/// Trait for seat inventory operations.
#[async_trait]
pub trait SeatService: Send + Sync {
    /// Blocks a seat on a flight for the booking.
    async fn block(
        &self,
        booking_id: BookingId,
        flight_number: &str,
        seat_number: &str,
    ) -> Result<TransactionResult, ServiceError>;

    /// Releases the seat previously blocked for the booking.
    async fn release(&self, booking_id: BookingId) -> Result<TransactionResult, ServiceError>;
}

/// Availability of a single seat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeatStatus {
    Available,
    Blocked,
    Booked,
}

#[derive(Debug, Clone)]
struct Seat {
    seat_number: String,
    status: SeatStatus,
    booking_id: Option<String>,
}

impl Seat {
    fn available(seat_number: &str) -> Self {
        Self {
            seat_number: seat_number.to_string(),
            status: SeatStatus::Available,
            booking_id: None,
        }
    }
}

#[derive(Debug, Default)]
struct InMemorySeatState {
    flights: HashMap<String, Vec<Seat>>,
    blocked: HashMap<BookingId, (String, String)>,
    fail_on_block: bool,
    fail_on_release: bool,
}

/// In-memory seat service.
#[derive(Debug, Clone, Default)]
pub struct InMemorySeatService {
    state: Arc<RwLock<InMemorySeatState>>,
    faults: Faults,
}

const SAMPLE_SEATS: [&str; 6] = ["1A", "1B", "1C", "2A", "2B", "2C"];

impl InMemorySeatService {
    /// Creates a seat service with no flights.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a seat service with flights FL001 and FL002.
    ///
    /// On FL001 seat `1B` is already blocked and `1C` already booked.
    pub fn with_sample_flights() -> Self {
        let service = Self::new();
        service.add_flight("FL001", &SAMPLE_SEATS);
        service.add_flight("FL002", &SAMPLE_SEATS);
        {
            let mut state = service.write();
            if let Some(seats) = state.flights.get_mut("FL001") {
                seats[1].status = SeatStatus::Blocked;
                seats[1].booking_id = Some("demo-booking-1".to_string());
                seats[2].status = SeatStatus::Booked;
                seats[2].booking_id = Some("demo-booking-2".to_string());
            }
        }
        service
    }

    /// Adds (or replaces) a flight whose seats are all available.
    pub fn add_flight(&self, flight_number: &str, seat_numbers: &[&str]) {
        let seats = seat_numbers.iter().map(|s| Seat::available(s)).collect();
        self.write().flights.insert(flight_number.to_string(), seats);
    }

    /// Configures the service to reject every block call.
    pub fn set_fail_on_block(&self, fail: bool) {
        self.write().fail_on_block = fail;
    }

    /// Configures the service to reject every release call.
    pub fn set_fail_on_release(&self, fail: bool) {
        self.write().fail_on_release = fail;
    }

    /// Simulates the service being unreachable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.faults.set_outage(unavailable);
    }

    /// Delays every answer by `latency`.
    pub fn set_latency(&self, latency: Option<Duration>) {
        self.faults.set_latency(latency);
    }

    /// Returns the number of calls received.
    pub fn call_count(&self) -> usize {
        self.faults.call_count()
    }

    /// Returns the number of seats currently blocked by bookings.
    pub fn blocked_count(&self) -> usize {
        self.read().blocked.len()
    }

    /// Returns the status of a seat, if the flight and seat exist.
    pub fn seat_status(&self, flight_number: &str, seat_number: &str) -> Option<SeatStatus> {
        self.read()
            .flights
            .get(flight_number)?
            .iter()
            .find(|s| s.seat_number == seat_number)
            .map(|s| s.status)
    }

    fn read(&self) -> RwLockReadGuard<'_, InMemorySeatState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, InMemorySeatState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl SeatService for InMemorySeatService {
    async fn block(
        &self,
        booking_id: BookingId,
        flight_number: &str,
        seat_number: &str,
    ) -> Result<TransactionResult, ServiceError> {
        self.faults.enter(SEAT_SERVICE).await?;
        let mut state = self.write();

        if state.fail_on_block {
            return Err(ServiceError::rejected(409, "Seat blocking declined"));
        }

        let seat = state
            .flights
            .get_mut(flight_number)
            .ok_or_else(|| ServiceError::rejected(404, format!("Flight {flight_number} not found")))?
            .iter_mut()
            .find(|s| s.seat_number == seat_number)
            .ok_or_else(|| {
                ServiceError::rejected(
                    404,
                    format!("Seat {seat_number} not found on flight {flight_number}"),
                )
            })?;

        if seat.status != SeatStatus::Available {
            return Err(ServiceError::rejected(
                409,
                format!("Seat {seat_number} on flight {flight_number} is not available"),
            ));
        }

        seat.status = SeatStatus::Blocked;
        seat.booking_id = Some(booking_id.to_string());
        state.blocked.insert(
            booking_id,
            (flight_number.to_string(), seat_number.to_string()),
        );

        Ok(TransactionResult::success(
            booking_id.to_string(),
            TransactionStatus::Completed,
            format!("Seat {seat_number} on flight {flight_number} blocked successfully"),
        )
        .with_data("flight_number", json!(flight_number))
        .with_data("seat_number", json!(seat_number)))
    }

    async fn release(&self, booking_id: BookingId) -> Result<TransactionResult, ServiceError> {
        self.faults.enter(SEAT_SERVICE).await?;
        let mut state = self.write();

        if state.fail_on_release {
            return Err(ServiceError::rejected(500, "Seat release failed"));
        }

        let (flight_number, seat_number) = state.blocked.remove(&booking_id).ok_or_else(|| {
            ServiceError::rejected(404, format!("No blocked seat found for booking {booking_id}"))
        })?;

        if let Some(seat) = state
            .flights
            .get_mut(&flight_number)
            .and_then(|seats| seats.iter_mut().find(|s| s.seat_number == seat_number))
        {
            seat.status = SeatStatus::Available;
            seat.booking_id = None;
        }

        Ok(TransactionResult::success(
            booking_id.to_string(),
            TransactionStatus::Released,
            format!("Seat {seat_number} on flight {flight_number} released successfully"),
        )
        .with_data("flight_number", json!(flight_number))
        .with_data("seat_number", json!(seat_number)))
    }
}
