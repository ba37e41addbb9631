//! Booking ledger record.

use chrono::{DateTime, Utc};
use saga_common::{BoardingPass, BookingId, PaymentDetails, TransactionResult, TransactionStatus};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SagaError};
use crate::state::BookingStatus;

/// One entry of a booking's audit trail.
///
/// Steps are appended in the exact order the collaborator calls were made
/// and are never modified afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub service: String,
    pub operation: String,
    pub status: TransactionStatus,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Step {
    /// Records a collaborator's successful answer.
    ///
    /// Uses the collaborator's timestamp when it supplied one.
    pub fn from_result(service: &str, operation: &str, result: &TransactionResult) -> Self {
        Self {
            service: service.to_string(),
            operation: operation.to_string(),
            status: result.status,
            timestamp: result.timestamp.unwrap_or_else(Utc::now),
            message: None,
        }
    }

    /// Records a rejected forward operation.
    pub fn failed(service: &str, operation: &str, message: impl Into<String>) -> Self {
        Self {
            service: service.to_string(),
            operation: operation.to_string(),
            status: TransactionStatus::Failed,
            timestamp: Utc::now(),
            message: Some(message.into()),
        }
    }
}

/// A request to book a seat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewBooking {
    pub passenger_name: String,
    pub flight_number: String,
    pub seat_number: String,
    pub payment_details: PaymentDetails,
}

/// A booking and its saga progress.
///
/// Owned and mutated by the orchestrator through a [`BookingStore`];
/// callers only ever see cloned snapshots.
///
/// [`BookingStore`]: crate::ledger::BookingStore
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    booking_id: BookingId,
    status: BookingStatus,
    passenger_name: String,
    flight_number: String,
    seat_number: String,
    steps: Vec<Step>,
    boarding_pass: Option<BoardingPass>,
    failure_reason: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Booking {
    /// Creates a pending booking with an empty step log.
    pub fn new(
        booking_id: BookingId,
        passenger_name: impl Into<String>,
        flight_number: impl Into<String>,
        seat_number: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            booking_id,
            status: BookingStatus::Pending,
            passenger_name: passenger_name.into(),
            flight_number: flight_number.into(),
            seat_number: seat_number.into(),
            steps: Vec::new(),
            boarding_pass: None,
            failure_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Creates a pending booking from a request.
    pub fn from_request(booking_id: BookingId, request: &NewBooking) -> Self {
        Self::new(
            booking_id,
            request.passenger_name.clone(),
            request.flight_number.clone(),
            request.seat_number.clone(),
        )
    }

    /// Appends a step to the audit trail.
    pub fn record_step(&mut self, step: Step) {
        self.steps.push(step);
        self.touch();
    }

    /// Stores the issued boarding pass.
    pub fn attach_boarding_pass(&mut self, boarding_pass: BoardingPass) {
        self.boarding_pass = Some(boarding_pass);
        self.touch();
    }

    /// Moves the booking to `next`, rejecting non-monotonic transitions.
    pub fn transition(&mut self, next: BookingStatus, reason: Option<String>) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(SagaError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        if reason.is_some() {
            self.failure_reason = reason;
        }
        self.touch();
        Ok(())
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

// Query methods
impl Booking {
    pub fn id(&self) -> BookingId {
        self.booking_id
    }

    pub fn status(&self) -> BookingStatus {
        self.status
    }

    pub fn passenger_name(&self) -> &str {
        &self.passenger_name
    }

    pub fn flight_number(&self) -> &str {
        &self.flight_number
    }

    pub fn seat_number(&self) -> &str {
        &self.seat_number
    }

    /// Returns the step log in execution order.
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Returns the operation names of the step log.
    pub fn step_names(&self) -> Vec<String> {
        self.steps.iter().map(|s| s.operation.clone()).collect()
    }

    pub fn boarding_pass(&self) -> Option<&BoardingPass> {
        self.boarding_pass.as_ref()
    }

    /// Returns the reason the booking failed, if any.
    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}
