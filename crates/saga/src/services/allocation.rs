//! Allocation service trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use saga_common::{BoardingPass, BookingId, TransactionResult, TransactionStatus};
use serde_json::json;

use super::Faults;
use crate::booking_saga::ALLOCATION_SERVICE;
use crate::error::ServiceError;

/// Gate shown on boarding passes for flights without an assignment.
pub const GATE_TBD: &str = "Gate TBD";

const BOARDING_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Trait for final seat allocation operations.
#[async_trait]
pub trait AllocationService: Send + Sync {
    /// Allocates the seat and issues a boarding pass in `data.boarding_pass`.
    async fn allocate(
        &self,
        booking_id: BookingId,
        flight_number: &str,
        seat_number: &str,
        passenger_name: &str,
    ) -> Result<TransactionResult, ServiceError>;

    /// Cancels the allocation made for a booking.
    async fn cancel(&self, booking_id: BookingId) -> Result<TransactionResult, ServiceError>;
}

#[derive(Debug, Clone)]
struct AllocationRecord {
    allocation_id: String,
    boarding_pass: BoardingPass,
    cancelled: bool,
}

#[derive(Debug)]
struct InMemoryAllocationState {
    allocations: HashMap<BookingId, AllocationRecord>,
    gates: HashMap<String, String>,
    boarding_times: HashMap<String, DateTime<Utc>>,
    next_id: u32,
    fail_on_allocate: bool,
    fail_on_cancel: bool,
}

impl Default for InMemoryAllocationState {
    fn default() -> Self {
        let now = Utc::now();
        let schedule = [("FL001", "B12", 2), ("FL002", "C05", 3), ("FL003", "A22", 4)];

        let mut gates = HashMap::new();
        let mut boarding_times = HashMap::new();
        for (flight, gate, hours) in schedule {
            gates.insert(flight.to_string(), gate.to_string());
            boarding_times.insert(flight.to_string(), now + TimeDelta::hours(hours));
        }

        Self {
            allocations: HashMap::new(),
            gates,
            boarding_times,
            next_id: 0,
            fail_on_allocate: false,
            fail_on_cancel: false,
        }
    }
}

/// In-memory allocation service with a fixed gate schedule.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAllocationService {
    state: Arc<RwLock<InMemoryAllocationState>>,
    faults: Faults,
}

impl InMemoryAllocationService {
    /// Creates a new in-memory allocation service.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the service to reject every allocation.
    pub fn set_fail_on_allocate(&self, fail: bool) {
        self.write().fail_on_allocate = fail;
    }

    /// Configures the service to reject every cancellation.
    pub fn set_fail_on_cancel(&self, fail: bool) {
        self.write().fail_on_cancel = fail;
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

    /// Returns the number of active (not cancelled) allocations.
    pub fn allocation_count(&self) -> usize {
        self.read()
            .allocations
            .values()
            .filter(|a| !a.cancelled)
            .count()
    }

    fn read(&self) -> RwLockReadGuard<'_, InMemoryAllocationState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, InMemoryAllocationState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn boarding_pass_json(boarding_pass: &BoardingPass) -> serde_json::Value {
    serde_json::to_value(boarding_pass).unwrap_or_default()
}

#[async_trait]
impl AllocationService for InMemoryAllocationService {
    async fn allocate(
        &self,
        booking_id: BookingId,
        flight_number: &str,
        seat_number: &str,
        passenger_name: &str,
    ) -> Result<TransactionResult, ServiceError> {
        self.faults.enter(ALLOCATION_SERVICE).await?;
        let mut state = self.write();

        if let Some(existing) = state.allocations.get(&booking_id).filter(|a| !a.cancelled) {
            return Ok(TransactionResult::success(
                booking_id.to_string(),
                TransactionStatus::Completed,
                "Seat already allocated",
            )
            .with_data("allocation_id", json!(existing.allocation_id))
            .with_data("boarding_pass", boarding_pass_json(&existing.boarding_pass)));
        }

        if state.fail_on_allocate {
            return Err(ServiceError::rejected(400, "Seat allocation failed"));
        }

        let gate = state
            .gates
            .get(flight_number)
            .cloned()
            .unwrap_or_else(|| GATE_TBD.to_string());
        let boarding_time = state
            .boarding_times
            .get(flight_number)
            .copied()
            .unwrap_or_else(Utc::now)
            .format(BOARDING_TIME_FORMAT)
            .to_string();

        let boarding_pass = BoardingPass {
            passenger: passenger_name.to_string(),
            flight: flight_number.to_string(),
            seat: seat_number.to_string(),
            gate,
            boarding_time,
        };

        state.next_id += 1;
        let allocation_id = format!("alloc_{:04}", state.next_id);
        state.allocations.insert(
            booking_id,
            AllocationRecord {
                allocation_id: allocation_id.clone(),
                boarding_pass: boarding_pass.clone(),
                cancelled: false,
            },
        );

        Ok(TransactionResult::success(
            booking_id.to_string(),
            TransactionStatus::Completed,
            format!("Seat {seat_number} allocated to {passenger_name} on flight {flight_number}"),
        )
        .with_data("allocation_id", json!(allocation_id))
        .with_data("boarding_pass", boarding_pass_json(&boarding_pass)))
    }

    async fn cancel(&self, booking_id: BookingId) -> Result<TransactionResult, ServiceError> {
        self.faults.enter(ALLOCATION_SERVICE).await?;
        let mut state = self.write();

        if state.fail_on_cancel {
            return Err(ServiceError::rejected(500, "Allocation cancellation failed"));
        }

        let record = state.allocations.get_mut(&booking_id).ok_or_else(|| {
            ServiceError::rejected(404, format!("No allocation found for booking {booking_id}"))
        })?;

        let message = if record.cancelled {
            "Allocation already cancelled"
        } else {
            record.cancelled = true;
            "Allocation cancelled successfully"
        };

        Ok(TransactionResult::success(
            booking_id.to_string(),
            TransactionStatus::Released,
            message,
        )
        .with_data("allocation_id", json!(record.allocation_id)))
    }
}
