//! Collaborator contracts consumed by saga commands, with HTTP clients and
//! in-memory implementations.

pub mod allocation;
pub mod http;
pub mod payment;
pub mod seat;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

pub use allocation::{AllocationService, InMemoryAllocationService};
pub use http::{HttpAllocationClient, HttpPaymentClient, HttpSeatClient};
pub use payment::{InMemoryPaymentService, PAYMENT_LIMIT, PaymentService};
pub use seat::{InMemorySeatService, SeatService, SeatStatus};

use crate::error::ServiceError;

/// The three collaborators a booking saga talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub seat: Arc<dyn SeatService>,
    pub payment: Arc<dyn PaymentService>,
    pub allocation: Arc<dyn AllocationService>,
}

impl Collaborators {
    /// Bundles the three collaborator implementations.
    pub fn new(
        seat: Arc<dyn SeatService>,
        payment: Arc<dyn PaymentService>,
        allocation: Arc<dyn AllocationService>,
    ) -> Self {
        Self {
            seat,
            payment,
            allocation,
        }
    }

    /// In-memory collaborators seeded with the sample flights.
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(InMemorySeatService::with_sample_flights()),
            Arc::new(InMemoryPaymentService::new()),
            Arc::new(InMemoryAllocationService::new()),
        )
    }
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}

#[derive(Debug, Default)]
struct FaultState {
    outage: bool,
    latency: Option<Duration>,
}

/// Outage and latency switches shared by the in-memory collaborators.
#[derive(Debug, Clone, Default)]
pub(crate) struct Faults {
    state: Arc<RwLock<FaultState>>,
    calls: Arc<AtomicUsize>,
}

impl Faults {
    pub(crate) fn set_outage(&self, outage: bool) {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .outage = outage;
    }

    pub(crate) fn set_latency(&self, latency: Option<Duration>) {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .latency = latency;
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Counts the call, applies latency, then fails if an outage is set.
    pub(crate) async fn enter(&self, service: &str) -> Result<(), ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let (outage, latency) = {
            let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
            (state.outage, state.latency)
        };
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        if outage {
            return Err(ServiceError::Unavailable {
                reason: format!("{service} is not reachable"),
            });
        }
        Ok(())
    }
}
