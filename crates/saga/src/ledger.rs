//! Booking ledger storage.
//!
//! The ledger is the only state shared between concurrently running sagas.
//! Every mutation of a booking is atomic with respect to readers of the same
//! booking; different bookings never wait on each other beyond the short
//! map lookup.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use saga_common::{BoardingPass, BookingId};
use tokio::sync::RwLock;

use crate::booking::{Booking, Step};
use crate::error::{Result, SagaError};
use crate::state::BookingStatus;

/// Repository for booking records.
///
/// All implementations must be thread-safe (Send + Sync). Reads return
/// snapshots; there is no read locking across calls.
#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Inserts a new booking. Fails if the ID is already taken.
    async fn insert(&self, booking: Booking) -> Result<()>;

    /// Returns a snapshot of the booking, or `NotFound`.
    async fn get(&self, booking_id: BookingId) -> Result<Booking>;

    /// Returns snapshots of all bookings, oldest first.
    async fn list(&self) -> Result<Vec<Booking>>;

    /// Appends a step to the booking's log.
    async fn append_step(&self, booking_id: BookingId, step: Step) -> Result<()>;

    /// Stores the boarding pass issued for the booking.
    async fn set_boarding_pass(
        &self,
        booking_id: BookingId,
        boarding_pass: BoardingPass,
    ) -> Result<()>;

    /// Atomically moves the booking to `next` and returns the new snapshot.
    ///
    /// Fails with `InvalidTransition` without touching the booking when the
    /// lifecycle does not allow the move.
    async fn transition(
        &self,
        booking_id: BookingId,
        next: BookingStatus,
        reason: Option<String>,
    ) -> Result<Booking>;
}

/// In-memory booking store.
///
/// Each booking sits behind its own lock; the outer map lock is only held
/// long enough to find the entry.
#[derive(Clone, Default)]
pub struct InMemoryBookingStore {
    bookings: Arc<RwLock<HashMap<BookingId, Arc<RwLock<Booking>>>>>,
}

impl InMemoryBookingStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored bookings.
    pub async fn booking_count(&self) -> usize {
        self.bookings.read().await.len()
    }

    async fn entry(&self, booking_id: BookingId) -> Result<Arc<RwLock<Booking>>> {
        self.bookings
            .read()
            .await
            .get(&booking_id)
            .cloned()
            .ok_or(SagaError::NotFound(booking_id))
    }
}

#[async_trait]
impl BookingStore for InMemoryBookingStore {
    async fn insert(&self, booking: Booking) -> Result<()> {
        let mut bookings = self.bookings.write().await;
        let booking_id = booking.id();
        if bookings.contains_key(&booking_id) {
            return Err(SagaError::InvalidState(format!(
                "booking {booking_id} already exists"
            )));
        }
        bookings.insert(booking_id, Arc::new(RwLock::new(booking)));
        Ok(())
    }

    async fn get(&self, booking_id: BookingId) -> Result<Booking> {
        let entry = self.entry(booking_id).await?;
        let booking = entry.read().await.clone();
        Ok(booking)
    }

    async fn list(&self) -> Result<Vec<Booking>> {
        let entries: Vec<_> = self.bookings.read().await.values().cloned().collect();

        let mut bookings = Vec::with_capacity(entries.len());
        for entry in entries {
            bookings.push(entry.read().await.clone());
        }
        bookings.sort_by_key(|b| (b.created_at(), b.id()));
        Ok(bookings)
    }

    async fn append_step(&self, booking_id: BookingId, step: Step) -> Result<()> {
        let entry = self.entry(booking_id).await?;
        entry.write().await.record_step(step);
        Ok(())
    }

    async fn set_boarding_pass(
        &self,
        booking_id: BookingId,
        boarding_pass: BoardingPass,
    ) -> Result<()> {
        let entry = self.entry(booking_id).await?;
        entry.write().await.attach_boarding_pass(boarding_pass);
        Ok(())
    }

    async fn transition(
        &self,
        booking_id: BookingId,
        next: BookingStatus,
        reason: Option<String>,
    ) -> Result<Booking> {
        let entry = self.entry(booking_id).await?;
        let mut booking = entry.write().await;
        booking.transition(next, reason)?;
        Ok(booking.clone())
    }
}

/// A command's handle on the booking it works for.
///
/// Commands never hold the booking itself, only this handle, so every
/// append goes through the store and is immediately visible to readers.
#[derive(Clone)]
pub struct BookingLedger {
    booking_id: BookingId,
    store: Arc<dyn BookingStore>,
}

impl BookingLedger {
    /// Creates a ledger handle for one booking.
    pub fn new(booking_id: BookingId, store: Arc<dyn BookingStore>) -> Self {
        Self { booking_id, store }
    }

    /// Returns the booking this handle points at.
    pub fn booking_id(&self) -> BookingId {
        self.booking_id
    }

    /// Appends a step to the booking's log.
    pub async fn record(&self, step: Step) -> Result<()> {
        self.store.append_step(self.booking_id, step).await
    }

    /// Stores a boarding pass on the booking.
    pub async fn attach_boarding_pass(&self, boarding_pass: BoardingPass) -> Result<()> {
        self.store
            .set_boarding_pass(self.booking_id, boarding_pass)
            .await
    }

    /// Returns the current snapshot of the booking.
    pub async fn snapshot(&self) -> Result<Booking> {
        self.store.get(self.booking_id).await
    }
}

impl std::fmt::Debug for BookingLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BookingLedger")
            .field("booking_id", &self.booking_id)
            .finish_non_exhaustive()
    }
}
