//! Saga orchestrator for flight bookings.
//!
//! Two pipelines touch a booking:
//!
//! - the forward pipeline runs the configured commands in order and, when a
//!   step fails, undoes the completed ones in reverse order;
//! - the cancellation pipeline, triggered by an explicit cancel, always
//!   attempts allocation cancel, refund and seat release, ignoring
//!   individual failures.
//!
//! Both hold the booking's lock while they talk to collaborators, so they
//! never interleave. The forward pipeline re-reads the status before every
//! step and stops as soon as the booking is cancelled; the cancellation
//! pipeline then runs on a quiescent booking.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::Instant;

use saga_common::{BookingId, PaymentDetails};
use tokio::sync::Mutex;
use tokio::task::JoinSet;

use crate::booking::{Booking, NewBooking};
use crate::booking_saga::{CANCELLATION_ORDER, SAGA_TYPE};
use crate::commands::{Command, CommandArgs, CommandFactory, CommandRegistry};
use crate::config::SagaConfig;
use crate::error::{Result, SagaError};
use crate::ledger::{BookingLedger, BookingStore};
use crate::services::Collaborators;
use crate::state::BookingStatus;

/// Result of a cancel request.
#[derive(Debug, Clone, PartialEq)]
pub struct CancellationOutcome {
    /// Snapshot taken right after the status change.
    pub booking: Booking,
    /// True when the booking was already cancelled and nothing was started.
    pub already_cancelled: bool,
}

struct Inner {
    store: Arc<dyn BookingStore>,
    collaborators: Collaborators,
    factory: CommandFactory,
    config: SagaConfig,
    locks: StdMutex<HashMap<BookingId, Arc<Mutex<()>>>>,
    tasks: StdMutex<JoinSet<()>>,
}

/// Drives booking sagas against the configured collaborators.
///
/// Cheap to clone; all clones share the same ledger and background tasks.
#[derive(Clone)]
pub struct SagaOrchestrator {
    inner: Arc<Inner>,
}

impl SagaOrchestrator {
    /// Creates an orchestrator.
    ///
    /// Fails with `InvalidCommand` if `config.steps` names a step the
    /// registry does not know.
    pub fn new(
        store: Arc<dyn BookingStore>,
        collaborators: Collaborators,
        registry: CommandRegistry,
        config: SagaConfig,
    ) -> Result<Self> {
        let factory = CommandFactory::new(registry, &config.steps)?;
        Ok(Self {
            inner: Arc::new(Inner {
                store,
                collaborators,
                factory,
                config,
                locks: StdMutex::new(HashMap::new()),
                tasks: StdMutex::new(JoinSet::new()),
            }),
        })
    }

    pub fn config(&self) -> &SagaConfig {
        &self.inner.config
    }

    /// Records a new PENDING booking and runs its forward pipeline in the
    /// background. Returns the initial snapshot.
    #[tracing::instrument(
        skip(self, request),
        fields(saga_type = SAGA_TYPE, flight = %request.flight_number, seat = %request.seat_number)
    )]
    pub async fn start_booking(&self, request: NewBooking) -> Result<Booking> {
        let booking = Booking::from_request(BookingId::new(), &request);
        let booking_id = booking.id();
        self.inner.store.insert(booking.clone()).await?;
        tracing::info!(%booking_id, "booking created");

        let orchestrator = self.clone();
        let payment = request.payment_details;
        self.spawn(async move {
            match orchestrator.process_booking(booking_id, payment).await {
                Ok(booking) => {
                    tracing::info!(%booking_id, status = %booking.status(), "forward pipeline finished");
                }
                Err(SagaError::InvalidState(reason)) => {
                    tracing::info!(%booking_id, %reason, "forward pipeline skipped");
                }
                Err(err) => {
                    tracing::warn!(%booking_id, error = %err, "booking saga failed");
                }
            }
        });

        Ok(booking)
    }

    /// Runs the forward pipeline for a PENDING booking and waits for it.
    ///
    /// On a step failure the completed steps are undone in reverse order, the
    /// booking is marked FAILED and the original error is returned.
    #[tracing::instrument(skip(self, payment), fields(saga_type = SAGA_TYPE))]
    pub async fn process_booking(
        &self,
        booking_id: BookingId,
        payment: PaymentDetails,
    ) -> Result<Booking> {
        let lock = self.booking_lock(booking_id);
        let _guard = lock.try_lock().map_err(|_| {
            SagaError::InvalidState(format!("booking {booking_id} already has a pipeline running"))
        })?;

        let booking = self.inner.store.get(booking_id).await?;
        if booking.status() != BookingStatus::Pending {
            return Err(SagaError::InvalidState(format!(
                "booking {booking_id} is {}, expected PENDING",
                booking.status()
            )));
        }

        metrics::counter!("booking_sagas_started_total").increment(1);
        let started = Instant::now();

        let args = self.command_args(&booking, Some(payment));
        let commands = self.inner.factory.commands(&args)?;
        let outcome = self.run_forward(booking_id, &commands).await;

        metrics::histogram!("booking_saga_duration_seconds")
            .record(started.elapsed().as_secs_f64());
        outcome
    }

    async fn run_forward(
        &self,
        booking_id: BookingId,
        commands: &[Box<dyn Command>],
    ) -> Result<Booking> {
        let mut completed: Vec<&dyn Command> = Vec::with_capacity(commands.len());

        for command in commands {
            let snapshot = self.inner.store.get(booking_id).await?;
            if snapshot.status() == BookingStatus::Cancelled {
                tracing::info!(%booking_id, step = command.name(), "booking cancelled, forward pipeline stopped");
                return Ok(snapshot);
            }

            tracing::info!(%booking_id, step = command.name(), "saga step started");
            if let Err(err) = command.execute().await {
                return self.fail(booking_id, err, &completed).await;
            }
            tracing::info!(%booking_id, step = command.name(), "saga step completed");
            completed.push(command.as_ref());
        }

        match self
            .inner
            .store
            .transition(booking_id, BookingStatus::Completed, None)
            .await
        {
            Ok(booking) => {
                metrics::counter!("booking_sagas_completed_total").increment(1);
                tracing::info!(%booking_id, "booking saga completed");
                Ok(booking)
            }
            Err(SagaError::InvalidTransition {
                from: BookingStatus::Cancelled,
                ..
            }) => {
                tracing::info!(%booking_id, "booking cancelled before completion");
                self.inner.store.get(booking_id).await
            }
            Err(err) => Err(err),
        }
    }

    /// Unwinds the completed steps (when the failure warrants it) and marks
    /// the booking FAILED. Always returns `err`.
    async fn fail(
        &self,
        booking_id: BookingId,
        err: SagaError,
        completed: &[&dyn Command],
    ) -> Result<Booking> {
        let mut reason = err.to_string();
        let compensate = err.is_step_failure()
            || (err.is_transport() && self.inner.config.compensate_on_transport_failure);

        let cancelled =
            self.inner.store.get(booking_id).await?.status() == BookingStatus::Cancelled;

        if cancelled {
            tracing::info!(%booking_id, error = %err, "step failed after cancellation, unwinding left to cancellation");
        } else if compensate {
            tracing::warn!(
                %booking_id,
                error = %err,
                completed = completed.len(),
                "compensating completed steps"
            );
            for command in completed.iter().rev() {
                metrics::counter!("booking_compensations_total").increment(1);
                if let Err(undo_err) = command.undo().await {
                    tracing::error!(
                        %booking_id,
                        step = command.name(),
                        error = %undo_err,
                        "compensation failed, unwinding halted"
                    );
                    reason = format!("{reason}; {undo_err}");
                    break;
                }
            }
        } else {
            tracing::warn!(%booking_id, error = %err, "transport failure, completed steps left in place");
        }

        match self
            .inner
            .store
            .transition(booking_id, BookingStatus::Failed, Some(reason))
            .await
        {
            Ok(_) => {
                metrics::counter!("booking_sagas_failed_total").increment(1);
            }
            Err(SagaError::InvalidTransition {
                from: BookingStatus::Cancelled,
                ..
            }) => {}
            Err(transition_err) => return Err(transition_err),
        }

        Err(err)
    }

    /// Cancels a booking.
    ///
    /// The status becomes CANCELLED before this returns; the compensating
    /// calls run in the background. Cancelling an already cancelled booking
    /// returns its snapshot and starts nothing. A FAILED booking cannot be
    /// cancelled.
    #[tracing::instrument(skip(self))]
    pub async fn cancel_booking(&self, booking_id: BookingId) -> Result<CancellationOutcome> {
        let booking = self.inner.store.get(booking_id).await?;
        if booking.status() == BookingStatus::Cancelled {
            return Ok(CancellationOutcome {
                booking,
                already_cancelled: true,
            });
        }
        if !booking.status().can_cancel() {
            return Err(SagaError::InvalidTransition {
                from: booking.status(),
                to: BookingStatus::Cancelled,
            });
        }

        let booking = match self
            .inner
            .store
            .transition(booking_id, BookingStatus::Cancelled, None)
            .await
        {
            Ok(booking) => booking,
            Err(SagaError::InvalidTransition {
                from: BookingStatus::Cancelled,
                ..
            }) => {
                return Ok(CancellationOutcome {
                    booking: self.inner.store.get(booking_id).await?,
                    already_cancelled: true,
                });
            }
            Err(err) => return Err(err),
        };

        metrics::counter!("booking_cancellations_total").increment(1);
        tracing::info!(%booking_id, "booking cancelled, compensation scheduled");

        let orchestrator = self.clone();
        self.spawn(async move {
            if let Err(err) = orchestrator.compensate_cancelled(booking_id).await {
                tracing::error!(%booking_id, error = %err, "cancellation pipeline aborted");
            }
        });

        Ok(CancellationOutcome {
            booking,
            already_cancelled: false,
        })
    }

    /// Runs the cancellation pipeline for a CANCELLED booking and waits for it.
    ///
    /// Every compensating call is attempted; failures are logged and skipped.
    #[tracing::instrument(skip(self))]
    pub async fn compensate_cancelled(&self, booking_id: BookingId) -> Result<Booking> {
        let lock = self.booking_lock(booking_id);
        let _guard = lock.lock().await;

        let booking = self.inner.store.get(booking_id).await?;
        if booking.status() != BookingStatus::Cancelled {
            return Err(SagaError::InvalidState(format!(
                "booking {booking_id} is {}, expected CANCELLED",
                booking.status()
            )));
        }

        let args = self.command_args(&booking, None);
        for step in CANCELLATION_ORDER {
            let command = match self.inner.factory.command(step, &args) {
                Ok(command) => command,
                Err(err) => {
                    tracing::warn!(%booking_id, step, error = %err, "no command for cancellation step");
                    continue;
                }
            };

            metrics::counter!("booking_compensations_total").increment(1);
            if let Err(err) = command.undo().await {
                tracing::warn!(%booking_id, step, error = %err, "cancellation step failed, continuing");
            }
        }

        tracing::info!(%booking_id, "cancellation pipeline finished");
        self.inner.store.get(booking_id).await
    }

    /// Returns the current snapshot of a booking.
    pub async fn get_booking(&self, booking_id: BookingId) -> Result<Booking> {
        self.inner.store.get(booking_id).await
    }

    /// Returns snapshots of all bookings, oldest first.
    pub async fn list_bookings(&self) -> Result<Vec<Booking>> {
        self.inner.store.list().await
    }

    /// Waits for every background pipeline, including ones started while
    /// waiting.
    pub async fn shutdown(&self) {
        loop {
            let mut tasks = self.take_tasks();
            if tasks.is_empty() {
                break;
            }
            while let Some(joined) = tasks.join_next().await {
                if let Err(err) = joined {
                    tracing::error!(error = %err, "saga task did not finish cleanly");
                }
            }
        }
    }

    fn command_args(
        &self,
        booking: &Booking,
        payment_details: Option<PaymentDetails>,
    ) -> CommandArgs {
        CommandArgs {
            ledger: BookingLedger::new(booking.id(), self.inner.store.clone()),
            passenger_name: booking.passenger_name().to_string(),
            flight_number: booking.flight_number().to_string(),
            seat_number: booking.seat_number().to_string(),
            payment_details,
            collaborators: self.inner.collaborators.clone(),
            timeout: self.inner.config.timeout,
        }
    }

    fn booking_lock(&self, booking_id: BookingId) -> Arc<Mutex<()>> {
        self.inner
            .locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(booking_id)
            .or_default()
            .clone()
    }

    fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut tasks = self
            .inner
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        while tasks.try_join_next().is_some() {}
        tasks.spawn(task);
    }

    fn take_tasks(&self) -> JoinSet<()> {
        std::mem::take(
            &mut *self
                .inner
                .tasks
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        )
    }
}

impl std::fmt::Debug for SagaOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SagaOrchestrator")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use saga_common::PaymentMethodType;

    use crate::ledger::InMemoryBookingStore;

    fn orchestrator() -> SagaOrchestrator {
        SagaOrchestrator::new(
            Arc::new(InMemoryBookingStore::new()),
            Collaborators::in_memory(),
            CommandRegistry::with_defaults(),
            SagaConfig::default(),
        )
        .unwrap()
    }

    fn request(seat: &str, amount: f64) -> NewBooking {
        NewBooking {
            passenger_name: "John Doe".to_string(),
            flight_number: "FL001".to_string(),
            seat_number: seat.to_string(),
            payment_details: PaymentDetails::new(amount, "USD", PaymentMethodType::CreditCard),
        }
    }

    #[tokio::test]
    async fn test_start_booking_returns_pending_snapshot() {
        let orchestrator = orchestrator();
        let booking = orchestrator.start_booking(request("1A", 100.0)).await.unwrap();
        assert_eq!(booking.status(), BookingStatus::Pending);
        assert!(booking.steps().is_empty());

        orchestrator.shutdown().await;
        let booking = orchestrator.get_booking(booking.id()).await.unwrap();
        assert_eq!(booking.status(), BookingStatus::Completed);
        assert_eq!(
            booking.step_names(),
            vec!["block_seat", "process_payment", "allocate_seat"]
        );
    }

    #[tokio::test]
    async fn test_unknown_step_rejects_construction() {
        let result = SagaOrchestrator::new(
            Arc::new(InMemoryBookingStore::new()),
            Collaborators::in_memory(),
            CommandRegistry::with_defaults(),
            SagaConfig::default().with_steps(["seat", "hotel"]),
        );
        assert!(matches!(result, Err(SagaError::InvalidCommand(_))));
    }

    #[tokio::test]
    async fn test_process_requires_pending_booking() {
        let orchestrator = orchestrator();
        let booking = orchestrator.start_booking(request("2A", 10.0)).await.unwrap();
        orchestrator.shutdown().await;

        let err = orchestrator
            .process_booking(
                booking.id(),
                PaymentDetails::new(10.0, "USD", PaymentMethodType::CreditCard),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, SagaError::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_cancel_unknown_booking_is_not_found() {
        let orchestrator = orchestrator();
        let id = BookingId::new();
        assert!(matches!(
            orchestrator.cancel_booking(id).await,
            Err(SagaError::NotFound(x)) if x == id
        ));
    }

    #[tokio::test]
    async fn test_cancel_twice_reports_already_cancelled() {
        let orchestrator = orchestrator();
        let booking = orchestrator.start_booking(request("2B", 10.0)).await.unwrap();
        orchestrator.shutdown().await;

        let first = orchestrator.cancel_booking(booking.id()).await.unwrap();
        assert!(!first.already_cancelled);
        assert_eq!(first.booking.status(), BookingStatus::Cancelled);

        let second = orchestrator.cancel_booking(booking.id()).await.unwrap();
        assert!(second.already_cancelled);
        orchestrator.shutdown().await;
    }

    #[tokio::test]
    async fn test_list_bookings() {
        let orchestrator = orchestrator();
        orchestrator.start_booking(request("2A", 10.0)).await.unwrap();
        orchestrator.start_booking(request("2B", 10.0)).await.unwrap();
        orchestrator.shutdown().await;

        assert_eq!(orchestrator.list_bookings().await.unwrap().len(), 2);
    }
}
