//! Saga commands: one forward operation paired with its compensation.
//!
//! A command never owns the booking. It writes its outcome through a
//! [`BookingLedger`] handle, so every step it records is visible to readers
//! as soon as the call returns.

pub mod allocation;
pub mod factory;
pub mod payment;
pub mod seat;

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use saga_common::{PaymentDetails, TransactionResult};

pub use allocation::AllocationCommand;
pub use factory::{CommandConstructor, CommandFactory, CommandRegistry};
pub use payment::PaymentCommand;
pub use seat::SeatCommand;

use crate::booking::Step;
use crate::error::{Result, SagaError, ServiceError};
use crate::ledger::BookingLedger;
use crate::services::Collaborators;

/// A reversible saga step.
///
/// `execute` calls the collaborator exactly once. On success it appends one
/// step; on a business rejection it appends a FAILED step carrying the
/// collaborator's message and returns [`SagaError::StepFailed`]; on a
/// transport failure it appends nothing and returns [`SagaError::Transport`].
///
/// `undo` calls the compensating operation and appends a step only when
/// that call succeeds. Otherwise it returns
/// [`SagaError::CompensationFailed`].
#[async_trait]
pub trait Command: Send + Sync {
    /// The step-type name this command was registered under.
    fn name(&self) -> &str;

    /// Performs the forward operation.
    async fn execute(&self) -> Result<()>;

    /// Performs the compensating operation.
    async fn undo(&self) -> Result<()>;
}

/// Everything a command needs to talk to its collaborator for one booking.
#[derive(Debug, Clone)]
pub struct CommandArgs {
    pub ledger: BookingLedger,
    pub passenger_name: String,
    pub flight_number: String,
    pub seat_number: String,
    /// Absent when commands are built only to compensate.
    pub payment_details: Option<PaymentDetails>,
    pub collaborators: Collaborators,
    /// Upper bound for each collaborator call.
    pub timeout: Duration,
}

/// Runs a collaborator call under the configured timeout.
pub(crate) async fn call<F>(
    timeout: Duration,
    request: F,
) -> std::result::Result<TransactionResult, ServiceError>
where
    F: Future<Output = std::result::Result<TransactionResult, ServiceError>>,
{
    match tokio::time::timeout(timeout, request).await {
        Ok(outcome) => outcome,
        Err(_) => Err(ServiceError::Timeout { after: timeout }),
    }
}

/// Records a failed forward call and converts it into a saga error.
pub(crate) async fn forward_failure(
    ledger: &BookingLedger,
    service: &str,
    operation: &str,
    err: ServiceError,
) -> SagaError {
    if err.is_step_failure() {
        tracing::warn!(
            booking_id = %ledger.booking_id(),
            service,
            operation,
            error = %err,
            "collaborator rejected step"
        );
        if let Err(ledger_err) = ledger
            .record(Step::failed(service, operation, err.to_string()))
            .await
        {
            return ledger_err;
        }
    } else {
        tracing::warn!(
            booking_id = %ledger.booking_id(),
            service,
            operation,
            error = %err,
            "transport failure"
        );
    }
    err.into_step_error(ledger.booking_id(), operation)
}

/// Records the outcome of a compensating call.
pub(crate) async fn record_compensation(
    ledger: &BookingLedger,
    service: &str,
    operation: &str,
    outcome: std::result::Result<TransactionResult, ServiceError>,
) -> Result<()> {
    match outcome {
        Ok(result) => {
            tracing::info!(
                booking_id = %ledger.booking_id(),
                service,
                operation,
                status = %result.status,
                "compensation succeeded"
            );
            ledger
                .record(Step::from_result(service, operation, &result))
                .await
        }
        Err(err) => Err(err.into_compensation_error(ledger.booking_id(), operation)),
    }
}
