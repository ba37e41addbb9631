//! Saga error types.

use std::time::Duration;

use saga_common::BookingId;
use thiserror::Error;

use crate::state::BookingStatus;

/// Errors that can occur while driving a booking saga.
#[derive(Debug, Error)]
pub enum SagaError {
    /// A collaborator rejected a forward operation (or did not answer in time).
    /// Triggers compensation of the previously completed steps.
    #[error("Booking {booking_id}: step '{step}' failed: {reason}")]
    StepFailed {
        booking_id: BookingId,
        step: String,
        reason: String,
    },

    /// A collaborator was unreachable or answered with something unreadable.
    #[error("Booking {booking_id}: transport failure in step '{step}': {reason}")]
    Transport {
        booking_id: BookingId,
        step: String,
        reason: String,
    },

    /// A compensating operation failed.
    #[error("Booking {booking_id}: compensation '{step}' failed: {reason}")]
    CompensationFailed {
        booking_id: BookingId,
        step: String,
        reason: String,
    },

    /// Booking not found in the ledger.
    #[error("Booking {0} not found")]
    NotFound(BookingId),

    /// Unknown step type in the pipeline configuration.
    #[error("Command '{0}' is not supported")]
    InvalidCommand(String),

    /// Status change that would break the booking lifecycle.
    #[error("Invalid booking status transition: {from} -> {to}")]
    InvalidTransition {
        from: BookingStatus,
        to: BookingStatus,
    },

    /// Booking is not in a state that allows the requested operation.
    #[error("Invalid booking state: {0}")]
    InvalidState(String),
}

impl SagaError {
    /// Returns true for business-level failures that trigger compensation.
    pub fn is_step_failure(&self) -> bool {
        matches!(self, SagaError::StepFailed { .. })
    }

    /// Returns true for transport-level failures.
    pub fn is_transport(&self) -> bool {
        matches!(self, SagaError::Transport { .. })
    }
}

/// Convenience type alias for saga results.
pub type Result<T> = std::result::Result<T, SagaError>;

/// Failure of a single collaborator call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    /// The collaborator answered with a non-success code.
    #[error("{message}")]
    Rejected { status: u16, message: String },

    /// No answer within the configured timeout.
    #[error("no response within {}ms", after.as_millis())]
    Timeout { after: Duration },

    /// The collaborator could not be reached.
    #[error("service unavailable: {reason}")]
    Unavailable { reason: String },

    /// The collaborator answered with an unexpected payload.
    #[error("malformed response: {reason}")]
    Malformed { reason: String },
}

impl ServiceError {
    /// Creates a rejection with the given status code.
    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        ServiceError::Rejected {
            status,
            message: message.into(),
        }
    }

    /// Returns true if the failure is a step failure (business rejection or timeout).
    pub fn is_step_failure(&self) -> bool {
        matches!(
            self,
            ServiceError::Rejected { .. } | ServiceError::Timeout { .. }
        )
    }

    /// Converts the failure of a forward operation into a saga error.
    pub fn into_step_error(self, booking_id: BookingId, step: &str) -> SagaError {
        if self.is_step_failure() {
            SagaError::StepFailed {
                booking_id,
                step: step.to_string(),
                reason: self.to_string(),
            }
        } else {
            SagaError::Transport {
                booking_id,
                step: step.to_string(),
                reason: self.to_string(),
            }
        }
    }

    /// Converts the failure of a compensating operation into a saga error.
    pub fn into_compensation_error(self, booking_id: BookingId, step: &str) -> SagaError {
        SagaError::CompensationFailed {
            booking_id,
            step: step.to_string(),
            reason: self.to_string(),
        }
    }
}
