//! Seat allocation step.

use async_trait::async_trait;
use saga_common::{BoardingPass, TransactionResult};

use super::{Command, CommandArgs, call, forward_failure, record_compensation};
use crate::booking::Step;
use crate::booking_saga::{
    ALLOCATION_SERVICE, OP_ALLOCATE_SEAT, OP_CANCEL_ALLOCATION, STEP_ALLOCATION,
};
use crate::error::Result;

/// Allocates the seat and keeps the boarding pass when one is issued;
/// compensates by cancelling the allocation.
#[derive(Debug)]
pub struct AllocationCommand {
    args: CommandArgs,
}

impl AllocationCommand {
    pub fn new(args: &CommandArgs) -> Self {
        Self { args: args.clone() }
    }
}

/// Reads the boarding pass out of an allocation answer, if it carries one.
fn boarding_pass(result: &TransactionResult) -> serde_json::Result<Option<BoardingPass>> {
    result
        .data_value("boarding_pass")
        .map(|value| serde_json::from_value(value.clone()))
        .transpose()
}

#[async_trait]
impl Command for AllocationCommand {
    fn name(&self) -> &str {
        STEP_ALLOCATION
    }

    async fn execute(&self) -> Result<()> {
        let ledger = &self.args.ledger;
        tracing::info!(booking_id = %ledger.booking_id(), "allocating seat");

        let outcome = call(
            self.args.timeout,
            self.args.collaborators.allocation.allocate(
                ledger.booking_id(),
                &self.args.flight_number,
                &self.args.seat_number,
                &self.args.passenger_name,
            ),
        )
        .await;

        let result = match outcome {
            Ok(result) => result,
            Err(err) => {
                return Err(
                    forward_failure(ledger, ALLOCATION_SERVICE, OP_ALLOCATE_SEAT, err).await,
                );
            }
        };

        ledger
            .record(Step::from_result(ALLOCATION_SERVICE, OP_ALLOCATE_SEAT, &result))
            .await?;

        match boarding_pass(&result) {
            Ok(Some(pass)) => ledger.attach_boarding_pass(pass).await,
            Ok(None) => Ok(()),
            Err(err) => {
                tracing::warn!(
                    booking_id = %ledger.booking_id(),
                    error = %err,
                    "unreadable boarding pass ignored"
                );
                Ok(())
            }
        }
    }

    async fn undo(&self) -> Result<()> {
        let ledger = &self.args.ledger;
        tracing::info!(booking_id = %ledger.booking_id(), "cancelling allocation");

        let outcome = call(
            self.args.timeout,
            self.args.collaborators.allocation.cancel(ledger.booking_id()),
        )
        .await;
        record_compensation(ledger, ALLOCATION_SERVICE, OP_CANCEL_ALLOCATION, outcome).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use saga_common::TransactionStatus;
    use serde_json::json;

    #[test]
    fn test_boarding_pass_is_decoded() {
        let result = TransactionResult::success("x", TransactionStatus::Completed, "ok").with_data(
            "boarding_pass",
            json!({
                "passenger": "John Doe",
                "flight": "FL001",
                "seat": "1A",
                "gate": "B12",
                "boarding_time": "2024-05-01T12:00:00"
            }),
        );

        assert_eq!(boarding_pass(&result).unwrap().unwrap().gate, "B12");
    }

    #[test]
    fn test_missing_boarding_pass_is_none() {
        let result = TransactionResult::success("x", TransactionStatus::Completed, "ok");
        assert!(boarding_pass(&result).unwrap().is_none());
    }

    #[test]
    fn test_undecodable_boarding_pass_is_an_error() {
        let result = TransactionResult::success("x", TransactionStatus::Completed, "ok")
            .with_data("boarding_pass", json!({"gate": 12}));
        assert!(boarding_pass(&result).is_err());
    }
}
