//! Seat blocking step.

use async_trait::async_trait;

use super::{Command, CommandArgs, call, forward_failure, record_compensation};
use crate::booking::Step;
use crate::booking_saga::{OP_BLOCK_SEAT, OP_RELEASE_SEAT, SEAT_SERVICE, STEP_SEAT};
use crate::error::Result;

/// Blocks the requested seat; compensates by releasing it.
#[derive(Debug)]
pub struct SeatCommand {
    args: CommandArgs,
}

impl SeatCommand {
    pub fn new(args: &CommandArgs) -> Self {
        Self { args: args.clone() }
    }
}

#[async_trait]
impl Command for SeatCommand {
    fn name(&self) -> &str {
        STEP_SEAT
    }

    async fn execute(&self) -> Result<()> {
        let ledger = &self.args.ledger;
        tracing::info!(
            booking_id = %ledger.booking_id(),
            flight = %self.args.flight_number,
            seat = %self.args.seat_number,
            "blocking seat"
        );

        let outcome = call(
            self.args.timeout,
            self.args.collaborators.seat.block(
                ledger.booking_id(),
                &self.args.flight_number,
                &self.args.seat_number,
            ),
        )
        .await;

        match outcome {
            Ok(result) => {
                ledger
                    .record(Step::from_result(SEAT_SERVICE, OP_BLOCK_SEAT, &result))
                    .await
            }
            Err(err) => Err(forward_failure(ledger, SEAT_SERVICE, OP_BLOCK_SEAT, err).await),
        }
    }

    async fn undo(&self) -> Result<()> {
        let ledger = &self.args.ledger;
        tracing::info!(booking_id = %ledger.booking_id(), "releasing seat");

        let outcome = call(
            self.args.timeout,
            self.args.collaborators.seat.release(ledger.booking_id()),
        )
        .await;
        record_compensation(ledger, SEAT_SERVICE, OP_RELEASE_SEAT, outcome).await
    }
}
