//! Payment step.

use async_trait::async_trait;

use super::{Command, CommandArgs, call, forward_failure, record_compensation};
use crate::booking::Step;
use crate::booking_saga::{OP_PROCESS_PAYMENT, OP_REFUND_PAYMENT, PAYMENT_SERVICE, STEP_PAYMENT};
use crate::error::{Result, SagaError};

/// Charges the passenger; compensates with a refund.
#[derive(Debug)]
pub struct PaymentCommand {
    args: CommandArgs,
}

impl PaymentCommand {
    pub fn new(args: &CommandArgs) -> Self {
        Self { args: args.clone() }
    }
}

#[async_trait]
impl Command for PaymentCommand {
    fn name(&self) -> &str {
        STEP_PAYMENT
    }

    async fn execute(&self) -> Result<()> {
        let ledger = &self.args.ledger;
        let payment = self.args.payment_details.as_ref().ok_or_else(|| {
            SagaError::InvalidState(format!(
                "booking {} has no payment details",
                ledger.booking_id()
            ))
        })?;
        tracing::info!(
            booking_id = %ledger.booking_id(),
            amount = payment.amount,
            currency = %payment.currency,
            "processing payment"
        );

        let outcome = call(
            self.args.timeout,
            self.args
                .collaborators
                .payment
                .process(ledger.booking_id(), payment),
        )
        .await;

        match outcome {
            Ok(result) => {
                ledger
                    .record(Step::from_result(PAYMENT_SERVICE, OP_PROCESS_PAYMENT, &result))
                    .await
            }
            Err(err) => {
                Err(forward_failure(ledger, PAYMENT_SERVICE, OP_PROCESS_PAYMENT, err).await)
            }
        }
    }

    async fn undo(&self) -> Result<()> {
        let ledger = &self.args.ledger;
        tracing::info!(booking_id = %ledger.booking_id(), "refunding payment");

        let outcome = call(
            self.args.timeout,
            self.args.collaborators.payment.refund(ledger.booking_id()),
        )
        .await;
        record_compensation(ledger, PAYMENT_SERVICE, OP_REFUND_PAYMENT, outcome).await
    }
}
