//! Payment service trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use async_trait::async_trait;
use saga_common::{BookingId, PaymentDetails, TransactionResult, TransactionStatus};
use serde_json::json;

use super::Faults;
use crate::booking_saga::PAYMENT_SERVICE;
use crate::error::ServiceError;

/// Amounts above this limit are declined by the in-memory payment service.
pub const PAYMENT_LIMIT: f64 = 1000.0;

/// Trait for payment processing operations.
#[async_trait]
pub trait PaymentService: Send + Sync {
    /// Charges the passenger for a booking.
    async fn process(
        &self,
        booking_id: BookingId,
        payment: &PaymentDetails,
    ) -> Result<TransactionResult, ServiceError>;

    /// Refunds the payment made for a booking.
    async fn refund(&self, booking_id: BookingId) -> Result<TransactionResult, ServiceError>;
}

#[derive(Debug, Clone)]
struct PaymentRecord {
    payment_id: String,
    details: PaymentDetails,
    refunded: bool,
}

#[derive(Debug, Default)]
struct InMemoryPaymentState {
    payments: HashMap<BookingId, PaymentRecord>,
    next_id: u32,
    fail_on_charge: bool,
    fail_on_refund: bool,
}

/// In-memory payment service.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPaymentService {
    state: Arc<RwLock<InMemoryPaymentState>>,
    faults: Faults,
}

impl InMemoryPaymentService {
    /// Creates a new in-memory payment service.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the service to decline every charge.
    pub fn set_fail_on_charge(&self, fail: bool) {
        self.write().fail_on_charge = fail;
    }

    /// Configures the service to reject every refund.
    pub fn set_fail_on_refund(&self, fail: bool) {
        self.write().fail_on_refund = fail;
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

    /// Returns the number of payments that have not been refunded.
    pub fn payment_count(&self) -> usize {
        self.read().payments.values().filter(|p| !p.refunded).count()
    }

    /// Returns true if the booking's payment has been refunded.
    pub fn is_refunded(&self, booking_id: BookingId) -> bool {
        self.read()
            .payments
            .get(&booking_id)
            .is_some_and(|p| p.refunded)
    }

    fn read(&self) -> RwLockReadGuard<'_, InMemoryPaymentState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, InMemoryPaymentState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl PaymentService for InMemoryPaymentService {
    async fn process(
        &self,
        booking_id: BookingId,
        payment: &PaymentDetails,
    ) -> Result<TransactionResult, ServiceError> {
        self.faults.enter(PAYMENT_SERVICE).await?;
        let mut state = self.write();

        if let Some(existing) = state.payments.get(&booking_id).filter(|p| !p.refunded) {
            return Ok(TransactionResult::success(
                booking_id.to_string(),
                TransactionStatus::Completed,
                "Payment already processed",
            )
            .with_data("payment_id", json!(existing.payment_id))
            .with_data("amount", json!(existing.details.amount))
            .with_data("currency", json!(existing.details.currency)));
        }

        if state.fail_on_charge {
            return Err(ServiceError::rejected(400, "Payment declined"));
        }

        if payment.amount > PAYMENT_LIMIT {
            return Err(ServiceError::rejected(400, "Payment amount exceeds limit"));
        }

        state.next_id += 1;
        let payment_id = format!("pay_{:04}", state.next_id);
        state.payments.insert(
            booking_id,
            PaymentRecord {
                payment_id: payment_id.clone(),
                details: payment.clone(),
                refunded: false,
            },
        );

        Ok(TransactionResult::success(
            booking_id.to_string(),
            TransactionStatus::Completed,
            "Payment processed successfully",
        )
        .with_data("payment_id", json!(payment_id))
        .with_data("amount", json!(payment.amount))
        .with_data("currency", json!(payment.currency)))
    }

    async fn refund(&self, booking_id: BookingId) -> Result<TransactionResult, ServiceError> {
        self.faults.enter(PAYMENT_SERVICE).await?;
        let mut state = self.write();

        if state.fail_on_refund {
            return Err(ServiceError::rejected(400, "Refund failed"));
        }

        let record = state.payments.get_mut(&booking_id).ok_or_else(|| {
            ServiceError::rejected(404, format!("No payment found for booking {booking_id}"))
        })?;

        let message = if record.refunded {
            "Payment already refunded"
        } else {
            record.refunded = true;
            "Payment refunded successfully"
        };
        let refund_id = record.payment_id.replacen("pay_", "ref_", 1);

        Ok(TransactionResult::success(
            booking_id.to_string(),
            TransactionStatus::Refunded,
            message,
        )
        .with_data("payment_id", json!(record.payment_id))
        .with_data("refund_id", json!(refund_id)))
    }
}
