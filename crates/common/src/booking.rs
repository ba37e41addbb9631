//! Booking payloads threaded through the saga.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Supported payment methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethodType {
    CreditCard,
    Paypal,
    BankTransfer,
    Crypto,
}

/// Payment information supplied with a booking request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentDetails {
    pub amount: f64,
    pub currency: String,
    pub payment_method_type: PaymentMethodType,
    #[serde(default)]
    pub payment_metadata: Map<String, Value>,
}

impl PaymentDetails {
    /// Creates payment details with empty metadata.
    pub fn new(amount: f64, currency: impl Into<String>, method: PaymentMethodType) -> Self {
        Self {
            amount,
            currency: currency.into(),
            payment_method_type: method,
            payment_metadata: Map::new(),
        }
    }

    /// Adds a metadata entry (e.g. `card_last4`).
    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.payment_metadata.insert(key.into(), value);
        self
    }
}

/// Boarding pass issued by the allocation service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardingPass {
    pub passenger: String,
    pub flight: String,
    pub seat: String,
    pub gate: String,
    pub boarding_time: String,
}
