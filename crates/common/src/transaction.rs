//! Request/response envelope shared by every collaborator operation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Outcome status reported by a collaborator for a single operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
    Released,
    Refunded,
    Cancelled,
}

impl TransactionStatus {
    /// Returns the wire name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "PENDING",
            TransactionStatus::Completed => "COMPLETED",
            TransactionStatus::Failed => "FAILED",
            TransactionStatus::Released => "RELEASED",
            TransactionStatus::Refunded => "REFUNDED",
            TransactionStatus::Cancelled => "CANCELLED",
        }
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Body of a successful collaborator response.
///
/// `data` carries operation-specific payload such as the issued
/// `boarding_pass` or the `payment_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionResult {
    pub success: bool,
    pub booking_id: String,
    pub status: TransactionStatus,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Map<String, Value>>,
}

impl TransactionResult {
    /// Builds a successful result stamped with the current time.
    pub fn success(
        booking_id: impl Into<String>,
        status: TransactionStatus,
        message: impl Into<String>,
    ) -> Self {
        Self {
            success: true,
            booking_id: booking_id.into(),
            status,
            message: message.into(),
            timestamp: Some(Utc::now()),
            data: None,
        }
    }

    /// Attaches a payload entry to the result.
    pub fn with_data(mut self, key: impl Into<String>, value: Value) -> Self {
        self.data
            .get_or_insert_with(Map::new)
            .insert(key.into(), value);
        self
    }

    /// Looks up a payload entry.
    pub fn data_value(&self, key: &str) -> Option<&Value> {
        self.data.as_ref().and_then(|data| data.get(key))
    }
}

/// Body of a failed collaborator response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub booking_id: Option<String>,
    #[serde(default = "failed_status")]
    pub status: TransactionStatus,
    #[serde(default = "unknown_error")]
    pub message: String,
}

fn failed_status() -> TransactionStatus {
    TransactionStatus::Failed
}

fn unknown_error() -> String {
    "Unknown error".to_string()
}

impl ErrorBody {
    /// Builds a failure body for the given booking.
    pub fn new(booking_id: Option<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            booking_id,
            status: TransactionStatus::Failed,
            message: message.into(),
        }
    }

    /// Decodes a failure body, falling back to `"Unknown error"` when the
    /// payload is not the expected shape.
    pub fn from_slice(bytes: &[u8]) -> Self {
        serde_json::from_slice(bytes).unwrap_or_else(|_| Self::new(None, unknown_error()))
    }
}
