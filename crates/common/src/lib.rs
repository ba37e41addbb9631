//! Shared types exchanged between the booking orchestrator and the
//! seat, payment and allocation services.

pub mod booking;
pub mod transaction;
pub mod types;

pub use booking::{BoardingPass, PaymentDetails, PaymentMethodType};
pub use transaction::{ErrorBody, TransactionResult, TransactionStatus};
pub use types::{BookingId, ParseBookingIdError};
