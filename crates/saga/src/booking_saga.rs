//! Flight booking saga constants.

/// The saga type identifier for flight bookings.
pub const SAGA_TYPE: &str = "FlightBooking";

/// Step type: block the requested seat.
pub const STEP_SEAT: &str = "seat";

/// Step type: charge the passenger.
pub const STEP_PAYMENT: &str = "payment";

/// Step type: allocate the seat and issue a boarding pass.
pub const STEP_ALLOCATION: &str = "allocation";

/// Default forward pipeline.
pub const DEFAULT_STEPS: [&str; 3] = [STEP_SEAT, STEP_PAYMENT, STEP_ALLOCATION];

/// Fixed order of the cancellation pipeline.
pub const CANCELLATION_ORDER: [&str; 3] = [STEP_ALLOCATION, STEP_PAYMENT, STEP_SEAT];

pub const SEAT_SERVICE: &str = "seat_service";
pub const PAYMENT_SERVICE: &str = "payment_service";
pub const ALLOCATION_SERVICE: &str = "allocation_service";

pub const OP_BLOCK_SEAT: &str = "block_seat";
pub const OP_RELEASE_SEAT: &str = "release_seat";
pub const OP_PROCESS_PAYMENT: &str = "process_payment";
pub const OP_REFUND_PAYMENT: &str = "refund_payment";
pub const OP_ALLOCATE_SEAT: &str = "allocate_seat";
pub const OP_CANCEL_ALLOCATION: &str = "cancel_allocation";
