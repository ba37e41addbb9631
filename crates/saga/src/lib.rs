//! Saga orchestration for flight bookings.
//!
//! A booking runs through an ordered pipeline of commands (by default:
//! block seat, process payment, allocate seat). Each command pairs a call
//! to a remote collaborator with a compensating call. When a step fails,
//! the steps that already completed are compensated in reverse order.
//!
//! Every booking keeps an append-only log of the collaborator calls made on
//! its behalf, which callers read back as snapshots.

pub mod booking;
pub mod booking_saga;
pub mod commands;
pub mod config;
pub mod error;
pub mod ledger;
pub mod orchestrator;
pub mod services;
pub mod state;

pub use booking::{Booking, NewBooking, Step};
pub use commands::{Command, CommandArgs, CommandConstructor, CommandFactory, CommandRegistry};
pub use config::SagaConfig;
pub use error::{SagaError, ServiceError};
pub use ledger::{BookingLedger, BookingStore, InMemoryBookingStore};
pub use orchestrator::{CancellationOutcome, SagaOrchestrator};
pub use services::{
    AllocationService, Collaborators, HttpAllocationClient, HttpPaymentClient, HttpSeatClient,
    InMemoryAllocationService, InMemoryPaymentService, InMemorySeatService, PaymentService,
    SeatService, SeatStatus,
};
pub use state::BookingStatus;
