//! Booking status state machine.

use serde::{Deserialize, Serialize};

/// The status of a booking in its lifecycle.
///
/// State transitions:
/// ```text
/// Pending ──┬──► Completed ──► Cancelled
///           ├──► Failed
///           └──► Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    /// Booking accepted, saga steps are being executed.
    #[default]
    Pending,

    /// All saga steps completed successfully.
    Completed,

    /// A step failed; prior steps were compensated (terminal state).
    Failed,

    /// Cancelled on request (terminal state).
    Cancelled,
}

impl BookingStatus {
    /// Returns true if the booking may move to `next`.
    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        matches!(
            (self, next),
            (BookingStatus::Pending, BookingStatus::Completed)
                | (BookingStatus::Pending, BookingStatus::Failed)
                | (BookingStatus::Pending, BookingStatus::Cancelled)
                | (BookingStatus::Completed, BookingStatus::Cancelled)
        )
    }

    /// Returns true if the booking can be cancelled.
    pub fn can_cancel(&self) -> bool {
        self.can_transition_to(BookingStatus::Cancelled)
    }

    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "PENDING",
            BookingStatus::Completed => "COMPLETED",
            BookingStatus::Failed => "FAILED",
            BookingStatus::Cancelled => "CANCELLED",
        }
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [BookingStatus; 4] = [
        BookingStatus::Pending,
        BookingStatus::Completed,
        BookingStatus::Failed,
        BookingStatus::Cancelled,
    ];

    #[test]
    fn test_default_status_is_pending() {
        assert_eq!(BookingStatus::default(), BookingStatus::Pending);
    }

    #[test]
    fn test_pending_transitions() {
        assert!(BookingStatus::Pending.can_transition_to(BookingStatus::Completed));
        assert!(BookingStatus::Pending.can_transition_to(BookingStatus::Failed));
        assert!(BookingStatus::Pending.can_transition_to(BookingStatus::Cancelled));
        assert!(!BookingStatus::Pending.can_transition_to(BookingStatus::Pending));
    }

    #[test]
    fn test_completed_only_cancels() {
        assert!(BookingStatus::Completed.can_cancel());
        assert!(!BookingStatus::Completed.can_transition_to(BookingStatus::Failed));
        assert!(!BookingStatus::Completed.can_transition_to(BookingStatus::Pending));
    }

    #[test]
    fn test_terminal_states_never_move() {
        for next in ALL {
            assert!(!BookingStatus::Failed.can_transition_to(next));
            assert!(!BookingStatus::Cancelled.can_transition_to(next));
        }
        assert!(!BookingStatus::Failed.can_cancel());
        assert!(!BookingStatus::Cancelled.can_cancel());
    }

    #[test]
    fn test_display() {
        assert_eq!(BookingStatus::Pending.to_string(), "PENDING");
        assert_eq!(BookingStatus::Completed.to_string(), "COMPLETED");
        assert_eq!(BookingStatus::Failed.to_string(), "FAILED");
        assert_eq!(BookingStatus::Cancelled.to_string(), "CANCELLED");
    }

    #[test]
    fn test_serialization() {
        let json = serde_json::to_string(&BookingStatus::Cancelled).unwrap();
        assert_eq!(json, "\"CANCELLED\"");
        let status: BookingStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(status, BookingStatus::Cancelled);
    }
}
