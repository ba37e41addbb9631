//! Saga pipeline configuration.

use std::time::Duration;

use crate::booking_saga::DEFAULT_STEPS;

/// Default per-call timeout for collaborator operations.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Controls how the orchestrator composes and runs the forward pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SagaConfig {
    /// Ordered step-type names; each resolves to one command.
    pub steps: Vec<String>,
    /// Upper bound for every collaborator call.
    pub timeout: Duration,
    /// Unwind completed steps on transport failures as well as step failures.
    pub compensate_on_transport_failure: bool,
}

impl SagaConfig {
    /// Replaces the step sequence.
    pub fn with_steps<I, S>(mut self, steps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.steps = steps.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the per-call timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Enables or disables compensation on transport failures.
    pub fn with_compensate_on_transport_failure(mut self, enabled: bool) -> Self {
        self.compensate_on_transport_failure = enabled;
        self
    }
}

impl Default for SagaConfig {
    fn default() -> Self {
        Self {
            steps: DEFAULT_STEPS.iter().map(|s| s.to_string()).collect(),
            timeout: DEFAULT_TIMEOUT,
            compensate_on_transport_failure: false,
        }
    }
}
