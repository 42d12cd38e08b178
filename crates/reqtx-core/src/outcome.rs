//! Request outcome classification for the close phase.

/// Why a request ended up on the rollback path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    /// The response carried a status outside 200..=299.
    Status(u16),
    /// Simulation was requested; results are never persisted.
    Simulation,
}

/// Explicit outcome threaded through the close phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    Success,
    Failure(FailureReason),
    Cancelled,
}

impl RequestOutcome {
    /// Cancellation wins over everything, then a failing status, then simulation.
    pub fn classify(status: u16, simulation: bool, cancelled: bool) -> Self {
        if cancelled {
            RequestOutcome::Cancelled
        } else if !is_success_status(status) {
            RequestOutcome::Failure(FailureReason::Status(status))
        } else if simulation {
            RequestOutcome::Failure(FailureReason::Simulation)
        } else {
            RequestOutcome::Success
        }
    }

    pub fn should_rollback(self) -> bool {
        !matches!(self, RequestOutcome::Success)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RequestOutcome::Success => "success",
            RequestOutcome::Failure(FailureReason::Status(_)) => "failure_status",
            RequestOutcome::Failure(FailureReason::Simulation) => "simulation",
            RequestOutcome::Cancelled => "cancelled",
        }
    }
}

/// Success is the inclusive range 200..=299.
pub fn is_success_status(status: u16) -> bool {
    (200..=299).contains(&status)
}
