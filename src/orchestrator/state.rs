/// Lifecycle states of the orchestrator loop
use serde::Serialize;
use std::fmt;

/// Represents where the orchestrator loop is in its lifecycle
///
/// `Idle -> Running` on start, `Running -> Stopping` on a stop request and
/// `Stopping -> Idle` once the loop has exited (or was aborted after the
/// grace period).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OrchestratorState {
    Idle,
    Running,
    Stopping,
}

impl OrchestratorState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Stopping => "stopping",
        }
    }

    /// Returns true if a transition from `self` to `to` is allowed
    pub fn can_transition_to(&self, to: OrchestratorState) -> bool {
        matches!(
            (self, to),
            (Self::Idle, Self::Running)
                | (Self::Running, Self::Stopping)
                | (Self::Stopping, Self::Idle)
        )
    }
}

impl fmt::Display for OrchestratorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
