//! Saga lifecycle state machine.

use serde::{Deserialize, Serialize};

use crate::events::SagaEvent;

/// The state of a saga run as observed from its event stream.
///
/// State transitions:
/// ```text
/// NotStarted ──► Running ──┬──► Completed
///                          └──► Compensating ──► Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SagaState {
    #[default]
    NotStarted,

    /// Forward steps are executing.
    Running,

    /// A step failed and compensations are being attempted.
    Compensating,

    /// All steps completed (terminal).
    Completed,

    /// Compensation pass finished after a failure (terminal).
    Failed,
}

impl SagaState {
    /// Returns the state reached after observing `event`.
    ///
    /// Events that do not move the lifecycle (step and per-compensation
    /// events) leave the state unchanged, as do events that arrive out of
    /// order for the current state.
    pub fn on_event(self, event: &SagaEvent) -> SagaState {
        match (self, event) {
            (SagaState::NotStarted, SagaEvent::SagaStarted(_)) => SagaState::Running,
            (SagaState::Running, SagaEvent::SagaCompleted(_)) => SagaState::Completed,
            (SagaState::Running, SagaEvent::CompensationStarted(_)) => SagaState::Compensating,
            (SagaState::Running | SagaState::Compensating, SagaEvent::SagaFailed(_)) => {
                SagaState::Failed
            }
            (state, _) => state,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SagaState::Completed | SagaState::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SagaState::NotStarted => "NotStarted",
            SagaState::Running => "Running",
            SagaState::Compensating => "Compensating",
            SagaState::Completed => "Completed",
            SagaState::Failed => "Failed",
        }
    }
}

impl std::fmt::Display for SagaState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
