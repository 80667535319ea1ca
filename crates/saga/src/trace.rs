//! Saga provenance rebuilt from lifecycle events.

use common::{CorrelationId, SagaId};
use serde::{Deserialize, Serialize};

use crate::events::SagaEvent;
use crate::state::SagaState;

/// Everything an operator needs to know about one saga run, folded from its
/// [`SagaEvent`] stream.
///
/// Unlike [`SagaMetadata`](crate::SagaMetadata), a trace also records which
/// compensations failed, since those never reach the saga result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SagaTrace {
    saga_id: Option<SagaId>,
    saga_name: Option<String>,
    correlation_id: Option<CorrelationId>,
    state: SagaState,
    executed_steps: Vec<String>,
    compensated_steps: Vec<String>,
    failed_compensations: Vec<String>,
    failed_step: Option<String>,
    failure_reason: Option<String>,
    duration_ms: Option<u64>,
}

impl SagaTrace {
    /// Folds a full event stream into a trace.
    pub fn from_events<'a>(events: impl IntoIterator<Item = &'a SagaEvent>) -> Self {
        let mut trace = SagaTrace::default();
        for event in events {
            trace.apply(event);
        }
        trace
    }

    pub fn apply(&mut self, event: &SagaEvent) {
        self.state = self.state.on_event(event);
        match event {
            SagaEvent::SagaStarted(data) => {
                self.saga_id = Some(data.saga_id);
                self.saga_name = data.saga_name.clone();
                self.correlation_id = Some(data.correlation_id.clone());
            }
            SagaEvent::StepStarted(_) => {}
            SagaEvent::StepCompleted(data) => {
                self.executed_steps.push(data.step_name.clone());
            }
            SagaEvent::StepFailed(data) => {
                self.failed_step = Some(data.step_name.clone());
                self.failure_reason = Some(data.error.clone());
            }
            SagaEvent::CompensationStarted(_) => {}
            SagaEvent::CompensationStepCompleted(data) => {
                self.compensated_steps.push(data.step_name.clone());
            }
            SagaEvent::CompensationStepFailed(data) => {
                // attempted, so it still counts as compensated
                self.compensated_steps.push(data.step_name.clone());
                self.failed_compensations.push(data.step_name.clone());
            }
            SagaEvent::SagaCompleted(data) => {
                self.duration_ms = Some(data.duration_ms);
            }
            SagaEvent::SagaFailed(data) => {
                self.duration_ms = Some(data.duration_ms);
            }
        }
    }
}

// Query methods
impl SagaTrace {
    pub fn saga_id(&self) -> Option<SagaId> {
        self.saga_id
    }

    pub fn saga_name(&self) -> Option<&str> {
        self.saga_name.as_deref()
    }

    pub fn correlation_id(&self) -> Option<&CorrelationId> {
        self.correlation_id.as_ref()
    }

    pub fn state(&self) -> SagaState {
        self.state
    }

    pub fn executed_steps(&self) -> &[String] {
        &self.executed_steps
    }

    pub fn compensated_steps(&self) -> &[String] {
        &self.compensated_steps
    }

    /// Compensations that returned an error or timed out.
    pub fn failed_compensations(&self) -> &[String] {
        &self.failed_compensations
    }

    pub fn failed_step(&self) -> Option<&str> {
        self.failed_step.as_deref()
    }

    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }

    pub fn duration_ms(&self) -> Option<u64> {
        self.duration_ms
    }

    /// True when the saga failed and at least one compensation did too,
    /// meaning the remote services need manual reconciliation.
    pub fn needs_reconciliation(&self) -> bool {
        self.state == SagaState::Failed && !self.failed_compensations.is_empty()
    }
}
