//! Saga lifecycle events.

use chrono::{DateTime, Utc};
use common::{CorrelationId, SagaId};
use serde::{Deserialize, Serialize};

/// Events emitted while a saga runs, in lifecycle order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum SagaEvent {
    /// Saga execution started.
    SagaStarted(SagaStartedData),

    /// A step's `execute` was invoked.
    StepStarted(StepData),

    /// A step's `execute` returned an output.
    StepCompleted(StepCompletedData),

    /// A step's `execute` failed or timed out.
    StepFailed(StepFailedData),

    /// Compensation pass started after a step failure.
    CompensationStarted(CompensationData),

    /// A compensation completed successfully.
    CompensationStepCompleted(StepData),

    /// A compensation failed (logged, unwind continues).
    CompensationStepFailed(StepFailedData),

    /// All steps completed.
    SagaCompleted(SagaCompletedData),

    /// Saga failed; compensation pass finished.
    SagaFailed(SagaFailedData),
}

impl SagaEvent {
    /// Returns the event type name.
    pub fn event_type(&self) -> &'static str {
        match self {
            SagaEvent::SagaStarted(_) => "SagaStarted",
            SagaEvent::StepStarted(_) => "StepStarted",
            SagaEvent::StepCompleted(_) => "StepCompleted",
            SagaEvent::StepFailed(_) => "StepFailed",
            SagaEvent::CompensationStarted(_) => "CompensationStarted",
            SagaEvent::CompensationStepCompleted(_) => "CompensationStepCompleted",
            SagaEvent::CompensationStepFailed(_) => "CompensationStepFailed",
            SagaEvent::SagaCompleted(_) => "SagaCompleted",
            SagaEvent::SagaFailed(_) => "SagaFailed",
        }
    }
}

/// Data for SagaStarted event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SagaStartedData {
    /// The saga run identifier.
    pub saga_id: SagaId,
    /// The caller-supplied saga label, if any.
    pub saga_name: Option<String>,
    /// The correlation id propagated to every remote call.
    pub correlation_id: CorrelationId,
    /// Number of declared steps.
    pub step_count: usize,
    /// When the run started.
    pub started_at: DateTime<Utc>,
}

/// Step name only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepData {
    /// The step name.
    pub step_name: String,
}

/// Data for StepCompleted event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepCompletedData {
    /// The step name.
    pub step_name: String,
    /// How long `execute` took, in milliseconds.
    pub duration_ms: u64,
}

/// Data for StepFailed and CompensationStepFailed events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepFailedData {
    /// The step name.
    pub step_name: String,
    /// The rendered error.
    pub error: String,
}

/// Data for CompensationStarted event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompensationData {
    /// The step whose failure triggered compensation.
    pub from_step: String,
}

/// Data for SagaCompleted event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SagaCompletedData {
    /// Total run time, in milliseconds.
    pub duration_ms: u64,
    /// When the last step completed.
    pub completed_at: DateTime<Utc>,
}

/// Data for SagaFailed event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SagaFailedData {
    /// The step whose failure triggered compensation.
    pub failed_step: String,
    /// The failing step's error.
    pub reason: String,
    /// Total run time including compensation, in milliseconds.
    pub duration_ms: u64,
    /// When the compensation pass finished.
    pub failed_at: DateTime<Utc>,
}

// Convenience constructors
impl SagaEvent {
    pub fn saga_started(
        saga_id: SagaId,
        saga_name: Option<&str>,
        correlation_id: &CorrelationId,
        step_count: usize,
    ) -> Self {
        SagaEvent::SagaStarted(SagaStartedData {
            saga_id,
            saga_name: saga_name.map(str::to_string),
            correlation_id: correlation_id.clone(),
            step_count,
            started_at: Utc::now(),
        })
    }

    pub fn step_started(step_name: impl Into<String>) -> Self {
        SagaEvent::StepStarted(StepData {
            step_name: step_name.into(),
        })
    }

    pub fn step_completed(step_name: impl Into<String>, duration_ms: u64) -> Self {
        SagaEvent::StepCompleted(StepCompletedData {
            step_name: step_name.into(),
            duration_ms,
        })
    }

    pub fn step_failed(step_name: impl Into<String>, error: impl Into<String>) -> Self {
        SagaEvent::StepFailed(StepFailedData {
            step_name: step_name.into(),
            error: error.into(),
        })
    }

    pub fn compensation_started(from_step: impl Into<String>) -> Self {
        SagaEvent::CompensationStarted(CompensationData {
            from_step: from_step.into(),
        })
    }

    pub fn compensation_step_completed(step_name: impl Into<String>) -> Self {
        SagaEvent::CompensationStepCompleted(StepData {
            step_name: step_name.into(),
        })
    }

    pub fn compensation_step_failed(
        step_name: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        SagaEvent::CompensationStepFailed(StepFailedData {
            step_name: step_name.into(),
            error: error.into(),
        })
    }

    pub fn saga_completed(duration_ms: u64) -> Self {
        SagaEvent::SagaCompleted(SagaCompletedData {
            duration_ms,
            completed_at: Utc::now(),
        })
    }

    pub fn saga_failed(
        failed_step: impl Into<String>,
        reason: impl Into<String>,
        duration_ms: u64,
    ) -> Self {
        SagaEvent::SagaFailed(SagaFailedData {
            failed_step: failed_step.into(),
            reason: reason.into(),
            duration_ms,
            failed_at: Utc::now(),
        })
    }
}
