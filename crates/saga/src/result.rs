//! Saga outcome and execution provenance.

use std::time::Duration;

use common::SagaId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::StepError;

/// Provenance of one saga run, returned on success and failure alike.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SagaMetadata {
    /// The identifier assigned to this run.
    pub saga_id: SagaId,
    /// Steps whose `execute` completed, in execution order.
    pub executed_steps: Vec<String>,
    /// Steps whose `compensate` was attempted, in compensation order.
    pub compensated_steps: Vec<String>,
    /// Wall time from the first step to the final result.
    #[serde(rename = "durationMs", with = "duration_ms")]
    pub duration: Duration,
}

impl SagaMetadata {
    pub fn duration_ms(&self) -> u64 {
        u64::try_from(self.duration.as_millis()).unwrap_or(u64::MAX)
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

/// The forward step that broke a saga, with its original error.
#[derive(Debug, Error)]
#[error("Step '{step}' failed: {message}")]
pub struct StepFailure {
    /// The error message, as rendered from `source`.
    pub message: String,
    /// The step name.
    pub step: String,
    #[source]
    pub source: StepError,
}

impl StepFailure {
    pub(crate) fn new(step: impl Into<String>, source: StepError) -> Self {
        Self {
            message: source.to_string(),
            step: step.into(),
            source,
        }
    }
}

/// Outcome of [`SagaOrchestrator::execute`](crate::SagaOrchestrator::execute).
///
/// Holds either the final step's output or the failure that triggered the
/// compensation pass. Compensation errors are never reported here; they are
/// only logged.
#[derive(Debug)]
pub struct SagaResult<T> {
    outcome: Result<T, StepFailure>,
    metadata: SagaMetadata,
}

impl<T> SagaResult<T> {
    pub(crate) fn completed(data: T, metadata: SagaMetadata) -> Self {
        Self {
            outcome: Ok(data),
            metadata,
        }
    }

    pub(crate) fn failed(failure: StepFailure, metadata: SagaMetadata) -> Self {
        Self {
            outcome: Err(failure),
            metadata,
        }
    }

    /// Returns true if every step completed.
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    /// The final step's output, present only on success.
    pub fn data(&self) -> Option<&T> {
        self.outcome.as_ref().ok()
    }

    /// The failing step and its error, present only on failure.
    pub fn error(&self) -> Option<&StepFailure> {
        self.outcome.as_ref().err()
    }

    pub fn metadata(&self) -> &SagaMetadata {
        &self.metadata
    }

    pub fn saga_id(&self) -> SagaId {
        self.metadata.saga_id
    }

    /// Splits into the outcome and the provenance.
    pub fn into_parts(self) -> (Result<T, StepFailure>, SagaMetadata) {
        (self.outcome, self.metadata)
    }

    /// Converts into a plain `Result`, keeping the provenance on the error
    /// side so callers can attach the saga id to their own error type.
    pub fn into_result(self) -> Result<T, SagaFailure> {
        match self.outcome {
            Ok(data) => Ok(data),
            Err(failure) => Err(SagaFailure {
                failure,
                metadata: self.metadata,
            }),
        }
    }
}

/// A failed saga, as handed to callers through [`SagaResult::into_result`].
#[derive(Debug, Error)]
#[error(
    "Saga {} failed at step '{}': {}",
    .metadata.saga_id,
    .failure.step,
    .failure.message
)]
pub struct SagaFailure {
    /// The forward step that broke the saga.
    #[source]
    pub failure: StepFailure,
    /// Provenance of the failed run, compensation included.
    pub metadata: SagaMetadata,
}

impl SagaFailure {
    /// The identifier of the failed run.
    pub fn saga_id(&self) -> SagaId {
        self.metadata.saga_id
    }

    /// The name of the step that failed.
    pub fn step(&self) -> &str {
        &self.failure.step
    }
}
