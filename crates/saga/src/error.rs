//! Saga error types.

use std::any::Any;
use std::time::Duration;

use thiserror::Error;

/// Errors raised for malformed saga definitions.
///
/// Step failures never surface here; they are captured in
/// [`SagaResult`](crate::SagaResult) instead.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SagaError {
    /// The step list was empty.
    #[error("Saga has no steps")]
    NoSteps,

    /// Two steps share the same name.
    #[error("Duplicate step name '{0}'")]
    DuplicateStep(String),
}

/// Failure of a single step's `execute` or `compensate` function.
#[derive(Debug, Error)]
pub enum StepError {
    /// The step did not settle within its time budget.
    #[error("Step '{step}' timed out after {timeout_ms}ms")]
    Timeout { step: String, timeout_ms: u64 },

    /// A remote call made by the step failed.
    #[error(transparent)]
    Remote(#[from] RemoteCallError),

    /// The step rejected its input (validation, business rule, ...).
    #[error("{0}")]
    Rejected(String),

    /// Any other error raised by step code.
    #[error(transparent)]
    Other(Box<dyn std::error::Error + Send + Sync>),

    /// Step code panicked while executing or compensating.
    #[error("Step '{step}' panicked: {message}")]
    Panicked { step: String, message: String },
}

impl StepError {
    /// Creates a timeout error for the named step.
    pub fn timeout(step: impl Into<String>, limit: Duration) -> Self {
        StepError::Timeout {
            step: step.into(),
            timeout_ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// Creates a rejection with the given message.
    pub fn rejected(message: impl Into<String>) -> Self {
        StepError::Rejected(message.into())
    }

    /// Wraps an arbitrary error raised by step code.
    pub fn other(error: impl std::error::Error + Send + Sync + 'static) -> Self {
        StepError::Other(Box::new(error))
    }

    /// Converts a caught panic payload into an error for the named step.
    pub(crate) fn panicked(step: impl Into<String>, payload: &(dyn Any + Send)) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        StepError::Panicked {
            step: step.into(),
            message,
        }
    }

    /// Returns true if the step was cut off by a timeout, either the
    /// orchestrator's or the remote client's.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            StepError::Timeout { .. } | StepError::Remote(RemoteCallError::Timeout { .. })
        )
    }
}

impl From<serde_json::Error> for StepError {
    fn from(e: serde_json::Error) -> Self {
        StepError::Remote(RemoteCallError::Serialization(e))
    }
}

/// Errors returned by a [`RemoteCallClient`](crate::remote::RemoteCallClient).
#[derive(Debug, Error)]
pub enum RemoteCallError {
    /// No reply arrived within the call's timeout.
    #[error("Call to {service}.{operation} timed out after {timeout_ms}ms")]
    Timeout {
        service: String,
        operation: String,
        timeout_ms: u64,
    },

    /// The remote service replied with an error.
    #[error("{service}.{operation} failed: {message}")]
    Remote {
        service: String,
        operation: String,
        message: String,
    },

    /// The request could not be delivered.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The payload or reply could not be (de)serialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenience type alias for saga definition results.
pub type Result<T> = std::result::Result<T, SagaError>;
