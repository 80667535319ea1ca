//! Per-invocation saga context and caller options.

use common::{CorrelationId, SagaId};
use serde_json::{Map, Value};

/// Caller-supplied options for a saga run.
///
/// All fields are opaque pass-through values; the orchestrator only copies
/// them into the [`SagaContext`] and its log fields.
#[derive(Debug, Clone, Default)]
pub struct SagaOptions {
    /// Correlation id for remote calls; generated when absent.
    pub correlation_id: Option<CorrelationId>,
    /// The acting user, recorded in logs.
    pub user_id: Option<String>,
    /// Free-form values handed to every step.
    pub metadata: Map<String, Value>,
    /// Human-readable saga label, e.g. `"create_doctor"`.
    pub name: Option<String>,
}

impl SagaOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_correlation_id(mut self, id: impl Into<CorrelationId>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Adds one metadata entry, replacing any previous value for `key`.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// State shared with every step of one saga invocation.
///
/// Holds the original request alongside the correlation data. Steps receive
/// the previous step's output as their input, so anything that needs the
/// caller's original intent reads it from [`SagaContext::initial_data`].
#[derive(Debug, Clone)]
pub struct SagaContext<T> {
    saga_id: SagaId,
    saga_name: Option<String>,
    initial_data: T,
    correlation_id: CorrelationId,
    user_id: Option<String>,
    metadata: Map<String, Value>,
}

impl<T> SagaContext<T> {
    /// Builds the context for a run. A correlation id is generated when the
    /// caller did not provide one.
    pub fn new(saga_id: SagaId, initial_data: T, options: SagaOptions) -> Self {
        Self {
            saga_id,
            saga_name: options.name,
            initial_data,
            correlation_id: options
                .correlation_id
                .unwrap_or_else(CorrelationId::generate),
            user_id: options.user_id,
            metadata: options.metadata,
        }
    }

    /// The identifier of this run.
    pub fn saga_id(&self) -> SagaId {
        self.saga_id
    }

    /// The caller-supplied saga label, if any.
    pub fn saga_name(&self) -> Option<&str> {
        self.saga_name.as_deref()
    }

    /// The value the caller passed to `execute()`.
    pub fn initial_data(&self) -> &T {
        &self.initial_data
    }

    /// The correlation id, supplied or generated.
    pub fn correlation_id(&self) -> &CorrelationId {
        &self.correlation_id
    }

    /// The acting user, if the caller supplied one.
    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    /// Free-form caller metadata.
    pub fn metadata(&self) -> &Map<String, Value> {
        &self.metadata
    }
}
