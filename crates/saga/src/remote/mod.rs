//! Remote call client contract used by saga steps.
//!
//! The engine never talks to the message broker itself. Steps call services
//! through a [`RemoteCallClient`], and [`RemoteStep`] wires one forward call
//! and its inverse into a [`Step`](crate::Step).

pub mod in_memory;
pub mod step;

use std::time::Duration;

use async_trait::async_trait;
use common::CorrelationId;
use serde_json::Value;

use crate::error::RemoteCallError;

pub use in_memory::{InMemoryRemoteClient, RecordedCall};
pub use step::RemoteStep;

/// Per-call options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallOptions {
    /// Maximum time to wait for the reply. `None` defers to the client.
    pub timeout: Option<Duration>,
    pub correlation_id: Option<CorrelationId>,
}

/// Request/reply RPC client.
#[async_trait]
pub trait RemoteCallClient: Send + Sync {
    /// Sends `payload` to `operation` on `service` and waits for the reply.
    async fn send(
        &self,
        service: &str,
        operation: &str,
        payload: Value,
        options: CallOptions,
    ) -> Result<Value, RemoteCallError>;
}

/// Address and time budget of one remote operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCall {
    pub service: String,
    pub operation: String,
    pub timeout: Option<Duration>,
}

impl RemoteCall {
    pub fn new(service: impl Into<String>, operation: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            operation: operation.into(),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sends this call through `client` with the given correlation id.
    pub async fn send(
        &self,
        client: &dyn RemoteCallClient,
        payload: Value,
        correlation_id: &CorrelationId,
    ) -> Result<Value, RemoteCallError> {
        let options = CallOptions {
            timeout: self.timeout,
            correlation_id: Some(correlation_id.clone()),
        };
        client
            .send(&self.service, &self.operation, payload, options)
            .await
    }
}

impl std::fmt::Display for RemoteCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.service, self.operation)
    }
}
