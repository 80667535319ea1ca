//! In-memory remote call client for testing.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::CorrelationId;
use serde_json::Value;
use tokio::sync::RwLock;

use super::{CallOptions, RemoteCallClient};
use crate::error::RemoteCallError;

type Handler = Arc<dyn Fn(Value) -> Result<Value, RemoteCallError> + Send + Sync>;
type Route = (String, String);

/// A call received by [`InMemoryRemoteClient`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub service: String,
    pub operation: String,
    pub payload: Value,
    pub correlation_id: Option<CorrelationId>,
}

#[derive(Default)]
struct InMemoryRemoteState {
    handlers: HashMap<Route, Handler>,
    failures: HashMap<Route, String>,
    latencies: HashMap<Route, Duration>,
    calls: Vec<RecordedCall>,
}

/// Remote client that dispatches to in-process handlers.
///
/// Handlers are registered per `(service, operation)`. Failures and latency
/// can be injected per route, and every call is recorded, including calls
/// that fail or time out.
#[derive(Clone, Default)]
pub struct InMemoryRemoteClient {
    state: Arc<RwLock<InMemoryRemoteState>>,
}

fn route(service: &str, operation: &str) -> Route {
    (service.to_string(), operation.to_string())
}

impl InMemoryRemoteClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the handler for `service.operation`, replacing any previous one.
    pub async fn register<F>(&self, service: &str, operation: &str, handler: F)
    where
        F: Fn(Value) -> Result<Value, RemoteCallError> + Send + Sync + 'static,
    {
        self.state
            .write()
            .await
            .handlers
            .insert(route(service, operation), Arc::new(handler));
    }

    /// Makes every call to `service.operation` fail with a remote error.
    pub async fn fail(&self, service: &str, operation: &str, message: impl Into<String>) {
        self.state
            .write()
            .await
            .failures
            .insert(route(service, operation), message.into());
    }

    pub async fn clear_failure(&self, service: &str, operation: &str) {
        self.state
            .write()
            .await
            .failures
            .remove(&route(service, operation));
    }

    /// Delays every reply from `service.operation` by `latency`.
    pub async fn set_latency(&self, service: &str, operation: &str, latency: Duration) {
        self.state
            .write()
            .await
            .latencies
            .insert(route(service, operation), latency);
    }

    /// All calls received so far, in arrival order.
    pub async fn calls(&self) -> Vec<RecordedCall> {
        self.state.read().await.calls.clone()
    }

    pub async fn calls_to(&self, service: &str, operation: &str) -> Vec<RecordedCall> {
        self.state
            .read()
            .await
            .calls
            .iter()
            .filter(|c| c.service == service && c.operation == operation)
            .cloned()
            .collect()
    }

    pub async fn call_count(&self) -> usize {
        self.state.read().await.calls.len()
    }
}

impl std::fmt::Debug for InMemoryRemoteClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryRemoteClient").finish_non_exhaustive()
    }
}

#[async_trait]
impl RemoteCallClient for InMemoryRemoteClient {
    async fn send(
        &self,
        service: &str,
        operation: &str,
        payload: Value,
        options: CallOptions,
    ) -> Result<Value, RemoteCallError> {
        let key = route(service, operation);
        let (handler, failure, latency) = {
            let mut state = self.state.write().await;
            state.calls.push(RecordedCall {
                service: service.to_string(),
                operation: operation.to_string(),
                payload: payload.clone(),
                correlation_id: options.correlation_id.clone(),
            });
            (
                state.handlers.get(&key).cloned(),
                state.failures.get(&key).cloned(),
                state.latencies.get(&key).copied(),
            )
        };

        let reply = async move {
            if let Some(latency) = latency {
                tokio::time::sleep(latency).await;
            }
            if let Some(message) = failure {
                return Err(RemoteCallError::Remote {
                    service: service.to_string(),
                    operation: operation.to_string(),
                    message,
                });
            }
            match handler {
                Some(handler) => handler(payload),
                None => Err(RemoteCallError::Transport(format!(
                    "no handler registered for {service}.{operation}"
                ))),
            }
        };

        match options.timeout {
            Some(limit) => tokio::time::timeout(limit, reply).await.unwrap_or_else(|_| {
                Err(RemoteCallError::Timeout {
                    service: service.to_string(),
                    operation: operation.to_string(),
                    timeout_ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
                })
            }),
            None => reply.await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_dispatches_to_handler_and_records_call() {
        let client = InMemoryRemoteClient::new();
        client
            .register("accounts", "create", |payload| {
                Ok(json!({"id": "acc-1", "email": payload["email"]}))
            })
            .await;

        let options = CallOptions {
            timeout: None,
            correlation_id: Some(CorrelationId::new("corr-1")),
        };
        let reply = client
            .send("accounts", "create", json!({"email": "a@b.c"}), options)
            .await
            .unwrap();

        assert_eq!(reply, json!({"id": "acc-1", "email": "a@b.c"}));
        let calls = client.calls().await;
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].service, "accounts");
        assert_eq!(calls[0].correlation_id, Some(CorrelationId::new("corr-1")));
    }

    #[tokio::test]
    async fn test_unknown_route_is_transport_error() {
        let client = InMemoryRemoteClient::new();
        let result = client
            .send("nowhere", "noop", Value::Null, CallOptions::default())
            .await;
        assert!(matches!(result, Err(RemoteCallError::Transport(_))));
        assert_eq!(client.call_count().await, 1);
    }

    #[tokio::test]
    async fn test_injected_failure_and_clear() {
        let client = InMemoryRemoteClient::new();
        client
            .register("booking", "commit_hold", |_| Ok(json!({"ok": true})))
            .await;
        client.fail("booking", "commit_hold", "hold expired").await;

        let result = client
            .send("booking", "commit_hold", Value::Null, CallOptions::default())
            .await;
        match result {
            Err(RemoteCallError::Remote { message, .. }) => assert_eq!(message, "hold expired"),
            other => panic!("expected remote error, got {other:?}"),
        }

        client.clear_failure("booking", "commit_hold").await;
        let result = client
            .send("booking", "commit_hold", Value::Null, CallOptions::default())
            .await;
        assert!(result.is_ok());
        assert_eq!(client.calls_to("booking", "commit_hold").await.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_latency_beyond_timeout_times_out() {
        let client = InMemoryRemoteClient::new();
        client.register("notify", "send", |_| Ok(Value::Null)).await;
        client
            .set_latency("notify", "send", Duration::from_secs(5))
            .await;

        let options = CallOptions {
            timeout: Some(Duration::from_millis(100)),
            correlation_id: None,
        };
        let result = client.send("notify", "send", Value::Null, options).await;
        assert!(matches!(
            result,
            Err(RemoteCallError::Timeout { timeout_ms: 100, .. })
        ));
    }
}
