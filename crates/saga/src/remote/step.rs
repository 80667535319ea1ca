//! Saga steps backed by a single remote call.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use super::{RemoteCall, RemoteCallClient};
use crate::context::SagaContext;
use crate::error::StepError;
use crate::step::Step;

type RequestFn<T> = dyn Fn(&T, &SagaContext<T>) -> Result<Value, StepError> + Send + Sync;
type MergeFn<T> = dyn Fn(T, Value) -> Result<T, StepError> + Send + Sync;

/// Builds a [`Step`] whose `execute` is one remote call and whose
/// `compensate`, if declared, is the semantically inverse call.
///
/// `request` turns the step input into the call payload, `merge` folds the
/// reply back into the value handed to the next step. The inverse request is
/// built from this step's own output, so it can reference ids the forward
/// call created.
pub struct RemoteStep<T> {
    name: String,
    client: Arc<dyn RemoteCallClient>,
    call: RemoteCall,
    request: Arc<RequestFn<T>>,
    merge: Arc<MergeFn<T>>,
    inverse: Option<(RemoteCall, Arc<RequestFn<T>>)>,
    timeout: Option<Duration>,
}

impl<T: Send + Sync + 'static> RemoteStep<T> {
    pub fn new<R, M>(
        name: impl Into<String>,
        client: Arc<dyn RemoteCallClient>,
        call: RemoteCall,
        request: R,
        merge: M,
    ) -> Self
    where
        R: Fn(&T, &SagaContext<T>) -> Result<Value, StepError> + Send + Sync + 'static,
        M: Fn(T, Value) -> Result<T, StepError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            client,
            call,
            request: Arc::new(request),
            merge: Arc::new(merge),
            inverse: None,
            timeout: None,
        }
    }

    /// Declares the inverse call issued during compensation.
    pub fn with_inverse<R>(mut self, call: RemoteCall, request: R) -> Self
    where
        R: Fn(&T, &SagaContext<T>) -> Result<Value, StepError> + Send + Sync + 'static,
    {
        self.inverse = Some((call, Arc::new(request)));
        self
    }

    /// Orchestrator-level bound on the whole step, on top of the call's own
    /// client timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Step<T> {
        let RemoteStep {
            name,
            client,
            call,
            request,
            merge,
            inverse,
            timeout,
        } = self;

        let forward_client = Arc::clone(&client);
        let mut step = Step::new(name, move |input: T, ctx: Arc<SagaContext<T>>| {
            forward(
                Arc::clone(&forward_client),
                call.clone(),
                Arc::clone(&request),
                Arc::clone(&merge),
                input,
                ctx,
            )
        });

        if let Some((inverse_call, inverse_request)) = inverse {
            step = step.with_compensation(move |output: T, ctx: Arc<SagaContext<T>>| {
                undo(
                    Arc::clone(&client),
                    inverse_call.clone(),
                    Arc::clone(&inverse_request),
                    output,
                    ctx,
                )
            });
        }

        match timeout {
            Some(timeout) => step.with_timeout(timeout),
            None => step,
        }
    }
}

async fn forward<T>(
    client: Arc<dyn RemoteCallClient>,
    call: RemoteCall,
    request: Arc<RequestFn<T>>,
    merge: Arc<MergeFn<T>>,
    input: T,
    ctx: Arc<SagaContext<T>>,
) -> Result<T, StepError> {
    let payload = request(&input, ctx.as_ref())?;
    tracing::debug!(call = %call, "remote call");
    let reply = call
        .send(client.as_ref(), payload, ctx.correlation_id())
        .await?;
    merge(input, reply)
}

async fn undo<T>(
    client: Arc<dyn RemoteCallClient>,
    call: RemoteCall,
    request: Arc<RequestFn<T>>,
    output: T,
    ctx: Arc<SagaContext<T>>,
) -> Result<(), StepError> {
    let payload = request(&output, ctx.as_ref())?;
    tracing::debug!(call = %call, "inverse remote call");
    call.send(client.as_ref(), payload, ctx.correlation_id())
        .await?;
    Ok(())
}

/// Merge function that ignores the reply and passes the input through.
///
/// Suits fire-and-forget emissions such as notification dispatch.
pub fn keep_input<T>(input: T, _reply: Value) -> Result<T, StepError> {
    Ok(input)
}

/// Merge function for JSON payloads: stores the reply under `key` in the
/// input object, so later steps see everything created so far.
pub fn insert_reply(key: &'static str) -> impl Fn(Value, Value) -> Result<Value, StepError> {
    move |mut input: Value, reply: Value| match input.as_object_mut() {
        Some(object) => {
            object.insert(key.to_string(), reply);
            Ok(input)
        }
        None => Err(StepError::rejected(format!(
            "cannot store '{key}' reply: step input is not a JSON object"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::SagaOptions;
    use crate::remote::InMemoryRemoteClient;
    use common::{CorrelationId, SagaId};
    use serde_json::json;

    fn ctx(initial: Value) -> Arc<SagaContext<Value>> {
        Arc::new(SagaContext::new(
            SagaId::new(),
            initial,
            SagaOptions::new().with_correlation_id("corr-9"),
        ))
    }

    #[tokio::test]
    async fn test_forward_call_merges_reply() {
        let client = InMemoryRemoteClient::new();
        client
            .register("accounts", "create", |p| Ok(json!({"id": "acc-1", "email": p["email"]})))
            .await;

        let step = RemoteStep::new(
            "create_account",
            Arc::new(client.clone()),
            RemoteCall::new("accounts", "create"),
            |input: &Value, _ctx: &SagaContext<Value>| Ok(json!({"email": input["email"]})),
            insert_reply("account"),
        )
        .build();

        let input = json!({"email": "dr@clinic.test"});
        let output = step.execute(input.clone(), ctx(input)).await.unwrap();

        assert_eq!(output["account"]["id"], "acc-1");
        assert_eq!(output["email"], "dr@clinic.test");
        let calls = client.calls().await;
        assert_eq!(calls[0].correlation_id, Some(CorrelationId::new("corr-9")));
        assert!(!step.has_compensation());
    }

    #[tokio::test]
    async fn test_inverse_call_uses_step_output() {
        let client = InMemoryRemoteClient::new();
        client.register("accounts", "delete", |_| Ok(Value::Null)).await;

        let step = RemoteStep::new(
            "create_account",
            Arc::new(client.clone()),
            RemoteCall::new("accounts", "create"),
            |_input: &Value, _ctx: &SagaContext<Value>| Ok(Value::Null),
            keep_input,
        )
        .with_inverse(
            RemoteCall::new("accounts", "delete"),
            |output: &Value, _ctx: &SagaContext<Value>| Ok(json!({"id": output["account"]["id"]})),
        )
        .build();

        assert!(step.has_compensation());
        let output = json!({"account": {"id": "acc-7"}});
        step.compensate(output, ctx(Value::Null))
            .expect("inverse declared")
            .await
            .unwrap();

        let calls = client.calls_to("accounts", "delete").await;
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].payload, json!({"id": "acc-7"}));
    }

    #[tokio::test]
    async fn test_remote_failure_becomes_step_error() {
        let client = InMemoryRemoteClient::new();
        client.register("booking", "commit_hold", |_| Ok(Value::Null)).await;
        client.fail("booking", "commit_hold", "hold expired").await;

        let step = RemoteStep::new(
            "commit_hold",
            Arc::new(client),
            RemoteCall::new("booking", "commit_hold").with_timeout(Duration::from_secs(1)),
            |_input: &Value, _ctx: &SagaContext<Value>| Ok(Value::Null),
            keep_input,
        )
        .build();

        let err = step
            .execute(Value::Null, ctx(Value::Null))
            .await
            .unwrap_err();
        assert!(matches!(err, StepError::Remote(_)));
        assert_eq!(err.to_string(), "booking.commit_hold failed: hold expired");
    }

    #[test]
    fn test_insert_reply_rejects_non_objects() {
        let merge = insert_reply("profile");
        let err = merge(json!([1, 2]), json!({})).unwrap_err();
        assert!(err.to_string().contains("not a JSON object"));
    }

    #[test]
    fn test_build_carries_timeout() {
        let step = RemoteStep::new(
            "notify",
            Arc::new(InMemoryRemoteClient::new()),
            RemoteCall::new("notifications", "send"),
            |_input: &Value, _ctx: &SagaContext<Value>| Ok(Value::Null),
            keep_input,
        )
        .with_timeout(Duration::from_millis(500))
        .build();
        assert_eq!(step.timeout(), Some(Duration::from_millis(500)));
    }
}
