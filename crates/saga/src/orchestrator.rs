//! Saga orchestrator: sequential execution with reverse compensation.

use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use common::SagaId;
use futures_util::FutureExt;
use tokio::time::Instant;
use tracing::Instrument;

use crate::config::OrchestratorConfig;
use crate::context::{SagaContext, SagaOptions};
use crate::error::{Result, SagaError, StepError};
use crate::events::SagaEvent;
use crate::listener::SagaListener;
use crate::result::{SagaMetadata, SagaResult, StepFailure};
use crate::step::Step;

/// Runs step lists as sagas.
///
/// Steps of one saga run strictly in declared order, each receiving the
/// previous step's output. When a step fails (or exceeds its timeout), the
/// steps that already completed are compensated in reverse order, best-effort,
/// and a failed [`SagaResult`] is returned. The orchestrator keeps no state
/// between runs, so one instance can drive any number of concurrent sagas.
#[derive(Default)]
pub struct SagaOrchestrator {
    config: OrchestratorConfig,
    listener: Option<Arc<dyn SagaListener>>,
}

impl SagaOrchestrator {
    /// Creates an orchestrator with no time budgets and no listener.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an orchestrator with the given time budgets.
    pub fn with_config(config: OrchestratorConfig) -> Self {
        Self {
            config,
            listener: None,
        }
    }

    /// Attaches a listener that receives every lifecycle event.
    pub fn with_listener(mut self, listener: Arc<dyn SagaListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    /// The time budgets applied to every run.
    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Executes `steps` in order, starting from `initial_data`.
    ///
    /// Step failures, including timeouts, never surface as `Err`: they are
    /// reported through the returned [`SagaResult`] after the compensation
    /// pass. `Err` is reserved for malformed step lists (empty, or with
    /// duplicate names), in which case no step runs.
    pub async fn execute<T>(
        &self,
        steps: &[Step<T>],
        initial_data: T,
        options: SagaOptions,
    ) -> Result<SagaResult<T>>
    where
        T: Clone + Send + Sync + 'static,
    {
        validate(steps)?;

        let saga_id = SagaId::new();
        let context = Arc::new(SagaContext::new(saga_id, initial_data.clone(), options));
        let span = tracing::info_span!(
            "saga",
            %saga_id,
            saga_name = context.saga_name().unwrap_or("unnamed"),
            correlation_id = %context.correlation_id(),
            user_id = context.user_id(),
        );

        Ok(self.run(steps, initial_data, context).instrument(span).await)
    }

    async fn run<T>(
        &self,
        steps: &[Step<T>],
        initial_data: T,
        context: Arc<SagaContext<T>>,
    ) -> SagaResult<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        metrics::counter!("saga_executions_total").increment(1);
        let started = Instant::now();
        let saga_id = context.saga_id();

        tracing::info!(steps = steps.len(), "saga started");
        self.emit(
            saga_id,
            SagaEvent::saga_started(
                saga_id,
                context.saga_name(),
                context.correlation_id(),
                steps.len(),
            ),
        )
        .await;

        // each completed step with the output its compensation will receive
        let mut executed: Vec<(&Step<T>, T)> = Vec::with_capacity(steps.len());
        let mut current = initial_data;

        for step in steps {
            tracing::debug!(step = step.name(), "saga step started");
            self.emit(saga_id, SagaEvent::step_started(step.name())).await;
            let step_started = Instant::now();

            match self.run_step(step, current, &context).await {
                Ok(output) => {
                    let elapsed_ms = as_millis(step_started.elapsed());
                    tracing::debug!(step = step.name(), elapsed_ms, "saga step completed");
                    self.emit(saga_id, SagaEvent::step_completed(step.name(), elapsed_ms))
                        .await;
                    executed.push((step, output.clone()));
                    current = output;
                }
                Err(error) => return self.fail(step, error, executed, &context, started).await,
            }
        }

        let duration = started.elapsed();
        metrics::counter!("saga_completed").increment(1);
        metrics::histogram!("saga_duration_seconds").record(duration.as_secs_f64());
        tracing::info!(duration_ms = as_millis(duration), "saga completed successfully");
        self.emit(saga_id, SagaEvent::saga_completed(as_millis(duration)))
            .await;

        SagaResult::completed(
            current,
            SagaMetadata {
                saga_id,
                executed_steps: step_names(&executed),
                compensated_steps: Vec::new(),
                duration,
            },
        )
    }

    /// Runs one step's `execute`, bounded by the step's timeout or the
    /// configured default. An elapsed timer drops the step's future.
    async fn run_step<T>(
        &self,
        step: &Step<T>,
        input: T,
        context: &Arc<SagaContext<T>>,
    ) -> std::result::Result<T, StepError>
    where
        T: Clone + Send + Sync + 'static,
    {
        let context = Arc::clone(context);
        let execution = catch_panic(step.name(), async move {
            step.execute(input, context).await
        });
        match step.timeout().or(self.config.default_step_timeout) {
            Some(limit) => tokio::time::timeout(limit, execution)
                .await
                .unwrap_or_else(|_| Err(StepError::timeout(step.name(), limit))),
            None => execution.await,
        }
    }

    async fn fail<T>(
        &self,
        step: &Step<T>,
        error: StepError,
        executed: Vec<(&Step<T>, T)>,
        context: &Arc<SagaContext<T>>,
        started: Instant,
    ) -> SagaResult<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        let saga_id = context.saga_id();
        let failure = StepFailure::new(step.name(), error);

        tracing::warn!(step = step.name(), error = %failure.message, "saga step failed");
        metrics::counter!("saga_step_failures_total", "step" => step.name().to_string())
            .increment(1);
        self.emit(
            saga_id,
            SagaEvent::step_failed(step.name(), failure.message.as_str()),
        )
        .await;

        let executed_steps = step_names(&executed);
        let compensated_steps = self.compensate(executed, step.name(), context).await;

        let duration = started.elapsed();
        metrics::counter!("saga_failed").increment(1);
        metrics::histogram!("saga_duration_seconds").record(duration.as_secs_f64());
        tracing::warn!(
            failed_step = step.name(),
            compensated = compensated_steps.len(),
            duration_ms = as_millis(duration),
            "saga failed"
        );
        self.emit(
            saga_id,
            SagaEvent::saga_failed(step.name(), failure.message.as_str(), as_millis(duration)),
        )
        .await;

        SagaResult::failed(
            failure,
            SagaMetadata {
                saga_id,
                executed_steps,
                compensated_steps,
                duration,
            },
        )
    }

    /// Compensates completed steps in reverse order.
    ///
    /// Returns the names of every step whose compensation was attempted.
    /// Errors are logged and never stop the unwind of earlier steps.
    async fn compensate<T>(
        &self,
        executed: Vec<(&Step<T>, T)>,
        failed_step: &str,
        context: &Arc<SagaContext<T>>,
    ) -> Vec<String>
    where
        T: Clone + Send + Sync + 'static,
    {
        let saga_id = context.saga_id();
        let mut compensated = Vec::new();

        tracing::info!(
            from_step = failed_step,
            executed = executed.len(),
            "compensation started"
        );
        self.emit(saga_id, SagaEvent::compensation_started(failed_step))
            .await;

        for (step, output) in executed.into_iter().rev() {
            if !step.has_compensation() {
                tracing::debug!(step = step.name(), "no compensation declared, skipping");
                continue;
            }
            let context = Arc::clone(context);
            let compensation = catch_panic(step.name(), async move {
                match step.compensate(output, context) {
                    Some(compensation) => compensation.await,
                    None => Ok(()),
                }
            });
            compensated.push(step.name().to_string());
            metrics::counter!("saga_compensations_total").increment(1);

            let outcome = match self.config.compensation_timeout {
                Some(limit) => tokio::time::timeout(limit, compensation)
                    .await
                    .unwrap_or_else(|_| Err(StepError::timeout(step.name(), limit))),
                None => compensation.await,
            };

            match outcome {
                Ok(()) => {
                    tracing::info!(step = step.name(), "compensation step completed");
                    self.emit(saga_id, SagaEvent::compensation_step_completed(step.name()))
                        .await;
                }
                Err(error) => {
                    tracing::error!(
                        step = step.name(),
                        error = %error,
                        "compensation step failed, continuing unwind"
                    );
                    metrics::counter!(
                        "saga_compensation_failures_total",
                        "step" => step.name().to_string()
                    )
                    .increment(1);
                    self.emit(
                        saga_id,
                        SagaEvent::compensation_step_failed(step.name(), error.to_string()),
                    )
                    .await;
                }
            }
        }

        compensated
    }

    async fn emit(&self, saga_id: SagaId, event: SagaEvent) {
        if let Some(listener) = &self.listener {
            listener.on_event(saga_id, &event).await;
        }
    }
}

impl fmt::Debug for SagaOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SagaOrchestrator")
            .field("config", &self.config)
            .field("listener", &self.listener.is_some())
            .finish()
    }
}

fn validate<T>(steps: &[Step<T>]) -> Result<()> {
    if steps.is_empty() {
        return Err(SagaError::NoSteps);
    }
    let mut seen = HashSet::with_capacity(steps.len());
    for step in steps {
        if !seen.insert(step.name()) {
            return Err(SagaError::DuplicateStep(step.name().to_string()));
        }
    }
    Ok(())
}

fn step_names<T>(executed: &[(&Step<T>, T)]) -> Vec<String> {
    executed
        .iter()
        .map(|(step, _)| step.name().to_string())
        .collect()
}

/// Turns a panic raised while polling `fut` into [`StepError::Panicked`].
async fn catch_panic<R>(
    step: &str,
    fut: impl Future<Output = std::result::Result<R, StepError>>,
) -> std::result::Result<R, StepError> {
    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(outcome) => outcome,
        Err(payload) => {
            tracing::error!(step, "step code panicked");
            Err(StepError::panicked(step, payload.as_ref()))
        }
    }
}

fn as_millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
