//! Saga step definitions.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;

use crate::context::SagaContext;
use crate::error::StepError;

type ExecuteFn<T> =
    dyn Fn(T, Arc<SagaContext<T>>) -> BoxFuture<'static, Result<T, StepError>> + Send + Sync;

type CompensateFn<T> =
    dyn Fn(T, Arc<SagaContext<T>>) -> BoxFuture<'static, Result<(), StepError>> + Send + Sync;

/// One unit of work in a saga: a forward action and an optional undo.
///
/// `execute` receives the previous step's output (or the saga's initial data
/// for the first step) and produces this step's output. `compensate`, when
/// declared, receives that same output back if a later step fails.
///
/// ```
/// use std::time::Duration;
/// use saga::Step;
///
/// let step = Step::<u32>::new("double", |n, _ctx| async move { Ok(n * 2) })
///     .with_compensation(|_n, _ctx| async move { Ok(()) })
///     .with_timeout(Duration::from_secs(5));
///
/// assert_eq!(step.name(), "double");
/// assert!(step.has_compensation());
/// ```
pub struct Step<T> {
    name: String,
    execute: Box<ExecuteFn<T>>,
    compensate: Option<Box<CompensateFn<T>>>,
    timeout: Option<Duration>,
}

impl<T: Send + 'static> Step<T> {
    /// Creates a step with the given forward action and no compensation.
    pub fn new<F, Fut>(name: impl Into<String>, execute: F) -> Self
    where
        F: Fn(T, Arc<SagaContext<T>>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, StepError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            execute: Box::new(move |input, ctx| execute(input, ctx).boxed()),
            compensate: None,
            timeout: None,
        }
    }

    /// Declares the undo action, called with this step's own output.
    pub fn with_compensation<F, Fut>(mut self, compensate: F) -> Self
    where
        F: Fn(T, Arc<SagaContext<T>>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), StepError>> + Send + 'static,
    {
        self.compensate = Some(Box::new(move |output, ctx| compensate(output, ctx).boxed()));
        self
    }

    /// Bounds how long `execute` may run before the step counts as failed.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl<T> Step<T> {
    /// The step name, unique within a saga.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The step's own timeout, if declared.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Returns true if the step declares an undo action.
    pub fn has_compensation(&self) -> bool {
        self.compensate.is_some()
    }

    pub(crate) fn execute(
        &self,
        input: T,
        ctx: Arc<SagaContext<T>>,
    ) -> BoxFuture<'static, Result<T, StepError>> {
        (self.execute)(input, ctx)
    }

    /// Returns `None` when the step declares no compensation.
    pub(crate) fn compensate(
        &self,
        output: T,
        ctx: Arc<SagaContext<T>>,
    ) -> Option<BoxFuture<'static, Result<(), StepError>>> {
        self.compensate.as_ref().map(|f| f(output, ctx))
    }
}

impl<T> fmt::Debug for Step<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
            .field("name", &self.name)
            .field("compensates", &self.compensate.is_some())
            .field("timeout", &self.timeout)
            .finish()
    }
}
