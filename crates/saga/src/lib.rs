//! Saga orchestration engine.
//!
//! Executes a sequence of remote operations as one logical transaction across
//! services that share no database and cannot take part in a two-phase commit.
//!
//! A saga is a list of [`Step`]s run strictly in order. Each step receives the
//! previous step's output; the caller's original request stays reachable
//! through [`SagaContext::initial_data`]. If a step fails or exceeds its
//! timeout, the steps that already completed are compensated in reverse order,
//! best-effort, and the [`SagaResult`] reports which steps ran, which were
//! compensated and how long the whole run took.
//!
//! The engine keeps no state between runs: no saga journal, no locks, no
//! retries. Remote calls go through a [`remote::RemoteCallClient`] supplied by
//! the caller.

pub mod config;
pub mod context;
pub mod error;
pub mod events;
pub mod listener;
pub mod orchestrator;
pub mod remote;
pub mod result;
pub mod state;
pub mod step;
pub mod trace;

pub use common::{CorrelationId, SagaId};
pub use config::OrchestratorConfig;
pub use context::{SagaContext, SagaOptions};
pub use error::{RemoteCallError, Result, SagaError, StepError};
pub use events::SagaEvent;
pub use listener::{RecordingListener, SagaListener};
pub use orchestrator::SagaOrchestrator;
pub use remote::{
    CallOptions, InMemoryRemoteClient, RecordedCall, RemoteCall, RemoteCallClient, RemoteStep,
};
pub use result::{SagaFailure, SagaMetadata, SagaResult, StepFailure};
pub use state::SagaState;
pub use step::Step;
pub use trace::SagaTrace;
