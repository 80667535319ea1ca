//! Hooks for observing saga lifecycle events.

use std::sync::Arc;

use async_trait::async_trait;
use common::SagaId;
use tokio::sync::RwLock;

use crate::events::SagaEvent;
use crate::trace::SagaTrace;

/// Receives every [`SagaEvent`] an orchestrator emits, in order.
///
/// Listeners observe; they cannot influence the saga outcome.
#[async_trait]
pub trait SagaListener: Send + Sync {
    async fn on_event(&self, saga_id: SagaId, event: &SagaEvent);
}

/// In-memory listener that keeps every event it sees.
#[derive(Debug, Clone, Default)]
pub struct RecordingListener {
    events: Arc<RwLock<Vec<(SagaId, SagaEvent)>>>,
}

impl RecordingListener {
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded events, across sagas, in arrival order.
    pub async fn events(&self) -> Vec<(SagaId, SagaEvent)> {
        self.events.read().await.clone()
    }

    /// Events of one saga, in arrival order.
    pub async fn events_for(&self, saga_id: SagaId) -> Vec<SagaEvent> {
        self.events
            .read()
            .await
            .iter()
            .filter(|(id, _)| *id == saga_id)
            .map(|(_, event)| event.clone())
            .collect()
    }

    /// Rebuilds the trace of one saga, or `None` if nothing was recorded.
    pub async fn trace(&self, saga_id: SagaId) -> Option<SagaTrace> {
        let events = self.events_for(saga_id).await;
        if events.is_empty() {
            return None;
        }
        Some(SagaTrace::from_events(&events))
    }
}

#[async_trait]
impl SagaListener for RecordingListener {
    async fn on_event(&self, saga_id: SagaId, event: &SagaEvent) {
        self.events.write().await.push((saga_id, event.clone()));
    }
}
