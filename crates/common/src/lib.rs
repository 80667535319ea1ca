//! Shared identifier types used across the platform's services.

mod types;

pub use types::{CorrelationId, SagaId};
