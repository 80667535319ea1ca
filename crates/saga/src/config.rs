//! Orchestrator configuration loaded from environment variables.

use std::time::Duration;

/// Time budgets applied by the orchestrator.
///
/// Reads from environment variables:
/// - `SAGA_DEFAULT_STEP_TIMEOUT_MS`: bound for steps that declare no timeout
///   of their own (default: unbounded)
/// - `SAGA_COMPENSATION_TIMEOUT_MS`: bound for each compensation call
///   (default: unbounded)
///
/// A missing, unparsable or zero value leaves the budget unbounded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrchestratorConfig {
    pub default_step_timeout: Option<Duration>,
    pub compensation_timeout: Option<Duration>,
}

impl OrchestratorConfig {
    pub const DEFAULT_STEP_TIMEOUT_VAR: &'static str = "SAGA_DEFAULT_STEP_TIMEOUT_MS";
    pub const COMPENSATION_TIMEOUT_VAR: &'static str = "SAGA_COMPENSATION_TIMEOUT_MS";

    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let millis = |key: &str| {
            lookup(key)
                .and_then(|v| v.trim().parse::<u64>().ok())
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis)
        };
        Self {
            default_step_timeout: millis(Self::DEFAULT_STEP_TIMEOUT_VAR),
            compensation_timeout: millis(Self::COMPENSATION_TIMEOUT_VAR),
        }
    }

    pub fn with_default_step_timeout(mut self, timeout: Duration) -> Self {
        self.default_step_timeout = Some(timeout);
        self
    }

    pub fn with_compensation_timeout(mut self, timeout: Duration) -> Self {
        self.compensation_timeout = Some(timeout);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_values() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.default_step_timeout, None);
        assert_eq!(config.compensation_timeout, None);
    }

    #[test]
    fn test_reads_millisecond_values() {
        let config = OrchestratorConfig::from_lookup(lookup(&[
            ("SAGA_DEFAULT_STEP_TIMEOUT_MS", "5000"),
            ("SAGA_COMPENSATION_TIMEOUT_MS", " 250 "),
        ]));
        assert_eq!(config.default_step_timeout, Some(Duration::from_secs(5)));
        assert_eq!(
            config.compensation_timeout,
            Some(Duration::from_millis(250))
        );
    }

    #[test]
    fn test_invalid_or_zero_values_are_unbounded() {
        let config = OrchestratorConfig::from_lookup(lookup(&[
            ("SAGA_DEFAULT_STEP_TIMEOUT_MS", "soon"),
            ("SAGA_COMPENSATION_TIMEOUT_MS", "0"),
        ]));
        assert_eq!(config, OrchestratorConfig::default());
    }

    #[test]
    fn test_builders() {
        let config = OrchestratorConfig::default()
            .with_default_step_timeout(Duration::from_secs(1))
            .with_compensation_timeout(Duration::from_secs(2));
        assert_eq!(config.default_step_timeout, Some(Duration::from_secs(1)));
        assert_eq!(config.compensation_timeout, Some(Duration::from_secs(2)));
    }
}
