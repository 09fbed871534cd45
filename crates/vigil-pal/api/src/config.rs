use serde::{Deserialize, Serialize};
use thiserror::Error;

/// What to do when a pending transition is resolved for a resource that has no global state.
///
/// This only happens when a resource was used without ever publishing an initial state, which
/// is a bookkeeping bug. The transition is always skipped; the policy only controls how loudly.
#[derive(Debug, Default, Serialize, Deserialize, Copy, Clone, PartialEq, Eq, Hash)]
pub enum MissingStatePolicy {
    Ignore,
    #[default]
    Warn,
    Panic,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct TrackingConfig {
    pub missing_state: MissingStatePolicy,
    /// Check that every requested state is supported by the queue the list is recorded for.
    pub validate_queue_states: bool,
    /// Resolved barriers are flushed automatically once this many have accumulated. `None`
    /// only flushes before commands that depend on them.
    pub flush_threshold: Option<usize>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unable to parse tracking config: {0}")]
    Parse(#[from] ron::error::SpannedError),
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            missing_state: MissingStatePolicy::default(),
            validate_queue_states: cfg!(debug_assertions),
            flush_threshold: None,
        }
    }
}

impl TrackingConfig {
    /// Parses a config from [RON](https://github.com/ron-rs/ron). Missing fields take their
    /// default values.
    pub fn from_ron(source: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(source)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_ron_uses_defaults() {
        let config = TrackingConfig::from_ron("(missing_state: Panic, flush_threshold: Some(16))")
            .unwrap();
        assert_eq!(config.missing_state, MissingStatePolicy::Panic);
        assert_eq!(config.flush_threshold, Some(16));
        assert_eq!(config.validate_queue_states, cfg!(debug_assertions));
    }

    #[test]
    fn bad_ron_is_an_error() {
        assert!(TrackingConfig::from_ron("(missing_state: Sometimes)").is_err());
    }
}
