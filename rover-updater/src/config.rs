use crate::error::UpdateError;
use serde::Deserialize;

/// How update requests reach the drain loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateMode {
    /// Requests run immediately, subject to the reentrancy guards.
    #[default]
    Sync,
    /// Requests are parked on the scheduler until `UpdateTree::flush`.
    Batched,
}

impl UpdateMode {
    pub fn as_str(self) -> &'static str {
        match self {
            UpdateMode::Sync => "sync",
            UpdateMode::Batched => "batched",
        }
    }
}

pub const DEFAULT_MAX_DRAIN_STEPS: usize = 100_000;

/// Runtime config for an update tree.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UpdaterConfig {
    pub mode: UpdateMode,
    /// Upper bound on jobs executed by one drain before it is aborted
    pub max_drain_steps: usize,
    /// Let a parent re-render with identical props skip the child's render call
    pub reuse_unchanged_output: bool,
}

impl UpdaterConfig {
    pub fn new(mode: UpdateMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub fn from_json(source: &str) -> Result<Self, UpdateError> {
        Ok(serde_json::from_str(source)?)
    }

    pub fn with_max_drain_steps(mut self, steps: usize) -> Self {
        self.max_drain_steps = steps;
        self
    }

    pub fn with_output_reuse(mut self, enabled: bool) -> Self {
        self.reuse_unchanged_output = enabled;
        self
    }

    pub fn mode(&self) -> UpdateMode {
        self.mode
    }
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self {
            mode: UpdateMode::Sync,
            max_drain_steps: DEFAULT_MAX_DRAIN_STEPS,
            reuse_unchanged_output: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = UpdaterConfig::default();
        assert_eq!(config.mode(), UpdateMode::Sync);
        assert_eq!(config.max_drain_steps, DEFAULT_MAX_DRAIN_STEPS);
        assert!(config.reuse_unchanged_output);
    }

    #[test]
    fn test_from_json_partial() {
        let config = UpdaterConfig::from_json(r#"{ "mode": "batched" }"#).unwrap();
        assert_eq!(config.mode(), UpdateMode::Batched);
        assert_eq!(config.max_drain_steps, DEFAULT_MAX_DRAIN_STEPS);
    }

    #[test]
    fn test_from_json_rejects_unknown_mode() {
        let err = UpdaterConfig::from_json(r#"{ "mode": "eventually" }"#).unwrap_err();
        assert!(matches!(err, UpdateError::Config(_)));
    }

    #[test]
    fn test_mode_names() {
        assert_eq!(UpdateMode::Sync.as_str(), "sync");
        assert_eq!(UpdateMode::Batched.as_str(), "batched");
    }
}
