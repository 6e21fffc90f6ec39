//! Engine configuration.

use agentrace_core::{HashAlgorithm, ReplayConfig};
use serde::{Deserialize, Serialize};

/// Settings shared by every replay and checkpoint operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Deadline applied to requests that do not set one
    pub default_timeout_seconds: u64,
    /// Algorithm used to fingerprint new checkpoints
    pub hash_algorithm: HashAlgorithm,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_timeout_seconds: ReplayConfig::DEFAULT_TIMEOUT_SECONDS,
            hash_algorithm: HashAlgorithm::default(),
        }
    }
}

impl EngineConfig {
    /// Set the default deadline
    #[must_use]
    pub fn with_default_timeout(mut self, seconds: u64) -> Self {
        self.default_timeout_seconds = seconds;
        self
    }

    /// Set the checkpoint hash algorithm
    #[must_use]
    pub fn with_hash_algorithm(mut self, algorithm: HashAlgorithm) -> Self {
        self.hash_algorithm = algorithm;
        self
    }

    /// A request config seeded with this engine's defaults
    #[must_use]
    pub fn replay_config(&self) -> ReplayConfig {
        ReplayConfig::default().with_timeout(self.default_timeout_seconds)
    }
}
