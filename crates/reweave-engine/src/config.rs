use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Engine tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum simultaneously in-flight types. 1 fully serializes the run.
    pub max_in_flight: usize,
    /// Oracle refinement attempts per type before it fails.
    pub max_attempts: usize,
    /// Deduplicated example cap per type.
    pub max_examples_per_type: usize,
    /// Wall-clock bound on one type's whole attempt loop.
    pub task_timeout_secs: u64,
    /// Directory accepted components are persisted under.
    pub output_directory: String,
}

impl EngineConfig {
    /// The default configuration (fully serialized, 3 attempts).
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the concurrency bound; clamped to at least 1.
    #[must_use]
    pub fn with_max_in_flight(mut self, max: usize) -> Self {
        self.max_in_flight = max.max(1);
        self
    }

    /// Set the attempt bound; clamped to at least 1.
    #[must_use]
    pub fn with_max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Set the per-type example cap; clamped to at least 1.
    #[must_use]
    pub fn with_max_examples(mut self, max: usize) -> Self {
        self.max_examples_per_type = max.max(1);
        self
    }

    /// Set the directory accepted components are persisted under.
    #[must_use]
    pub fn with_output_directory(mut self, directory: impl Into<String>) -> Self {
        self.output_directory = directory.into();
        self
    }

    /// The per-type wall-clock bound as a [`Duration`].
    pub fn task_timeout(&self) -> Duration {
        Duration::from_secs(self.task_timeout_secs)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_in_flight: 1,
            max_attempts: 3,
            max_examples_per_type: 8,
            task_timeout_secs: 300,
            output_directory: "components".to_string(),
        }
    }
}
