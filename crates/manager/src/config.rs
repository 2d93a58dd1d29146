use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

/// Scheduling and batching knobs for a [`VectorManager`](crate::VectorManager).
///
/// Timer values are in milliseconds. Changes made through
/// [`VectorManager::set_config`](crate::VectorManager::set_config) take effect
/// at the next scheduling decision; timers already sleeping keep their
/// duration.
///
/// # Examples
///
/// ```
/// use vecbatch_manager::ManagerConfig;
///
/// let config = ManagerConfig::from_toml("max_parallel_requests = 4").unwrap();
/// assert_eq!(config.max_parallel_requests, 4);
/// assert_eq!(config.max_batch_size, 28_672);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Character budget of one engine call. Inputs longer than this are
    /// truncated to it.
    pub max_batch_size: usize,
    /// Maximum number of engine calls in one dispatch wave.
    pub max_parallel_requests: usize,
    /// Short debounce after the first enqueue.
    pub fast_queue_ms: u64,
    /// Total debounce once a burst is detected. Must be at least
    /// `fast_queue_ms`.
    pub wait_queue_ms: u64,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            max_batch_size: 28_672,
            max_parallel_requests: 10,
            fast_queue_ms: 10,
            wait_queue_ms: 100,
        }
    }
}

impl ManagerConfig {
    /// Parse a configuration from TOML. Missing fields take their defaults.
    pub fn from_toml(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the invariants the scheduler relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_batch_size == 0 {
            return Err(ConfigError::Invalid(
                "max_batch_size must be greater than zero".to_owned(),
            ));
        }
        if self.max_parallel_requests == 0 {
            return Err(ConfigError::Invalid(
                "max_parallel_requests must be greater than zero".to_owned(),
            ));
        }
        if self.wait_queue_ms < self.fast_queue_ms {
            return Err(ConfigError::Invalid(format!(
                "wait_queue_ms ({}) must not be less than fast_queue_ms ({})",
                self.wait_queue_ms, self.fast_queue_ms
            )));
        }
        Ok(())
    }

    /// Duration of the first debounce stage.
    pub fn fast_queue_time(&self) -> Duration {
        Duration::from_millis(self.fast_queue_ms)
    }

    /// Extra wait added once more than one request is queued.
    pub fn extend_time(&self) -> Duration {
        Duration::from_millis(self.wait_queue_ms.saturating_sub(self.fast_queue_ms))
    }
}
