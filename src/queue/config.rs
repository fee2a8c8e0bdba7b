// src/queue/config.rs

use derive_builder::Builder;
use std::time::Duration;

use super::types::QueueError;

pub const DEFAULT_MAX_BATCH_SIZE: usize = 100;
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(20);
pub const DEFAULT_SUBMIT_CAPACITY: usize = 1024;
pub const DEFAULT_DISPATCH_CAPACITY: usize = 16;

/// Queue configuration.
///
/// [`ConfigBuilder::build`] reports rejected values as
/// [`ConfigBuilderError::ValidationError`]; it converts into
/// [`QueueError::InvalidConfig`] with `?`. [`Config::validate`] and
/// `BatchingQueue::new` report `QueueError::InvalidConfig` directly.
#[derive(Debug, Clone, Builder)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct Config {
    /// Number of pending items that triggers an immediate flush
    #[builder(default = "DEFAULT_MAX_BATCH_SIZE")]
    pub(crate) max_batch_size: usize,

    /// Maximum time between flushes while items are pending
    #[builder(default = "DEFAULT_FLUSH_INTERVAL")]
    pub(crate) flush_interval: Duration,

    /// Capacity of the hand-off channel between producers and the coordinator
    #[builder(default = "DEFAULT_SUBMIT_CAPACITY")]
    pub(crate) submit_capacity: usize,

    /// Number of frozen batches allowed to wait for the consumer
    #[builder(default = "DEFAULT_DISPATCH_CAPACITY")]
    pub(crate) dispatch_capacity: usize,
}

impl ConfigBuilder {
    /// Same checks as [`Config::validate`], surfaced through
    /// [`ConfigBuilderError::ValidationError`].
    fn validate(&self) -> Result<(), String> {
        check(
            self.max_batch_size.unwrap_or(DEFAULT_MAX_BATCH_SIZE),
            self.flush_interval.unwrap_or(DEFAULT_FLUSH_INTERVAL),
            self.submit_capacity.unwrap_or(DEFAULT_SUBMIT_CAPACITY),
            self.dispatch_capacity.unwrap_or(DEFAULT_DISPATCH_CAPACITY),
        )
    }
}

impl From<ConfigBuilderError> for QueueError {
    fn from(err: ConfigBuilderError) -> Self {
        match err {
            ConfigBuilderError::ValidationError(message) => QueueError::InvalidConfig(message),
            other => QueueError::InvalidConfig(other.to_string()),
        }
    }
}

fn check(
    max_batch_size: usize,
    flush_interval: Duration,
    submit_capacity: usize,
    dispatch_capacity: usize,
) -> Result<(), String> {
    if max_batch_size == 0 {
        return Err("max_batch_size must be positive".to_string());
    }
    if flush_interval.is_zero() {
        return Err("flush_interval must be positive".to_string());
    }
    if submit_capacity == 0 {
        return Err("submit_capacity must be positive".to_string());
    }
    if dispatch_capacity == 0 {
        return Err("dispatch_capacity must be positive".to_string());
    }
    Ok(())
}

impl Config {
    /// Creates a config with the given thresholds and default channel capacities
    pub fn new(max_batch_size: usize, flush_interval: Duration) -> Self {
        Config {
            max_batch_size,
            flush_interval,
            submit_capacity: DEFAULT_SUBMIT_CAPACITY,
            dispatch_capacity: DEFAULT_DISPATCH_CAPACITY,
        }
    }

    /// Rejects zero sizes, capacities and intervals
    pub fn validate(&self) -> Result<(), QueueError> {
        check(
            self.max_batch_size,
            self.flush_interval,
            self.submit_capacity,
            self.dispatch_capacity,
        )
        .map_err(QueueError::InvalidConfig)
    }

    #[inline]
    pub fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }

    #[inline]
    pub fn flush_interval(&self) -> Duration {
        self.flush_interval
    }

    #[inline]
    pub fn submit_capacity(&self) -> usize {
        self.submit_capacity
    }

    #[inline]
    pub fn dispatch_capacity(&self) -> usize {
        self.dispatch_capacity
    }
}

impl Default for Config {
    fn default() -> Self {
        Config::new(DEFAULT_MAX_BATCH_SIZE, DEFAULT_FLUSH_INTERVAL)
    }
}
