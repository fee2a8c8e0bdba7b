use std::fmt;

use thiserror::Error;

/// Boxed error returned by batch consumers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur while submitting to or running a queue.
#[derive(Debug, Error)]
pub enum QueueError {
    /// The queue has begun shutting down and no longer accepts items.
    #[error("queue closed")]
    QueueClosed,

    /// The consumer returned an error for a batch.
    ///
    /// Preserves the source error for debugging.
    #[error("consumer failed")]
    ConsumerError(#[source] BoxError),

    /// The consumer panicked while processing a batch.
    #[error("consumer panicked: {0}")]
    ConsumerPanicked(String),

    /// The queue configuration was rejected at construction.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The queue was created outside of a Tokio runtime.
    #[error("no tokio runtime available")]
    NoRuntime(#[from] tokio::runtime::TryCurrentError),
}

/// What caused a batch to be flushed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlushTrigger {
    /// The buffer reached the configured batch size.
    Size,
    /// The flush interval elapsed with items pending.
    Interval,
    /// Final flush performed during shutdown.
    Shutdown,
}

impl fmt::Display for FlushTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FlushTrigger::Size => "size",
            FlushTrigger::Interval => "interval",
            FlushTrigger::Shutdown => "shutdown",
        };
        f.write_str(name)
    }
}

/// Lifecycle of a [`BatchingQueue`](super::BatchingQueue).
///
/// Transitions are one-way: `Running -> Draining -> Terminated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueState {
    /// Accepting submissions, timer active.
    Running,
    /// Shutdown requested, final flush in flight.
    Draining,
    /// All background tasks have exited.
    Terminated,
}

impl QueueState {
    pub(crate) fn as_u8(self) -> u8 {
        match self {
            QueueState::Running => 0,
            QueueState::Draining => 1,
            QueueState::Terminated => 2,
        }
    }

    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            0 => QueueState::Running,
            1 => QueueState::Draining,
            _ => QueueState::Terminated,
        }
    }
}

/// Report handed to the failure hook when a batch could not be processed.
#[derive(Debug)]
pub struct FlushFailure {
    /// Sequence number of the batch, starting at 1.
    pub sequence: u64,
    /// Number of items in the failed batch.
    pub batch_len: usize,
    /// What caused the batch to be flushed.
    pub trigger: FlushTrigger,
    /// `ConsumerError` or `ConsumerPanicked`.
    pub error: QueueError,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_consumer_error_preserves_source() {
        let source = std::io::Error::new(std::io::ErrorKind::Other, "bulk request rejected");
        let err = QueueError::ConsumerError(Box::new(source));

        assert!(err.source().is_some());
        assert_eq!(err.to_string(), "consumer failed");
    }

    #[test]
    fn test_error_display() {
        assert_eq!(QueueError::QueueClosed.to_string(), "queue closed");

        let err = QueueError::InvalidConfig("max_batch_size must be positive".to_string());
        assert_eq!(
            err.to_string(),
            "invalid configuration: max_batch_size must be positive"
        );

        let err = QueueError::ConsumerPanicked("boom".to_string());
        assert_eq!(err.to_string(), "consumer panicked: boom");
        assert!(err.source().is_none());
    }

    #[test]
    fn test_trigger_display() {
        assert_eq!(FlushTrigger::Size.to_string(), "size");
        assert_eq!(FlushTrigger::Interval.to_string(), "interval");
        assert_eq!(FlushTrigger::Shutdown.to_string(), "shutdown");
    }

    #[test]
    fn test_state_round_trips_through_u8() {
        for state in [QueueState::Running, QueueState::Draining, QueueState::Terminated] {
            assert_eq!(QueueState::from_u8(state.as_u8()), state);
        }
    }
}
