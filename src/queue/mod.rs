pub mod config;
pub mod consumer;
pub mod engine;
pub mod stats;
pub mod types;

pub use config::{Config, ConfigBuilder, ConfigBuilderError};
pub use consumer::BatchConsumer;
pub use engine::{BatchingQueue, FailureHook};
pub use stats::QueueStats;
pub use types::{BoxError, FlushFailure, FlushTrigger, QueueError, QueueState};
