//! # bulk-queue
//!
//! An in-process work-batching queue built on Tokio.
//!
//! ## Features
//!
//! - **Size and interval flushing**: a batch is flushed when it reaches
//!   `max_batch_size` items or when `flush_interval` elapses, whichever
//!   comes first
//! - **Single owner** of the pending buffer, so flushes never lose or
//!   duplicate items
//! - **Graceful shutdown** with a final flush
//! - **Failure isolation**: consumer errors and panics are reported and the
//!   queue keeps running
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use bulk_queue::queue::{BatchingQueue, BoxError, ConfigBuilder};
//! use std::time::Duration;
//!
//! let config = ConfigBuilder::default()
//!     .max_batch_size(100usize)
//!     .flush_interval(Duration::from_secs(5))
//!     .build()?;
//!
//! let queue = BatchingQueue::new(config, |batch: &[String]| {
//!     let docs = batch.to_vec();
//!     async move {
//!         send_bulk(docs).await?;
//!         Ok::<(), BoxError>(())
//!     }
//! })?;
//!
//! queue.submit("doc-1".to_string()).await?;
//! queue.shutdown().await;
//! ```
//!
//! ## Modules
//!
//! - [`queue`] - Batching queue, configuration and consumer trait

pub mod queue;
