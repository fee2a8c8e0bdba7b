//! Simple queue example showing size and interval flushing.
//!
//! Run with: cargo run --example simple_queue

use async_trait::async_trait;
use bulk_queue::queue::{BatchConsumer, BatchingQueue, BoxError, ConfigBuilder, FlushFailure};
use std::time::Duration;
use tracing::info;

/// Consumer that prints batch information and rejects batches containing 13
struct PrintingConsumer;

#[async_trait]
impl BatchConsumer<u32> for PrintingConsumer {
    async fn process(&self, batch: &[u32]) -> Result<(), BoxError> {
        if batch.contains(&13) {
            return Err("unlucky batch".into());
        }
        info!(items = batch.len(), first = batch[0], "processing batch");
        // Simulate a bulk request
        tokio::time::sleep(Duration::from_millis(50)).await;
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,bulk_queue=debug".into()),
        )
        .init();

    let config = ConfigBuilder::default()
        .max_batch_size(10usize)
        .flush_interval(Duration::from_millis(500))
        .build()?;

    let queue = BatchingQueue::with_failure_hook(
        config,
        PrintingConsumer,
        |failure: &FlushFailure| {
            eprintln!(
                "batch {} ({} items, {}) failed: {}",
                failure.sequence, failure.batch_len, failure.trigger, failure.error
            );
        },
    )?;

    println!("Starting queue...");
    println!("- Batch size: 10");
    println!("- Flush interval: 500ms");
    println!("- Producers: 2 x 25 items\n");

    let mut producers = Vec::new();
    for p in 0..2u32 {
        let queue = queue.clone();
        producers.push(tokio::spawn(async move {
            for i in 0..25u32 {
                if let Err(e) = queue.submit(p * 100 + i).await {
                    eprintln!("Failed to submit item {}: {}", i, e);
                    break;
                }
                tokio::time::sleep(Duration::from_millis(30)).await;
            }
        }));
    }

    for producer in producers {
        producer.await?;
    }
    queue.shutdown().await;

    let stats = queue.stats();
    println!(
        "\nQueue terminated: {} batches, {} items, {} failed",
        stats.batches_flushed, stats.items_flushed, stats.failed_batches
    );
    Ok(())
}
