// src/queue/consumer.rs

use async_trait::async_trait;

use super::types::BoxError;

/// Downstream handler that receives flushed batches.
///
/// The batch is borrowed for the duration of the call and is never empty.
/// Implementations that need the items afterwards must copy them.
#[async_trait]
pub trait BatchConsumer<T>: Send + Sync {
    async fn process(&self, batch: &[T]) -> Result<(), BoxError>;
}

#[async_trait]
impl<T, F, Fut> BatchConsumer<T> for F
where
    F: Fn(&[T]) -> Fut + Send + Sync,
    Fut: std::future::Future<Output = Result<(), BoxError>> + Send,
    T: Send + Sync,
{
    async fn process(&self, batch: &[T]) -> Result<(), BoxError> {
        self(batch).await
    }
}
