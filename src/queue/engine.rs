use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::config::Config;
use super::consumer::BatchConsumer;
use super::stats::{QueueMetrics, QueueStats};
use super::types::{FlushFailure, FlushTrigger, QueueError, QueueState};

/// Callback invoked for every batch the consumer failed to process.
pub type FailureHook = Arc<dyn Fn(&FlushFailure) + Send + Sync>;

/// A frozen snapshot of the pending buffer on its way to the consumer.
struct Batch<T> {
    sequence: u64,
    trigger: FlushTrigger,
    items: Vec<T>,
}

struct Shared {
    state: AtomicU8,
    metrics: QueueMetrics,
}

impl Shared {
    fn state(&self) -> QueueState {
        QueueState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Moves the state forward; never backwards.
    fn advance(&self, to: QueueState) {
        self.state.fetch_max(to.as_u8(), Ordering::AcqRel);
    }
}

/// Background task handles; a slot is cleared only once its task has exited.
struct Tasks {
    coordinator: Option<JoinHandle<()>>,
    dispatcher: Option<JoinHandle<()>>,
}

impl Tasks {
    fn is_joined(&self) -> bool {
        self.coordinator.is_none() && self.dispatcher.is_none()
    }
}

async fn join_task(slot: &mut Option<JoinHandle<()>>, name: &'static str) {
    if let Some(handle) = slot.as_mut() {
        let result = handle.await;
        *slot = None;
        if let Err(e) = result {
            error!(task = name, error = %e, "background task failed");
        }
    }
}

/// In-process queue that groups submitted items into batches.
///
/// A single coordinator task owns the pending buffer and flushes it when it
/// reaches `max_batch_size` items or when `flush_interval` elapses, whichever
/// comes first. Frozen batches are handed to a dispatcher task that calls the
/// [`BatchConsumer`] one batch at a time, so a slow consumer never blocks
/// accumulation directly.
///
/// Handles are cheap to clone; all clones share the same queue.
pub struct BatchingQueue<T> {
    config: Arc<Config>,
    sender: mpsc::Sender<T>,
    done: CancellationToken,
    shared: Arc<Shared>,
    tasks: Arc<Mutex<Tasks>>,
}

impl<T> Clone for BatchingQueue<T> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            sender: self.sender.clone(),
            done: self.done.clone(),
            shared: self.shared.clone(),
            tasks: self.tasks.clone(),
        }
    }
}

impl<T> BatchingQueue<T>
where
    T: Send + Sync + 'static,
{
    /// Validates `config` and starts the coordinator and dispatcher tasks.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new<C>(config: Config, consumer: C) -> Result<Self, QueueError>
    where
        C: BatchConsumer<T> + 'static,
    {
        Self::start(config, Arc::new(consumer), None)
    }

    /// Like [`BatchingQueue::new`], additionally reporting every failed
    /// batch to `hook`.
    pub fn with_failure_hook<C, H>(config: Config, consumer: C, hook: H) -> Result<Self, QueueError>
    where
        C: BatchConsumer<T> + 'static,
        H: Fn(&FlushFailure) + Send + Sync + 'static,
    {
        let hook: FailureHook = Arc::new(hook);
        Self::start(config, Arc::new(consumer), Some(hook))
    }

    fn start(
        config: Config,
        consumer: Arc<dyn BatchConsumer<T>>,
        hook: Option<FailureHook>,
    ) -> Result<Self, QueueError> {
        config.validate()?;
        let runtime = tokio::runtime::Handle::try_current()?;

        let config = Arc::new(config);
        let (sender, receiver) = mpsc::channel(config.submit_capacity());
        let (batch_tx, batch_rx) = mpsc::channel(config.dispatch_capacity());
        let done = CancellationToken::new();
        let shared = Arc::new(Shared {
            state: AtomicU8::new(QueueState::Running.as_u8()),
            metrics: QueueMetrics::default(),
        });

        let coordinator = runtime.spawn(Self::coordinate(
            receiver,
            batch_tx,
            done.clone(),
            config.clone(),
            shared.clone(),
        ));
        let dispatcher = runtime.spawn(Self::dispatch(batch_rx, consumer, hook, shared.clone()));

        info!(
            max_batch_size = config.max_batch_size(),
            flush_interval = ?config.flush_interval(),
            "batching queue started"
        );

        Ok(Self {
            config,
            sender,
            done,
            shared,
            tasks: Arc::new(Mutex::new(Tasks {
                coordinator: Some(coordinator),
                dispatcher: Some(dispatcher),
            })),
        })
    }

    /// Enqueues one item.
    ///
    /// Waits only for room in the hand-off channel. Returns
    /// [`QueueError::QueueClosed`] once shutdown has begun.
    pub async fn submit(&self, item: T) -> Result<(), QueueError> {
        if self.done.is_cancelled() {
            return Err(self.reject());
        }

        tokio::select! {
            biased;
            _ = self.done.cancelled() => Err(self.reject()),
            sent = self.sender.send(item) => match sent {
                Ok(()) => {
                    self.shared.metrics.record_submit();
                    Ok(())
                }
                Err(_) => Err(self.reject()),
            },
        }
    }

    /// Blocking variant of [`submit`](Self::submit) for producers on plain
    /// threads. Panics if called from within an async context.
    pub fn blocking_submit(&self, item: T) -> Result<(), QueueError> {
        if self.done.is_cancelled() {
            return Err(self.reject());
        }

        self.sender
            .blocking_send(item)
            .map_err(|_| self.reject())?;
        self.shared.metrics.record_submit();
        Ok(())
    }

    /// Stops accepting items, flushes whatever is pending and waits until the
    /// consumer has returned from the final batch.
    ///
    /// Calling it again, or from several handles at once, is harmless: every
    /// caller returns once the queue has terminated. Dropping the returned
    /// future early leaves the tasks in place for the next caller to join.
    pub async fn shutdown(&self) {
        let mut tasks = self.tasks.lock().await;
        if tasks.is_joined() {
            return;
        }

        if !self.done.is_cancelled() {
            info!("batching queue shutting down");
            self.shared.advance(QueueState::Draining);
            self.done.cancel();
        }

        join_task(&mut tasks.coordinator, "coordinator").await;
        join_task(&mut tasks.dispatcher, "dispatcher").await;
        self.shared.advance(QueueState::Terminated);

        let stats = self.stats();
        info!(
            batches = stats.batches_flushed,
            items = stats.items_flushed,
            failed = stats.failed_batches,
            "batching queue terminated"
        );
    }

    pub fn state(&self) -> QueueState {
        self.shared.state()
    }

    /// True once shutdown has begun.
    pub fn is_closed(&self) -> bool {
        self.done.is_cancelled() || self.state() != QueueState::Running
    }

    pub fn stats(&self) -> QueueStats {
        self.shared.metrics.snapshot()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn reject(&self) -> QueueError {
        self.shared.metrics.record_reject();
        warn!("submit rejected, queue closed");
        QueueError::QueueClosed
    }

    async fn coordinate(
        mut receiver: mpsc::Receiver<T>,
        batches: mpsc::Sender<Batch<T>>,
        done: CancellationToken,
        config: Arc<Config>,
        shared: Arc<Shared>,
    ) {
        let max_batch_size = config.max_batch_size();
        let period = config.flush_interval();
        let mut flusher = Flusher {
            batches,
            shared: shared.clone(),
            max_batch_size,
            sequence: 0,
        };
        let mut pending: Vec<T> = Vec::with_capacity(max_batch_size);
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                _ = done.cancelled() => {
                    debug!("coordinator received shutdown signal");
                    break;
                }

                _ = ticker.tick() => {
                    if !pending.is_empty() {
                        flusher.flush(&mut pending, FlushTrigger::Interval).await;
                    }
                }

                item = receiver.recv() => {
                    match item {
                        Some(item) => {
                            pending.push(item);
                            if pending.len() >= max_batch_size {
                                flusher.flush(&mut pending, FlushTrigger::Size).await;
                                ticker.reset();
                            }
                        }
                        None => {
                            debug!("all queue handles dropped");
                            break;
                        }
                    }
                }
            }
        }

        shared.advance(QueueState::Draining);

        // Items accepted before the close are still in the channel.
        receiver.close();
        while let Some(item) = receiver.recv().await {
            pending.push(item);
            if pending.len() >= max_batch_size {
                flusher.flush(&mut pending, FlushTrigger::Size).await;
            }
        }
        if !pending.is_empty() {
            flusher.flush(&mut pending, FlushTrigger::Shutdown).await;
        }
    }

    async fn dispatch(
        mut batches: mpsc::Receiver<Batch<T>>,
        consumer: Arc<dyn BatchConsumer<T>>,
        hook: Option<FailureHook>,
        shared: Arc<Shared>,
    ) {
        while let Some(batch) = batches.recv().await {
            let outcome = AssertUnwindSafe(consumer.process(&batch.items))
                .catch_unwind()
                .await;

            let error = match outcome {
                Ok(Ok(())) => {
                    debug!(sequence = batch.sequence, "batch delivered");
                    continue;
                }
                Ok(Err(e)) => {
                    error!(
                        sequence = batch.sequence,
                        trigger = %batch.trigger,
                        items = batch.items.len(),
                        error = %e,
                        "batch consumer failed"
                    );
                    QueueError::ConsumerError(e)
                }
                Err(panic) => {
                    let message = panic_message(panic.as_ref());
                    error!(
                        sequence = batch.sequence,
                        trigger = %batch.trigger,
                        items = batch.items.len(),
                        panic = %message,
                        "batch consumer panicked"
                    );
                    QueueError::ConsumerPanicked(message)
                }
            };

            shared.metrics.record_failure();
            if let Some(hook) = &hook {
                let failure = FlushFailure {
                    sequence: batch.sequence,
                    batch_len: batch.items.len(),
                    trigger: batch.trigger,
                    error,
                };
                if std::panic::catch_unwind(AssertUnwindSafe(|| hook(&failure))).is_err() {
                    error!(sequence = batch.sequence, "failure hook panicked");
                }
            }
        }

        shared.advance(QueueState::Terminated);
        debug!("dispatcher stopped");
    }
}

/// Coordinator-side half of a flush: freezes the buffer and hands it off.
struct Flusher<T> {
    batches: mpsc::Sender<Batch<T>>,
    shared: Arc<Shared>,
    max_batch_size: usize,
    sequence: u64,
}

impl<T> Flusher<T> {
    async fn flush(&mut self, pending: &mut Vec<T>, trigger: FlushTrigger) {
        let items = std::mem::replace(pending, Vec::with_capacity(self.max_batch_size));
        self.sequence += 1;
        self.shared.metrics.record_flush(trigger, items.len());
        debug!(
            sequence = self.sequence,
            trigger = %trigger,
            items = items.len(),
            "flushing batch"
        );

        let batch = Batch {
            sequence: self.sequence,
            trigger,
            items,
        };
        if let Err(e) = self.batches.send(batch).await {
            error!(
                sequence = e.0.sequence,
                items = e.0.items.len(),
                "dispatcher gone, batch dropped"
            );
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
