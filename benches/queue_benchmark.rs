use bulk_queue::queue::{BatchingQueue, BoxError, ConfigBuilder};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

type Ready = std::future::Ready<Result<(), BoxError>>;

fn counting_consumer(counter: Arc<AtomicUsize>) -> impl Fn(&[u64]) -> Ready + Send + Sync + 'static {
    move |batch: &[u64]| {
        counter.fetch_add(batch.len(), Ordering::Relaxed);
        std::future::ready(Ok(()))
    }
}

async fn run_queue(items: u64, batch_size: usize, producers: u64) -> usize {
    let counter = Arc::new(AtomicUsize::new(0));
    let config = ConfigBuilder::default()
        .max_batch_size(batch_size)
        .flush_interval(Duration::from_millis(50))
        .build()
        .unwrap();
    let queue = BatchingQueue::new(config, counting_consumer(Arc::clone(&counter))).unwrap();

    let per_producer = items / producers;
    let mut handles = Vec::new();
    for p in 0..producers {
        let queue = queue.clone();
        handles.push(tokio::spawn(async move {
            for i in 0..per_producer {
                queue.submit(p * per_producer + i).await.unwrap();
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }
    queue.shutdown().await;

    counter.load(Ordering::Relaxed)
}

// Benchmark batch size impact on a single producer
fn bench_batch_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("batch_sizes");
    let runtime = tokio::runtime::Runtime::new().unwrap();

    let data_size = 10_000u64;
    let batch_sizes = vec![10usize, 100, 500, 1000];

    for batch_size in batch_sizes {
        group.throughput(Throughput::Elements(data_size));
        group.bench_with_input(
            BenchmarkId::new("batch", batch_size),
            &batch_size,
            |b, &batch_size| {
                b.to_async(&runtime).iter(|| async move {
                    let delivered = run_queue(data_size, batch_size, 1).await;
                    assert_eq!(delivered as u64, data_size);
                });
            },
        );
    }

    group.finish();
}

// Benchmark concurrent producers sharing one queue
fn bench_concurrent_producers(c: &mut Criterion) {
    let mut group = c.benchmark_group("concurrent_producers");
    let runtime = tokio::runtime::Runtime::new().unwrap();

    let data_size = 8_000u64;
    let producer_counts = vec![1u64, 2, 4, 8];

    for producers in producer_counts {
        group.throughput(Throughput::Elements(data_size));
        group.bench_with_input(
            BenchmarkId::new("producers", producers),
            &producers,
            |b, &producers| {
                b.to_async(&runtime).iter(|| async move {
                    let delivered = run_queue(data_size, 100, producers).await;
                    assert_eq!(delivered as u64, data_size);
                });
            },
        );
    }

    group.finish();
}

// Consumer that is slower than the producers
fn bench_slow_consumer(c: &mut Criterion) {
    let mut group = c.benchmark_group("slow_consumer");
    group.sample_size(10);
    let runtime = tokio::runtime::Runtime::new().unwrap();

    group.bench_function("sleeping_consumer", |b| {
        b.to_async(&runtime).iter(|| async {
            let config = ConfigBuilder::default()
                .max_batch_size(100usize)
                .flush_interval(Duration::from_millis(50))
                .build()
                .unwrap();
            let queue = BatchingQueue::new(config, |_batch: &[u64]| async {
                tokio::time::sleep(Duration::from_micros(200)).await;
                Ok::<(), BoxError>(())
            })
            .unwrap();

            for i in 0..2_000u64 {
                queue.submit(i).await.unwrap();
            }
            queue.shutdown().await;
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_batch_sizes,
    bench_concurrent_producers,
    bench_slow_consumer
);
criterion_main!(benches);
