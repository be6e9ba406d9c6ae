use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use std::sync::Arc;
use tallyq::prelude::*;

const TASKS: i32 = 1_000;

fn uncontended(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("runtime");

    c.bench_function("enqueue_dequeue_uncontended", |b| {
        let queue = BoundedQueue::new(TASKS as usize);
        b.iter(|| {
            runtime.block_on(async {
                for id in 0..TASKS {
                    queue.enqueue(Task::new(id, "bench")).await.unwrap();
                }
                for _ in 0..TASKS {
                    black_box(queue.dequeue().await);
                }
            })
        })
    });
}

fn contended(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(4)
        .enable_all()
        .build()
        .expect("runtime");

    let mut group = c.benchmark_group("producer_consumer");
    for capacity in [0usize, 1, 16, 256] {
        group.bench_with_input(
            BenchmarkId::from_parameter(capacity),
            &capacity,
            |b, &capacity| {
                b.iter(|| {
                    runtime.block_on(async {
                        let queue = Arc::new(BoundedQueue::new(capacity));
                        let consumer = {
                            let queue = Arc::clone(&queue);
                            tokio::spawn(async move {
                                let mut n = 0;
                                while queue.dequeue().await.is_some() {
                                    n += 1;
                                }
                                n
                            })
                        };
                        for id in 0..TASKS {
                            queue.enqueue(Task::new(id, "bench")).await.unwrap();
                        }
                        queue.close();
                        black_box(consumer.await.unwrap())
                    })
                })
            },
        );
    }
    group.finish();
}

criterion_group!(benches, uncontended, contended);
criterion_main!(benches);
