//! Batch engine throughput benchmark over synthetic tasks
//!
//! Measures orchestration overhead (claim cursor, retry wrapper, result
//! recording) with instant tasks at several concurrency levels, plus one
//! jittered-latency run closer to real scrape traffic.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use std::time::Duration;
use tokio::runtime::Runtime;

use aliexpress_scraper::batch::{BatchOptions, run_batch};
use aliexpress_scraper::domain::ScrapeError;

const INSTANT_ITEMS: usize = 512;
const JITTERED_ITEMS: usize = 128;

fn synthetic_inputs(count: usize) -> Vec<String> {
    (0..count).map(|index| format!("item-{index}")).collect()
}

async fn run_instant_batch(concurrency: usize) {
    let report = run_batch(
        synthetic_inputs(INSTANT_ITEMS),
        BatchOptions::default()
            .with_concurrency(concurrency)
            .with_retries(0)
            .with_item_timeout(None),
        |input: String, _ctx| async move { Ok::<_, ScrapeError>(input.len()) },
    )
    .await
    .expect("batch must resolve");
    assert_eq!(report.summary.succeeded, INSTANT_ITEMS);
}

async fn run_jittered_batch(concurrency: usize) {
    let report = run_batch(
        synthetic_inputs(JITTERED_ITEMS),
        BatchOptions::default()
            .with_concurrency(concurrency)
            .with_retries(1)
            .with_item_timeout(Some(Duration::from_millis(250))),
        |input: String, _ctx| async move {
            tokio::time::sleep(Duration::from_micros(u64::from(fastrand::u32(50..500)))).await;
            Ok::<_, ScrapeError>(input.len())
        },
    )
    .await
    .expect("batch must resolve");
    assert_eq!(report.summary.succeeded, JITTERED_ITEMS);
}

fn batch_engine_throughput(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    for concurrency in [1usize, 8, 32] {
        c.bench_function(
            &format!("instant tasks x{INSTANT_ITEMS}, concurrency {concurrency}"),
            |b| {
                b.to_async(&rt)
                    .iter(|| black_box(run_instant_batch(concurrency)))
            },
        );
    }

    c.bench_function(
        &format!("jittered tasks x{JITTERED_ITEMS}, concurrency 16"),
        |b| b.to_async(&rt).iter(|| black_box(run_jittered_batch(16))),
    );
}

criterion_group!(benches, batch_engine_throughput);
criterion_main!(benches);
