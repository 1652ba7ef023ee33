//! Batch engine stress runner with a synthetic scraper
//!
//! Drives the batch engine over thousands of stub tasks without touching the
//! network, verifying throughput and the counter invariants under load.
//! Tuned through environment variables:
//! - STRESS_ITEMS: number of synthetic inputs (default 1000)
//! - STRESS_CONCURRENCY: worker cap (default 25)
//! - STRESS_RETRIES: per-item retry budget (default 0)
//! - STRESS_DELAY_MS: base stub latency in milliseconds (default 2)
//! - STRESS_ITEM_TIMEOUT: per-item timeout in milliseconds (default 5000)
//! - STRESS_FAIL_EVERY: fail every Nth item, 0 disables (default 0)
//! - STRESS_EXPECT_MAX_MS: fail the run if it takes longer (default 30000)
//!
//! Ctrl-C cancels the whole batch; the run still prints a full summary.

use std::time::{Duration, Instant};

use anyhow::{Result, bail};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use aliexpress_scraper::batch::{AttemptContext, BatchOptions, run_batch};
use aliexpress_scraper::domain::ScrapeError;
use aliexpress_scraper::infrastructure::logging::{init_logging, log_system_info};

fn positive_int(name: &str, fallback: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|raw| raw.trim().parse::<u64>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(fallback)
}

fn non_negative_int(name: &str, fallback: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|raw| raw.trim().parse::<u64>().ok())
        .unwrap_or(fallback)
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = init_logging();
    log_system_info();

    let items = positive_int("STRESS_ITEMS", 1000) as usize;
    let concurrency = positive_int("STRESS_CONCURRENCY", 25) as usize;
    let retries = u32::try_from(non_negative_int("STRESS_RETRIES", 0)).unwrap_or(0);
    let base_delay_ms = positive_int("STRESS_DELAY_MS", 2);
    let item_timeout_ms = positive_int("STRESS_ITEM_TIMEOUT", 5000);
    let fail_every = non_negative_int("STRESS_FAIL_EVERY", 0) as usize;
    let expect_max_ms = positive_int("STRESS_EXPECT_MAX_MS", 30_000);

    info!("🚀 Starting batch engine stress run");
    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "items": items,
            "concurrency": concurrency,
            "retries": retries,
            "itemTimeout": item_timeout_ms,
            "failEvery": fail_every,
            "expectMaxMs": expect_max_ms,
        }))?
    );

    let inputs: Vec<String> = (1..=items).map(|index| format!("item-{index}")).collect();

    let cancellation = CancellationToken::new();
    let signal_token = cancellation.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("🛑 Ctrl-C received, cancelling the batch");
            signal_token.cancel();
        }
    });

    let options = BatchOptions::default()
        .with_concurrency(concurrency)
        .with_retries(retries)
        .with_item_timeout(Some(Duration::from_millis(item_timeout_ms)))
        .with_cancellation(cancellation)
        .with_progress(move |event| {
            if event.completed % 250 == 0 || event.completed == event.total {
                info!(
                    "Progress: {}/{} (failed={})",
                    event.completed, event.total, event.failed
                );
            }
            Ok(())
        });

    let started = Instant::now();
    let report = run_batch(inputs, options, move |input: String, ctx: AttemptContext| {
        async move {
            let index: usize = input
                .split('-')
                .nth(1)
                .and_then(|raw| raw.parse().ok())
                .unwrap_or(0);
            let delay = Duration::from_millis(base_delay_ms + (index % 3) as u64);

            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                () = ctx.cancellation.cancelled() => return Err(ScrapeError::Cancelled),
            }

            if fail_every > 0 && index % fail_every == 0 {
                return Err(ScrapeError::Network(format!("simulated failure for {input}")));
            }
            Ok(serde_json::json!({ "id": input, "index": index }))
        }
    })
    .await?;

    let measured_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    let throughput = items as f64 / (measured_ms.max(1) as f64 / 1000.0);

    info!("📊 Stress run summary");
    let mut summary = serde_json::to_value(&report.summary)?;
    if let Some(object) = summary.as_object_mut() {
        object.insert(
            "throughputPerSecond".to_string(),
            serde_json::json!((throughput * 100.0).round() / 100.0),
        );
        object.insert("measuredDurationMs".to_string(), serde_json::json!(measured_ms));
    }
    println!("{}", serde_json::to_string_pretty(&summary)?);

    if report.summary.total != items {
        bail!(
            "Expected {items} total items but got {}",
            report.summary.total
        );
    }
    if measured_ms > expect_max_ms {
        bail!("Stress run exceeded expected max duration ({measured_ms}ms > {expect_max_ms}ms)");
    }

    info!("✅ Batch engine stress run passed");
    Ok(())
}
