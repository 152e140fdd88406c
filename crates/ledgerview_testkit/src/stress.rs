//! Stress runs against a [`SimulatedLedger`].
//!
//! Each run drives loaders or synced entities concurrently and reports
//! throughput together with the ledger's concurrency high-water mark.

use crate::ledger::SimulatedLedger;
use ledgerview_sync::{ChunkedCollectionLoader, EntityConfig, LoaderConfig, SyncedEntity};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Result of a stress run.
#[derive(Debug, Clone)]
pub struct StressTestResult {
    /// Total operations performed.
    pub total_ops: usize,
    /// Successful operations.
    pub successful_ops: usize,
    /// Failed operations.
    pub failed_ops: usize,
    /// Range requests the ledger served.
    pub requests: usize,
    /// Most requests the ledger served at once.
    pub max_in_flight: usize,
    /// Total duration.
    pub duration: Duration,
    /// Operations per second.
    pub ops_per_second: f64,
}

impl StressTestResult {
    fn new(successful: usize, failed: usize, ledger: &SimulatedLedger, duration: Duration) -> Self {
        let total = successful + failed;
        let ops_per_second = if duration.as_secs_f64() > 0.0 {
            total as f64 / duration.as_secs_f64()
        } else {
            0.0
        };

        Self {
            total_ops: total,
            successful_ops: successful,
            failed_ops: failed,
            requests: ledger.request_count(),
            max_in_flight: ledger.max_in_flight(),
            duration,
            ops_per_second,
        }
    }

    /// Prints a summary of the run.
    pub fn print_summary(&self, name: &str) {
        println!("\n=== {} ===", name);
        println!("Total operations: {}", self.total_ops);
        println!("Successful: {}", self.successful_ops);
        println!("Failed: {}", self.failed_ops);
        println!("Ledger requests: {} (max {} at once)", self.requests, self.max_in_flight);
        println!("Duration: {:?}", self.duration);
        println!("Throughput: {:.2} ops/sec", self.ops_per_second);
    }
}

/// Configuration for stress runs.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Number of operations to perform.
    pub operations: usize,
    /// Number of concurrent tasks.
    pub tasks: usize,
    /// Records per collection.
    pub collection_size: u64,
    /// Loader chunk size.
    pub chunk_size: u64,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            operations: 1_000,
            tasks: 8,
            collection_size: 250,
            chunk_size: 50,
        }
    }
}

const STRESS_KEY: &str = "stress";

fn seed(ledger: &SimulatedLedger, config: &StressConfig) {
    ledger.insert(STRESS_KEY, crate::fixtures::moments(config.collection_size));
    ledger.reset_stats();
}

/// Loads the same collection `operations` times from concurrent tasks,
/// each task owning its own loader.
pub async fn stress_concurrent_loads(
    ledger: Arc<SimulatedLedger>,
    config: &StressConfig,
) -> StressTestResult {
    seed(&ledger, config);
    let successful = Arc::new(AtomicUsize::new(0));
    let failed = Arc::new(AtomicUsize::new(0));
    let tasks = config.tasks.max(1);
    let ops_per_task = config.operations / tasks;

    let start = Instant::now();
    let handles: Vec<_> = (0..tasks)
        .map(|_| {
            let ledger = Arc::clone(&ledger);
            let successful = Arc::clone(&successful);
            let failed = Arc::clone(&failed);
            let loader_config = LoaderConfig::new(config.chunk_size);
            let expected = config.collection_size as usize;

            tokio::spawn(async move {
                let loader = match ChunkedCollectionLoader::new(ledger, loader_config) {
                    Ok(loader) => loader,
                    Err(_) => {
                        failed.fetch_add(ops_per_task, Ordering::Relaxed);
                        return;
                    }
                };
                let key = STRESS_KEY.to_string();
                for _ in 0..ops_per_task {
                    match loader.load(&key).await {
                        Ok(c) if c.len() == expected => {
                            successful.fetch_add(1, Ordering::Relaxed);
                        }
                        _ => {
                            failed.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.await.expect("Task panicked");
    }

    StressTestResult::new(
        successful.load(Ordering::Relaxed),
        failed.load(Ordering::Relaxed),
        &ledger,
        start.elapsed(),
    )
}

/// Hammers a single synced entity with refresh requests from concurrent
/// tasks. The entity must keep at most one cycle in flight, so the ledger
/// never sees overlapping requests.
pub async fn stress_entity_refreshes(
    ledger: Arc<SimulatedLedger>,
    config: &StressConfig,
) -> StressTestResult {
    seed(&ledger, config);
    let loader = match ChunkedCollectionLoader::new(
        Arc::clone(&ledger),
        LoaderConfig::new(config.chunk_size),
    ) {
        Ok(loader) => loader,
        Err(_) => return StressTestResult::new(0, config.operations, &ledger, Duration::ZERO),
    };
    let entity = Arc::new(SyncedEntity::new("stress", loader, EntityConfig::new()));
    entity.set_key(STRESS_KEY.to_string());

    let successful = Arc::new(AtomicUsize::new(0));
    let failed = Arc::new(AtomicUsize::new(0));
    let tasks = config.tasks.max(1);
    let ops_per_task = config.operations / tasks;

    let start = Instant::now();
    let handles: Vec<_> = (0..tasks)
        .map(|_| {
            let entity = Arc::clone(&entity);
            let successful = Arc::clone(&successful);
            let failed = Arc::clone(&failed);

            tokio::spawn(async move {
                for _ in 0..ops_per_task {
                    match entity.refresh().await {
                        Ok(_) => successful.fetch_add(1, Ordering::Relaxed),
                        Err(_) => failed.fetch_add(1, Ordering::Relaxed),
                    };
                }
            })
        })
        .collect();

    for handle in handles {
        handle.await.expect("Task panicked");
    }

    StressTestResult::new(
        successful.load(Ordering::Relaxed),
        failed.load(Ordering::Relaxed),
        &ledger,
        start.elapsed(),
    )
}
