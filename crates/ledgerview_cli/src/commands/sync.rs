//! Sync command implementation.
//!
//! Serves a JSON record file through an in-memory range fetcher and drives a
//! synced entity over it for a number of polling cycles, printing every
//! settled state.

use ledgerview_protocol::Record;
use ledgerview_sync::{
    ChunkedCollectionLoader, ClientConfig, FetchState, MockRangeFetcher, SyncedEntity,
};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Options for the sync command.
#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    /// Identifier field of the JSON records.
    pub id_field: String,
    /// Entity key to sync.
    pub key: String,
    /// Overrides the configured chunk size.
    pub chunk_size: Option<u64>,
    /// Settled cycles to wait for.
    pub cycles: u64,
    /// Overrides the configured refresh delay.
    pub delay_ms: Option<u64>,
}

/// One settled cycle.
#[derive(Debug, Serialize)]
pub struct CycleReport {
    /// Cycle number.
    pub cycle: u64,
    /// Records in the collection, if the cycle succeeded.
    pub records: Option<usize>,
    /// Error message, if the cycle failed.
    pub error: Option<String>,
    /// Range requests issued so far.
    pub requests: usize,
}

/// Runs the sync command.
pub fn run(
    path: &Path,
    config_path: Option<&Path>,
    options: &SyncOptions,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match config_path {
        Some(p) => ClientConfig::from_json_file(p)?,
        None => ClientConfig::default(),
    };
    if let Some(chunk_size) = options.chunk_size {
        config.loader.chunk_size = chunk_size;
    }
    if let Some(delay_ms) = options.delay_ms {
        config.entity.refresh_delay = Duration::from_millis(delay_ms);
    }
    config.validate()?;

    let collection = super::load_collection(path, &options.id_field)?;
    let records: Vec<Record> = collection.iter().cloned().collect();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let reports = runtime.block_on(drive(records, &config, options))?;

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&reports)?),
        _ => {
            println!(
                "Synced `{}` from {} (chunk size {})",
                options.key,
                path.display(),
                config.loader.chunk_size
            );
            for report in &reports {
                match (&report.records, &report.error) {
                    (Some(n), _) => println!(
                        "  cycle {:>3}: {n} records ({} requests)",
                        report.cycle, report.requests
                    ),
                    (None, Some(e)) => println!("  cycle {:>3}: failed: {e}", report.cycle),
                    (None, None) => {}
                }
            }
        }
    }

    Ok(())
}

/// Mounts an entity over `records` and collects `options.cycles` settled
/// cycles.
pub async fn drive(
    records: Vec<Record>,
    config: &ClientConfig,
    options: &SyncOptions,
) -> Result<Vec<CycleReport>, Box<dyn std::error::Error>> {
    let fetcher = Arc::new(MockRangeFetcher::new(records));
    let loader = ChunkedCollectionLoader::new(Arc::clone(&fetcher), config.loader.clone())?;
    let entity = SyncedEntity::new("cli", loader, config.entity.clone());
    let mut snapshots = entity.subscribe();

    entity.mount(options.key.clone());

    let mut reports = Vec::new();
    for cycle in 1..=options.cycles {
        let state = snapshots
            .wait_for(|s| s.state.is_settled() && s.state.cycle() >= Some(cycle))
            .await?
            .state
            .clone();

        let report = match state {
            FetchState::Succeeded { collection, .. } => CycleReport {
                cycle,
                records: Some(collection.len()),
                error: None,
                requests: fetcher.call_count(),
            },
            FetchState::Failed { error, .. } => CycleReport {
                cycle,
                records: None,
                error: Some(error.to_string()),
                requests: fetcher.call_count(),
            },
            _ => continue,
        };
        tracing::info!(cycle, records = ?report.records, "cycle settled");
        reports.push(report);
    }

    entity.stop_polling();
    Ok(reports)
}
