//! ledgerview CLI
//!
//! Command-line tools for browsing ledger collections.
//!
//! # Commands
//!
//! - `networks` - List the known ledger networks and contract addresses
//! - `view` - Page, filter and sort a JSON record file
//! - `sync` - Drive a synced entity over a JSON record file

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// ledgerview command-line tools.
#[derive(Parser)]
#[command(name = "ledgerview")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the known ledger networks
    Networks {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Page, filter and sort a JSON array of records
    View {
        /// Path to the JSON file
        file: PathBuf,

        /// Identifier field of each record
        #[arg(long, default_value = "id")]
        id_field: String,

        /// Zero-based page index
        #[arg(short, long, default_value = "0")]
        page: usize,

        /// Records per page
        #[arg(long, default_value = "20")]
        page_size: usize,

        /// Field to filter on
        #[arg(long)]
        field: Option<String>,

        /// Case-insensitive prefix to filter by
        #[arg(short, long)]
        query: Option<String>,

        /// Field to sort by
        #[arg(short, long)]
        sort: Option<String>,

        /// Sort descending
        #[arg(long)]
        desc: bool,

        /// What the sort applies to (filtered, page)
        #[arg(long, default_value = "filtered")]
        sort_scope: String,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Sync a JSON array of records through a chunked loader
    Sync {
        /// Path to the JSON file
        file: PathBuf,

        /// Client configuration file (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Identifier field of each record
        #[arg(long, default_value = "id")]
        id_field: String,

        /// Entity key
        #[arg(short, long, default_value = "local")]
        key: String,

        /// Records per range query
        #[arg(long)]
        chunk_size: Option<u64>,

        /// Number of settled cycles to wait for
        #[arg(long, default_value = "3")]
        cycles: u64,

        /// Delay between cycles in milliseconds
        #[arg(long)]
        delay_ms: Option<u64>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Networks { format } => {
            commands::networks::run(&format)?;
        }
        Commands::View {
            file,
            id_field,
            page,
            page_size,
            field,
            query,
            sort,
            desc,
            sort_scope,
            format,
        } => {
            let options = commands::view::ViewOptions {
                id_field,
                page,
                page_size,
                field,
                query,
                sort,
                descending: desc,
                sort_scope,
            };
            commands::view::run(&file, &options, &format)?;
        }
        Commands::Sync {
            file,
            config,
            id_field,
            key,
            chunk_size,
            cycles,
            delay_ms,
            format,
        } => {
            let options = commands::sync::SyncOptions {
                id_field,
                key,
                chunk_size,
                cycles,
                delay_ms,
            };
            commands::sync::run(&file, config.as_deref(), &options, &format)?;
        }
        Commands::Version => {
            println!("ledgerview CLI v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
