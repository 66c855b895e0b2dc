//! Atlas Regions Binary
//!
//! Loads an atlas from a local data directory and writes every renderable
//! region as `(ACRONYM) -- Name`, one per line.
//!
//! ## Configuration
//!
//! Environment variables:
//! - `ATLAS_*`: adapter configuration (see `AdapterConfig::apply_env`)
//! - `RUST_LOG`: Log level filter (default: info)
//! - `LOG_FORMAT`: "json" for structured logs, "pretty" for development (default: json)
//!
//! ## Usage
//!
//! ```bash
//! LOG_FORMAT=pretty cargo run --bin atlas_regions -- ./atlas_data all_regions.txt
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;

use tracing::{error, info};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use atlas_adapter::{AdapterConfig, AdapterResult, AtlasAdapter, LocalProvider};

const DEFAULT_OUTPUT: &str = "all_regions.txt";

/// Initialize the tracing subscriber with JSON or pretty format
fn init_tracing() {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string());

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "atlas_regions=info,atlas_adapter=info".into());

    if log_format == "pretty" {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_span_events(FmtSpan::CLOSE)
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_current_span(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .flatten_event(true)
            )
            .init();
    }
}

fn run(data_dir: PathBuf, output: PathBuf) -> AdapterResult<usize> {
    let config = AdapterConfig::from_env()?;
    let provider = Arc::new(LocalProvider::new(data_dir));

    let load_start = Instant::now();
    let adapter = AtlasAdapter::new(provider, config)?;
    info!(
        latency_ms = load_start.elapsed().as_millis() as u64,
        structures = adapter.tree().len(),
        "atlas loaded"
    );

    adapter.write_structures_list(&output)
}

fn main() -> ExitCode {
    init_tracing();

    let mut args = std::env::args_os().skip(1);
    let Some(data_dir) = args.next().map(PathBuf::from) else {
        eprintln!("usage: atlas_regions <data_dir> [output]");
        return ExitCode::from(2);
    };
    let output = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT));

    info!(
        version = env!("CARGO_PKG_VERSION"),
        data_dir = %data_dir.display(),
        "Starting atlas region listing"
    );

    match run(data_dir, output.clone()) {
        Ok(count) => {
            info!(regions = count, output = %output.display(), "region list written");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "failed to write region list");
            ExitCode::FAILURE
        }
    }
}
