mod analysis;
mod batch;
mod config;
mod data;
mod loader;
mod logging;
mod output;
mod pipeline;
mod source;
#[cfg(test)]
mod test_support;

use std::fs;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::info;

use batch::{run_batch, BatchSettings};
use config::{parse_ticker_list, AppConfig, OutputFormat};
use output::{print_json, print_report};
use pipeline::PipelineConfig;
use source::{CsvDirectorySource, FetchRequest};

fn main() -> Result<()> {
    let config = AppConfig::parse();
    logging::init_logging();
    run(&config)
}

fn run(config: &AppConfig) -> Result<()> {
    if !config.data_dir.is_dir() {
        bail!("data directory {:?} does not exist", config.data_dir);
    }

    let mut raw = config.tickers.clone().unwrap_or_default();
    if let Some(path) = &config.tickers_file {
        let listed = fs::read_to_string(path)
            .with_context(|| format!("failed to read ticker list from {:?}", path))?;
        raw.push('\n');
        raw.push_str(&listed);
    }
    let tickers = parse_ticker_list(&raw);
    if tickers.is_empty() {
        bail!("no tickers given; use --tickers or --tickers-file");
    }

    let settings = BatchSettings {
        workers: config.workers,
        request: FetchRequest {
            lookback: config.period,
            interval: config.interval,
        },
        pipeline: PipelineConfig {
            weekly_trend_gate: config.weekly_gate,
        },
    };
    info!(
        tickers = tickers.len(),
        period = %config.period,
        interval = ?config.interval,
        workers = config.workers,
        "starting scan"
    );

    let source = CsvDirectorySource::new(&config.data_dir);
    let report = run_batch(&tickers, &source, &settings).context("failed to start worker pool")?;

    match config.format {
        OutputFormat::Table => print_report(&report),
        OutputFormat::Json => print_json(&report).context("failed to serialise report")?,
    }

    Ok(())
}
