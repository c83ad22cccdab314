use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

use rayon::prelude::*;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::analysis::Rejection;
use crate::loader::{validate_series, SeriesError};
use crate::pipeline::{run_pipeline, PipelineConfig, PipelineResult};
use crate::source::{FetchRequest, PriceSource, SourceError};

pub const DEFAULT_WORKERS: usize = 10;

#[derive(Debug, Clone, Copy)]
pub struct BatchSettings {
    pub workers: usize,
    pub request: FetchRequest,
    pub pipeline: PipelineConfig,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            request: FetchRequest::default(),
            pipeline: PipelineConfig::default(),
        }
    }
}

#[derive(Debug, Error)]
pub enum UnavailableCause {
    #[error("fetch failed: {0}")]
    Fetch(#[from] SourceError),

    #[error("empty series")]
    EmptySeries,

    #[error("malformed series: {0}")]
    Malformed(SeriesError),

    #[error("scan panicked: {0}")]
    Panicked(String),
}

/// Outcome of one symbol's unit of work.
#[derive(Debug)]
pub enum ScanOutcome {
    Passed(Box<PipelineResult>),
    Rejected(Rejection),
    Unavailable(UnavailableCause),
}

/// Per-symbol report for symbols whose data was usable.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum SymbolReport {
    Passed(Box<PipelineResult>),
    Rejected { rejection: Rejection },
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchStats {
    pub requested: usize,
    pub passed: usize,
    pub rejected: usize,
    pub unavailable: usize,
    pub elapsed_ms: u128,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub results: BTreeMap<String, SymbolReport>,
    pub unavailable: BTreeMap<String, String>,
    pub stats: BatchStats,
}

/// Scan every symbol on a pool of `settings.workers` threads that lives for
/// this call only. A failing symbol never affects the others.
pub fn run_batch(
    symbols: &[String],
    source: &dyn PriceSource,
    settings: &BatchSettings,
) -> Result<BatchReport, rayon::ThreadPoolBuildError> {
    let started = Instant::now();
    let mut unique = symbols.to_vec();
    unique.sort();
    unique.dedup();

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(settings.workers.max(1))
        .thread_name(|i| format!("scan-worker-{i}"))
        .build()?;

    let outcomes: Vec<(String, ScanOutcome)> = pool.install(|| {
        unique
            .par_iter()
            .map(|symbol| (symbol.clone(), scan_symbol(symbol, source, settings)))
            .collect()
    });

    let mut report = BatchReport {
        stats: BatchStats {
            requested: unique.len(),
            ..BatchStats::default()
        },
        ..BatchReport::default()
    };
    for (symbol, outcome) in outcomes {
        match outcome {
            ScanOutcome::Passed(result) => {
                report.stats.passed += 1;
                report.results.insert(symbol, SymbolReport::Passed(result));
            }
            ScanOutcome::Rejected(rejection) => {
                report.stats.rejected += 1;
                report
                    .results
                    .insert(symbol, SymbolReport::Rejected { rejection });
            }
            ScanOutcome::Unavailable(cause) => {
                report.stats.unavailable += 1;
                report.unavailable.insert(symbol, cause.to_string());
            }
        }
    }
    report.stats.elapsed_ms = started.elapsed().as_millis();

    info!(
        requested = report.stats.requested,
        passed = report.stats.passed,
        rejected = report.stats.rejected,
        unavailable = report.stats.unavailable,
        elapsed_ms = report.stats.elapsed_ms as u64,
        "scan complete"
    );
    Ok(report)
}

/// Fetch, validate and analyse one symbol. Panics stop here.
pub fn scan_symbol(symbol: &str, source: &dyn PriceSource, settings: &BatchSettings) -> ScanOutcome {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| scan_unguarded(symbol, source, settings)))
        .unwrap_or_else(|payload| {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            error!(symbol, %message, "scan panicked");
            ScanOutcome::Unavailable(UnavailableCause::Panicked(message))
        });

    if let ScanOutcome::Unavailable(cause) = &outcome {
        warn!(symbol, %cause, "symbol unavailable");
    }
    outcome
}

fn scan_unguarded(symbol: &str, source: &dyn PriceSource, settings: &BatchSettings) -> ScanOutcome {
    let bars = match source.fetch(symbol, &settings.request) {
        Ok(bars) => bars,
        Err(err) => return ScanOutcome::Unavailable(err.into()),
    };
    match validate_series(&bars) {
        Ok(()) => {}
        Err(SeriesError::Empty) => return ScanOutcome::Unavailable(UnavailableCause::EmptySeries),
        Err(err) => return ScanOutcome::Unavailable(UnavailableCause::Malformed(err)),
    }

    match run_pipeline(symbol, &bars, &settings.pipeline) {
        Ok(result) => ScanOutcome::Passed(Box::new(result)),
        Err(rejection) => ScanOutcome::Rejected(rejection),
    }
}
