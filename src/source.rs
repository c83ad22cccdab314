use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::config::{Interval, Lookback};
use crate::data::Bar;
use crate::loader::{apply_lookback, load_bars_from_csv, resample_weekly, LoaderError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FetchRequest {
    pub lookback: Lookback,
    pub interval: Interval,
}

impl Default for FetchRequest {
    fn default() -> Self {
        Self {
            lookback: Lookback::default(),
            interval: Interval::Daily,
        }
    }
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("no data for symbol {0}")]
    NotFound(String),

    #[error("invalid symbol {0:?}")]
    InvalidSymbol(String),

    #[error(transparent)]
    Load(#[from] LoaderError),
}

/// Supplier of ordered bar series, one symbol at a time.
pub trait PriceSource: Send + Sync {
    fn fetch(&self, symbol: &str, request: &FetchRequest) -> Result<Vec<Bar>, SourceError>;
}

/// Reads `<root>/<SYMBOL>.csv` files.
#[derive(Debug, Clone)]
pub struct CsvDirectorySource {
    root: PathBuf,
}

impl CsvDirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, symbol: &str) -> PathBuf {
        self.root.join(format!("{symbol}.csv"))
    }
}

/// Ticker-shaped names only (`BRK.B`, `^GSPC`, `EURUSD=X`), so a symbol always
/// names a single file directly under the root.
fn is_valid_symbol(symbol: &str) -> bool {
    !symbol.is_empty()
        && !symbol.starts_with('.')
        && symbol
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '^' | '-' | '=' | '_'))
}

impl PriceSource for CsvDirectorySource {
    fn fetch(&self, symbol: &str, request: &FetchRequest) -> Result<Vec<Bar>, SourceError> {
        if !is_valid_symbol(symbol) {
            return Err(SourceError::InvalidSymbol(symbol.to_string()));
        }
        let path = self.path_for(symbol);
        if !path.is_file() {
            return Err(SourceError::NotFound(symbol.to_string()));
        }
        let bars = apply_lookback(load_bars_from_csv(&path)?, request.lookback);
        Ok(match request.interval {
            Interval::Daily => bars,
            Interval::Weekly => resample_weekly(&bars),
        })
    }
}
