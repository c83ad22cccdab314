use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use clap::{Parser, ValueEnum};
use serde::Serialize;

/// Command-line configuration for the support-zone scanner.
#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct AppConfig {
    /// Directory holding one `<SYMBOL>.csv` OHLCV file per ticker.
    #[arg(short = 'd', long = "data-dir", value_name = "DIR")]
    pub data_dir: PathBuf,

    /// Tickers to scan, separated by commas or newlines.
    #[arg(short = 't', long)]
    pub tickers: Option<String>,

    /// File with tickers to scan, same separators as --tickers.
    #[arg(long, value_name = "FILE")]
    pub tickers_file: Option<PathBuf>,

    /// History to use per ticker, e.g. 1y, 5y or max.
    #[arg(long, default_value = "5y")]
    pub period: Lookback,

    /// Bar interval the pipeline runs on.
    #[arg(long, value_enum, default_value_t = Interval::Daily)]
    pub interval: Interval,

    /// Worker threads used for one scan.
    #[arg(long, default_value_t = 10)]
    pub workers: usize,

    /// Also require the last close above the weekly SMA200.
    #[arg(long, default_value_t = false)]
    pub weekly_gate: bool,

    /// Report format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
pub enum Interval {
    #[value(name = "1d")]
    Daily,
    #[value(name = "1wk")]
    Weekly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

/// Trailing history window requested from the data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Lookback {
    Years(u32),
    Max,
}

impl Default for Lookback {
    fn default() -> Self {
        Lookback::Years(5)
    }
}

impl FromStr for Lookback {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim().to_ascii_lowercase();
        if value == "max" {
            return Ok(Lookback::Max);
        }
        value
            .strip_suffix('y')
            .and_then(|years| years.parse::<u32>().ok())
            .filter(|years| *years > 0)
            .map(Lookback::Years)
            .ok_or_else(|| format!("invalid period '{value}', expected e.g. 5y or max"))
    }
}

impl fmt::Display for Lookback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lookback::Years(years) => write!(f, "{years}y"),
            Lookback::Max => f.write_str("max"),
        }
    }
}

/// Split on commas and newlines, upper-case, drop blanks and duplicates.
pub fn parse_ticker_list(raw: &str) -> Vec<String> {
    let mut tickers: Vec<String> = raw
        .split([',', '\n'])
        .map(|t| t.trim().to_ascii_uppercase())
        .filter(|t| !t.is_empty())
        .collect();
    tickers.sort();
    tickers.dedup();
    tickers
}
