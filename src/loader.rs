use std::fs::File;
use std::path::Path;

use chrono::{Datelike, Months, NaiveDate, NaiveDateTime, NaiveTime};
use csv::StringRecord;
use itertools::Itertools;
use thiserror::Error;

use crate::config::Lookback;
use crate::data::Bar;

#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("failed to open {path:?}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed csv: {0}")]
    Csv(#[from] csv::Error),

    #[error("input file contains no valid rows")]
    Empty,

    #[error("unable to infer date from record: {0:?}")]
    Date(StringRecord),

    #[error("failed to parse numeric field '{field}' from value '{value}'")]
    ParseNumber { field: &'static str, value: String },

    #[error("header has no '{0}' column")]
    MissingColumn(&'static str),

    #[error("cannot infer column layout of a {0}-field row without a header")]
    UnknownLayout(usize),
}

#[derive(Debug, Error, PartialEq)]
pub enum SeriesError {
    #[error("series is empty")]
    Empty,

    #[error("dates must be strictly increasing (bar {index} on {date})")]
    NonIncreasingDate { index: usize, date: NaiveDate },

    #[error("non-positive or non-finite {field} at bar {index} on {date}")]
    InvalidPrice {
        field: &'static str,
        index: usize,
        date: NaiveDate,
    },

    #[error("negative or non-finite volume at bar {index} on {date}")]
    InvalidVolume { index: usize, date: NaiveDate },

    #[error("high/low do not bracket open/close at bar {index} on {date}")]
    InconsistentBar { index: usize, date: NaiveDate },
}

pub fn load_bars_from_csv<P: AsRef<Path>>(path: P) -> Result<Vec<Bar>, LoaderError> {
    let path_ref = path.as_ref();
    let file = File::open(path_ref).map_err(|source| LoaderError::Open {
        path: path_ref.display().to_string(),
        source,
    })?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(file);

    let mut layout: Option<ColumnLayout> = None;
    let mut bars = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.iter().all(|field| field.trim().is_empty()) {
            continue;
        }
        if is_header(&record) {
            layout = Some(ColumnLayout::from_header(&record)?);
            continue;
        }
        let columns = match layout {
            Some(columns) => columns,
            None => {
                let inferred = ColumnLayout::infer(&record)?;
                layout = Some(inferred);
                inferred
            }
        };
        bars.push(parse_record(&record, &columns)?);
    }

    if bars.is_empty() {
        return Err(LoaderError::Empty);
    }

    bars.sort_by_key(|bar| bar.date);
    Ok(bars)
}

/// Column positions of the fields a bar needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ColumnLayout {
    date: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    volume: usize,
}

impl ColumnLayout {
    const PLAIN: ColumnLayout = ColumnLayout {
        date: 0,
        open: 1,
        high: 2,
        low: 3,
        close: 4,
        volume: 5,
    };

    const WITH_TIME: ColumnLayout = ColumnLayout {
        date: 0,
        open: 2,
        high: 3,
        low: 4,
        close: 5,
        volume: 6,
    };

    /// Columns located by name; extras such as "Adj Close" are ignored.
    fn from_header(record: &StringRecord) -> Result<Self, LoaderError> {
        let find = |names: &[&str], column: &'static str| {
            record
                .iter()
                .position(|field| names.iter().any(|n| field.trim().eq_ignore_ascii_case(n)))
                .ok_or(LoaderError::MissingColumn(column))
        };
        Ok(Self {
            date: find(&["date", "datetime", "timestamp"], "date")?,
            open: find(&["open"], "open")?,
            high: find(&["high"], "high")?,
            low: find(&["low"], "low")?,
            close: find(&["close"], "close")?,
            volume: find(&["volume"], "volume")?,
        })
    }

    /// Headerless files: `date,open,high,low,close,volume`, optionally with a
    /// time column after the date. Any other width is ambiguous.
    fn infer(record: &StringRecord) -> Result<Self, LoaderError> {
        match record.len() {
            6 => Ok(Self::PLAIN),
            7 if record.get(1).and_then(parse_time).is_some() => Ok(Self::WITH_TIME),
            width => Err(LoaderError::UnknownLayout(width)),
        }
    }
}

fn is_header(record: &StringRecord) -> bool {
    record
        .get(0)
        .map(|first| {
            let first = first.trim();
            ["date", "datetime", "timestamp"]
                .iter()
                .any(|name| first.eq_ignore_ascii_case(name))
        })
        .unwrap_or(false)
}

fn parse_record(record: &StringRecord, columns: &ColumnLayout) -> Result<Bar, LoaderError> {
    let field = |idx: usize| record.get(idx).map(str::trim).filter(|f| !f.is_empty());
    let date = field(columns.date)
        .and_then(parse_date)
        .ok_or_else(|| LoaderError::Date(record.clone()))?;

    Ok(Bar {
        date,
        open: parse_number(field(columns.open), "open")?,
        high: parse_number(field(columns.high), "high")?,
        low: parse_number(field(columns.low), "low")?,
        close: parse_number(field(columns.close), "close")?,
        volume: parse_number(field(columns.volume), "volume")?,
    })
}

fn parse_time(value: &str) -> Option<NaiveTime> {
    ["%H:%M:%S%.f", "%H:%M:%S", "%H:%M"]
        .iter()
        .find_map(|pattern| NaiveTime::parse_from_str(value.trim(), pattern).ok())
}

fn parse_number(value: Option<&str>, field: &'static str) -> Result<f64, LoaderError> {
    let value = value.ok_or_else(|| LoaderError::ParseNumber {
        field,
        value: String::from("<missing>"),
    })?;
    value
        .replace(',', "")
        .parse::<f64>()
        .map_err(|_| LoaderError::ParseNumber {
            field,
            value: value.to_string(),
        })
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    let date_patterns = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%Y%m%d"];
    for pattern in &date_patterns {
        if let Ok(date) = NaiveDate::parse_from_str(value, pattern) {
            return Some(date);
        }
    }

    let datetime_patterns = [
        "%Y-%m-%d %H:%M:%S",
        "%Y/%m/%d %H:%M:%S",
        "%m/%d/%Y %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
    ];
    for pattern in &datetime_patterns {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(value, pattern) {
            return Some(datetime.date());
        }
    }

    // Timestamps with an offset, e.g. "2024-01-02 00:00:00-05:00".
    chrono::DateTime::parse_from_rfc3339(value)
        .or_else(|_| chrono::DateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%:z"))
        .ok()
        .map(|dt| dt.date_naive())
}

pub fn validate_series(bars: &[Bar]) -> Result<(), SeriesError> {
    if bars.is_empty() {
        return Err(SeriesError::Empty);
    }

    for (index, bar) in bars.iter().enumerate() {
        for (field, value) in [
            ("open", bar.open),
            ("high", bar.high),
            ("low", bar.low),
            ("close", bar.close),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(SeriesError::InvalidPrice {
                    field,
                    index,
                    date: bar.date,
                });
            }
        }
        if !bar.volume.is_finite() || bar.volume < 0.0 {
            return Err(SeriesError::InvalidVolume {
                index,
                date: bar.date,
            });
        }
        if bar.high < bar.low
            || bar.low > bar.open.min(bar.close)
            || bar.high < bar.open.max(bar.close)
        {
            return Err(SeriesError::InconsistentBar {
                index,
                date: bar.date,
            });
        }
    }

    for (offset, pair) in bars.windows(2).enumerate() {
        if pair[1].date <= pair[0].date {
            return Err(SeriesError::NonIncreasingDate {
                index: offset + 1,
                date: pair[1].date,
            });
        }
    }

    Ok(())
}

/// Keep the bars that fall inside the lookback window ending at the last bar.
pub fn apply_lookback(bars: Vec<Bar>, lookback: Lookback) -> Vec<Bar> {
    let Lookback::Years(years) = lookback else {
        return bars;
    };
    let Some(last) = bars.last().map(|bar| bar.date) else {
        return bars;
    };
    // A window longer than any calendar keeps everything.
    let Some(cutoff) = years
        .checked_mul(12)
        .and_then(|months| last.checked_sub_months(Months::new(months)))
    else {
        return bars;
    };
    bars.into_iter().filter(|bar| bar.date > cutoff).collect()
}

/// Aggregate daily bars into ISO-week bars labelled with the last session date.
pub fn resample_weekly(bars: &[Bar]) -> Vec<Bar> {
    let mut weekly = Vec::new();
    for (_, week) in &bars.iter().group_by(|bar| {
        let iso = bar.date.iso_week();
        (iso.year(), iso.week())
    }) {
        let week: Vec<&Bar> = week.collect();
        let (Some(first), Some(last)) = (week.first(), week.last()) else {
            continue;
        };
        weekly.push(Bar {
            date: last.date,
            open: first.open,
            high: week.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max),
            low: week.iter().map(|b| b.low).fold(f64::INFINITY, f64::min),
            close: last.close,
            volume: week.iter().map(|b| b.volume).sum(),
        });
    }
    weekly
}
