use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;

/// Single OHLCV bar for one trading session (or one week after resampling).
#[derive(Debug, Clone, Serialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Highest high of the trailing year; right-hand end of every retracement.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnchorHigh {
    #[serde(skip)]
    pub index: usize,
    pub date: NaiveDate,
    pub price: f64,
}

/// Confirmed swing low preceding the anchor high.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignificantLow {
    pub date: NaiveDate,
    pub price: f64,
    pub volume_score: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Structure {
    pub anchor: AnchorHigh,
    pub significant_lows: Vec<SignificantLow>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum RetracementType {
    #[serde(rename = "38.2%")]
    R382,
    #[serde(rename = "50.0%")]
    R500,
    #[serde(rename = "61.8%")]
    R618,
    #[serde(rename = "78.6%")]
    R786,
}

impl RetracementType {
    pub const ALL: [RetracementType; 4] = [
        RetracementType::R382,
        RetracementType::R500,
        RetracementType::R618,
        RetracementType::R786,
    ];

    pub fn fraction(self) -> f64 {
        match self {
            RetracementType::R382 => 0.382,
            RetracementType::R500 => 0.500,
            RetracementType::R618 => 0.618,
            RetracementType::R786 => 0.786,
        }
    }

    /// Deeper retracements carry more weight.
    pub fn weight(self) -> f64 {
        match self {
            RetracementType::R382 => 1.0,
            RetracementType::R500 => 1.2,
            RetracementType::R618 | RetracementType::R786 => 1.5,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RetracementType::R382 => "38.2%",
            RetracementType::R500 => "50.0%",
            RetracementType::R618 => "61.8%",
            RetracementType::R786 => "78.6%",
        }
    }
}

impl fmt::Display for RetracementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FiboLevel {
    pub price: f64,
    pub source_low_price: f64,
    pub source_date: NaiveDate,
    pub retracement_type: RetracementType,
    pub weight: f64,
    pub score: f64,
}

/// Tight group (0.5%) of retracement levels.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelCluster {
    pub avg_price: f64,
    pub min_price: f64,
    pub max_price: f64,
    pub count: usize,
    pub total_score: f64,
    pub members: Vec<FiboLevel>,
}

/// One tradable support region built from one or more clusters.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Zone {
    pub avg_price: f64,
    pub min_price: f64,
    pub max_price: f64,
    pub total_score: f64,
    pub total_count: usize,
    pub members: Vec<FiboLevel>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureVector {
    pub ticker: String,
    pub last_price: f64,
    pub sma200: f64,
    pub sma200_dist_pct: f64,
    pub sma200_slope_pct: f64,
    pub rsi14: f64,
    pub atr14: f64,
    pub n_significant_lows: usize,
    pub max_zone_score: f64,
}
