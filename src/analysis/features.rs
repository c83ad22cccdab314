use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::analysis::indicators::{atr, round_to, rsi, sma_series};
use crate::data::{Bar, FeatureVector, Zone};
use crate::loader::resample_weekly;

pub const FEATURE_MIN_BARS: usize = 200;
const SMA_PERIOD: usize = 200;
const RSI_PERIOD: usize = 14;
const ATR_PERIOD: usize = 14;
const SLOPE_LOOKBACK: usize = 5;

/// Why a symbol was left out of the long-only results. Not an error.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "reason", rename_all = "camelCase")]
pub enum Rejection {
    #[error("insufficient history: {available} bars available, {required} required")]
    InsufficientHistory { required: usize, available: usize },

    #[error("close {close:.2} below daily SMA200 {sma200:.2}")]
    BelowDailyTrend { close: f64, sma200: f64 },

    #[error("close {close:.2} below weekly SMA200 {sma200:.2}")]
    BelowWeeklyTrend { close: f64, sma200: f64 },
}

/// Daily trend state of a series that passed every gate.
#[derive(Debug, Clone)]
pub struct TrendContext {
    closes: Vec<f64>,
    sma: Vec<Option<f64>>,
    sma200: f64,
    last_close: f64,
}

impl TrendContext {
    /// Run the history, weekly (optional) and daily SMA200 gates in order.
    pub fn evaluate(bars: &[Bar], weekly_gate: bool) -> Result<Self, Rejection> {
        if bars.len() < FEATURE_MIN_BARS {
            return Err(Rejection::InsufficientHistory {
                required: FEATURE_MIN_BARS,
                available: bars.len(),
            });
        }

        if weekly_gate {
            check_weekly_trend(bars)?;
        }

        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let sma = sma_series(&closes, SMA_PERIOD);
        let (Some(sma200), Some(&last_close)) = (sma.last().copied().flatten(), closes.last())
        else {
            return Err(Rejection::InsufficientHistory {
                required: SMA_PERIOD,
                available: bars.len(),
            });
        };
        if last_close < sma200 {
            return Err(Rejection::BelowDailyTrend {
                close: last_close,
                sma200,
            });
        }

        Ok(Self {
            closes,
            sma,
            sma200,
            last_close,
        })
    }

    pub fn last_close(&self) -> f64 {
        self.last_close
    }

    pub fn feature_vector(
        &self,
        ticker: &str,
        bars: &[Bar],
        n_significant_lows: usize,
        zones: &[Zone],
    ) -> FeatureVector {
        // Both are defined: evaluate() guarantees at least 200 bars.
        let rsi14 = rsi(&self.closes, RSI_PERIOD).unwrap_or(0.0);
        let atr14 = atr(bars, ATR_PERIOD).unwrap_or(0.0);

        let max_zone_score = zones
            .iter()
            .map(|z| z.total_score)
            .fold(0.0, f64::max);

        let vector = FeatureVector {
            ticker: ticker.to_string(),
            last_price: round_to(self.last_close, 2),
            sma200: round_to(self.sma200, 2),
            sma200_dist_pct: round_to((self.last_close - self.sma200) / self.sma200 * 100.0, 2),
            sma200_slope_pct: round_to(self.slope_pct(), 4),
            rsi14: round_to(rsi14, 2),
            atr14: round_to(atr14, 2),
            n_significant_lows,
            max_zone_score: round_to(max_zone_score, 2),
        };
        debug!(?vector, "feature vector");
        vector
    }

    /// Percent change of the SMA200 against its value five bars earlier.
    fn slope_pct(&self) -> f64 {
        let previous = self
            .sma
            .len()
            .checked_sub(SLOPE_LOOKBACK + 1)
            .and_then(|idx| self.sma[idx]);
        match previous {
            Some(prev) if prev != 0.0 => (self.sma200 - prev) / prev * 100.0,
            _ => 0.0,
        }
    }
}

fn check_weekly_trend(bars: &[Bar]) -> Result<(), Rejection> {
    let weekly = resample_weekly(bars);
    let closes: Vec<f64> = weekly.iter().map(|b| b.close).collect();
    let sma = sma_series(&closes, SMA_PERIOD);
    let (Some(sma200), Some(&close)) = (sma.last().copied().flatten(), closes.last()) else {
        return Err(Rejection::InsufficientHistory {
            required: SMA_PERIOD,
            available: weekly.len(),
        });
    };
    if close < sma200 {
        return Err(Rejection::BelowWeeklyTrend { close, sma200 });
    }
    Ok(())
}
