use statrs::statistics::Statistics;

use crate::data::Bar;

/// Trailing mean over `window` values; `None` until the window is full or
/// while any value inside it is undefined.
pub fn rolling_mean(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    if window == 0 {
        return vec![None; values.len()];
    }
    (0..values.len())
        .map(|idx| {
            if idx + 1 < window {
                return None;
            }
            let slice = &values[idx + 1 - window..=idx];
            let defined: Option<Vec<f64>> = slice.iter().copied().collect();
            defined.map(|v| v.iter().mean())
        })
        .collect()
}

pub fn sma_series(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let wrapped: Vec<Option<f64>> = values.iter().copied().map(Some).collect();
    rolling_mean(&wrapped, period)
}

/// True range per bar; the first bar has no previous close and uses its range.
pub fn true_range(bars: &[Bar]) -> Vec<f64> {
    bars.iter()
        .enumerate()
        .map(|(idx, bar)| {
            let high_low = bar.high - bar.low;
            match idx.checked_sub(1).map(|prev| bars[prev].close) {
                Some(prev_close) => high_low
                    .max((bar.high - prev_close).abs())
                    .max((bar.low - prev_close).abs()),
                None => high_low,
            }
        })
        .collect()
}

/// Simple-average ATR at the last bar.
pub fn atr(bars: &[Bar], period: usize) -> Option<f64> {
    let tr: Vec<Option<f64>> = true_range(bars).into_iter().map(Some).collect();
    rolling_mean(&tr, period).last().copied().flatten()
}

/// RSI at the last close from simple rolling means of gains and losses.
/// A window without losses reports 100.
pub fn rsi(closes: &[f64], period: usize) -> Option<f64> {
    if period == 0 || closes.len() < period + 1 {
        return None;
    }
    let deltas: Vec<f64> = closes.windows(2).map(|w| w[1] - w[0]).collect();
    let recent = &deltas[deltas.len() - period..];
    let gain = recent.iter().map(|d| d.max(0.0)).mean();
    let loss = recent.iter().map(|d| (-d).max(0.0)).mean();

    if loss == 0.0 {
        return Some(100.0);
    }
    let rs = gain / loss;
    Some(100.0 - 100.0 / (1.0 + rs))
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
