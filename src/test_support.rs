//! Synthetic price series shared by unit tests.

use chrono::{Duration, NaiveDate};

use crate::data::Bar;

pub const BASE_VOLUME: f64 = 1_000_000.0;

pub fn daily_dates(count: usize) -> Vec<NaiveDate> {
    let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
    (0..count)
        .map(|i| start + Duration::days(i as i64))
        .collect()
}

/// Bar with a one-point range centred on `close`.
pub fn bar(date: NaiveDate, close: f64, volume: f64) -> Bar {
    Bar {
        date,
        open: close,
        high: close + 0.5,
        low: close - 0.5,
        close,
        volume,
    }
}

/// Piecewise-linear close path through `(index, close)` control points.
pub fn path(points: &[(usize, f64)]) -> Vec<Bar> {
    let last = points.last().map(|p| p.0).unwrap_or(0);
    let dates = daily_dates(last + 1);
    let mut bars = Vec::with_capacity(last + 1);
    for segment in points.windows(2) {
        let (i0, c0) = segment[0];
        let (i1, c1) = segment[1];
        for i in i0..i1 {
            let close = c0 + (c1 - c0) * (i - i0) as f64 / (i1 - i0) as f64;
            bars.push(bar(dates[i], close, BASE_VOLUME));
        }
    }
    if let Some(&(i, c)) = points.last() {
        bars.push(bar(dates[i], c, BASE_VOLUME));
    }
    bars
}

/// 300 bars: a 15%-deep low at bar 100 with a 2x volume spike, a shallower
/// pullback low at bar 200, and the anchor high at bar 290.
pub fn two_low_uptrend() -> Vec<Bar> {
    let mut bars = path(&[
        (0, 95.0),
        (80, 100.0),
        (100, 85.0),
        (180, 112.0),
        (200, 101.74),
        (290, 130.0),
        (299, 125.0),
    ]);
    bars[100].volume = 2.0 * BASE_VOLUME;
    bars
}

pub fn flat(count: usize, price: f64) -> Vec<Bar> {
    daily_dates(count)
        .into_iter()
        .map(|date| Bar {
            date,
            open: price,
            high: price,
            low: price,
            close: price,
            volume: BASE_VOLUME,
        })
        .collect()
}

/// Steady decline: always below its own SMA200.
pub fn downtrend(count: usize) -> Vec<Bar> {
    daily_dates(count)
        .into_iter()
        .enumerate()
        .map(|(i, date)| bar(date, 200.0 - 0.2 * i as f64, BASE_VOLUME))
        .collect()
}
