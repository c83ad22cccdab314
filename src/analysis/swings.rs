use tracing::debug;

use crate::analysis::indicators::rolling_mean;
use crate::data::{AnchorHigh, Bar, SignificantLow, Structure};

/// Trailing window (one trading year) that holds the anchor high.
pub const ANCHOR_WINDOW: usize = 252;
const PIVOT_RADIUS: usize = 8;
const ANCHOR_GAP: usize = 5;
const VOLUME_MA: usize = 20;
const VOLUME_SPIKE: f64 = 1.5;
const EFFORT_SPIKE: f64 = 2.0;
const RECENT_HIGH_LOOKBACK: usize = 15;
const CONFIRM_HORIZON: usize = 35;
const CONFIRM_BOUNCE: f64 = 0.09;
const MIN_SEPARATION_DAYS: i64 = 20;
const MIN_DEPTH: f64 = 0.10;

/// Locate the anchor high and the volume-scored swing lows leading up to it.
///
/// Returns `None` when the series is shorter than [`ANCHOR_WINDOW`]. A
/// structure without surviving lows still carries its anchor.
pub fn detect_structure(bars: &[Bar]) -> Option<Structure> {
    let anchor = find_anchor(bars)?;
    let candidates = confirmed_candidates(bars, &anchor);
    let candidate_count = candidates.len();

    let significant_lows: Vec<SignificantLow> = dedupe_lows(candidates)
        .into_iter()
        .filter(|low| low.price <= anchor.price * (1.0 - MIN_DEPTH))
        .collect();

    debug!(
        anchor = anchor.price,
        anchor_date = %anchor.date,
        candidates = candidate_count,
        significant = significant_lows.len(),
        "swing structure"
    );

    Some(Structure {
        anchor,
        significant_lows,
    })
}

fn find_anchor(bars: &[Bar]) -> Option<AnchorHigh> {
    if bars.len() < ANCHOR_WINDOW {
        return None;
    }
    let start = bars.len() - ANCHOR_WINDOW;
    let mut best = start;
    for idx in start + 1..bars.len() {
        // First occurrence wins on ties.
        if bars[idx].high > bars[best].high {
            best = idx;
        }
    }
    Some(AnchorHigh {
        index: best,
        date: bars[best].date,
        price: bars[best].high,
    })
}

fn confirmed_candidates(bars: &[Bar], anchor: &AnchorHigh) -> Vec<SignificantLow> {
    let volumes: Vec<Option<f64>> = bars.iter().map(|b| Some(b.volume)).collect();
    let efforts: Vec<Option<f64>> = bars
        .iter()
        .map(|b| {
            let range = b.high - b.low;
            (range != 0.0).then(|| b.volume / range)
        })
        .collect();
    let volume_ma = rolling_mean(&volumes, VOLUME_MA);
    let effort_ma = rolling_mean(&efforts, VOLUME_MA);

    let p = anchor.index;
    let start = p.saturating_sub(ANCHOR_WINDOW) + PIVOT_RADIUS;
    let end = p.saturating_sub(ANCHOR_GAP);

    let mut candidates = Vec::new();
    for i in start..end {
        let low = bars[i].low;
        let window_end = (i + PIVOT_RADIUS + 1).min(bars.len());
        let window_min = bars[i - PIVOT_RADIUS..window_end]
            .iter()
            .map(|b| b.low)
            .fold(f64::INFINITY, f64::min);
        if low != window_min {
            continue;
        }

        let mut volume_score = 1.0;
        if matches!(volume_ma[i], Some(ma) if bars[i].volume > VOLUME_SPIKE * ma) {
            volume_score += 1.0;
        }
        if matches!((efforts[i], effort_ma[i]), (Some(e), Some(ma)) if e > EFFORT_SPIKE * ma) {
            volume_score += 1.0;
        }

        let recent_high = max_high(&bars[i.saturating_sub(RECENT_HIGH_LOOKBACK)..i]);
        let future = &bars[i..(i + CONFIRM_HORIZON).min(p)];
        if future.is_empty() {
            continue;
        }
        let future_high = max_high(future);
        if future_high > recent_high || (future_high - low) / low > CONFIRM_BOUNCE {
            candidates.push(SignificantLow {
                date: bars[i].date,
                price: low,
                volume_score,
            });
        }
    }
    candidates
}

/// Chronological pass where a lower low supersedes every higher-or-equal
/// prior and lows closer than 20 days collapse into one.
fn dedupe_lows(candidates: Vec<SignificantLow>) -> Vec<SignificantLow> {
    let mut accepted: Vec<SignificantLow> = Vec::new();
    for candidate in candidates {
        accepted.retain(|prior| prior.price < candidate.price);
        let separated = accepted.last().map_or(true, |last| {
            (candidate.date - last.date).num_days() > MIN_SEPARATION_DAYS
        });
        if separated {
            accepted.push(candidate);
        } else if let Some(last) = accepted.last_mut() {
            if candidate.price < last.price {
                *last = candidate;
            }
        }
    }
    accepted
}

fn max_high(bars: &[Bar]) -> f64 {
    bars.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max)
}
