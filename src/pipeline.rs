use serde::Serialize;
use tracing::debug;

use crate::analysis::{
    build_levels, build_zones, compose_signals, detect_structure, Rejection, Signals, TrendContext,
};
use crate::data::{AnchorHigh, Bar, FeatureVector, SignificantLow, Zone};

#[derive(Debug, Clone, Copy, Default)]
pub struct PipelineConfig {
    /// Require the last close above the weekly SMA200 as well.
    pub weekly_trend_gate: bool,
}

/// Everything derived from one symbol's series in one scan.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineResult {
    pub ticker: String,
    pub last_price: f64,
    pub anchor: Option<AnchorHigh>,
    pub significant_lows: Vec<SignificantLow>,
    pub zones: Vec<Zone>,
    pub feature_vector: FeatureVector,
    pub signals: Signals,
}

/// Run detection, clustering, features and signals on a validated series.
/// The series is only read.
pub fn run_pipeline(
    ticker: &str,
    bars: &[Bar],
    config: &PipelineConfig,
) -> Result<PipelineResult, Rejection> {
    let trend = TrendContext::evaluate(bars, config.weekly_trend_gate)?;

    let (anchor, significant_lows, zones) = match detect_structure(bars) {
        Some(structure) => {
            let zones = build_zones(build_levels(&structure));
            (
                Some(structure.anchor),
                structure.significant_lows,
                zones,
            )
        }
        None => (None, Vec::new(), Vec::new()),
    };

    let feature_vector = trend.feature_vector(ticker, bars, significant_lows.len(), &zones);
    let signals = compose_signals(&zones, trend.last_close());
    debug!(
        ticker,
        lows = significant_lows.len(),
        zones = zones.len(),
        "pipeline complete"
    );

    Ok(PipelineResult {
        ticker: ticker.to_string(),
        last_price: feature_vector.last_price,
        anchor,
        significant_lows,
        zones,
        feature_vector,
        signals,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::signals::{ZoneStatus, NO_ACTIVE_SUPPORT};
    use crate::test_support::{flat, path, two_low_uptrend};

    #[test]
    fn deep_volume_low_produces_ranked_support() {
        let bars = two_low_uptrend();
        let result = run_pipeline("DEMO", &bars, &PipelineConfig::default()).unwrap();

        let anchor = result.anchor.as_ref().unwrap();
        let deep = &result.significant_lows[0];
        assert!(deep.volume_score >= 2.0);
        assert!(!result.zones.is_empty());
        assert!(result
            .zones
            .iter()
            .any(|z| z.avg_price > deep.price && z.avg_price < anchor.price));
        for pair in result.zones.windows(2) {
            assert!(pair[0].total_score >= pair[1].total_score);
        }

        let main = result.signals.main_zone.as_ref().unwrap();
        assert!(matches!(
            main.status,
            ZoneStatus::Standard | ZoneStatus::Strong | ZoneStatus::Extreme
        ));
        assert!(result.signals.lines[0].starts_with("Nearest support"));
        assert_eq!(result.feature_vector.n_significant_lows, 2);
        assert_eq!(
            result.feature_vector.max_zone_score,
            crate::analysis::indicators::round_to(result.zones[0].total_score, 2)
        );
    }

    #[test]
    fn rerun_yields_identical_zones() {
        let bars = two_low_uptrend();
        let a = run_pipeline("DEMO", &bars, &PipelineConfig::default()).unwrap();
        let b = run_pipeline("DEMO", &bars, &PipelineConfig::default()).unwrap();
        let key = |r: &PipelineResult| {
            r.zones
                .iter()
                .map(|z| (z.avg_price, z.total_score, z.total_count))
                .collect::<Vec<_>>()
        };
        assert_eq!(key(&a), key(&b));
        assert_eq!(a.feature_vector, b.feature_vector);
    }

    #[test]
    fn flat_series_has_anchor_but_no_zones() {
        let bars = flat(300, 40.0);
        let result = run_pipeline("FLAT", &bars, &PipelineConfig::default()).unwrap();
        assert!(result.anchor.is_some());
        assert!(result.significant_lows.is_empty());
        assert!(result.zones.is_empty());
        assert_eq!(result.signals.lines, vec![NO_ACTIVE_SUPPORT]);
    }

    #[test]
    fn features_without_structure_history() {
        let bars = path(&[(0, 100.0), (219, 150.0)]);
        let result = run_pipeline("NEW", &bars, &PipelineConfig::default()).unwrap();
        assert!(result.anchor.is_none());
        assert!(result.zones.is_empty());
        assert_eq!(result.feature_vector.n_significant_lows, 0);
    }

    #[test]
    fn gated_symbol_is_rejected() {
        let bars = crate::test_support::downtrend(300);
        let err = run_pipeline("DOWN", &bars, &PipelineConfig::default()).unwrap_err();
        assert!(matches!(err, Rejection::BelowDailyTrend { .. }));
    }

    #[test]
    fn caller_series_is_untouched() {
        let bars = two_low_uptrend();
        let before: Vec<f64> = bars.iter().map(|b| b.close).collect();
        run_pipeline("DEMO", &bars, &PipelineConfig::default()).unwrap();
        let after: Vec<f64> = bars.iter().map(|b| b.close).collect();
        assert_eq!(before, after);
    }
}
