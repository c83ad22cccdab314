use std::cmp::Ordering;

use tabled::{settings::Style, Table, Tabled};

use crate::batch::{BatchReport, SymbolReport};
use crate::pipeline::PipelineResult;

/// Card highlight derived from the main zone's probability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardTier {
    High,
    Mid,
    Low,
}

impl CardTier {
    pub fn from_probability(probability_pct: f64) -> Self {
        if probability_pct >= 70.0 {
            CardTier::High
        } else if probability_pct >= 60.0 {
            CardTier::Mid
        } else {
            CardTier::Low
        }
    }

    fn label(self) -> &'static str {
        match self {
            CardTier::High => "HIGH",
            CardTier::Mid => "MID",
            CardTier::Low => "LOW",
        }
    }
}

fn trend_label(slope_pct: f64) -> &'static str {
    if slope_pct > 0.0 {
        "Rising"
    } else {
        "Falling"
    }
}

#[derive(Tabled)]
struct ScanRow {
    #[tabled(rename = "Ticker")]
    ticker: String,
    #[tabled(rename = "Price")]
    price: String,
    #[tabled(rename = "Trend")]
    trend: &'static str,
    #[tabled(rename = "SMA200 %")]
    sma_dist: String,
    #[tabled(rename = "RSI")]
    rsi: String,
    #[tabled(rename = "ATR")]
    atr: String,
    #[tabled(rename = "Lows")]
    lows: usize,
    #[tabled(rename = "Support")]
    support: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Prob")]
    probability: String,
    #[tabled(rename = "Tier")]
    tier: &'static str,
    #[tabled(rename = "Dist")]
    distance: String,
}

fn probability(result: &PipelineResult) -> f64 {
    result
        .signals
        .main_zone
        .as_ref()
        .map_or(0.0, |zone| zone.probability_pct)
}

fn scan_row(result: &PipelineResult) -> ScanRow {
    let features = &result.feature_vector;
    let main = result.signals.main_zone.as_ref();
    let dash = || "-".to_string();
    ScanRow {
        ticker: result.ticker.clone(),
        price: format!("{:.2}", result.last_price),
        trend: trend_label(features.sma200_slope_pct),
        sma_dist: format!("{:+.2}", features.sma200_dist_pct),
        rsi: format!("{:.1}", features.rsi14),
        atr: format!("{:.2}", features.atr14),
        lows: features.n_significant_lows,
        support: main.map_or_else(dash, |z| {
            format!("{:.2} ({:.2}-{:.2})", z.avg_price, z.min_price, z.max_price)
        }),
        status: main.map_or_else(dash, |z| z.status.to_string()),
        probability: main.map_or_else(dash, |z| format!("{:.0}%", z.probability_pct)),
        tier: CardTier::from_probability(probability(result)).label(),
        distance: main.map_or_else(dash, |z| format!("{:.2}%", z.distance_pct)),
    }
}

pub fn print_report(report: &BatchReport) {
    println!("\n=== Fibonacci Support Scan ===\n");
    println!(
        "Scanned {} symbols in {} ms: {} passed, {} rejected, {} unavailable",
        report.stats.requested,
        report.stats.elapsed_ms,
        report.stats.passed,
        report.stats.rejected,
        report.stats.unavailable
    );

    let mut passed: Vec<&PipelineResult> = report
        .results
        .values()
        .filter_map(|entry| match entry {
            SymbolReport::Passed(result) => Some(result.as_ref()),
            SymbolReport::Rejected { .. } => None,
        })
        .collect();
    passed.sort_by(|a, b| {
        probability(b)
            .partial_cmp(&probability(a))
            .unwrap_or(Ordering::Equal)
    });

    if passed.is_empty() {
        println!("\nNo symbols passed the long-only trend filter.");
    } else {
        let mut table = Table::new(passed.iter().map(|r| scan_row(r)));
        table.with(Style::rounded());
        println!("\n{table}\n");

        for result in &passed {
            println!("{}:", result.ticker);
            for line in &result.signals.lines {
                println!("  - {line}");
            }
        }
    }

    let rejected: Vec<(&String, String)> = report
        .results
        .iter()
        .filter_map(|(symbol, entry)| match entry {
            SymbolReport::Rejected { rejection } => Some((symbol, rejection.to_string())),
            SymbolReport::Passed(_) => None,
        })
        .collect();
    if !rejected.is_empty() {
        println!("\nFiltered out:");
        for (symbol, reason) in rejected {
            println!("  {symbol}: {reason}");
        }
    }

    if !report.unavailable.is_empty() {
        println!("\nUnavailable:");
        for (symbol, cause) in &report.unavailable {
            println!("  {symbol}: {cause}");
        }
    }
}

pub fn print_json(report: &BatchReport) -> serde_json::Result<()> {
    println!("{}", serde_json::to_string_pretty(report)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiers_follow_probability_bands() {
        assert_eq!(CardTier::from_probability(70.0), CardTier::High);
        assert_eq!(CardTier::from_probability(125.0), CardTier::High);
        assert_eq!(CardTier::from_probability(60.0), CardTier::Mid);
        assert_eq!(CardTier::from_probability(59.9), CardTier::Low);
    }

    #[test]
    fn trend_label_from_slope() {
        assert_eq!(trend_label(0.0123), "Rising");
        assert_eq!(trend_label(0.0), "Falling");
    }
}
