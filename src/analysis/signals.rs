use std::fmt;

use itertools::Itertools;
use serde::Serialize;

use crate::data::{RetracementType, Zone};

const EXTREME_SCORE: f64 = 8.0;
const STRONG_SCORE: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ZoneStatus {
    Extreme,
    Strong,
    Standard,
}

impl ZoneStatus {
    pub fn from_score(total_score: f64) -> Self {
        if total_score >= EXTREME_SCORE {
            ZoneStatus::Extreme
        } else if total_score >= STRONG_SCORE {
            ZoneStatus::Strong
        } else {
            ZoneStatus::Standard
        }
    }
}

impl fmt::Display for ZoneStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ZoneStatus::Extreme => "EXTREME",
            ZoneStatus::Strong => "STRONG",
            ZoneStatus::Standard => "STANDARD",
        })
    }
}

/// Strongest zone sitting below the last close.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MainZone {
    pub avg_price: f64,
    pub min_price: f64,
    pub max_price: f64,
    pub total_score: f64,
    pub status: ZoneStatus,
    /// `total_score * 10`, not capped at 100.
    pub probability_pct: f64,
    pub distance_pct: f64,
    pub retracements: Vec<RetracementType>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Signals {
    pub main_zone: Option<MainZone>,
    pub lines: Vec<String>,
}

pub const NO_ACTIVE_SUPPORT: &str = "No active support below current price";

/// `zones` must already be ranked by score, strongest first.
pub fn compose_signals(zones: &[Zone], last_close: f64) -> Signals {
    let Some(zone) = zones.iter().find(|z| z.avg_price < last_close) else {
        return Signals {
            main_zone: None,
            lines: vec![NO_ACTIVE_SUPPORT.to_string()],
        };
    };

    let status = ZoneStatus::from_score(zone.total_score);
    let distance_pct = (last_close - zone.avg_price) / last_close * 100.0;
    let retracements: Vec<RetracementType> = zone
        .members
        .iter()
        .map(|l| l.retracement_type)
        .unique()
        .sorted()
        .collect();

    let lines = vec![
        format!("Nearest support {:.2} ({status})", zone.avg_price),
        format!("Distance to support: {distance_pct:.2}%"),
        format!(
            "Retracements: {}",
            retracements.iter().map(|r| r.label()).join(", ")
        ),
    ];

    Signals {
        main_zone: Some(MainZone {
            avg_price: zone.avg_price,
            min_price: zone.min_price,
            max_price: zone.max_price,
            total_score: zone.total_score,
            status,
            probability_pct: zone.total_score * 10.0,
            distance_pct,
            retracements,
        }),
        lines,
    }
}
