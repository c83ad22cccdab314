use std::cmp::Ordering;

use tracing::debug;

use crate::data::{FiboLevel, LevelCluster, Zone};

/// Relative distance from a cluster's first level under which levels join it.
pub const CLUSTER_TOLERANCE: f64 = 0.0050;
/// Relative distance from a zone's first cluster under which clusters merge.
pub const ZONE_TOLERANCE: f64 = 0.0120;
const MIN_CLUSTER_SIZE: usize = 2;

/// Group retracement levels into clusters, then clusters into zones ranked by
/// total score (strongest first).
pub fn build_zones(levels: Vec<FiboLevel>) -> Vec<Zone> {
    let level_count = levels.len();
    let clusters = cluster_levels(levels);
    let cluster_count = clusters.len();
    let zones = merge_clusters(clusters);
    debug!(
        levels = level_count,
        clusters = cluster_count,
        zones = zones.len(),
        "zone clustering"
    );
    zones
}

/// Greedy scan over ascending prices. Each group is measured against its
/// first (lowest) member, so groups never drift upward. Singletons are
/// dropped.
pub fn cluster_levels(mut levels: Vec<FiboLevel>) -> Vec<LevelCluster> {
    levels.sort_by(|a, b| a.price.partial_cmp(&b.price).unwrap_or(Ordering::Equal));

    let mut clusters = Vec::new();
    let mut i = 0;
    while i < levels.len() {
        let seed = levels[i].price;
        let mut j = i + 1;
        while j < levels.len() && (levels[j].price - seed) / seed < CLUSTER_TOLERANCE {
            j += 1;
        }
        let group = &levels[i..j];
        if group.len() >= MIN_CLUSTER_SIZE {
            clusters.push(summarise_cluster(group));
        }
        i = j;
    }
    clusters
}

fn summarise_cluster(group: &[FiboLevel]) -> LevelCluster {
    let count = group.len();
    let avg_price = group.iter().map(|l| l.price).sum::<f64>() / count as f64;
    LevelCluster {
        avg_price,
        min_price: group.iter().map(|l| l.price).fold(f64::INFINITY, f64::min),
        max_price: group.iter().map(|l| l.price).fold(f64::NEG_INFINITY, f64::max),
        count,
        total_score: group.iter().map(|l| l.score).sum(),
        members: group.to_vec(),
    }
}

/// Same anchor-based scan over cluster averages with the wider tolerance.
/// The zone price is the midpoint of the merged span.
pub fn merge_clusters(mut clusters: Vec<LevelCluster>) -> Vec<Zone> {
    clusters.sort_by(|a, b| {
        a.avg_price
            .partial_cmp(&b.avg_price)
            .unwrap_or(Ordering::Equal)
    });

    let mut zones = Vec::new();
    let mut i = 0;
    while i < clusters.len() {
        let seed = clusters[i].avg_price;
        let mut j = i + 1;
        while j < clusters.len() && (clusters[j].avg_price - seed) / seed < ZONE_TOLERANCE {
            j += 1;
        }
        zones.push(summarise_zone(&clusters[i..j]));
        i = j;
    }

    // Stable: equal scores keep ascending-price order.
    zones.sort_by(|a, b| {
        b.total_score
            .partial_cmp(&a.total_score)
            .unwrap_or(Ordering::Equal)
    });
    zones
}

fn summarise_zone(group: &[LevelCluster]) -> Zone {
    let min_price = group.iter().map(|c| c.min_price).fold(f64::INFINITY, f64::min);
    let max_price = group
        .iter()
        .map(|c| c.max_price)
        .fold(f64::NEG_INFINITY, f64::max);
    Zone {
        avg_price: (min_price + max_price) / 2.0,
        min_price,
        max_price,
        total_score: group.iter().map(|c| c.total_score).sum(),
        total_count: group.iter().map(|c| c.count).sum(),
        members: group.iter().flat_map(|c| c.members.iter().cloned()).collect(),
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::data::RetracementType;

    fn level(price: f64, score: f64) -> FiboLevel {
        FiboLevel {
            price,
            source_low_price: price * 0.8,
            source_date: NaiveDate::from_ymd_opt(2022, 6, 1).unwrap(),
            retracement_type: RetracementType::R618,
            weight: 1.5,
            score,
        }
    }

    fn cluster(avg: f64, score: f64) -> LevelCluster {
        LevelCluster {
            avg_price: avg,
            min_price: avg - 0.1,
            max_price: avg + 0.1,
            count: 2,
            total_score: score,
            members: vec![level(avg - 0.1, score / 2.0), level(avg + 0.1, score / 2.0)],
        }
    }

    fn snapshot(zones: &[Zone]) -> Vec<(f64, f64, f64, usize)> {
        zones
            .iter()
            .map(|z| (z.avg_price, z.min_price, z.max_price, z.total_count))
            .collect()
    }

    #[test]
    fn levels_join_strictly_inside_tolerance() {
        let joined = cluster_levels(vec![level(100.0, 1.0), level(100.4999, 1.0)]);
        assert_eq!(joined.len(), 1);
        assert_eq!(joined[0].count, 2);

        let apart = cluster_levels(vec![level(100.0, 1.0), level(100.5001, 1.0)]);
        assert!(apart.is_empty());
    }

    #[test]
    fn clusters_merge_strictly_inside_zone_tolerance() {
        let merged = merge_clusters(vec![cluster(100.0, 2.0), cluster(101.1999, 2.0)]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].total_count, 4);

        let apart = merge_clusters(vec![cluster(100.0, 2.0), cluster(101.2001, 2.0)]);
        assert_eq!(apart.len(), 2);
    }

    #[test]
    fn distance_is_measured_from_the_first_member() {
        // Each step is 0.3%, but the third level is 0.6% from the first.
        let clusters = cluster_levels(vec![
            level(100.0, 1.0),
            level(100.3, 1.0),
            level(100.6009, 1.0),
            level(100.9, 1.0),
        ]);
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].count, 2);
        assert_eq!(clusters[0].max_price, 100.3);
        assert_eq!(clusters[1].min_price, 100.6009);
    }

    #[test]
    fn cluster_summary_uses_mean_price_and_summed_score() {
        let clusters = cluster_levels(vec![level(50.0, 1.0), level(50.1, 2.4), level(50.2, 3.0)]);
        assert_eq!(clusters.len(), 1);
        let c = &clusters[0];
        assert!((c.avg_price - 50.1).abs() < 1e-9);
        assert_eq!(c.min_price, 50.0);
        assert_eq!(c.max_price, 50.2);
        assert!((c.total_score - 6.4).abs() < 1e-9);
    }

    #[test]
    fn zone_price_is_span_midpoint_and_scores_add_up() {
        let a = cluster(100.0, 5.0);
        let b = cluster(101.0, 1.0);
        let zones = merge_clusters(vec![b, a]);
        assert_eq!(zones.len(), 1);
        let zone = &zones[0];
        assert!((zone.min_price - 99.9).abs() < 1e-9);
        assert!((zone.max_price - 101.1).abs() < 1e-9);
        assert!((zone.avg_price - 100.5).abs() < 1e-9);
        assert_eq!(zone.total_score, 6.0);
        let member_sum: f64 = zone.members.iter().map(|l| l.score).sum();
        assert_eq!(member_sum, zone.total_score);
    }

    #[test]
    fn zones_rank_by_score_with_stable_ties() {
        let zones = merge_clusters(vec![
            cluster(120.0, 3.0),
            cluster(100.0, 3.0),
            cluster(110.0, 7.5),
        ]);
        let order: Vec<i64> = zones.iter().map(|z| z.avg_price.round() as i64).collect();
        assert_eq!(order, vec![110, 100, 120]);
    }

    #[test]
    fn clustering_ignores_input_order() {
        let levels = vec![
            level(94.3, 3.0),
            level(107.5, 2.4),
            level(107.502, 1.5),
            level(112.42, 1.5),
            level(112.93, 2.0),
            level(119.3, 1.0),
        ];
        let mut reversed = levels.clone();
        reversed.reverse();

        let forward = build_zones(levels.clone());
        assert_eq!(snapshot(&forward), snapshot(&build_zones(reversed)));
        assert_eq!(snapshot(&forward), snapshot(&build_zones(levels)));
        assert_eq!(forward.len(), 2);
    }

    #[test]
    fn zone_score_equals_cluster_and_level_sums() {
        let levels = vec![
            level(200.0, 1.0),
            level(200.5, 2.4),
            level(202.0, 3.0),
            level(202.6, 1.5),
        ];
        let clusters = cluster_levels(levels.clone());
        let cluster_sum: f64 = clusters.iter().map(|c| c.total_score).sum();
        let zones = build_zones(levels);
        assert_eq!(zones.len(), 1);
        assert!((zones[0].total_score - cluster_sum).abs() < 1e-12);
        let level_sum: f64 = zones[0].members.iter().map(|l| l.score).sum();
        assert!((zones[0].total_score - level_sum).abs() < 1e-12);
        for c in &clusters {
            assert!(zones[0].min_price <= c.min_price && c.max_price <= zones[0].max_price);
        }
    }

    #[test]
    fn no_clusters_no_zones() {
        assert!(build_zones(vec![level(10.0, 1.0), level(20.0, 1.0)]).is_empty());
        assert!(build_zones(Vec::new()).is_empty());
    }
}
