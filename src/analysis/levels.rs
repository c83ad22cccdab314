use crate::data::{FiboLevel, RetracementType, Structure};

/// Project the four weighted retracements from every significant low up to
/// the anchor high. Output keeps low order, then retracement order.
pub fn build_levels(structure: &Structure) -> Vec<FiboLevel> {
    let high = structure.anchor.price;
    structure
        .significant_lows
        .iter()
        .flat_map(|low| {
            let diff = high - low.price;
            RetracementType::ALL.iter().map(move |&kind| FiboLevel {
                price: high - diff * kind.fraction(),
                source_low_price: low.price,
                source_date: low.date,
                retracement_type: kind,
                weight: kind.weight(),
                score: low.volume_score * kind.weight(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::data::{AnchorHigh, SignificantLow};

    #[test]
    fn projects_weighted_levels_per_low() {
        let date = NaiveDate::from_ymd_opt(2023, 3, 1).unwrap();
        let structure = Structure {
            anchor: AnchorHigh {
                index: 300,
                date,
                price: 200.0,
            },
            significant_lows: vec![
                SignificantLow {
                    date,
                    price: 100.0,
                    volume_score: 2.0,
                },
                SignificantLow {
                    date,
                    price: 150.0,
                    volume_score: 1.0,
                },
            ],
        };

        let levels = build_levels(&structure);
        assert_eq!(levels.len(), 8);

        let prices: Vec<f64> = levels[..4].iter().map(|l| l.price).collect();
        let expected = [161.8, 150.0, 138.2, 121.4];
        for (got, want) in prices.iter().zip(expected) {
            assert!((got - want).abs() < 1e-9);
        }
        let scores: Vec<f64> = levels[..4].iter().map(|l| l.score).collect();
        assert_eq!(scores, vec![2.0, 2.4, 3.0, 3.0]);

        assert_eq!(levels[4].source_low_price, 150.0);
        assert_eq!(levels[7].retracement_type, RetracementType::R786);
        assert_eq!(levels[7].score, 1.5);
    }

    #[test]
    fn no_lows_means_no_levels() {
        let structure = Structure {
            anchor: AnchorHigh {
                index: 0,
                date: NaiveDate::from_ymd_opt(2023, 3, 1).unwrap(),
                price: 10.0,
            },
            significant_lows: Vec::new(),
        };
        assert!(build_levels(&structure).is_empty());
    }
}
