//! Runs a raw confidence value through the active tuning config.
//!
//! Stage order is fixed: sport → spread magnitude → total bucket → confidence
//! band. Any disabled stage vetoes the whole recommendation.

use tracing::debug;

use super::tuning::{ConfidenceBand, Segment, SpreadBucket, TotalBucket, TuningConfig};

/// Adjusted confidence in [0, 100], or `None` when a stage vetoed it.
///
/// `raw_confidence` is on percentage scale. A missing `predicted_total`
/// skips the total-bucket stage.
pub fn apply_config_to_confidence(
    raw_confidence: f64,
    sport: &str,
    predicted_spread: f64,
    predicted_total: Option<f64>,
    config: &TuningConfig,
) -> Option<f64> {
    let sport_settings = config.sport(sport);
    if !sport_settings.enabled {
        debug!("Confidence veto: sport {} disabled", sport);
        return None;
    }
    if raw_confidence < sport_settings.min_confidence {
        debug!(
            "Confidence veto: {:.1} below {} floor {:.1}",
            raw_confidence, sport, sport_settings.min_confidence
        );
        return None;
    }

    let mut stages = vec![
        Segment::Sport(sport.to_string()),
        Segment::Spread(SpreadBucket::classify(predicted_spread)),
    ];
    if let Some(total) = predicted_total {
        stages.push(Segment::Total(TotalBucket::classify(total)));
    }
    stages.push(Segment::Confidence(ConfidenceBand::classify(raw_confidence)));

    let mut multiplier = 1.0;
    for stage in &stages {
        let settings = config.segment(stage);
        if !settings.enabled {
            debug!("Confidence veto: segment {:?} disabled", stage);
            return None;
        }
        multiplier *= settings.effective_multiplier();
    }

    Some((raw_confidence * multiplier).clamp(0.0, 100.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::tuning::{SegmentSettings, SportSettings};
    use approx::assert_relative_eq;

    const NBA: &str = "basketball_nba";

    fn scaled(m: f64) -> SegmentSettings {
        SegmentSettings {
            enabled: true,
            confidence_multiplier: m,
        }
    }

    #[test]
    fn neutral_config_passes_confidence_through() {
        let cfg = TuningConfig::neutral();
        let out = apply_config_to_confidence(64.0, NBA, 4.5, Some(150.0), &cfg).unwrap();
        assert_relative_eq!(out, 64.0, epsilon = 1e-9);
    }

    #[test]
    fn multipliers_compound_across_stages() {
        let mut cfg = TuningConfig::neutral();
        cfg.sports.get_mut(NBA).unwrap().confidence_multiplier = 0.8;
        cfg.spread_buckets.insert(SpreadBucket::Medium, scaled(0.6));
        cfg.total_buckets.insert(TotalBucket::High, scaled(0.5));
        cfg.confidence_bands.insert(ConfidenceBand::Medium, scaled(0.7));
        let out = apply_config_to_confidence(60.0, NBA, -4.0, Some(150.0), &cfg).unwrap();
        assert_relative_eq!(out, 60.0 * 0.8 * 0.6 * 0.5 * 0.7, epsilon = 1e-9);
    }

    #[test]
    fn any_disabled_stage_vetoes() {
        let base = TuningConfig::neutral();
        let cases: [fn(&mut TuningConfig); 4] = [
            |c: &mut TuningConfig| {
                c.sports.get_mut(NBA).unwrap().enabled = false;
            },
            |c: &mut TuningConfig| {
                c.spread_buckets.insert(SpreadBucket::Large, SegmentSettings::disabled());
            },
            |c: &mut TuningConfig| {
                c.total_buckets.insert(TotalBucket::Mid, SegmentSettings::disabled());
            },
            |c: &mut TuningConfig| {
                c.confidence_bands.insert(ConfidenceBand::High, SegmentSettings::disabled());
            },
        ];
        for disable in cases {
            let mut cfg = base.clone();
            disable(&mut cfg);
            assert!(apply_config_to_confidence(75.0, NBA, 8.0, Some(140.0), &cfg).is_none());
            // deterministic on repeat
            assert!(apply_config_to_confidence(75.0, NBA, 8.0, Some(140.0), &cfg).is_none());
        }
    }

    #[test]
    fn sport_floor_vetoes_low_raw_confidence() {
        let mut cfg = TuningConfig::neutral();
        cfg.sports.insert(
            NBA.into(),
            SportSettings {
                enabled: true,
                confidence_multiplier: 1.0,
                min_confidence: 60.0,
            },
        );
        assert!(apply_config_to_confidence(59.9, NBA, 1.0, None, &cfg).is_none());
        assert!(apply_config_to_confidence(60.0, NBA, 1.0, None, &cfg).is_some());
    }

    #[test]
    fn band_is_chosen_from_raw_confidence() {
        let mut cfg = TuningConfig::neutral();
        cfg.sports.get_mut(NBA).unwrap().confidence_multiplier = 0.5;
        cfg.confidence_bands.insert(ConfidenceBand::High, SegmentSettings::disabled());
        // 80 × 0.5 = 40 would land in the low band, but the raw 80 is high.
        assert!(apply_config_to_confidence(80.0, NBA, 1.0, None, &cfg).is_none());
    }

    #[test]
    fn result_is_clamped_to_100() {
        let mut cfg = TuningConfig::neutral();
        cfg.sports.get_mut(NBA).unwrap().confidence_multiplier = 1.5;
        cfg.spread_buckets.insert(SpreadBucket::Small, scaled(1.5));
        let out = apply_config_to_confidence(90.0, NBA, 1.0, None, &cfg).unwrap();
        assert_relative_eq!(out, 100.0, epsilon = 1e-9);
    }

    #[test]
    fn missing_total_skips_total_stage() {
        let mut cfg = TuningConfig::neutral();
        for b in TotalBucket::ALL {
            cfg.total_buckets.insert(b, SegmentSettings::disabled());
        }
        assert!(apply_config_to_confidence(65.0, NBA, 2.0, None, &cfg).is_some());
        assert!(apply_config_to_confidence(65.0, NBA, 2.0, Some(120.0), &cfg).is_none());
    }
}
