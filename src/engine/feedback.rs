//! Derive the next tuning config from segmented historical accuracy.
//!
//! Rules per axis (win rates in percentage points, only for segments whose
//! decided count reaches `globals.min_sample_size`):
//!
//! | axis        | < disable            | < downweight          | ≥ target              |
//! |-------------|----------------------|-----------------------|-----------------------|
//! | sport       | disable, ×0          | ramp 0.5 → 0.8        | 1 + (wr−target)/20, ≤1.2 |
//! | spread      | disable, ×0          | flat 0.6              | unchanged             |
//! | total       | disable, ×0          | flat 0.6              | unchanged             |
//! | confidence  | (never disabled) 0.7 | flat 0.7              | unchanged             |
//!
//! Segments below the sample floor keep exactly the base settings.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::error::EngineError;
use super::prediction::normalize_sport_key;
use super::tuning::{
    clamp_multiplier, ConfidenceBand, Segment, SegmentSettings, SpreadBucket, TotalBucket,
    TuningConfig, TuningGlobals,
};

pub const SPORT_RAMP_FLOOR: f64 = 0.5;
pub const SPORT_RAMP_SPAN: f64 = 0.3;
pub const SPORT_BOOST_CAP: f64 = 1.2;
pub const BUCKET_DOWNWEIGHT: f64 = 0.6;
pub const BAND_DOWNWEIGHT: f64 = 0.7;

/// Win/loss tally for one segment. Pushes are already excluded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentStats<K> {
    pub segment: K,
    pub wins: u32,
    pub losses: u32,
    /// Percentage points.
    pub win_rate: f64,
}

impl<K> SegmentStats<K> {
    pub fn decided(&self) -> u32 {
        self.wins + self.losses
    }
}

/// Historical accuracy split along the four tuning axes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SegmentationReport {
    #[serde(default)]
    pub by_sport: Vec<SegmentStats<String>>,
    #[serde(default)]
    pub by_spread: Vec<SegmentStats<SpreadBucket>>,
    #[serde(default)]
    pub by_total: Vec<SegmentStats<TotalBucket>>,
    #[serde(default)]
    pub by_confidence: Vec<SegmentStats<ConfidenceBand>>,
    #[serde(default)]
    pub total_samples: u32,
}

/// Build the next config version from `report`, starting from a copy of
/// `base`. `base` itself is never modified.
pub fn generate_config_from_feedback(
    report: &SegmentationReport,
    base: &TuningConfig,
) -> Result<TuningConfig, EngineError> {
    let mut next = base.clone();
    next.version = base
        .version
        .checked_add(1)
        .ok_or(EngineError::VersionExhausted(base.version))?;
    next.generated_at = Utc::now();
    let g = base.globals;

    for stats in report.by_sport.iter().filter(|s| has_sample(s, &g)) {
        let segment = Segment::Sport(normalize_sport_key(&stats.segment));
        if let Some(settings) = sport_adjustment(stats.win_rate, &g) {
            adjust(&mut next, segment, settings, stats.win_rate);
        }
    }

    for stats in report.by_spread.iter().filter(|s| has_sample(s, &g)) {
        if let Some(settings) = bucket_adjustment(stats.win_rate, &g) {
            adjust(&mut next, Segment::Spread(stats.segment), settings, stats.win_rate);
        }
    }

    for stats in report.by_total.iter().filter(|s| has_sample(s, &g)) {
        if let Some(settings) = bucket_adjustment(stats.win_rate, &g) {
            adjust(&mut next, Segment::Total(stats.segment), settings, stats.win_rate);
        }
    }

    for stats in report.by_confidence.iter().filter(|s| has_sample(s, &g)) {
        if stats.win_rate < g.downweight_threshold {
            let settings = SegmentSettings {
                enabled: true,
                confidence_multiplier: BAND_DOWNWEIGHT,
            };
            adjust(&mut next, Segment::Confidence(stats.segment), settings, stats.win_rate);
        }
    }

    info!(
        "Generated tuning config v{} from {} graded samples",
        next.version, report.total_samples
    );
    Ok(next)
}

fn has_sample<K>(stats: &SegmentStats<K>, g: &TuningGlobals) -> bool {
    stats.decided() >= g.min_sample_size
}

fn sport_adjustment(win_rate: f64, g: &TuningGlobals) -> Option<SegmentSettings> {
    if win_rate < g.disable_threshold {
        Some(SegmentSettings::disabled())
    } else if win_rate < g.downweight_threshold {
        let span = g.downweight_threshold - g.disable_threshold;
        let position = if span > 0.0 {
            (win_rate - g.disable_threshold) / span
        } else {
            0.0
        };
        Some(SegmentSettings {
            enabled: true,
            confidence_multiplier: SPORT_RAMP_FLOOR + position * SPORT_RAMP_SPAN,
        })
    } else if win_rate >= g.target_win_rate {
        let boost = (1.0 + (win_rate - g.target_win_rate) / 20.0).min(SPORT_BOOST_CAP);
        Some(SegmentSettings {
            enabled: true,
            confidence_multiplier: boost,
        })
    } else {
        None
    }
}

/// Spread-magnitude and total buckets only ever move down.
fn bucket_adjustment(win_rate: f64, g: &TuningGlobals) -> Option<SegmentSettings> {
    if win_rate < g.disable_threshold {
        Some(SegmentSettings::disabled())
    } else if win_rate < g.downweight_threshold {
        Some(SegmentSettings {
            enabled: true,
            confidence_multiplier: BUCKET_DOWNWEIGHT,
        })
    } else {
        None
    }
}

fn adjust(config: &mut TuningConfig, segment: Segment, settings: SegmentSettings, win_rate: f64) {
    let settings = SegmentSettings {
        enabled: settings.enabled,
        confidence_multiplier: if settings.enabled {
            clamp_multiplier(settings.confidence_multiplier)
        } else {
            0.0
        },
    };
    info!(
        "Segment {:?} at {:.1}% → enabled={} multiplier={:.3}",
        segment, win_rate, settings.enabled, settings.confidence_multiplier
    );
    config.set_segment(&segment, settings);
}
