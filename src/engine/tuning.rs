//! Versioned tuning configuration and the segmentation axes it is keyed by.
//!
//! Every axis (sport, spread magnitude, total points, confidence band) carries
//! the same `{enabled, multiplier}` shape. `Segment` is the closed union over
//! those axes, so the adjustment pipeline can match on it exhaustively.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::prediction::normalize_sport_key;

/// Multipliers are always clamped into `[0, MAX_MULTIPLIER]` before use.
pub const MAX_MULTIPLIER: f64 = 1.5;

/// Sport keys seeded into the neutral config.
pub const KNOWN_SPORTS: [&str; 6] = [
    "basketball_nba",
    "basketball_ncaab",
    "americanfootball_nfl",
    "americanfootball_ncaaf",
    "baseball_mlb",
    "icehockey_nhl",
];

// ── Segmentation axes ────────────────────────────────────────────────────────

/// |predicted spread| bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SpreadBucket {
    #[serde(rename = "small(<3)")]
    Small,
    #[serde(rename = "medium(3-7)")]
    Medium,
    #[serde(rename = "large(7-12)")]
    Large,
    #[serde(rename = "blowout(12+)")]
    Blowout,
}

impl SpreadBucket {
    pub const ALL: [SpreadBucket; 4] = [Self::Small, Self::Medium, Self::Large, Self::Blowout];

    pub fn classify(predicted_spread: f64) -> Self {
        let s = predicted_spread.abs();
        if s < 3.0 {
            Self::Small
        } else if s < 7.0 {
            Self::Medium
        } else if s < 12.0 {
            Self::Large
        } else {
            Self::Blowout
        }
    }
}

/// Predicted total points bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TotalBucket {
    #[serde(rename = "low(<130)")]
    Low,
    #[serde(rename = "mid(130-145)")]
    Mid,
    #[serde(rename = "high(145-160)")]
    High,
    #[serde(rename = "very_high(160+)")]
    VeryHigh,
}

impl TotalBucket {
    pub const ALL: [TotalBucket; 4] = [Self::Low, Self::Mid, Self::High, Self::VeryHigh];

    pub fn classify(predicted_total: f64) -> Self {
        if predicted_total < 130.0 {
            Self::Low
        } else if predicted_total < 145.0 {
            Self::Mid
        } else if predicted_total < 160.0 {
            Self::High
        } else {
            Self::VeryHigh
        }
    }
}

/// Raw (pre-adjustment) confidence band, percentage scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ConfidenceBand {
    #[serde(rename = "low(<50)")]
    Low,
    #[serde(rename = "medium(50-70)")]
    Medium,
    #[serde(rename = "high(70+)")]
    High,
}

impl ConfidenceBand {
    pub const ALL: [ConfidenceBand; 3] = [Self::Low, Self::Medium, Self::High];

    pub fn classify(confidence: f64) -> Self {
        if confidence < 50.0 {
            Self::Low
        } else if confidence < 70.0 {
            Self::Medium
        } else {
            Self::High
        }
    }
}

/// One historical-performance bucket on one axis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Sport(String),
    Spread(SpreadBucket),
    Total(TotalBucket),
    Confidence(ConfidenceBand),
}

// ── Settings ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SegmentSettings {
    pub enabled: bool,
    pub confidence_multiplier: f64,
}

impl SegmentSettings {
    pub const NEUTRAL: SegmentSettings = SegmentSettings {
        enabled: true,
        confidence_multiplier: 1.0,
    };

    pub fn disabled() -> Self {
        SegmentSettings {
            enabled: false,
            confidence_multiplier: 0.0,
        }
    }

    /// Multiplier as used by the pipeline: 0 when disabled, otherwise clamped.
    pub fn effective_multiplier(&self) -> f64 {
        if self.enabled {
            clamp_multiplier(self.confidence_multiplier)
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SportSettings {
    pub enabled: bool,
    pub confidence_multiplier: f64,
    /// Raw confidence (percentage) below which the sport never recommends.
    pub min_confidence: f64,
}

impl SportSettings {
    pub const NEUTRAL: SportSettings = SportSettings {
        enabled: true,
        confidence_multiplier: 1.0,
        min_confidence: 0.0,
    };

    pub fn as_segment(&self) -> SegmentSettings {
        SegmentSettings {
            enabled: self.enabled,
            confidence_multiplier: self.confidence_multiplier,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureWeights {
    /// Minimum effect size before a feature override is considered meaningful.
    pub significance_threshold: f64,
    #[serde(default)]
    pub overrides: BTreeMap<String, f64>,
}

impl Default for FeatureWeights {
    fn default() -> Self {
        FeatureWeights {
            significance_threshold: 0.05,
            overrides: BTreeMap::new(),
        }
    }
}

/// Global constants that drive the feedback generator. Win rates are in
/// percentage points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TuningGlobals {
    /// Decided (non-push) games a segment needs before it may be adjusted.
    pub min_sample_size: u32,
    pub disable_threshold: f64,
    pub downweight_threshold: f64,
    /// Break-even win rate at standard -110 juice.
    pub target_win_rate: f64,
}

impl Default for TuningGlobals {
    fn default() -> Self {
        TuningGlobals {
            min_sample_size: 30,
            disable_threshold: 35.0,
            downweight_threshold: 45.0,
            target_win_rate: 52.38,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RolloutMode {
    Live,
    Shadow,
    #[serde(rename = "ab")]
    AB,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rollout {
    pub mode: RolloutMode,
    #[serde(default)]
    pub experiment: Option<String>,
    #[serde(default)]
    pub variant: Option<String>,
}

/// The full tuning record. Exactly one is "current" at any time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TuningConfig {
    pub version: i64,
    pub generated_at: DateTime<Utc>,
    pub sports: BTreeMap<String, SportSettings>,
    pub spread_buckets: BTreeMap<SpreadBucket, SegmentSettings>,
    pub total_buckets: BTreeMap<TotalBucket, SegmentSettings>,
    pub confidence_bands: BTreeMap<ConfidenceBand, SegmentSettings>,
    #[serde(default)]
    pub feature_weights: FeatureWeights,
    #[serde(default)]
    pub globals: TuningGlobals,
    #[serde(default)]
    pub rollout: Option<Rollout>,
}

impl Default for TuningConfig {
    fn default() -> Self {
        Self::neutral()
    }
}

impl TuningConfig {
    /// Fully neutral config: version 0, every multiplier 1.0, everything
    /// enabled, epoch timestamp.
    pub fn neutral() -> Self {
        TuningConfig {
            version: 0,
            generated_at: DateTime::<Utc>::default(),
            sports: KNOWN_SPORTS
                .iter()
                .map(|s| (s.to_string(), SportSettings::NEUTRAL))
                .collect(),
            spread_buckets: SpreadBucket::ALL
                .iter()
                .map(|b| (*b, SegmentSettings::NEUTRAL))
                .collect(),
            total_buckets: TotalBucket::ALL
                .iter()
                .map(|b| (*b, SegmentSettings::NEUTRAL))
                .collect(),
            confidence_bands: ConfidenceBand::ALL
                .iter()
                .map(|b| (*b, SegmentSettings::NEUTRAL))
                .collect(),
            feature_weights: FeatureWeights::default(),
            globals: TuningGlobals::default(),
            rollout: None,
        }
    }

    /// Sport settings, neutral when the sport has never been tuned.
    pub fn sport(&self, sport: &str) -> SportSettings {
        self.sports
            .get(normalize_sport_key(sport).as_str())
            .copied()
            .unwrap_or(SportSettings::NEUTRAL)
    }

    /// The `{enabled, multiplier}` view of any segment. Missing entries are
    /// neutral.
    pub fn segment(&self, segment: &Segment) -> SegmentSettings {
        let found = match segment {
            Segment::Sport(s) => return self.sport(s).as_segment(),
            Segment::Spread(b) => self.spread_buckets.get(b),
            Segment::Total(b) => self.total_buckets.get(b),
            Segment::Confidence(b) => self.confidence_bands.get(b),
        };
        found.copied().unwrap_or(SegmentSettings::NEUTRAL)
    }

    /// Replace a segment's `{enabled, multiplier}` pair. Sport floors are kept.
    pub fn set_segment(&mut self, segment: &Segment, settings: SegmentSettings) {
        match segment {
            Segment::Sport(s) => {
                let entry = self
                    .sports
                    .entry(normalize_sport_key(s))
                    .or_insert(SportSettings::NEUTRAL);
                entry.enabled = settings.enabled;
                entry.confidence_multiplier = settings.confidence_multiplier;
            }
            Segment::Spread(b) => {
                self.spread_buckets.insert(*b, settings);
            }
            Segment::Total(b) => {
                self.total_buckets.insert(*b, settings);
            }
            Segment::Confidence(b) => {
                self.confidence_bands.insert(*b, settings);
            }
        }
    }

    /// Multiplicative override for a model feature, 1.0 when none is set.
    /// Read by upstream feature pipelines that consume the stored config.
    #[allow(dead_code)]
    pub fn feature_multiplier(&self, feature: &str) -> f64 {
        self.feature_weights
            .overrides
            .get(feature)
            .map(|m| clamp_multiplier(*m))
            .unwrap_or(1.0)
    }

    /// True when the config declares an A-B rollout with a named experiment.
    pub fn active_experiment(&self) -> Option<&str> {
        match &self.rollout {
            Some(Rollout {
                mode: RolloutMode::AB,
                experiment: Some(name),
                ..
            }) if !name.trim().is_empty() => Some(name.as_str()),
            _ => None,
        }
    }
}

pub fn clamp_multiplier(m: f64) -> f64 {
    if m.is_finite() {
        m.clamp(0.0, MAX_MULTIPLIER)
    } else {
        0.0
    }
}
