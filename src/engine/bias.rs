//! Systematic-error correction applied to a raw prediction before any
//! recommendation is derived from it.
//!
//! Offsets are measured externally from validated historical predictions:
//! a positive `home_offset` means the model has been over-predicting the home
//! score by that many points.

use serde::{Deserialize, Serialize};

use super::prediction::PredictionInput;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BiasCorrection {
    #[serde(default)]
    pub home_offset: Option<f64>,
    #[serde(default)]
    pub away_offset: Option<f64>,
    #[serde(default)]
    pub total_offset: Option<f64>,
}

impl BiasCorrection {
    fn is_noop(&self) -> bool {
        [self.home_offset, self.away_offset, self.total_offset]
            .iter()
            .all(|o| o.map_or(true, |v| v == 0.0))
    }
}

/// Return a bias-corrected copy of `prediction`. The input is never mutated.
pub fn apply_bias(prediction: &PredictionInput, bias: Option<&BiasCorrection>) -> PredictionInput {
    let Some(bias) = bias.filter(|b| !b.is_noop()) else {
        return prediction.clone();
    };

    let home = prediction.predicted_home_score - bias.home_offset.unwrap_or(0.0);
    let away = prediction.predicted_away_score - bias.away_offset.unwrap_or(0.0);
    let total = match (prediction.predicted_total, bias.total_offset) {
        (Some(t), Some(offset)) => Some(t - offset),
        (t, _) => t,
    };

    PredictionInput {
        predicted_home_score: home,
        predicted_away_score: away,
        predicted_spread: home - away,
        predicted_total: total,
        ..prediction.clone()
    }
}
