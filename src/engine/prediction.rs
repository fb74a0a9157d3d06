//! Caller-supplied inputs: the model's game prediction and the market snapshot.
//!
//! Sign conventions differ between the two on purpose, because they come from
//! different sources:
//! - `PredictionInput::predicted_spread` is **home-favored-positive**
//!   (+5 = home favored by 5).
//! - `OddsSnapshot::market_spread` is **home-favored-negative**
//!   (-3 = home favored by 3), the way books quote the home line.

use serde::{Deserialize, Serialize};

use super::error::EngineError;

/// A single game prediction produced by the upstream match model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionInput {
    pub home_team: String,
    pub away_team: String,
    pub predicted_home_score: f64,
    pub predicted_away_score: f64,
    /// Home-favored-positive.
    pub predicted_spread: f64,
    #[serde(default)]
    pub predicted_total: Option<f64>,
    /// Fraction in [0, 1] or percentage in (1, 100].
    pub home_win_prob: f64,
    /// Fraction in [0, 1] or percentage in (1, 100].
    pub away_win_prob: f64,
    /// Fraction in [0, 1] or percentage in (1, 100].
    pub confidence: f64,
    #[serde(default)]
    pub sport: Option<String>,
}

impl PredictionInput {
    /// Reject inputs that cannot be evaluated. Nothing is coerced here except
    /// the fraction/percentage convention, which `to_percent` handles later.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.home_team.trim().is_empty() {
            return Err(EngineError::InvalidPrediction("home_team is empty".into()));
        }
        if self.away_team.trim().is_empty() {
            return Err(EngineError::InvalidPrediction("away_team is empty".into()));
        }
        for (name, value) in [
            ("predicted_home_score", self.predicted_home_score),
            ("predicted_away_score", self.predicted_away_score),
            ("predicted_spread", self.predicted_spread),
        ] {
            if !value.is_finite() {
                return Err(EngineError::InvalidPrediction(format!(
                    "{name} is not a finite number"
                )));
            }
        }
        if let Some(total) = self.predicted_total {
            if !total.is_finite() || total < 0.0 {
                return Err(EngineError::InvalidPrediction(format!(
                    "predicted_total {total} must be a finite non-negative number"
                )));
            }
        }
        for (name, value) in [
            ("home_win_prob", self.home_win_prob),
            ("away_win_prob", self.away_win_prob),
            ("confidence", self.confidence),
        ] {
            if !value.is_finite() || !(0.0..=100.0).contains(&value) {
                return Err(EngineError::InvalidPrediction(format!(
                    "{name} {value} must be a fraction in [0, 1] or a percentage in [0, 100]"
                )));
            }
        }
        Ok(())
    }

    /// Sport key used for threshold and tuning lookups.
    pub fn sport_key(&self) -> String {
        self.sport
            .as_deref()
            .map(normalize_sport_key)
            .unwrap_or_default()
    }
}

/// Market prices observed for the same game. `None` fields are simply absent
/// from the feed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OddsSnapshot {
    /// Home-favored-negative.
    #[serde(default)]
    pub market_spread: Option<f64>,
    #[serde(default)]
    pub market_total: Option<f64>,
    /// Decimal price for the home moneyline.
    #[serde(default)]
    pub home_moneyline: Option<f64>,
    /// Decimal price for the away moneyline.
    #[serde(default)]
    pub away_moneyline: Option<f64>,
}

/// Convert a fraction-or-percentage value to percentage scale.
///
/// Values `<= 1` are fractions; anything larger is already a percentage.
/// This is the only place the dual convention is resolved.
pub fn to_percent(value: f64) -> f64 {
    if value <= 1.0 {
        value * 100.0
    } else {
        value
    }
}

/// Canonical sport key: trimmed, lowercased, and with short league aliases
/// expanded so every lookup agrees on one key per sport.
pub fn normalize_sport_key(sport: &str) -> String {
    let key = sport.trim().to_lowercase();
    let canonical = match key.as_str() {
        "nba" => "basketball_nba",
        "ncaab" => "basketball_ncaab",
        "nfl" => "americanfootball_nfl",
        "ncaaf" => "americanfootball_ncaaf",
        "mlb" => "baseball_mlb",
        "nhl" => "icehockey_nhl",
        _ => return key,
    };
    canonical.to_string()
}

#[cfg(test)]
pub(crate) fn sample_prediction() -> PredictionInput {
    PredictionInput {
        home_team: "Duke".into(),
        away_team: "North Carolina".into(),
        predicted_home_score: 78.0,
        predicted_away_score: 73.0,
        predicted_spread: 5.0,
        predicted_total: Some(151.0),
        home_win_prob: 0.68,
        away_win_prob: 0.32,
        confidence: 0.70,
        sport: Some("basketball_ncaab".into()),
    }
}
