//! Turn a (bias-corrected) prediction plus an optional market snapshot into
//! zero to three tiered recommendations: spread, moneyline and total.
//!
//! Without a snapshot the engine runs in **model-only** mode: every leg that
//! clears its confidence gate is emitted with `is_model_only = true` and no
//! edge, since there is no price to compare against.
//!
//! Legs that miss a gate are omitted, never reported as errors.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::adjust::apply_config_to_confidence;
use super::error::EngineError;
use super::prediction::{to_percent, OddsSnapshot, PredictionInput};
use super::thresholds::{thresholds_for, SportThresholds};
use super::tuning::TuningConfig;

/// Implied probability of a -110 spread bet (110 / 210 ≈ 52.38%).
pub const SPREAD_BREAK_EVEN: f64 = 110.0 / 210.0;
/// Points of predicted-vs-needed margin per unit of `tanh` input.
const COVER_SCALE: f64 = 10.0;
const TIER_HIGH: f64 = 90.0;
const TIER_MEDIUM: f64 = 65.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationKind {
    Spread,
    Moneyline,
    TotalOver,
    TotalUnder,
    /// Informational model total with no market total to compare against.
    TotalOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Home,
    Away,
    Over,
    Under,
    Total,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub kind: RecommendationKind,
    pub side: Side,
    /// Market line (spread in home-favored-negative form, total points, or
    /// decimal price for moneylines). Model-only legs carry the model's line.
    pub line: Option<f64>,
    /// 0–100.
    pub confidence: f64,
    pub reasoning: String,
    /// Percentage points for spread/moneyline, game points for totals.
    pub edge: Option<f64>,
    pub is_model_only: bool,
    pub tier: Tier,
}

/// A leg that cleared its gates but has not been tiered yet.
#[derive(Debug, Clone)]
struct Candidate {
    kind: RecommendationKind,
    side: Side,
    line: Option<f64>,
    confidence: f64,
    reasoning: String,
    edge: Option<f64>,
    is_model_only: bool,
}

impl Candidate {
    fn into_recommendation(self) -> Recommendation {
        let tier = tier_for(self.edge, self.confidence);
        Recommendation {
            kind: self.kind,
            side: self.side,
            line: self.line,
            confidence: self.confidence,
            reasoning: self.reasoning,
            edge: self.edge,
            is_model_only: self.is_model_only,
            tier,
        }
    }
}

/// Normalized view of the prediction the legs work from.
struct Evaluation<'a> {
    prediction: &'a PredictionInput,
    thresholds: SportThresholds,
    confidence: f64,
    home_win_prob: f64,
    away_win_prob: f64,
}

// ── Public API ───────────────────────────────────────────────────────────────

pub fn generate_recommendations(
    prediction: &PredictionInput,
    odds: Option<&OddsSnapshot>,
) -> Result<Vec<Recommendation>, EngineError> {
    let candidates = candidates(prediction, odds)?;
    Ok(candidates
        .into_iter()
        .map(Candidate::into_recommendation)
        .collect())
}

/// Same as [`generate_recommendations`], but each recommendation's confidence
/// is first run through `config` and the tier recomputed. Vetoed
/// recommendations are dropped.
pub fn generate_tuned_recommendations(
    prediction: &PredictionInput,
    odds: Option<&OddsSnapshot>,
    config: &TuningConfig,
) -> Result<Vec<Recommendation>, EngineError> {
    let sport = prediction.sport_key();
    let recommendations = generate_recommendations(prediction, odds)?;
    Ok(recommendations
        .into_iter()
        .filter_map(|mut rec| {
            let adjusted = apply_config_to_confidence(
                rec.confidence,
                &sport,
                prediction.predicted_spread,
                prediction.predicted_total,
                config,
            )?;
            rec.confidence = adjusted.round();
            rec.tier = tier_for(rec.edge, rec.confidence);
            Some(rec)
        })
        .collect())
}

/// Model probability that the chosen side covers `market_spread`.
///
/// `predicted_spread` is home-favored-positive; `market_spread` is the home
/// line (home-favored-negative). Clamped to [0.1, 0.9].
pub fn cover_probability(predicted_spread: f64, market_spread: f64, is_home: bool) -> f64 {
    let (predicted_margin, margin_needed) = if is_home {
        (predicted_spread, -market_spread)
    } else {
        (-predicted_spread, market_spread)
    };
    let z = (predicted_margin - margin_needed) / COVER_SCALE;
    (0.5 + 0.5 * z.tanh()).clamp(0.1, 0.9)
}

/// Implied win probability from a decimal price. When the opposite side's
/// price is also valid the book's margin is removed by normalising the pair.
pub fn implied_probability(price: f64, opposite_price: Option<f64>) -> f64 {
    let raw = 1.0 / price;
    match opposite_price.filter(|p| valid_price(*p)) {
        Some(opp) => raw / (raw + 1.0 / opp),
        None => raw,
    }
}

pub fn tier_for(edge: Option<f64>, confidence: f64) -> Tier {
    let score = edge.unwrap_or(0.0) * 5.0 + confidence * 0.3;
    if score >= TIER_HIGH {
        Tier::High
    } else if score >= TIER_MEDIUM {
        Tier::Medium
    } else {
        Tier::Low
    }
}

// ── Legs ─────────────────────────────────────────────────────────────────────

fn candidates(
    prediction: &PredictionInput,
    odds: Option<&OddsSnapshot>,
) -> Result<Vec<Candidate>, EngineError> {
    prediction.validate()?;
    let eval = Evaluation {
        prediction,
        thresholds: thresholds_for(&prediction.sport_key()),
        confidence: to_percent(prediction.confidence),
        home_win_prob: to_percent(prediction.home_win_prob),
        away_win_prob: to_percent(prediction.away_win_prob),
    };

    let legs = [
        spread_leg(&eval, odds),
        moneyline_leg(&eval, odds),
        total_leg(&eval, odds),
    ];
    Ok(legs.into_iter().flatten().collect())
}

fn spread_leg(eval: &Evaluation, odds: Option<&OddsSnapshot>) -> Option<Candidate> {
    let p = eval.prediction;
    if eval.confidence < eval.thresholds.min_confidence {
        debug!(
            "Spread skipped for {} vs {}: confidence {:.1} < {:.1}",
            p.home_team, p.away_team, eval.confidence, eval.thresholds.min_confidence
        );
        return None;
    }

    let Some(market_spread) = odds.and_then(|o| o.market_spread) else {
        let (side, team) = favored(p);
        return Some(Candidate {
            kind: RecommendationKind::Spread,
            side,
            line: Some(-p.predicted_spread.abs()),
            confidence: eval.confidence.round(),
            reasoning: format!(
                "Model-only: {} projected to win by {:.1}",
                team,
                p.predicted_spread.abs()
            ),
            edge: None,
            is_model_only: true,
        });
    };
    if !market_spread.is_finite() {
        warn!("Ignoring non-finite market spread for {} vs {}", p.home_team, p.away_team);
        return None;
    }

    // Back the side the model likes more than the market does.
    let is_home = p.predicted_spread > -market_spread;
    let prob = cover_probability(p.predicted_spread, market_spread, is_home);
    let edge = (prob - SPREAD_BREAK_EVEN) * 100.0;
    if edge < eval.thresholds.min_edge {
        debug!(
            "Spread skipped for {} vs {}: edge {:.2} < {:.2}",
            p.home_team, p.away_team, edge, eval.thresholds.min_edge
        );
        return None;
    }

    let (side, team, line) = if is_home {
        (Side::Home, &p.home_team, market_spread)
    } else {
        (Side::Away, &p.away_team, -market_spread)
    };
    let confidence = (0.6 * eval.confidence + (2.0 * edge).min(40.0))
        .round()
        .min(100.0);
    Some(Candidate {
        kind: RecommendationKind::Spread,
        side,
        line: Some(line),
        confidence,
        reasoning: format!(
            "{} {:+.1}: model spread {:+.1} (home) vs market {:+.1}, cover probability {:.1}%",
            team,
            line,
            p.predicted_spread,
            market_spread,
            prob * 100.0
        ),
        edge: Some(edge),
        is_model_only: false,
    })
}

fn moneyline_leg(eval: &Evaluation, odds: Option<&OddsSnapshot>) -> Option<Candidate> {
    let p = eval.prediction;
    let is_home = eval.home_win_prob >= eval.away_win_prob;
    let win_prob = eval.home_win_prob.max(eval.away_win_prob);
    if win_prob < eval.thresholds.min_win_prob {
        debug!(
            "Moneyline skipped for {} vs {}: win probability {:.1} < {:.1}",
            p.home_team, p.away_team, win_prob, eval.thresholds.min_win_prob
        );
        return None;
    }

    let (side, team) = if is_home {
        (Side::Home, &p.home_team)
    } else {
        (Side::Away, &p.away_team)
    };
    let (price, opposite) = match odds {
        Some(o) if is_home => (o.home_moneyline, o.away_moneyline),
        Some(o) => (o.away_moneyline, o.home_moneyline),
        None => (None, None),
    };

    let Some(price) = price else {
        return Some(Candidate {
            kind: RecommendationKind::Moneyline,
            side,
            line: None,
            confidence: win_prob.round(),
            reasoning: format!("Model-only: {} wins {:.1}% of simulations", team, win_prob),
            edge: None,
            is_model_only: true,
        });
    };
    if !valid_price(price) {
        warn!(
            "Skipping moneyline for {} vs {}: invalid decimal price {}",
            p.home_team, p.away_team, price
        );
        return None;
    }

    let implied = implied_probability(price, opposite) * 100.0;
    let edge = win_prob - implied;
    if edge < eval.thresholds.min_edge {
        debug!(
            "Moneyline skipped for {} vs {}: edge {:.2} < {:.2}",
            p.home_team, p.away_team, edge, eval.thresholds.min_edge
        );
        return None;
    }

    let confidence = (0.7 * win_prob + edge.min(30.0)).round().min(100.0);
    Some(Candidate {
        kind: RecommendationKind::Moneyline,
        side,
        line: Some(price),
        confidence,
        reasoning: format!(
            "{} @ {:.2}: model {:.1}% vs market {:.1}%",
            team, price, win_prob, implied
        ),
        edge: Some(edge),
        is_model_only: false,
    })
}

fn total_leg(eval: &Evaluation, odds: Option<&OddsSnapshot>) -> Option<Candidate> {
    let p = eval.prediction;
    let predicted_total = p.predicted_total?;
    if eval.confidence < eval.thresholds.min_confidence {
        return None;
    }

    let Some(market_total) = odds.and_then(|o| o.market_total) else {
        return Some(Candidate {
            kind: RecommendationKind::TotalOnly,
            side: Side::Total,
            line: Some(predicted_total),
            confidence: eval.confidence.round(),
            reasoning: format!("Model-only: projected total {:.1}", predicted_total),
            edge: None,
            is_model_only: true,
        });
    };
    if !market_total.is_finite() {
        warn!("Ignoring non-finite market total for {} vs {}", p.home_team, p.away_team);
        return None;
    }

    let edge = (predicted_total - market_total).abs();
    if edge < eval.thresholds.min_total_diff {
        debug!(
            "Total skipped for {} vs {}: difference {:.1} < {:.1}",
            p.home_team, p.away_team, edge, eval.thresholds.min_total_diff
        );
        return None;
    }

    let (kind, side, direction) = if predicted_total > market_total {
        (RecommendationKind::TotalOver, Side::Over, "Over")
    } else {
        (RecommendationKind::TotalUnder, Side::Under, "Under")
    };
    Some(Candidate {
        kind,
        side,
        line: Some(market_total),
        confidence: eval.confidence.round(),
        reasoning: format!(
            "{} {:.1}: model total {:.1} is {:.1} points {}",
            direction,
            market_total,
            predicted_total,
            edge,
            if side == Side::Over { "higher" } else { "lower" }
        ),
        edge: Some(edge),
        is_model_only: false,
    })
}

fn favored(p: &PredictionInput) -> (Side, &str) {
    if p.predicted_spread >= 0.0 {
        (Side::Home, p.home_team.as_str())
    } else {
        (Side::Away, p.away_team.as_str())
    }
}

fn valid_price(price: f64) -> bool {
    price.is_finite() && price > 0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::prediction::sample_prediction;
    use crate::engine::tuning::{SegmentSettings, SpreadBucket};
    use approx::assert_relative_eq;

    fn generic_prediction() -> PredictionInput {
        PredictionInput {
            sport: None,
            ..sample_prediction()
        }
    }

    fn find(recs: &[Recommendation], kind: RecommendationKind) -> Option<&Recommendation> {
        recs.iter().find(|r| r.kind == kind)
    }

    #[test]
    fn cover_probability_matches_worked_example() {
        // home by 5 in the model, home by 3 at the book
        let p = cover_probability(5.0, -3.0, true);
        assert_relative_eq!(p, 0.5 + 0.5 * 0.2f64.tanh(), epsilon = 1e-12);
        assert_relative_eq!(p, 0.5987, epsilon = 1e-3);
        let edge = (p - SPREAD_BREAK_EVEN) * 100.0;
        assert_relative_eq!(edge, 7.49, epsilon = 1e-2);
    }

    #[test]
    fn cover_probability_is_symmetric_and_clamped() {
        let home = cover_probability(1.0, -3.0, true);
        let away = cover_probability(1.0, -3.0, false);
        assert_relative_eq!(home + away, 1.0, epsilon = 1e-12);
        assert!(away > 0.5);
        assert_relative_eq!(cover_probability(60.0, 0.0, true), 0.9, epsilon = 1e-12);
        assert_relative_eq!(cover_probability(-60.0, 0.0, true), 0.1, epsilon = 1e-12);
    }

    #[test]
    fn home_spread_recommendation_from_worked_example() {
        let p = generic_prediction(); // spread +5, confidence 70
        let odds = OddsSnapshot {
            market_spread: Some(-3.0),
            ..Default::default()
        };
        let recs = generate_recommendations(&p, Some(&odds)).unwrap();
        let spread = find(&recs, RecommendationKind::Spread).expect("spread leg");
        assert_eq!(spread.side, Side::Home);
        assert_eq!(spread.line, Some(-3.0));
        assert!(!spread.is_model_only);
        let edge = spread.edge.unwrap();
        assert_relative_eq!(edge, 7.49, epsilon = 1e-2);
        // round(0.6 × 70 + 2 × 7.49)
        assert_relative_eq!(spread.confidence, 57.0, epsilon = 1e-9);
        assert_eq!(spread.tier, Tier::Low);
    }

    #[test]
    fn away_spread_when_market_overrates_home() {
        let mut p = generic_prediction();
        p.predicted_spread = -2.0; // model has away by 2
        let odds = OddsSnapshot {
            market_spread: Some(-4.0), // book has home by 4
            ..Default::default()
        };
        let recs = generate_recommendations(&p, Some(&odds)).unwrap();
        let spread = find(&recs, RecommendationKind::Spread).unwrap();
        assert_eq!(spread.side, Side::Away);
        assert_eq!(spread.line, Some(4.0));
        assert!(spread.reasoning.contains("North Carolina"));
    }

    #[test]
    fn small_spread_edge_is_omitted() {
        let mut p = generic_prediction();
        p.predicted_spread = 3.5;
        let odds = OddsSnapshot {
            market_spread: Some(-3.0),
            ..Default::default()
        };
        let recs = generate_recommendations(&p, Some(&odds)).unwrap();
        assert!(find(&recs, RecommendationKind::Spread).is_none());
    }

    #[test]
    fn no_odds_means_every_leg_is_model_only() {
        for sport in ["basketball_nba", "basketball_ncaab", "americanfootball_nfl", "baseball_mlb", "curling"] {
            let mut p = sample_prediction();
            p.sport = Some(sport.into());
            p.confidence = 0.9;
            p.home_win_prob = 0.8;
            p.away_win_prob = 0.2;
            let recs = generate_recommendations(&p, None).unwrap();
            assert_eq!(recs.len(), 3, "{sport}");
            assert!(recs.iter().all(|r| r.is_model_only && r.edge.is_none()));
            assert!(find(&recs, RecommendationKind::TotalOnly).is_some());
        }
    }

    #[test]
    fn low_confidence_suppresses_spread_and_total() {
        let mut p = generic_prediction();
        p.confidence = 0.40;
        let recs = generate_recommendations(&p, None).unwrap();
        assert!(find(&recs, RecommendationKind::Spread).is_none());
        assert!(find(&recs, RecommendationKind::TotalOnly).is_none());
        // moneyline gates on win probability instead
        assert!(find(&recs, RecommendationKind::Moneyline).is_some());
    }

    #[test]
    fn moneyline_edge_uses_devigged_price() {
        let p = generic_prediction(); // home 68%
        let odds = OddsSnapshot {
            home_moneyline: Some(1.6),
            away_moneyline: Some(2.4),
            ..Default::default()
        };
        let recs = generate_recommendations(&p, Some(&odds)).unwrap();
        let ml = find(&recs, RecommendationKind::Moneyline).unwrap();
        assert_eq!(ml.side, Side::Home);
        // 0.625 / (0.625 + 0.41667) = 0.6
        assert_relative_eq!(ml.edge.unwrap(), 8.0, epsilon = 1e-6);
        assert_relative_eq!(ml.confidence, 56.0, epsilon = 1e-9);
    }

    #[test]
    fn moneyline_without_opposite_price_uses_raw_implied() {
        assert_relative_eq!(implied_probability(2.0, None), 0.5, epsilon = 1e-12);
        assert_relative_eq!(implied_probability(2.0, Some(-1.0)), 0.5, epsilon = 1e-12);
    }

    #[test]
    fn invalid_price_skips_only_the_moneyline() {
        let p = generic_prediction();
        let odds = OddsSnapshot {
            market_spread: Some(-3.0),
            home_moneyline: Some(0.0),
            ..Default::default()
        };
        let recs = generate_recommendations(&p, Some(&odds)).unwrap();
        assert!(find(&recs, RecommendationKind::Moneyline).is_none());
        assert!(find(&recs, RecommendationKind::Spread).is_some());
    }

    #[test]
    fn missing_moneyline_price_falls_back_to_model_only() {
        let p = generic_prediction();
        let odds = OddsSnapshot {
            market_total: Some(140.0),
            ..Default::default()
        };
        let recs = generate_recommendations(&p, Some(&odds)).unwrap();
        let ml = find(&recs, RecommendationKind::Moneyline).unwrap();
        assert!(ml.is_model_only);
    }

    #[test]
    fn totals_pick_direction_and_gate_on_difference() {
        let p = generic_prediction(); // total 151
        let over = OddsSnapshot {
            market_total: Some(146.0),
            ..Default::default()
        };
        let recs = generate_recommendations(&p, Some(&over)).unwrap();
        let t = find(&recs, RecommendationKind::TotalOver).unwrap();
        assert_eq!(t.side, Side::Over);
        assert_relative_eq!(t.edge.unwrap(), 5.0, epsilon = 1e-9);
        assert_relative_eq!(t.confidence, 70.0, epsilon = 1e-9);

        let under = OddsSnapshot {
            market_total: Some(158.0),
            ..Default::default()
        };
        let recs = generate_recommendations(&p, Some(&under)).unwrap();
        assert!(find(&recs, RecommendationKind::TotalUnder).is_some());

        let close = OddsSnapshot {
            market_total: Some(149.5),
            ..Default::default()
        };
        let recs = generate_recommendations(&p, Some(&close)).unwrap();
        assert!(recs
            .iter()
            .all(|r| !matches!(r.kind, RecommendationKind::TotalOver | RecommendationKind::TotalUnder)));
    }

    #[test]
    fn fraction_and_percentage_inputs_agree() {
        let fractional = generic_prediction();
        let mut percent = generic_prediction();
        percent.home_win_prob = 68.0;
        percent.away_win_prob = 32.0;
        percent.confidence = 70.0;
        let odds = OddsSnapshot {
            market_spread: Some(-3.0),
            market_total: Some(145.0),
            home_moneyline: Some(1.6),
            away_moneyline: Some(2.4),
        };
        let a = generate_recommendations(&fractional, Some(&odds)).unwrap();
        let b = generate_recommendations(&percent, Some(&odds)).unwrap();
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(&b) {
            assert_eq!(x.tier, y.tier);
            assert_eq!(x.kind, y.kind);
            assert_relative_eq!(x.edge.unwrap_or(0.0), y.edge.unwrap_or(0.0), epsilon = 1e-9);
        }
    }

    #[test]
    fn tiers_follow_combined_score() {
        assert_eq!(tier_for(Some(14.0), 80.0), Tier::High);
        assert_eq!(tier_for(Some(10.0), 80.0), Tier::Medium);
        assert_eq!(tier_for(Some(7.0), 80.0), Tier::Low);
        // missing edge counts as zero
        assert_eq!(tier_for(None, 100.0), Tier::Low);
    }

    #[test]
    fn invalid_prediction_is_an_error() {
        let mut p = generic_prediction();
        p.home_team.clear();
        assert!(generate_recommendations(&p, None).is_err());
    }

    #[test]
    fn tuned_path_scales_and_vetoes() {
        let p = generic_prediction(); // spread 5 → medium bucket
        let mut cfg = TuningConfig::neutral();
        cfg.spread_buckets.insert(
            SpreadBucket::Medium,
            SegmentSettings {
                enabled: true,
                confidence_multiplier: 0.5,
            },
        );
        let recs = generate_tuned_recommendations(&p, None, &cfg).unwrap();
        let spread = find(&recs, RecommendationKind::Spread).unwrap();
        assert_relative_eq!(spread.confidence, 35.0, epsilon = 1e-9);

        cfg.spread_buckets.insert(SpreadBucket::Medium, SegmentSettings::disabled());
        let recs = generate_tuned_recommendations(&p, None, &cfg).unwrap();
        assert!(recs.is_empty());
    }

    #[test]
    fn disabled_sport_also_vetoes_its_league_alias() {
        let mut cfg = TuningConfig::neutral();
        cfg.sports.get_mut("basketball_nba").unwrap().enabled = false;

        for sport in ["basketball_nba", "nba", " NBA "] {
            let p = PredictionInput {
                sport: Some(sport.into()),
                ..sample_prediction()
            };
            assert_eq!(p.sport_key(), "basketball_nba");
            assert!(!generate_recommendations(&p, None).unwrap().is_empty());
            let recs = generate_tuned_recommendations(&p, None, &cfg).unwrap();
            assert!(recs.is_empty(), "{} slipped past the disabled sport", sport);
        }
    }
}
