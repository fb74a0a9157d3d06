//! Wires the engine to storage: the operations the CLI and HTTP API expose.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::db::models::GradedPick;
use crate::db::Database;
use crate::engine::{
    apply_bias, ats_summary, build_segmentation_report, check_performance_gate,
    generate_config_from_feedback, generate_tuned_recommendations, BiasCorrection,
    ConfigManager, OddsSnapshot, PerformanceGateResult, PredictionInput, Recommendation,
    Rollout, SegmentationReport, TuningConfig,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationRequest {
    pub prediction: PredictionInput,
    #[serde(default)]
    pub odds: Option<OddsSnapshot>,
    #[serde(default)]
    pub bias: Option<BiasCorrection>,
    #[serde(default)]
    pub caller_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationResponse {
    pub config_version: i64,
    pub model_only: bool,
    pub recommendations: Vec<Recommendation>,
}

#[derive(Clone)]
pub struct RecommendationService {
    db: Database,
    manager: ConfigManager,
    gate_threshold: f64,
}

impl RecommendationService {
    pub fn new(db: Database, gate_threshold: f64) -> Self {
        let manager = ConfigManager::new(Arc::new(db.clone()), Arc::new(db.clone()));
        RecommendationService {
            db,
            manager,
            gate_threshold,
        }
    }

    pub fn manager(&self) -> &ConfigManager {
        &self.manager
    }

    /// Bias-correct the prediction, resolve the caller's config, then derive
    /// tuned recommendations.
    pub fn recommend(&self, request: &RecommendationRequest) -> Result<RecommendationResponse> {
        let config = match request.caller_id.as_deref() {
            Some(caller) => self.manager.get_effective_config_for_caller(caller)?,
            None => self.manager.get_effective_config()?,
        };
        let corrected = apply_bias(&request.prediction, request.bias.as_ref());
        let recommendations =
            generate_tuned_recommendations(&corrected, request.odds.as_ref(), &config)?;
        Ok(RecommendationResponse {
            config_version: config.version,
            model_only: request.odds.is_none(),
            recommendations,
        })
    }

    pub fn import_picks(&self, picks: &[GradedPick]) -> Result<usize> {
        for pick in picks {
            self.db.insert_graded_pick(pick).with_context(|| {
                format!("Failed to store pick {} vs {}", pick.home_team, pick.away_team)
            })?;
        }
        info!("Imported {} graded picks", picks.len());
        Ok(picks.len())
    }

    pub fn gate(&self) -> Result<PerformanceGateResult> {
        let picks = self.db.list_graded_picks()?;
        let (win_rate, decided) = ats_summary(&picks);
        Ok(check_performance_gate(win_rate, decided, self.gate_threshold))
    }

    /// Regenerate the tuning config from the current one and make it current.
    /// Without an explicit report, one is built from stored graded picks.
    pub fn tune(
        &self,
        report: Option<SegmentationReport>,
        rollout: Option<Rollout>,
    ) -> Result<TuningConfig> {
        let report = match report {
            Some(r) => r,
            None => build_segmentation_report(&self.db.list_graded_picks()?),
        };
        let base = self.manager.get_effective_config()?;
        let mut next = generate_config_from_feedback(&report, &base)?;
        next.rollout = rollout;
        self.manager.save_config(&next)?;
        Ok(next)
    }
}
