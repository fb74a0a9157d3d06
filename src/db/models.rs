use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Result of a graded pick against the spread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PickOutcome {
    Win,
    Loss,
    /// Landed exactly on the line; excluded from win-rate denominators.
    Push,
}

impl PickOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            PickOutcome::Win => "win",
            PickOutcome::Loss => "loss",
            PickOutcome::Push => "push",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "win" | "w" => Some(PickOutcome::Win),
            "loss" | "l" => Some(PickOutcome::Loss),
            "push" | "p" => Some(PickOutcome::Push),
            _ => None,
        }
    }
}

/// A historical prediction whose result is known
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradedPick {
    #[serde(default)]
    pub id: Option<i64>,
    pub sport: String,
    pub home_team: String,
    pub away_team: String,
    /// Home-favored-positive, as predicted at the time
    pub predicted_spread: f64,
    #[serde(default)]
    pub predicted_total: Option<f64>,
    /// Raw model confidence at prediction time, percentage scale
    pub confidence: f64,
    pub outcome: PickOutcome,
    pub graded_at: DateTime<Utc>,
}

/// Sticky experiment bucket for one caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentAssignment {
    pub caller_id: String,
    pub experiment: String,
    pub variant: String,
    pub assigned_at: DateTime<Utc>,
}
