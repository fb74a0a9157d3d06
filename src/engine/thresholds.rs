/// Minimum gates a recommendation leg must clear, per sport.
///
/// Edges and probabilities are in percentage points; `min_total_diff` is in
/// game points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SportThresholds {
    pub min_edge: f64,
    pub min_confidence: f64,
    pub min_win_prob: f64,
    pub min_total_diff: f64,
}

pub const DEFAULT_THRESHOLDS: SportThresholds = SportThresholds {
    min_edge: 2.0,
    min_confidence: 55.0,
    min_win_prob: 55.0,
    min_total_diff: 3.0,
};

/// Look up thresholds for a canonical sport key (see
/// [`normalize_sport_key`](super::prediction::normalize_sport_key)), falling
/// back to the default entry for anything unrecognised.
pub fn thresholds_for(sport: &str) -> SportThresholds {
    match sport {
        "basketball_nba" => SportThresholds {
            min_edge: 2.0,
            min_confidence: 55.0,
            min_win_prob: 55.0,
            min_total_diff: 4.0,
        },
        // College lines are softer but noisier.
        "basketball_ncaab" => SportThresholds {
            min_edge: 2.5,
            min_confidence: 58.0,
            min_win_prob: 58.0,
            min_total_diff: 4.0,
        },
        "americanfootball_nfl" => SportThresholds {
            min_edge: 2.0,
            min_confidence: 55.0,
            min_win_prob: 55.0,
            min_total_diff: 3.0,
        },
        "americanfootball_ncaaf" => SportThresholds {
            min_edge: 2.5,
            min_confidence: 58.0,
            min_win_prob: 58.0,
            min_total_diff: 3.5,
        },
        "baseball_mlb" => SportThresholds {
            min_edge: 2.5,
            min_confidence: 55.0,
            min_win_prob: 55.0,
            min_total_diff: 1.0,
        },
        "icehockey_nhl" => SportThresholds {
            min_edge: 2.5,
            min_confidence: 55.0,
            min_win_prob: 55.0,
            min_total_diff: 0.5,
        },
        _ => DEFAULT_THRESHOLDS,
    }
}
