use serde::{Deserialize, Serialize};

/// Decided (non-push) games required before the gate can pass.
pub const MIN_GATE_SAMPLE: u32 = 30;
/// Default ATS win-rate threshold, percentage points.
pub const DEFAULT_GATE_THRESHOLD: f64 = 53.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerformanceGateResult {
    pub passed: bool,
    pub ats_win_rate: f64,
    pub decided_games: u32,
    pub threshold: f64,
}

/// Is the graded track record good enough to expose recommendations publicly?
pub fn check_performance_gate(
    ats_win_rate: f64,
    decided_games: u32,
    threshold: f64,
) -> PerformanceGateResult {
    PerformanceGateResult {
        passed: decided_games >= MIN_GATE_SAMPLE && ats_win_rate >= threshold,
        ats_win_rate,
        decided_games,
        threshold,
    }
}
