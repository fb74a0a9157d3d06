//! Build a segmentation report out of graded picks, using the same bucket
//! boundaries the confidence pipeline classifies live predictions with.

use std::collections::BTreeMap;

use crate::db::models::{GradedPick, PickOutcome};

use super::feedback::{SegmentStats, SegmentationReport};
use super::prediction::{normalize_sport_key, to_percent};
use super::tuning::{ConfidenceBand, SpreadBucket, TotalBucket};

#[derive(Debug, Default, Clone, Copy)]
struct Tally {
    wins: u32,
    losses: u32,
}

impl Tally {
    fn record(&mut self, outcome: PickOutcome) {
        match outcome {
            PickOutcome::Win => self.wins += 1,
            PickOutcome::Loss => self.losses += 1,
            PickOutcome::Push => {}
        }
    }

    fn into_stats<K>(self, segment: K) -> SegmentStats<K> {
        SegmentStats {
            segment,
            wins: self.wins,
            losses: self.losses,
            win_rate: win_rate(self.wins, self.losses),
        }
    }
}

pub fn build_segmentation_report(picks: &[GradedPick]) -> SegmentationReport {
    let mut by_sport: BTreeMap<String, Tally> = BTreeMap::new();
    let mut by_spread: BTreeMap<SpreadBucket, Tally> = BTreeMap::new();
    let mut by_total: BTreeMap<TotalBucket, Tally> = BTreeMap::new();
    let mut by_confidence: BTreeMap<ConfidenceBand, Tally> = BTreeMap::new();

    for pick in picks {
        by_sport
            .entry(normalize_sport_key(&pick.sport))
            .or_default()
            .record(pick.outcome);
        by_spread
            .entry(SpreadBucket::classify(pick.predicted_spread))
            .or_default()
            .record(pick.outcome);
        if let Some(total) = pick.predicted_total {
            by_total
                .entry(TotalBucket::classify(total))
                .or_default()
                .record(pick.outcome);
        }
        by_confidence
            .entry(ConfidenceBand::classify(to_percent(pick.confidence)))
            .or_default()
            .record(pick.outcome);
    }

    SegmentationReport {
        by_sport: by_sport.into_iter().map(|(k, t)| t.into_stats(k)).collect(),
        by_spread: by_spread.into_iter().map(|(k, t)| t.into_stats(k)).collect(),
        by_total: by_total.into_iter().map(|(k, t)| t.into_stats(k)).collect(),
        by_confidence: by_confidence
            .into_iter()
            .map(|(k, t)| t.into_stats(k))
            .collect(),
        total_samples: picks.len() as u32,
    }
}

/// Overall ATS win rate (percentage points) and decided-game count.
pub fn ats_summary(picks: &[GradedPick]) -> (f64, u32) {
    let mut tally = Tally::default();
    for pick in picks {
        tally.record(pick.outcome);
    }
    (win_rate(tally.wins, tally.losses), tally.wins + tally.losses)
}

fn win_rate(wins: u32, losses: u32) -> f64 {
    let decided = wins + losses;
    if decided == 0 {
        0.0
    } else {
        wins as f64 / decided as f64 * 100.0
    }
}

#[cfg(test)]
pub(crate) fn pick(
    sport: &str,
    spread: f64,
    total: Option<f64>,
    confidence: f64,
    outcome: PickOutcome,
) -> GradedPick {
    GradedPick {
        id: None,
        sport: sport.into(),
        home_team: "Home".into(),
        away_team: "Away".into(),
        predicted_spread: spread,
        predicted_total: total,
        confidence,
        outcome,
        graded_at: chrono::Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn pushes_are_excluded_from_rates() {
        let picks = vec![
            pick("basketball_nba", 4.0, Some(150.0), 60.0, PickOutcome::Win),
            pick("basketball_nba", 4.0, Some(150.0), 60.0, PickOutcome::Push),
            pick("basketball_nba", 4.0, Some(150.0), 60.0, PickOutcome::Loss),
            pick("basketball_nba", 4.0, Some(150.0), 60.0, PickOutcome::Win),
        ];
        let (rate, decided) = ats_summary(&picks);
        assert_eq!(decided, 3);
        assert_relative_eq!(rate, 200.0 / 3.0, epsilon = 1e-9);

        let report = build_segmentation_report(&picks);
        assert_eq!(report.total_samples, 4);
        assert_eq!(report.by_sport.len(), 1);
        assert_eq!(report.by_sport[0].decided(), 3);
    }

    #[test]
    fn picks_are_split_along_every_axis() {
        let picks = vec![
            pick("NBA", -1.5, Some(128.0), 0.45, PickOutcome::Win),
            pick("basketball_ncaab", 8.0, Some(150.0), 72.0, PickOutcome::Loss),
            pick("basketball_ncaab", 13.0, None, 55.0, PickOutcome::Win),
        ];
        let report = build_segmentation_report(&picks);
        let sports: Vec<_> = report.by_sport.iter().map(|s| s.segment.as_str()).collect();
        assert_eq!(sports, vec!["basketball_nba", "basketball_ncaab"]);
        let spreads: Vec<_> = report.by_spread.iter().map(|s| s.segment).collect();
        assert_eq!(
            spreads,
            vec![SpreadBucket::Small, SpreadBucket::Large, SpreadBucket::Blowout]
        );
        // untotaled pick is left out of the total axis
        assert_eq!(report.by_total.iter().map(|s| s.decided()).sum::<u32>(), 2);
        // 0.45 is a fraction → low band
        assert_eq!(report.by_confidence[0].segment, ConfidenceBand::Low);
    }

    #[test]
    fn league_aliases_share_one_sport_segment() {
        let picks = vec![
            pick("NBA", 2.0, None, 60.0, PickOutcome::Win),
            pick("basketball_nba", 4.0, None, 60.0, PickOutcome::Loss),
            pick(" nba ", 6.0, None, 60.0, PickOutcome::Win),
        ];
        let report = build_segmentation_report(&picks);
        assert_eq!(report.by_sport.len(), 1);
        assert_eq!(report.by_sport[0].segment, "basketball_nba");
        assert_eq!(report.by_sport[0].decided(), 3);
    }

    #[test]
    fn empty_input_yields_empty_report() {
        let report = build_segmentation_report(&[]);
        assert_eq!(report, SegmentationReport::default());
        assert_eq!(ats_summary(&[]), (0.0, 0));
    }
}
