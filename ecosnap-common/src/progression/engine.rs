//! Report-to-progression transition
//!
//! One processed report produces one [`Transition`]. The steps run in a fixed
//! order and each reads only values already settled in the same call:
//!
//! 1. base award plus confidence bonus
//! 2. report count
//! 3. rolling accuracy (weighted by the pre-increment count)
//! 4. streak and last report time
//! 5. rank from the new points
//! 6. badges against the fully updated state, their rewards, then rank again
//!
//! No I/O, no clock reads, no shared state: identical inputs always yield an
//! identical transition, so a caller may discard a result and recompute it
//! from a fresher snapshot.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::badges::{Badge, BadgeCatalog};
use super::rank::{rank_for, Rank};
use super::streak::next_streak;
use super::ProgressionState;
use crate::classification::{Classification, Confidence};

/// Points for every processed report
pub const BASE_AWARD: u64 = 10;

/// Extra points when confidence is strictly above [`BONUS_CONFIDENCE_ABOVE`]
pub const CONFIDENCE_BONUS: u64 = 5;

pub const BONUS_CONFIDENCE_ABOVE: u8 = 80;

/// Result of applying one report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transition {
    /// Snapshot ready to persist
    pub state: ProgressionState,
    pub previous_rank: Rank,
    /// Base, bonus and badge rewards granted by this report
    pub points_awarded: u64,
    /// Badges unlocked by this report, in catalog order
    pub unlocked: Vec<Badge>,
}

impl Transition {
    pub fn rank_changed(&self) -> bool {
        self.state.rank != self.previous_rank
    }
}

/// Incremental mean: `round((old * old_count + confidence) / (old_count + 1))`
///
/// Halves round up, matching the rounding the stored averages were built with.
pub fn rolling_accuracy(old_accuracy: u8, old_count: u64, confidence: Confidence) -> u8 {
    let new_count = u128::from(old_count) + 1;
    let total = u128::from(old_accuracy) * u128::from(old_count) + u128::from(confidence.value());
    let rounded = (2 * total + new_count) / (2 * new_count);
    // Mean of values in 0..=100 stays in 0..=100
    rounded.min(100) as u8
}

fn report_award(confidence: Confidence) -> u64 {
    if confidence.value() > BONUS_CONFIDENCE_ABOVE {
        BASE_AWARD + CONFIDENCE_BONUS
    } else {
        BASE_AWARD
    }
}

/// Apply one classified report to a user's prior snapshot
pub fn apply_report(
    prior: &ProgressionState,
    classification: &Classification,
    now: DateTime<Utc>,
    catalog: &BadgeCatalog,
) -> Transition {
    let confidence = classification.confidence;
    let mut next = prior.clone();

    let report_points = report_award(confidence);
    next.eco_points = next.eco_points.saturating_add(report_points);

    next.report_count = prior.report_count.saturating_add(1);

    next.accuracy = rolling_accuracy(prior.accuracy, prior.report_count, confidence);

    next.streak_days = next_streak(prior.streak_days, prior.last_report_at, now);
    next.last_report_at = Some(now);

    // First rank pass: report points only
    next.rank = rank_for(next.eco_points);

    let unlocked: Vec<Badge> = catalog.newly_achieved(&next).into_iter().cloned().collect();
    let mut badge_points: u64 = 0;
    for badge in &unlocked {
        next.badges_earned.insert(badge.id.clone());
        badge_points = badge_points.saturating_add(badge.reward);
    }
    next.eco_points = next.eco_points.saturating_add(badge_points);

    // Second rank pass: badge rewards may cross further thresholds
    next.rank = rank_for(next.eco_points);

    Transition {
        state: next,
        previous_rank: prior.rank,
        points_awarded: report_points.saturating_add(badge_points),
        unlocked,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classification::WasteCategory;
    use crate::progression::badges::CriterionKind;
    use chrono::{Duration, TimeZone};

    fn scan(confidence: u8) -> Classification {
        Classification::new(WasteCategory::Plastic, Confidence::new(confidence).unwrap())
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 3, 10, 0, 0).unwrap()
    }

    fn badge(id: &str, criterion: CriterionKind, threshold: u64, reward: u64) -> Badge {
        Badge {
            id: id.to_string(),
            name: id.to_string(),
            description: String::new(),
            criterion,
            threshold,
            reward,
        }
    }

    #[test]
    fn test_points_bonus_is_strictly_above_80() {
        let catalog = BadgeCatalog::empty();
        let prior = ProgressionState::default();
        assert_eq!(apply_report(&prior, &scan(80), t0(), &catalog).state.eco_points, 10);
        assert_eq!(apply_report(&prior, &scan(81), t0(), &catalog).state.eco_points, 15);
        assert_eq!(apply_report(&prior, &scan(0), t0(), &catalog).state.eco_points, 10);
    }

    #[test]
    fn test_first_report_badge_scenario() {
        let catalog =
            BadgeCatalog::new(vec![badge("first", CriterionKind::ReportCount, 1, 5)]).unwrap();
        let prior = ProgressionState::default();

        let t = apply_report(&prior, &scan(90), t0(), &catalog);

        assert_eq!(t.state.eco_points, 20);
        assert_eq!(t.state.report_count, 1);
        assert_eq!(t.state.accuracy, 90);
        assert_eq!(t.state.rank, Rank::Beginner);
        assert_eq!(t.points_awarded, 20);
        assert_eq!(t.unlocked.len(), 1);
        assert_eq!(t.unlocked[0].id, "first");
        assert!(t.state.badges_earned.contains("first"));
        assert!(!t.rank_changed());
    }

    #[test]
    fn test_rank_boundary_scenario() {
        let catalog = BadgeCatalog::empty();
        let prior = ProgressionState {
            eco_points: 45,
            report_count: 4,
            accuracy: 70,
            ..ProgressionState::default()
        };

        let t = apply_report(&prior, &scan(70), t0(), &catalog);

        assert_eq!(t.state.eco_points, 55);
        assert_eq!(t.previous_rank, Rank::Beginner);
        assert_eq!(t.state.rank, Rank::EcoWarrior);
        assert!(t.rank_changed());
    }

    #[test]
    fn test_badge_reward_triggers_second_rank_pass() {
        // 40 + 10 = 50 crosses into EcoWarrior; the 120-point badge lifts it to 170
        let catalog =
            BadgeCatalog::new(vec![badge("ten", CriterionKind::ReportCount, 10, 120)]).unwrap();
        let prior = ProgressionState {
            eco_points: 40,
            report_count: 9,
            accuracy: 60,
            ..ProgressionState::default()
        };

        let t = apply_report(&prior, &scan(50), t0(), &catalog);

        assert_eq!(t.state.eco_points, 170);
        assert_eq!(t.state.rank, Rank::EnvironmentalGuardian);
        assert_eq!(t.state.rank, rank_for(t.state.eco_points));
    }

    #[test]
    fn test_badge_reward_alone_can_cross_threshold() {
        let catalog =
            BadgeCatalog::new(vec![badge("acc", CriterionKind::Accuracy, 50, 500)]).unwrap();
        let t = apply_report(&ProgressionState::default(), &scan(60), t0(), &catalog);
        assert_eq!(t.state.eco_points, 510);
        assert_eq!(t.state.rank, Rank::Legend);
    }

    #[test]
    fn test_earned_badge_is_not_reawarded() {
        let catalog =
            BadgeCatalog::new(vec![badge("first", CriterionKind::ReportCount, 1, 5)]).unwrap();
        let first = apply_report(&ProgressionState::default(), &scan(90), t0(), &catalog);
        let second = apply_report(&first.state, &scan(90), t0(), &catalog);

        assert!(second.unlocked.is_empty());
        assert_eq!(second.state.eco_points, 20 + 15);
        assert_eq!(second.state.badges_earned.len(), 1);
    }

    #[test]
    fn test_badges_evaluated_on_updated_streak() {
        let catalog =
            BadgeCatalog::new(vec![badge("two-days", CriterionKind::Streak, 2, 0)]).unwrap();
        let prior = ProgressionState {
            report_count: 1,
            streak_days: 1,
            last_report_at: Some(t0()),
            ..ProgressionState::default()
        };

        let same_day = apply_report(&prior, &scan(50), t0() + Duration::hours(1), &catalog);
        assert!(same_day.unlocked.is_empty());

        let next_day = apply_report(&prior, &scan(50), t0() + Duration::days(1), &catalog);
        assert_eq!(next_day.unlocked.len(), 1);
    }

    #[test]
    fn test_unlocked_list_follows_catalog_order() {
        let catalog = BadgeCatalog::new(vec![
            badge("z-streak", CriterionKind::Streak, 1, 1),
            badge("a-count", CriterionKind::ReportCount, 1, 1),
            badge("m-acc", CriterionKind::Accuracy, 10, 1),
        ])
        .unwrap();

        let t = apply_report(&ProgressionState::default(), &scan(90), t0(), &catalog);
        let ids: Vec<&str> = t.unlocked.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["z-streak", "a-count", "m-acc"]);
        assert_eq!(t.state.eco_points, 15 + 3);
    }

    #[test]
    fn test_streak_sequence() {
        let catalog = BadgeCatalog::empty();
        let mut state = ProgressionState::default();

        state = apply_report(&state, &scan(50), t0(), &catalog).state;
        assert_eq!(state.streak_days, 1);

        state = apply_report(&state, &scan(50), t0() + Duration::hours(3), &catalog).state;
        assert_eq!(state.streak_days, 1);

        state = apply_report(&state, &scan(50), t0() + Duration::days(1), &catalog).state;
        assert_eq!(state.streak_days, 2);

        state = apply_report(&state, &scan(50), t0() + Duration::days(4), &catalog).state;
        assert_eq!(state.streak_days, 1);
        assert_eq!(state.last_report_at, Some(t0() + Duration::days(4)));
    }

    #[test]
    fn test_report_dated_before_last_keeps_streak() {
        let catalog = BadgeCatalog::empty();
        let prior = ProgressionState {
            report_count: 3,
            streak_days: 3,
            last_report_at: Some(t0()),
            ..ProgressionState::default()
        };
        let earlier = t0() - Duration::days(2);

        let t = apply_report(&prior, &scan(50), earlier, &catalog);

        assert_eq!(t.state.streak_days, 3);
        assert_eq!(t.state.last_report_at, Some(earlier));
        assert_eq!(t.state.report_count, 4);
        assert_eq!(t.state.eco_points, 10);
    }

    #[test]
    fn test_rolling_accuracy_steps() {
        let c = |v| Confidence::new(v).unwrap();
        assert_eq!(rolling_accuracy(0, 0, c(73)), 73);
        // (90 + 80) / 2 = 85
        assert_eq!(rolling_accuracy(90, 1, c(80)), 85);
        // (85 * 2 + 71) / 3 = 80.33
        assert_eq!(rolling_accuracy(85, 2, c(71)), 80);
        // (50 + 51) / 2 = 50.5 rounds up
        assert_eq!(rolling_accuracy(50, 1, c(51)), 51);
        assert_eq!(rolling_accuracy(100, u64::MAX, c(100)), 100);
        assert_eq!(rolling_accuracy(0, u64::MAX, c(0)), 0);
    }

    #[test]
    fn test_accuracy_over_sequence_uses_per_step_rounding() {
        let catalog = BadgeCatalog::empty();
        let mut state = ProgressionState::default();
        let mut expected: u64 = 0;
        for (n, confidence) in [90u8, 80, 71, 100, 3].into_iter().enumerate() {
            let n = n as u64;
            expected = (2 * (expected * n + u64::from(confidence)) + (n + 1)) / (2 * (n + 1));
            state = apply_report(&state, &scan(confidence), t0(), &catalog).state;
            assert_eq!(u64::from(state.accuracy), expected);
        }
        assert_eq!(state.report_count, 5);
    }

    #[test]
    fn test_report_count_after_n_reports() {
        let catalog = BadgeCatalog::builtin();
        let mut state = ProgressionState::default();
        for i in 0..37 {
            state = apply_report(&state, &scan(40), t0() + Duration::days(i), &catalog).state;
            assert_eq!(state.rank, rank_for(state.eco_points));
        }
        assert_eq!(state.report_count, 37);
    }

    #[test]
    fn test_pure_and_repeatable() {
        let catalog = BadgeCatalog::builtin();
        let prior = ProgressionState {
            eco_points: 140,
            report_count: 9,
            accuracy: 88,
            rank: Rank::EcoWarrior,
            streak_days: 6,
            last_report_at: Some(t0()),
            badges_earned: ["first-report".to_string()].into_iter().collect(),
        };
        let snapshot = prior.clone();
        let now = t0() + Duration::days(1);

        let first = apply_report(&prior, &scan(95), now, &catalog);
        let second = apply_report(&prior, &scan(95), now, &catalog);

        assert_eq!(first, second);
        assert_eq!(prior, snapshot);
    }
}
