//! Progression: eco points, rank ladder, streaks and badges
//!
//! [`apply_report`] turns one processed report into a new progression
//! snapshot. It is a pure function of its inputs; persistence and
//! per-user serialization live with the caller.

pub mod badges;
pub mod engine;
pub mod rank;
pub mod streak;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub use badges::{Badge, BadgeCatalog, CriterionKind};
pub use engine::{
    apply_report, rolling_accuracy, Transition, BASE_AWARD, BONUS_CONFIDENCE_ABOVE,
    CONFIDENCE_BONUS,
};
pub use rank::{rank_for, Rank, RANK_LADDER};
pub use streak::next_streak;

/// Per-user progression snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressionState {
    pub eco_points: u64,
    pub report_count: u64,
    /// Running mean of all recorded confidences, 0..=100
    pub accuracy: u8,
    pub rank: Rank,
    pub streak_days: u32,
    pub last_report_at: Option<DateTime<Utc>>,
    pub badges_earned: BTreeSet<String>,
}

impl Default for ProgressionState {
    fn default() -> Self {
        Self {
            eco_points: 0,
            report_count: 0,
            accuracy: 0,
            rank: Rank::Beginner,
            streak_days: 0,
            last_report_at: None,
            badges_earned: BTreeSet::new(),
        }
    }
}

impl ProgressionState {
    /// Points still missing for the next rank, `None` at the top
    pub fn points_to_next_rank(&self) -> Option<u64> {
        self.rank
            .next()
            .map(|next| next.threshold().saturating_sub(self.eco_points))
    }
}
