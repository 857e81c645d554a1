//! Queries over the shared EcoSnap schema
//!
//! Schema creation lives in `ecosnap_common::db`; this module holds the
//! service's reads and the transactional progression commit.

mod reports;
mod users;

pub use reports::{commit_report, find_by_submission, get_report, list_user_reports, CommitOutcome};
pub use users::{create_user, leaderboard, load_earned_badges, load_user, EarnedBadge};

use ecosnap_common::{Error, Result};

/// SQLite stores integers as i64; progression counters are u64 in memory
fn to_i64(value: u64, column: &str) -> Result<i64> {
    i64::try_from(value)
        .map_err(|_| Error::Internal(format!("Value out of range for {}: {}", column, value)))
}
