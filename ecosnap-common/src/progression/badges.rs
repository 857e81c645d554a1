//! Badge catalog and eligibility evaluation
//!
//! Each badge carries exactly one numeric criterion read from the progression
//! state. A badge is achieved when the current value reaches the threshold;
//! the progress percentage shown to users is derived from the same ratio so
//! the two never disagree.
//!
//! The catalog is loaded once at startup (TOML or built-in) and is immutable
//! afterwards. Its order is the evaluation order.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::info;

use super::ProgressionState;
use crate::{Error, Result};

/// Which progression field a badge watches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CriterionKind {
    ReportCount,
    Accuracy,
    Streak,
}

impl CriterionKind {
    pub fn current_value(&self, state: &ProgressionState) -> u64 {
        match self {
            CriterionKind::ReportCount => state.report_count,
            CriterionKind::Accuracy => u64::from(state.accuracy),
            CriterionKind::Streak => u64::from(state.streak_days),
        }
    }
}

/// One unlockable achievement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Badge {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub criterion: CriterionKind,
    pub threshold: u64,
    /// Eco points granted on unlock
    #[serde(default)]
    pub reward: u64,
}

impl Badge {
    pub fn current_value(&self, state: &ProgressionState) -> u64 {
        self.criterion.current_value(state)
    }

    pub fn is_achieved(&self, state: &ProgressionState) -> bool {
        self.current_value(state) >= self.threshold
    }

    /// `min(current / threshold, 1) * 100`
    pub fn progress_percent(&self, state: &ProgressionState) -> f64 {
        if self.is_achieved(state) {
            return 100.0;
        }
        // threshold > 0 here, otherwise the badge would be achieved
        let percent = self.current_value(state) as f64 * 100.0 / self.threshold as f64;
        percent.min(100.0)
    }
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default, rename = "badge")]
    badges: Vec<Badge>,
}

/// Ordered, validated badge definitions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BadgeCatalog {
    badges: Vec<Badge>,
}

static DEFAULT_CATALOG: Lazy<BadgeCatalog> = Lazy::new(|| BadgeCatalog {
    badges: vec![
        badge(
            "first-report",
            "First Report",
            "Submit your first waste report",
            CriterionKind::ReportCount,
            1,
            5,
        ),
        badge(
            "eco-starter",
            "Eco Starter",
            "Submit 10 waste reports",
            CriterionKind::ReportCount,
            10,
            20,
        ),
        badge(
            "eco-champion",
            "Eco Champion",
            "Submit 50 waste reports",
            CriterionKind::ReportCount,
            50,
            50,
        ),
        badge(
            "sharp-eye",
            "Sharp Eye",
            "Keep an average classification confidence of 90%",
            CriterionKind::Accuracy,
            90,
            25,
        ),
        badge(
            "week-streak",
            "Week Streak",
            "Report on 7 consecutive days",
            CriterionKind::Streak,
            7,
            30,
        ),
        badge(
            "month-streak",
            "Month Streak",
            "Report on 30 consecutive days",
            CriterionKind::Streak,
            30,
            100,
        ),
    ],
});

fn badge(
    id: &str,
    name: &str,
    description: &str,
    criterion: CriterionKind,
    threshold: u64,
    reward: u64,
) -> Badge {
    Badge {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        criterion,
        threshold,
        reward,
    }
}

impl BadgeCatalog {
    /// Build a catalog, rejecting duplicate/empty ids and unreachable
    /// accuracy thresholds
    pub fn new(badges: Vec<Badge>) -> Result<Self> {
        let mut seen = HashSet::new();
        for badge in &badges {
            if badge.id.trim().is_empty() {
                return Err(Error::Config("Badge with empty id in catalog".to_string()));
            }
            if !seen.insert(badge.id.as_str()) {
                return Err(Error::Config(format!("Duplicate badge id: {}", badge.id)));
            }
            if badge.criterion == CriterionKind::Accuracy && badge.threshold > 100 {
                return Err(Error::Config(format!(
                    "Badge {} has accuracy threshold {} above 100",
                    badge.id, badge.threshold
                )));
            }
        }
        Ok(Self { badges })
    }

    /// Built-in catalog used when no catalog file is configured
    pub fn builtin() -> Self {
        DEFAULT_CATALOG.clone()
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: CatalogFile = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Invalid badge catalog: {}", e)))?;
        Self::new(file.badges)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let catalog = Self::from_toml_str(&content)?;
        info!("Loaded {} badges from {}", catalog.len(), path.display());
        Ok(catalog)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Badge> {
        self.badges.iter()
    }

    pub fn get(&self, id: &str) -> Option<&Badge> {
        self.badges.iter().find(|b| b.id == id)
    }

    pub fn len(&self) -> usize {
        self.badges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.badges.is_empty()
    }

    /// Badges not yet in `state.badges_earned` whose criterion `state` meets,
    /// in catalog order
    pub fn newly_achieved(&self, state: &ProgressionState) -> Vec<&Badge> {
        self.badges
            .iter()
            .filter(|b| !state.badges_earned.contains(&b.id))
            .filter(|b| b.is_achieved(state))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(report_count: u64, accuracy: u8, streak_days: u32) -> ProgressionState {
        ProgressionState {
            report_count,
            accuracy,
            streak_days,
            ..ProgressionState::default()
        }
    }

    #[test]
    fn test_progress_matches_achievement() {
        let b = badge("ten", "Ten", "", CriterionKind::ReportCount, 10, 0);
        assert_eq!(b.progress_percent(&state(0, 0, 0)), 0.0);
        assert_eq!(b.progress_percent(&state(4, 0, 0)), 40.0);
        assert!(!b.is_achieved(&state(9, 0, 0)));
        assert!(b.progress_percent(&state(9, 0, 0)) < 100.0);
        assert!(b.is_achieved(&state(10, 0, 0)));
        assert_eq!(b.progress_percent(&state(10, 0, 0)), 100.0);
        assert_eq!(b.progress_percent(&state(25, 0, 0)), 100.0);
    }

    #[test]
    fn test_criterion_reads_right_field() {
        let s = state(3, 77, 5);
        assert_eq!(CriterionKind::ReportCount.current_value(&s), 3);
        assert_eq!(CriterionKind::Accuracy.current_value(&s), 77);
        assert_eq!(CriterionKind::Streak.current_value(&s), 5);
    }

    #[test]
    fn test_zero_threshold_is_always_achieved() {
        let b = badge("free", "Free", "", CriterionKind::Streak, 0, 1);
        assert!(b.is_achieved(&state(0, 0, 0)));
        assert_eq!(b.progress_percent(&state(0, 0, 0)), 100.0);
    }

    #[test]
    fn test_newly_achieved_skips_earned_and_keeps_order() {
        let catalog = BadgeCatalog::new(vec![
            badge("b", "B", "", CriterionKind::Streak, 1, 0),
            badge("a", "A", "", CriterionKind::ReportCount, 1, 0),
            badge("c", "C", "", CriterionKind::Accuracy, 95, 0),
        ])
        .unwrap();

        let mut s = state(1, 90, 1);
        let ids: Vec<&str> = catalog.newly_achieved(&s).iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);

        s.badges_earned.insert("b".to_string());
        let ids: Vec<&str> = catalog.newly_achieved(&s).iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["a"]);
    }

    #[test]
    fn test_catalog_from_toml() {
        let toml = r#"
            [[badge]]
            id = "first-report"
            name = "First Report"
            criterion = "report_count"
            threshold = 1
            reward = 5

            [[badge]]
            id = "streaker"
            name = "Streaker"
            description = "Three days in a row"
            criterion = "streak"
            threshold = 3
        "#;
        let catalog = BadgeCatalog::from_toml_str(toml).unwrap();
        assert_eq!(catalog.len(), 2);
        let first = catalog.get("first-report").unwrap();
        assert_eq!(first.reward, 5);
        assert_eq!(first.criterion, CriterionKind::ReportCount);
        assert_eq!(catalog.get("streaker").unwrap().reward, 0);
        let order: Vec<&str> = catalog.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(order, vec!["first-report", "streaker"]);
    }

    #[test]
    fn test_empty_toml_is_empty_catalog() {
        let catalog = BadgeCatalog::from_toml_str("").unwrap();
        assert!(catalog.is_empty());
        assert!(catalog.newly_achieved(&state(100, 100, 100)).is_empty());
    }

    #[test]
    fn test_catalog_validation() {
        let dup = BadgeCatalog::new(vec![
            badge("x", "X", "", CriterionKind::Streak, 1, 0),
            badge("x", "X2", "", CriterionKind::Streak, 2, 0),
        ]);
        assert!(matches!(dup, Err(Error::Config(_))));

        let unreachable =
            BadgeCatalog::new(vec![badge("acc", "Acc", "", CriterionKind::Accuracy, 101, 0)]);
        assert!(matches!(unreachable, Err(Error::Config(_))));

        let blank = BadgeCatalog::new(vec![badge(" ", "Blank", "", CriterionKind::Streak, 1, 0)]);
        assert!(matches!(blank, Err(Error::Config(_))));

        let bad_kind = BadgeCatalog::from_toml_str(
            "[[badge]]\nid = \"q\"\nname = \"Q\"\ncriterion = \"likes\"\nthreshold = 1\n",
        );
        assert!(matches!(bad_kind, Err(Error::Config(_))));
    }

    #[test]
    fn test_builtin_catalog_is_valid() {
        let builtin = BadgeCatalog::builtin();
        assert!(!builtin.is_empty());
        assert!(BadgeCatalog::new(builtin.iter().cloned().collect()).is_ok());
        assert_eq!(builtin.iter().next().unwrap().id, "first-report");
    }
}
