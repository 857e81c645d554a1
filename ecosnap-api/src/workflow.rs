//! Report submission workflow
//!
//! Classify the image, then apply the progression transition and persist it
//! atomically. Transitions for one user are serialized in-process by
//! [`UserLocks`] and across processes by the optimistic `version` check in
//! [`db::commit_report`]; a stale snapshot is re-read and recomputed.

use ecosnap_common::db::{ReportRecord, UserRecord};
use ecosnap_common::events::{EcoEvent, EventBus};
use ecosnap_common::progression::{Badge, BadgeCatalog};
use ecosnap_common::{apply_report, Clock, Rank};
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{info, warn};
use uuid::Uuid;

use crate::classifier::Classifier;
use crate::db::{self, CommitOutcome};
use crate::error::{ApiError, ApiResult};

pub const MAX_DESCRIPTION_CHARS: usize = 500;
pub const MAX_SUBMISSION_ID_LEN: usize = 128;

/// Idle lock entries are pruned once the map grows past this
const LOCK_PRUNE_THRESHOLD: usize = 1024;

/// One sighting as received from a client
#[derive(Debug, Clone)]
pub struct NewReport {
    pub user_id: Uuid,
    /// Idempotency key; a fresh one is generated when absent
    pub submission_id: Option<String>,
    pub image: Vec<u8>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub description: Option<String>,
}

/// What a submission did
#[derive(Debug, Clone)]
pub struct SubmissionOutcome {
    pub report: ReportRecord,
    /// The user after the submission
    pub user: UserRecord,
    pub previous_rank: Rank,
    pub unlocked: Vec<Badge>,
    /// The submission id was already processed; nothing was applied
    pub duplicate: bool,
}

impl SubmissionOutcome {
    pub fn rank_changed(&self) -> bool {
        self.user.state.rank != self.previous_rank
    }
}

/// Per-user async mutexes
#[derive(Clone, Default)]
pub struct UserLocks {
    inner: Arc<Mutex<HashMap<Uuid, Arc<Mutex<()>>>>>,
}

impl UserLocks {
    pub async fn lock(&self, user_id: Uuid) -> OwnedMutexGuard<()> {
        let user_lock = {
            let mut map = self.inner.lock().await;
            if map.len() > LOCK_PRUNE_THRESHOLD {
                map.retain(|_, lock| Arc::strong_count(lock) > 1);
            }
            map.entry(user_id).or_default().clone()
        };
        user_lock.lock_owned().await
    }
}

/// Everything a submission needs
pub struct ReportWorkflow {
    db: SqlitePool,
    classifier: Arc<dyn Classifier>,
    clock: Arc<dyn Clock>,
    catalog: Arc<BadgeCatalog>,
    event_bus: EventBus,
    locks: UserLocks,
    max_write_attempts: u32,
}

impl ReportWorkflow {
    pub fn new(
        db: SqlitePool,
        classifier: Arc<dyn Classifier>,
        clock: Arc<dyn Clock>,
        catalog: Arc<BadgeCatalog>,
        event_bus: EventBus,
        max_write_attempts: u32,
    ) -> Self {
        Self {
            db,
            classifier,
            clock,
            catalog,
            event_bus,
            locks: UserLocks::default(),
            max_write_attempts: max_write_attempts.max(1),
        }
    }

    pub fn catalog(&self) -> &BadgeCatalog {
        &self.catalog
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub fn classifier(&self) -> &dyn Classifier {
        self.classifier.as_ref()
    }

    /// Run one submission end to end
    ///
    /// Classifier failures surface as [`ApiError::ClassifierUnavailable`]
    /// with nothing persisted.
    pub async fn submit(&self, new_report: NewReport) -> ApiResult<SubmissionOutcome> {
        validate(&new_report)?;

        let submission_id = match new_report.submission_id.as_deref().map(str::trim) {
            Some(id) => id.to_string(),
            None => Uuid::new_v4().to_string(),
        };

        if db::load_user(&self.db, new_report.user_id).await?.is_none() {
            return Err(ApiError::NotFound(format!("User {}", new_report.user_id)));
        }

        if let Some(existing) = db::find_by_submission(&self.db, &submission_id).await? {
            return self.duplicate(existing, new_report.user_id).await;
        }

        let classification = match self.classifier.classify(&new_report.image).await {
            Ok(c) => c,
            Err(e) => {
                warn!(user_id = %new_report.user_id, "Classification failed: {}", e);
                return Err(ApiError::ClassifierUnavailable(e));
            }
        };

        let image_sha256 = format!("{:x}", Sha256::digest(&new_report.image));
        let image_size = i64::try_from(new_report.image.len())
            .map_err(|_| ApiError::BadRequest("Image too large".to_string()))?;

        let _guard = self.locks.lock(new_report.user_id).await;

        // A concurrent request with the same key may have committed while
        // this one was classifying.
        if let Some(existing) = db::find_by_submission(&self.db, &submission_id).await? {
            return self.duplicate(existing, new_report.user_id).await;
        }

        for attempt in 1..=self.max_write_attempts {
            let snapshot = db::load_user(&self.db, new_report.user_id)
                .await?
                .ok_or_else(|| ApiError::NotFound(format!("User {}", new_report.user_id)))?;

            let now = self.clock.now();
            let transition = apply_report(&snapshot.state, &classification, now, &self.catalog);

            let report = ReportRecord {
                guid: Uuid::new_v4(),
                user_id: snapshot.guid,
                submission_id: submission_id.clone(),
                category: classification.category,
                confidence: classification.confidence,
                risk_level: classification.risk_level(),
                image_sha256: image_sha256.clone(),
                image_size,
                latitude: new_report.latitude,
                longitude: new_report.longitude,
                description: new_report.description.clone(),
                points_awarded: transition.points_awarded,
                created_at: now,
            };

            match db::commit_report(&self.db, &snapshot, &transition, &report).await? {
                CommitOutcome::Committed => {
                    let unlocked_ids: Vec<&str> =
                        transition.unlocked.iter().map(|b| b.id.as_str()).collect();
                    info!(
                        user_id = %snapshot.guid,
                        report_id = %report.guid,
                        category = %report.category,
                        points = transition.points_awarded,
                        eco_points = transition.state.eco_points,
                        rank = %transition.state.rank,
                        rank_changed = transition.rank_changed(),
                        unlocked = ?unlocked_ids,
                        "Report processed"
                    );

                    let outcome = SubmissionOutcome {
                        report,
                        user: UserRecord {
                            state: transition.state,
                            version: snapshot.version + 1,
                            updated_at: now,
                            ..snapshot
                        },
                        previous_rank: transition.previous_rank,
                        unlocked: transition.unlocked,
                        duplicate: false,
                    };
                    self.emit_events(&outcome);
                    return Ok(outcome);
                }
                CommitOutcome::StaleSnapshot => {
                    warn!(
                        user_id = %snapshot.guid,
                        attempt,
                        "User changed during commit, recomputing"
                    );
                }
                CommitOutcome::DuplicateSubmission => {
                    let existing = db::find_by_submission(&self.db, &submission_id)
                        .await?
                        .ok_or_else(|| {
                            ApiError::Internal(format!(
                                "Submission {} vanished after conflict",
                                submission_id
                            ))
                        })?;
                    return self.duplicate(existing, new_report.user_id).await;
                }
            }
        }

        Err(ApiError::Conflict(format!(
            "Could not commit report for user {} after {} attempts",
            new_report.user_id, self.max_write_attempts
        )))
    }

    async fn duplicate(
        &self,
        existing: ReportRecord,
        user_id: Uuid,
    ) -> ApiResult<SubmissionOutcome> {
        if existing.user_id != user_id {
            return Err(ApiError::Conflict(format!(
                "Submission id {} belongs to another user",
                existing.submission_id
            )));
        }

        let user = db::load_user(&self.db, user_id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("User {}", user_id)))?;

        info!(
            user_id = %user_id,
            submission_id = %existing.submission_id,
            "Duplicate submission, returning stored report"
        );

        Ok(SubmissionOutcome {
            report: existing,
            previous_rank: user.state.rank,
            user,
            unlocked: Vec::new(),
            duplicate: true,
        })
    }

    fn emit_events(&self, outcome: &SubmissionOutcome) {
        let user_id = outcome.user.guid;
        let timestamp = outcome.report.created_at;

        self.event_bus.emit(EcoEvent::ReportProcessed {
            user_id,
            report_id: outcome.report.guid,
            category: outcome.report.category,
            confidence: outcome.report.confidence.value(),
            points_awarded: outcome.report.points_awarded,
            eco_points: outcome.user.state.eco_points,
            timestamp,
        });

        for badge in &outcome.unlocked {
            self.event_bus.emit(EcoEvent::BadgeUnlocked {
                user_id,
                badge_id: badge.id.clone(),
                badge_name: badge.name.clone(),
                reward: badge.reward,
                timestamp,
            });
        }

        if outcome.rank_changed() {
            self.event_bus.emit(EcoEvent::RankChanged {
                user_id,
                old_rank: outcome.previous_rank,
                new_rank: outcome.user.state.rank,
                eco_points: outcome.user.state.eco_points,
                timestamp,
            });
        }
    }
}

fn validate(new_report: &NewReport) -> ApiResult<()> {
    if new_report.image.is_empty() {
        return Err(ApiError::BadRequest("Image is empty".to_string()));
    }

    if let Some(id) = &new_report.submission_id {
        let id = id.trim();
        if id.is_empty() || id.len() > MAX_SUBMISSION_ID_LEN {
            return Err(ApiError::BadRequest(format!(
                "submission_id must be 1-{} characters",
                MAX_SUBMISSION_ID_LEN
            )));
        }
    }

    if let Some(lat) = new_report.latitude {
        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(ApiError::BadRequest(format!("Latitude out of range: {}", lat)));
        }
    }

    if let Some(lon) = new_report.longitude {
        if !lon.is_finite() || !(-180.0..=180.0).contains(&lon) {
            return Err(ApiError::BadRequest(format!("Longitude out of range: {}", lon)));
        }
    }

    if let Some(description) = &new_report.description {
        if description.chars().count() > MAX_DESCRIPTION_CHARS {
            return Err(ApiError::BadRequest(format!(
                "Description longer than {} characters",
                MAX_DESCRIPTION_CHARS
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> NewReport {
        NewReport {
            user_id: Uuid::new_v4(),
            submission_id: None,
            image: vec![0xFF, 0xD8, 0xFF],
            latitude: Some(51.5),
            longitude: Some(-0.12),
            description: None,
        }
    }

    #[test]
    fn test_validate_accepts_plain_report() {
        assert!(validate(&report()).is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_image() {
        let r = NewReport { image: Vec::new(), ..report() };
        assert!(matches!(validate(&r), Err(ApiError::BadRequest(_))));
    }

    #[test]
    fn test_validate_rejects_bad_coordinates() {
        let r = NewReport { latitude: Some(91.0), ..report() };
        assert!(validate(&r).is_err());
        let r = NewReport { longitude: Some(f64::NAN), ..report() };
        assert!(validate(&r).is_err());
    }

    #[test]
    fn test_validate_rejects_blank_submission_id() {
        let r = NewReport { submission_id: Some("   ".to_string()), ..report() };
        assert!(validate(&r).is_err());
    }

    #[test]
    fn test_validate_rejects_long_description() {
        let r = NewReport {
            description: Some("x".repeat(MAX_DESCRIPTION_CHARS + 1)),
            ..report()
        };
        assert!(validate(&r).is_err());
    }

    #[tokio::test]
    async fn test_user_locks_serialize_same_user() {
        let locks = UserLocks::default();
        let user = Uuid::new_v4();

        let guard = locks.lock(user).await;
        let other =
            tokio::time::timeout(std::time::Duration::from_millis(50), locks.lock(user)).await;
        assert!(other.is_err(), "second lock on same user must wait");

        let different = tokio::time::timeout(
            std::time::Duration::from_millis(50),
            locks.lock(Uuid::new_v4()),
        )
        .await;
        assert!(different.is_ok(), "other users are not blocked");

        drop(guard);
        assert!(
            tokio::time::timeout(std::time::Duration::from_millis(50), locks.lock(user))
                .await
                .is_ok()
        );
    }
}
