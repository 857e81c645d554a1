//! Event types and the broadcast event bus
//!
//! Events are emitted after a report transition has been committed. They are
//! notifications only: a lagging or absent subscriber never affects what was
//! persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::classification::WasteCategory;
use crate::progression::Rank;

/// Progression events surfaced to SSE clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EcoEvent {
    /// A report was classified, stored, and credited
    ReportProcessed {
        user_id: Uuid,
        report_id: Uuid,
        category: WasteCategory,
        confidence: u8,
        points_awarded: u64,
        eco_points: u64,
        timestamp: DateTime<Utc>,
    },

    /// A badge was unlocked by a report
    BadgeUnlocked {
        user_id: Uuid,
        badge_id: String,
        badge_name: String,
        reward: u64,
        timestamp: DateTime<Utc>,
    },

    /// The user's rank differs after a report
    RankChanged {
        user_id: Uuid,
        old_rank: Rank,
        new_rank: Rank,
        eco_points: u64,
        timestamp: DateTime<Utc>,
    },
}

impl EcoEvent {
    /// SSE event name
    pub fn event_type(&self) -> &'static str {
        match self {
            EcoEvent::ReportProcessed { .. } => "ReportProcessed",
            EcoEvent::BadgeUnlocked { .. } => "BadgeUnlocked",
            EcoEvent::RankChanged { .. } => "RankChanged",
        }
    }

    pub fn user_id(&self) -> Uuid {
        match self {
            EcoEvent::ReportProcessed { user_id, .. }
            | EcoEvent::BadgeUnlocked { user_id, .. }
            | EcoEvent::RankChanged { user_id, .. } => *user_id,
        }
    }
}

/// Fan-out channel for [`EcoEvent`]s
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<EcoEvent>,
}

impl EventBus {
    /// Creates a new EventBus buffering up to `capacity` events per
    /// subscriber before the oldest are dropped
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<EcoEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns the number of subscribers reached; zero subscribers is not an
    /// error.
    pub fn emit(&self, event: EcoEvent) -> usize {
        match self.tx.send(event) {
            Ok(count) => count,
            Err(_) => {
                tracing::trace!("No subscribers for event");
                0
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
