//! # EcoSnap Common Library
//!
//! Shared code for the EcoSnap services including:
//! - Progression engine (points, rank ladder, streaks, badges)
//! - Classification result types
//! - Database schema initialization and migrations
//! - Event types (EcoEvent enum) and the broadcast event bus
//! - Configuration loading
//! - Clock abstraction

pub mod classification;
pub mod config;
#[cfg(feature = "sqlx")]
pub mod db;
pub mod error;
pub mod events;
pub mod progression;
pub mod sse;
pub mod time;

pub use classification::{Classification, Confidence, RiskLevel, WasteCategory};
pub use error::{Error, Result};
pub use progression::{apply_report, rank_for, ProgressionState, Rank, Transition};
pub use time::{Clock, ManualClock, SystemClock};
