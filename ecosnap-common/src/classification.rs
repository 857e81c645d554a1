//! Classification result types
//!
//! A classification is what the external detection service says about one
//! photographed sighting. Only the confidence feeds progression; the category
//! and its risk level flow straight through to the stored report.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Waste category reported by the detection service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WasteCategory {
    Plastic,
    Chemical,
    Oil,
    MixedWaste,
}

impl WasteCategory {
    pub const ALL: [WasteCategory; 4] = [
        WasteCategory::Plastic,
        WasteCategory::Chemical,
        WasteCategory::Oil,
        WasteCategory::MixedWaste,
    ];

    /// Stable identifier used in the database
    pub fn as_str(&self) -> &'static str {
        match self {
            WasteCategory::Plastic => "Plastic",
            WasteCategory::Chemical => "Chemical",
            WasteCategory::Oil => "Oil",
            WasteCategory::MixedWaste => "MixedWaste",
        }
    }

    /// Map a label as emitted by the detection service ("Mixed Waste" etc.)
    pub fn from_service_label(label: &str) -> Option<Self> {
        match label.trim() {
            "Plastic" => Some(WasteCategory::Plastic),
            "Chemical" => Some(WasteCategory::Chemical),
            "Oil" => Some(WasteCategory::Oil),
            "Mixed Waste" | "MixedWaste" => Some(WasteCategory::MixedWaste),
            _ => None,
        }
    }

    /// Hazard level attached to every sighting of this category
    pub fn risk_level(&self) -> RiskLevel {
        match self {
            WasteCategory::Plastic => RiskLevel::Medium,
            WasteCategory::Chemical => RiskLevel::Critical,
            WasteCategory::Oil => RiskLevel::High,
            WasteCategory::MixedWaste => RiskLevel::Medium,
        }
    }
}

impl fmt::Display for WasteCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WasteCategory {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        WasteCategory::from_service_label(s)
            .ok_or_else(|| Error::InvalidInput(format!("Unknown waste category: {}", s)))
    }
}

/// Hazard level derived from the category
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiskLevel {
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
            RiskLevel::Critical => "Critical",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Medium" => Ok(RiskLevel::Medium),
            "High" => Ok(RiskLevel::High),
            "Critical" => Ok(RiskLevel::Critical),
            other => Err(Error::InvalidInput(format!("Unknown risk level: {}", other))),
        }
    }
}

/// Classification confidence as an integer percentage in `0..=100`
///
/// Holding a `Confidence` proves the value was range-checked; the progression
/// engine accepts nothing else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Confidence(u8);

impl Confidence {
    pub const MAX: u8 = 100;

    pub fn new(percent: u8) -> Result<Self> {
        if percent > Self::MAX {
            return Err(Error::InvalidInput(format!(
                "Confidence {} outside 0..=100",
                percent
            )));
        }
        Ok(Self(percent))
    }

    /// Accept a real-valued percentage, rounding half away from zero
    pub fn from_percent(percent: f64) -> Result<Self> {
        if !percent.is_finite() || !(0.0..=100.0).contains(&percent) {
            return Err(Error::InvalidInput(format!(
                "Confidence {} outside 0..=100",
                percent
            )));
        }
        Ok(Self(percent.round() as u8))
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Confidence {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        Confidence::new(value)
    }
}

impl From<Confidence> for u8 {
    fn from(confidence: Confidence) -> u8 {
        confidence.0
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

/// Output of one classifier call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub category: WasteCategory,
    pub confidence: Confidence,
}

impl Classification {
    pub fn new(category: WasteCategory, confidence: Confidence) -> Self {
        Self {
            category,
            confidence,
        }
    }

    pub fn risk_level(&self) -> RiskLevel {
        self.category.risk_level()
    }
}
