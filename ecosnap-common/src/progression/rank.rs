//! Rank ladder
//!
//! Rank is a derived view of eco points, never an independent fact. Anything
//! that stores a rank must store `rank_for(eco_points)`.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Rank {
    Beginner,
    EcoWarrior,
    EnvironmentalGuardian,
    PlanetProtector,
    Legend,
}

/// Ascending (minimum points, rank) pairs
pub const RANK_LADDER: [(u64, Rank); 5] = [
    (0, Rank::Beginner),
    (50, Rank::EcoWarrior),
    (150, Rank::EnvironmentalGuardian),
    (300, Rank::PlanetProtector),
    (500, Rank::Legend),
];

/// Highest rank whose threshold does not exceed `eco_points`
pub fn rank_for(eco_points: u64) -> Rank {
    RANK_LADDER
        .iter()
        .rev()
        .find(|(threshold, _)| eco_points >= *threshold)
        .map(|(_, rank)| *rank)
        .unwrap_or(Rank::Beginner)
}

impl Rank {
    /// Points needed to hold this rank
    pub fn threshold(&self) -> u64 {
        RANK_LADDER
            .iter()
            .find(|(_, rank)| rank == self)
            .map(|(threshold, _)| *threshold)
            .unwrap_or(0)
    }

    /// Next rung up, `None` at the top
    pub fn next(&self) -> Option<Rank> {
        RANK_LADDER
            .iter()
            .map(|(_, rank)| *rank)
            .find(|rank| rank > self)
    }

    /// Identifier used in the database and API
    pub fn as_str(&self) -> &'static str {
        match self {
            Rank::Beginner => "Beginner",
            Rank::EcoWarrior => "EcoWarrior",
            Rank::EnvironmentalGuardian => "EnvironmentalGuardian",
            Rank::PlanetProtector => "PlanetProtector",
            Rank::Legend => "Legend",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Rank::Beginner => "Beginner",
            Rank::EcoWarrior => "Eco Warrior",
            Rank::EnvironmentalGuardian => "Environmental Guardian",
            Rank::PlanetProtector => "Planet Protector",
            Rank::Legend => "Legend",
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for Rank {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        RANK_LADDER
            .iter()
            .map(|(_, rank)| *rank)
            .find(|rank| rank.as_str() == s || rank.display_name() == s)
            .ok_or_else(|| Error::InvalidInput(format!("Unknown rank: {}", s)))
    }
}
