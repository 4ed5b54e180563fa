//! Hit dice and dice rolling helpers.
//!
//! The engine only rolls dice in one place (rolling a hit-die on level-up
//! when the caller asks the platform to roll for them); everything else
//! validates rolls submitted by the caller.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Standard die types used by class hit dice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DieType {
    D4,
    D6,
    D8,
    D10,
    D12,
    D20,
}

impl DieType {
    pub fn sides(&self) -> u8 {
        match self {
            DieType::D4 => 4,
            DieType::D6 => 6,
            DieType::D8 => 8,
            DieType::D10 => 10,
            DieType::D12 => 12,
            DieType::D20 => 20,
        }
    }

    pub fn from_sides(sides: u8) -> Option<DieType> {
        match sides {
            4 => Some(DieType::D4),
            6 => Some(DieType::D6),
            8 => Some(DieType::D8),
            10 => Some(DieType::D10),
            12 => Some(DieType::D12),
            20 => Some(DieType::D20),
            _ => None,
        }
    }
}

impl fmt::Display for DieType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "d{}", self.sides())
    }
}

/// Roll a single die.
pub fn roll(die: DieType) -> u8 {
    let mut rng = rand::thread_rng();
    rng.gen_range(1..=die.sides())
}
