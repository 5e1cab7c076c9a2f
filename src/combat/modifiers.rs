//! Multipliers applied inside the damage pipeline
//!
//! Class advantage, terrain and flanking. Each returns a plain factor; the
//! pipeline rounds after applying it.

use serde::{Deserialize, Serialize};

use crate::battle::grid::HexGrid;
use crate::battle::hex::HexDirection;
use crate::battle::unit_type::UnitClass;
use crate::battle::units::Unit;

/// Class advantage of `attacker` over `defender`
///
/// The table is asymmetric: Ranged hits Infantry for 1.3 but Infantry only
/// loses 0.8 against Ranged.
pub fn type_advantage(attacker: UnitClass, defender: UnitClass) -> f32 {
    use UnitClass::*;

    match (attacker, defender) {
        (Mounted, Ranged) => 1.5,
        (Infantry, Mounted) => 1.5,
        (Ranged, Infantry) => 1.3,
        (Ranged, Mounted) => 0.7,
        (Mounted, Infantry) => 0.7,
        (Infantry, Ranged) => 0.8,
        _ => 1.0,
    }
}

/// Terrain factor from the attacker's height over the defender
///
/// Neutral for now: elevation is tracked on every tile but does not yet
/// change damage.
pub fn terrain_modifier(_elevation_advantage: i8) -> f32 {
    1.0
}

/// Where the attacker stands relative to the defender's facing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlankPosition {
    Front,
    Side,
    Back,
}

impl FlankPosition {
    /// Classify an attack coming from `from` onto a defender facing `facing`
    pub fn from_directions(facing: HexDirection, from: HexDirection) -> Self {
        match facing.turns_to(&from) {
            0 => FlankPosition::Front,
            1 | 2 => FlankPosition::Side,
            _ => FlankPosition::Back,
        }
    }

    pub fn multiplier(&self) -> f32 {
        match self {
            FlankPosition::Front => 1.0,
            FlankPosition::Side => 1.25,
            FlankPosition::Back => 1.5,
        }
    }
}

/// Flank position of `attacker` against `defender`, if they are adjacent
pub fn flank_position(grid: &HexGrid, attacker: &Unit, defender: &Unit) -> Option<FlankPosition> {
    defender
        .position
        .direction_to(&attacker.position, grid.orientation)
        .map(|from| FlankPosition::from_directions(defender.facing, from))
}
