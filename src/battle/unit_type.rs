//! Unit classes and their default stat blocks

use serde::{Deserialize, Serialize};

use crate::core::types::Millis;

/// Class tag used by the type-advantage table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UnitClass {
    #[default]
    Infantry,
    Ranged,
    Mounted,
    Special,
}

/// Default stats for a unit class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassProfile {
    pub max_health: i32,
    pub max_stamina: i32,
    pub max_balance: i32,
    pub max_morale: i32,
    pub base_attack: i32,
    pub physical_defense: i32,
    pub magical_defense: i32,
    pub attack_interval_ms: Millis,
    pub movement: u32,
    pub critical_chance: f32,
    pub critical_multiplier: f32,
    pub dodge_chance: f32,
}

impl UnitClass {
    /// Get default stats for this class
    pub fn default_profile(&self) -> ClassProfile {
        match self {
            UnitClass::Infantry => ClassProfile {
                max_health: 100,
                max_stamina: 10,
                max_balance: 10,
                max_morale: 100,
                base_attack: 12,
                physical_defense: 10,
                magical_defense: 5,
                attack_interval_ms: 2500,
                movement: 3,
                critical_chance: 0.05,
                critical_multiplier: 1.5,
                dodge_chance: 0.1,
            },

            UnitClass::Ranged => ClassProfile {
                max_health: 70,
                max_stamina: 10,
                max_balance: 8,
                max_morale: 100,
                base_attack: 14,
                physical_defense: 4,
                magical_defense: 8,
                attack_interval_ms: 3000,
                movement: 3,
                critical_chance: 0.1,
                critical_multiplier: 1.5,
                dodge_chance: 0.15,
            },

            UnitClass::Mounted => ClassProfile {
                max_health: 120,
                max_stamina: 12,
                max_balance: 12,
                max_morale: 100,
                base_attack: 15,
                physical_defense: 8,
                magical_defense: 4,
                attack_interval_ms: 2000,
                movement: 5, // Fast
                critical_chance: 0.05,
                critical_multiplier: 1.75,
                dodge_chance: 0.05,
            },

            UnitClass::Special => ClassProfile {
                max_health: 80,
                max_stamina: 10,
                max_balance: 10,
                max_morale: 100,
                base_attack: 10,
                physical_defense: 5,
                magical_defense: 15,
                attack_interval_ms: 2500,
                movement: 3,
                critical_chance: 0.05,
                critical_multiplier: 1.5,
                dodge_chance: 0.1,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mounted_moves_farthest() {
        let mounted = UnitClass::Mounted.default_profile().movement;
        for class in [UnitClass::Infantry, UnitClass::Ranged, UnitClass::Special] {
            assert!(mounted > class.default_profile().movement);
        }
    }

    #[test]
    fn test_profiles_are_positive() {
        for class in [
            UnitClass::Infantry,
            UnitClass::Ranged,
            UnitClass::Mounted,
            UnitClass::Special,
        ] {
            let p = class.default_profile();
            assert!(p.max_health > 0 && p.max_stamina > 0 && p.max_balance > 0);
            assert!(p.attack_interval_ms > 0);
            assert!((0.0..=1.0).contains(&p.critical_chance));
        }
    }
}
