//! Damage pipeline and the dodge contest
//!
//! The pipeline runs in a fixed order and rounds to the nearest integer after
//! every multiplicative step. Rounding per step keeps Defence mode at exactly
//! half of the undefended result for the same random draws.
//!
//! Random draws are always taken in the same order (variation, then
//! critical), whatever the modifiers, so two calls with identically seeded
//! sources see identical draws.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::battle::units::{Unit, UnitMode};
use crate::combat::modifiers::{type_advantage, FlankPosition};

/// Multiplier applied to a defender in Defence mode
pub const DEFENCE_MODE_FACTOR: f32 = 0.5;

/// Every landed hit deals at least this much
pub const MIN_DAMAGE: i32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DamageType {
    #[default]
    Physical,
    Magical,
    /// Ignores defense
    True,
}

/// Everything about a strike that isn't a unit stat
#[derive(Debug, Clone, PartialEq)]
pub struct DamageContext {
    pub damage_type: DamageType,
    /// Extra power from the skill used (0 for a basic attack)
    pub skill_power: i32,
    /// Attack bonus from status effects (Berserk)
    pub bonus_attack: i32,
    /// Half-width of the uniform variation, 0.1 = plus/minus 10%
    pub variation: f32,
    pub terrain: f32,
    /// `None` when flanking is disabled
    pub flank: Option<FlankPosition>,
}

impl Default for DamageContext {
    fn default() -> Self {
        Self {
            damage_type: DamageType::Physical,
            skill_power: 0,
            bonus_attack: 0,
            variation: 0.1,
            terrain: 1.0,
            flank: None,
        }
    }
}

/// Outcome of one damage calculation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DamageRoll {
    pub amount: i32,
    pub critical: bool,
}

/// Defense factor for a damage type: 100 / (100 + defense)
pub fn mitigation(damage_type: DamageType, defender: &Unit) -> f32 {
    let defense = match damage_type {
        DamageType::Physical => defender.stats.physical_defense,
        DamageType::Magical => defender.stats.magical_defense,
        DamageType::True => return 1.0,
    };
    100.0 / (100.0 + defense.max(0) as f32)
}

fn scale(damage: f32, factor: f32) -> f32 {
    (damage * factor).round()
}

/// Compute the damage `attacker` deals to `defender`
pub fn calculate_damage<R: Rng>(
    attacker: &Unit,
    defender: &Unit,
    ctx: &DamageContext,
    rng: &mut R,
) -> DamageRoll {
    // 1. Base
    let base = (attacker.stats.base_attack + ctx.skill_power + ctx.bonus_attack).max(0) as f32;

    // 2. Variation
    let variation = if ctx.variation > 0.0 {
        rng.gen_range(-ctx.variation..=ctx.variation)
    } else {
        0.0
    };
    let mut damage = (base + base * variation).round();

    // 3. Defense
    damage = scale(damage, mitigation(ctx.damage_type, defender));

    // 4. Defence mode
    if defender.mode == UnitMode::Defence {
        damage = scale(damage, DEFENCE_MODE_FACTOR);
    }

    // 5. Class advantage
    damage = scale(damage, type_advantage(attacker.class, defender.class));

    // 6. Terrain
    damage = scale(damage, ctx.terrain);

    // 7. Flanking
    if let Some(flank) = ctx.flank {
        damage = scale(damage, flank.multiplier());
    }

    // 8. Critical
    let critical = rng.gen::<f32>() < attacker.stats.critical_chance;
    if critical {
        damage = scale(damage, attacker.stats.critical_multiplier);
    }

    // 9. Floor
    DamageRoll {
        amount: (damage as i32).max(MIN_DAMAGE),
        critical,
    }
}

/// Chance that an attack lands, from the balance contest
///
/// A blinded attacker fights with half its balance. Two unbalanced units
/// trade at even odds.
pub fn attack_success_chance(attacker_balance: i32, defender_balance: i32, blinded: bool) -> f32 {
    let mut attacker = attacker_balance.max(0) as f32;
    if blinded {
        attacker *= 0.5;
    }
    let defender = defender_balance.max(0) as f32;

    if attacker + defender <= 0.0 {
        return 0.5;
    }
    attacker / (attacker + defender)
}

/// Roll the dodge: the attack misses when the draw reaches the success chance
pub fn roll_dodge<R: Rng>(success_chance: f32, rng: &mut R) -> bool {
    rng.gen::<f32>() >= success_chance
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::hex::HexCoord;
    use crate::battle::unit_type::UnitClass;
    use crate::battle::units::UnitSpawn;
    use crate::core::types::{Side, UnitId};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn unit(class: UnitClass, attack: i32, defense: i32) -> Unit {
        UnitSpawn::new("u", Side::Player, class, HexCoord::new(0, 0))
            .with_attack(attack)
            .with_defense(defense, defense)
            .with_critical(0.0, 1.5)
            .build(UnitId(0))
    }

    #[test]
    fn test_base_damage_within_variation() {
        let attacker = unit(UnitClass::Infantry, 10, 0);
        let defender = unit(UnitClass::Infantry, 10, 0);
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        for _ in 0..200 {
            let roll = calculate_damage(&attacker, &defender, &DamageContext::default(), &mut rng);
            assert!((9..=11).contains(&roll.amount), "got {}", roll.amount);
            assert!(!roll.critical);
        }
    }

    #[test]
    fn test_defence_mode_halves() {
        let attacker = unit(UnitClass::Infantry, 40, 0);
        let defender = unit(UnitClass::Infantry, 10, 0);
        let mut defending = defender.clone();
        defending.mode = UnitMode::Defence;

        for seed in 0..50 {
            let ctx = DamageContext::default();
            let normal =
                calculate_damage(&attacker, &defender, &ctx, &mut ChaCha8Rng::seed_from_u64(seed));
            let halved =
                calculate_damage(&attacker, &defending, &ctx, &mut ChaCha8Rng::seed_from_u64(seed));
            assert_eq!(halved.amount, (normal.amount as f32 * 0.5).round() as i32);
        }
    }

    #[test]
    fn test_mitigation_by_defense() {
        let attacker = unit(UnitClass::Infantry, 100, 0);
        let defender = unit(UnitClass::Infantry, 10, 100);
        let ctx = DamageContext {
            variation: 0.0,
            ..DamageContext::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        assert_eq!(calculate_damage(&attacker, &defender, &ctx, &mut rng).amount, 50);

        let true_damage = DamageContext {
            damage_type: DamageType::True,
            ..ctx
        };
        assert_eq!(
            calculate_damage(&attacker, &defender, &true_damage, &mut rng).amount,
            100
        );
    }

    #[test]
    fn test_damage_floor() {
        let attacker = unit(UnitClass::Infantry, 0, 0);
        let defender = unit(UnitClass::Infantry, 0, 10_000);
        let mut rng = ChaCha8Rng::seed_from_u64(3);

        let roll = calculate_damage(&attacker, &defender, &DamageContext::default(), &mut rng);
        assert_eq!(roll.amount, MIN_DAMAGE);
    }

    #[test]
    fn test_class_advantage_applied() {
        let attacker = unit(UnitClass::Mounted, 20, 0);
        let defender = unit(UnitClass::Ranged, 0, 0);
        let ctx = DamageContext {
            variation: 0.0,
            ..DamageContext::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        assert_eq!(calculate_damage(&attacker, &defender, &ctx, &mut rng).amount, 30);
    }

    #[test]
    fn test_critical_multiplies() {
        let mut attacker = unit(UnitClass::Infantry, 20, 0);
        attacker.stats.critical_chance = 1.0;
        attacker.stats.critical_multiplier = 2.0;
        let defender = unit(UnitClass::Infantry, 0, 0);
        let ctx = DamageContext {
            variation: 0.0,
            ..DamageContext::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        let roll = calculate_damage(&attacker, &defender, &ctx, &mut rng);
        assert!(roll.critical);
        assert_eq!(roll.amount, 40);
    }

    #[test]
    fn test_flanking_back_bonus() {
        let attacker = unit(UnitClass::Infantry, 20, 0);
        let defender = unit(UnitClass::Infantry, 0, 0);
        let ctx = DamageContext {
            variation: 0.0,
            flank: Some(FlankPosition::Back),
            ..DamageContext::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        assert_eq!(calculate_damage(&attacker, &defender, &ctx, &mut rng).amount, 30);
    }

    #[test]
    fn test_success_chance_balance_ratio() {
        assert_eq!(attack_success_chance(10, 10, false), 0.5);
        assert_eq!(attack_success_chance(0, 0, false), 0.5);
        assert_eq!(attack_success_chance(10, 0, false), 1.0);
        assert!((attack_success_chance(10, 5, false) - 2.0 / 3.0).abs() < 1e-6);
        assert!((attack_success_chance(10, 10, true) - 1.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_certain_hit_never_dodged() {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        for _ in 0..100 {
            assert!(!roll_dodge(1.0, &mut rng));
        }
    }

}
