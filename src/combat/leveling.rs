//! Experience and level progression

use crate::battle::units::Unit;

/// Max health gained per level (health is refilled on level up)
pub const HEALTH_GROWTH: i32 = 10;
/// Base attack gained per level
pub const ATTACK_GROWTH: i32 = 2;
/// Physical defense gained per level
pub const DEFENSE_GROWTH: i32 = 1;

/// Experience needed to leave `level`
pub fn experience_for_next_level(level: u32) -> u32 {
    level * 100
}

/// Add experience; returns the new level if the unit leveled up
///
/// At most one level per grant. Experience resets to zero on level up.
pub fn grant_experience(unit: &mut Unit, amount: u32) -> Option<u32> {
    unit.experience += amount;

    if unit.experience < experience_for_next_level(unit.level) {
        return None;
    }

    level_up(unit);
    Some(unit.level)
}

fn level_up(unit: &mut Unit) {
    unit.level += 1;
    unit.experience = 0;

    let max_health = unit.health.max() + HEALTH_GROWTH;
    unit.health.set_max(max_health);
    unit.health.refill();
    unit.stats.base_attack += ATTACK_GROWTH;
    unit.stats.physical_defense += DEFENSE_GROWTH;

    tracing::info!(unit = %unit.id, level = unit.level, "{} leveled up", unit.name);
}
