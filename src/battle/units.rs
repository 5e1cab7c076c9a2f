//! Units, their depletable pools, and the roster arena that owns them
//!
//! A unit stores the coordinate it stands on, never a reference to the tile.
//! The roster hands out sequential ids and never reuses them, so a removed
//! unit's id stays detectably stale for the rest of the battle.

use serde::{Deserialize, Serialize};

use crate::battle::hex::{HexCoord, HexDirection};
use crate::battle::unit_type::UnitClass;
use crate::core::error::{CombatError, Result};
use crate::core::types::{Millis, Side, UnitId};

/// A depletable resource clamped to [0, max]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pool {
    current: i32,
    max: i32,
}

impl Pool {
    /// A full pool
    pub fn new(max: i32) -> Self {
        let max = max.max(0);
        Self { current: max, max }
    }

    pub fn with_current(current: i32, max: i32) -> Self {
        let max = max.max(0);
        Self {
            current: current.clamp(0, max),
            max,
        }
    }

    pub fn current(&self) -> i32 {
        self.current
    }

    pub fn max(&self) -> i32 {
        self.max
    }

    pub fn is_depleted(&self) -> bool {
        self.current <= 0
    }

    pub fn fraction(&self) -> f32 {
        if self.max == 0 {
            0.0
        } else {
            self.current as f32 / self.max as f32
        }
    }

    /// Spend up to `amount`, clamping at zero. Returns the amount actually
    /// spent; whatever could not be covered is the overflow.
    pub fn spend(&mut self, amount: i32) -> i32 {
        let spent = amount.max(0).min(self.current);
        self.current -= spent;
        spent
    }

    /// Spend exactly `amount` or nothing
    pub fn try_spend(&mut self, amount: i32) -> Result<()> {
        if amount > self.current {
            return Err(CombatError::ResourceUnderflow {
                requested: amount,
                available: self.current,
            });
        }
        self.current -= amount.max(0);
        Ok(())
    }

    /// Restore up to `amount`, clamping at max. Returns the amount restored.
    pub fn restore(&mut self, amount: i32) -> i32 {
        let restored = amount.max(0).min(self.max - self.current);
        self.current += restored;
        restored
    }

    pub fn refill(&mut self) {
        self.current = self.max;
    }

    /// Change the maximum, keeping current within range
    pub fn set_max(&mut self, max: i32) {
        self.max = max.max(0);
        self.current = self.current.min(self.max);
    }
}

/// Behavior mode, set by callers (AI, player orders)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UnitMode {
    #[default]
    Normal,
    Attack,
    Defence,
    Retreat,
}

/// Fixed combat stats (changed only by leveling and status effects)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatStats {
    pub base_attack: i32,
    pub physical_defense: i32,
    pub magical_defense: i32,
    pub attack_interval_ms: Millis,
    /// Movement budget in hexes (halved while slowed)
    pub movement: u32,
    /// Movement budget without status effects
    pub base_movement: u32,
    pub critical_chance: f32,
    pub critical_multiplier: f32,
    /// Kept for stat-block compatibility; dodging uses the balance contest
    pub dodge_chance: f32,
}

/// A combatant on the battle grid
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Unit {
    pub id: UnitId,
    pub name: String,
    pub side: Side,
    pub class: UnitClass,
    pub mode: UnitMode,

    // Position
    pub position: HexCoord,
    pub facing: HexDirection,
    pub target: Option<UnitId>,

    // Pools
    pub health: Pool,
    pub stamina: Pool,
    pub balance: Pool,
    pub morale: Pool,

    pub stats: CombatStats,

    // Status flags
    pub stunned: bool,
    pub slowed: bool,

    // Progression
    pub level: u32,
    pub experience: u32,
}

impl Unit {
    pub fn is_alive(&self) -> bool {
        !self.health.is_depleted()
    }

    /// Can this unit start a strike right now?
    pub fn can_act(&self) -> bool {
        self.is_alive() && !self.stunned
    }

    pub fn is_hostile_to(&self, other: &Unit) -> bool {
        self.side != other.side
    }
}

/// Stat block used to spawn a unit
///
/// Anything left unset falls back to the class profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitSpawn {
    pub name: String,
    #[serde(default)]
    pub side: Side,
    #[serde(default)]
    pub class: UnitClass,
    pub position: HexCoord,
    #[serde(default)]
    pub mode: UnitMode,
    #[serde(default)]
    pub facing: HexDirection,

    pub health: Option<i32>,
    pub stamina: Option<i32>,
    pub balance: Option<i32>,
    pub morale: Option<i32>,
    pub base_attack: Option<i32>,
    pub physical_defense: Option<i32>,
    pub magical_defense: Option<i32>,
    pub attack_interval_ms: Option<Millis>,
    pub movement: Option<u32>,
    pub critical_chance: Option<f32>,
    pub critical_multiplier: Option<f32>,
    pub dodge_chance: Option<f32>,
}

impl UnitSpawn {
    pub fn new(name: impl Into<String>, side: Side, class: UnitClass, position: HexCoord) -> Self {
        Self {
            name: name.into(),
            side,
            class,
            position,
            mode: UnitMode::default(),
            facing: HexDirection::default(),
            health: None,
            stamina: None,
            balance: None,
            morale: None,
            base_attack: None,
            physical_defense: None,
            magical_defense: None,
            attack_interval_ms: None,
            movement: None,
            critical_chance: None,
            critical_multiplier: None,
            dodge_chance: None,
        }
    }

    pub fn with_pools(mut self, health: i32, stamina: i32, balance: i32) -> Self {
        self.health = Some(health);
        self.stamina = Some(stamina);
        self.balance = Some(balance);
        self
    }

    pub fn with_attack(mut self, base_attack: i32) -> Self {
        self.base_attack = Some(base_attack);
        self
    }

    pub fn with_defense(mut self, physical: i32, magical: i32) -> Self {
        self.physical_defense = Some(physical);
        self.magical_defense = Some(magical);
        self
    }

    pub fn with_critical(mut self, chance: f32, multiplier: f32) -> Self {
        self.critical_chance = Some(chance);
        self.critical_multiplier = Some(multiplier);
        self
    }

    pub fn with_movement(mut self, movement: u32) -> Self {
        self.movement = Some(movement);
        self
    }

    pub fn with_attack_interval(mut self, interval_ms: Millis) -> Self {
        self.attack_interval_ms = Some(interval_ms);
        self
    }

    pub fn with_mode(mut self, mode: UnitMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn facing(mut self, facing: HexDirection) -> Self {
        self.facing = facing;
        self
    }

    /// Build the unit this block describes
    pub fn build(&self, id: UnitId) -> Unit {
        let profile = self.class.default_profile();
        let movement = self.movement.unwrap_or(profile.movement);

        Unit {
            id,
            name: self.name.clone(),
            side: self.side,
            class: self.class,
            mode: self.mode,
            position: self.position,
            facing: self.facing,
            target: None,
            health: Pool::new(self.health.unwrap_or(profile.max_health)),
            stamina: Pool::new(self.stamina.unwrap_or(profile.max_stamina)),
            balance: Pool::new(self.balance.unwrap_or(profile.max_balance)),
            morale: Pool::new(self.morale.unwrap_or(profile.max_morale)),
            stats: CombatStats {
                base_attack: self.base_attack.unwrap_or(profile.base_attack),
                physical_defense: self.physical_defense.unwrap_or(profile.physical_defense),
                magical_defense: self.magical_defense.unwrap_or(profile.magical_defense),
                attack_interval_ms: self
                    .attack_interval_ms
                    .unwrap_or(profile.attack_interval_ms),
                movement,
                base_movement: movement,
                critical_chance: self.critical_chance.unwrap_or(profile.critical_chance),
                critical_multiplier: self
                    .critical_multiplier
                    .unwrap_or(profile.critical_multiplier),
                dodge_chance: self.dodge_chance.unwrap_or(profile.dodge_chance),
            },
            stunned: false,
            slowed: false,
            level: 1,
            experience: 0,
        }
    }
}

/// Arena of units keyed by `UnitId`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Roster {
    slots: Vec<Option<Unit>>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id the next inserted unit will get
    pub fn next_id(&self) -> UnitId {
        UnitId(self.slots.len() as u32)
    }

    /// Insert a unit built for `next_id()`
    pub fn insert(&mut self, unit: Unit) -> UnitId {
        let id = self.next_id();
        debug_assert_eq!(unit.id, id);
        self.slots.push(Some(unit));
        id
    }

    pub fn get(&self, id: UnitId) -> Option<&Unit> {
        self.slots.get(id.index()).and_then(|slot| slot.as_ref())
    }

    pub fn get_mut(&mut self, id: UnitId) -> Option<&mut Unit> {
        self.slots.get_mut(id.index()).and_then(|slot| slot.as_mut())
    }

    pub fn contains(&self, id: UnitId) -> bool {
        self.get(id).is_some()
    }

    /// Take a unit out of the battle; its id is never handed out again
    pub fn remove(&mut self, id: UnitId) -> Option<Unit> {
        self.slots.get_mut(id.index()).and_then(|slot| slot.take())
    }

    /// Units still in the battle, in id order
    pub fn iter(&self) -> impl Iterator<Item = &Unit> {
        self.slots.iter().filter_map(|slot| slot.as_ref())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Unit> {
        self.slots.iter_mut().filter_map(|slot| slot.as_mut())
    }

    pub fn ids(&self) -> Vec<UnitId> {
        self.iter().map(|u| u.id).collect()
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Living units on `side`
    pub fn count_side(&self, side: Side) -> usize {
        self.iter().filter(|u| u.side == side && u.is_alive()).count()
    }

    /// Clear every target reference to `id`
    pub fn clear_targets_of(&mut self, id: UnitId) {
        for unit in self.iter_mut() {
            if unit.target == Some(id) {
                unit.target = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_clamps_on_spend() {
        let mut pool = Pool::new(10);
        assert_eq!(pool.spend(4), 4);
        assert_eq!(pool.current(), 6);
        assert_eq!(pool.spend(20), 6);
        assert_eq!(pool.current(), 0);
        assert!(pool.is_depleted());
    }

    #[test]
    fn test_pool_try_spend_underflow() {
        let mut pool = Pool::new(3);
        let result = pool.try_spend(5);
        assert!(matches!(
            result,
            Err(CombatError::ResourceUnderflow {
                requested: 5,
                available: 3
            })
        ));
        assert_eq!(pool.current(), 3);
    }

    #[test]
    fn test_pool_restore_clamps_at_max() {
        let mut pool = Pool::with_current(8, 10);
        assert_eq!(pool.restore(5), 2);
        assert_eq!(pool.current(), 10);
    }

    #[test]
    fn test_pool_set_max_trims_current() {
        let mut pool = Pool::new(10);
        pool.set_max(6);
        assert_eq!(pool.current(), 6);
    }

    #[test]
    fn test_spawn_uses_class_defaults() {
        let spawn = UnitSpawn::new("Lancer", Side::Enemy, UnitClass::Mounted, HexCoord::new(1, 1));
        let unit = spawn.build(UnitId(0));
        let profile = UnitClass::Mounted.default_profile();
        assert_eq!(unit.health.max(), profile.max_health);
        assert_eq!(unit.stats.movement, profile.movement);
        assert_eq!(unit.side, Side::Enemy);
    }

    #[test]
    fn test_spawn_overrides() {
        let unit = UnitSpawn::new("Test", Side::Player, UnitClass::Infantry, HexCoord::new(0, 0))
            .with_pools(50, 10, 10)
            .with_attack(10)
            .with_defense(0, 0)
            .build(UnitId(3));
        assert_eq!(unit.health.current(), 50);
        assert_eq!(unit.stats.base_attack, 10);
        assert_eq!(unit.stats.physical_defense, 0);
        assert_eq!(unit.id, UnitId(3));
    }

    #[test]
    fn test_roster_ids_not_reused() {
        let mut roster = Roster::new();
        let spawn = UnitSpawn::new("A", Side::Player, UnitClass::Infantry, HexCoord::new(0, 0));
        let a = roster.insert(spawn.build(roster.next_id()));
        assert!(roster.remove(a).is_some());
        let b = roster.insert(spawn.build(roster.next_id()));

        assert_ne!(a, b);
        assert!(roster.get(a).is_none());
        assert!(roster.get(b).is_some());
        assert_eq!(roster.len(), 1);
    }

    #[test]
    fn test_clear_targets() {
        let mut roster = Roster::new();
        let spawn = UnitSpawn::new("A", Side::Player, UnitClass::Infantry, HexCoord::new(0, 0));
        let a = roster.insert(spawn.build(roster.next_id()));
        let b = roster.insert(spawn.build(roster.next_id()));
        roster.get_mut(a).unwrap().target = Some(b);

        roster.clear_targets_of(b);

        assert_eq!(roster.get(a).unwrap().target, None);
    }
}
