//! Timed status effects on units
//!
//! At most one effect per (unit, kind). Re-applying an active kind stacks
//! into the existing entry: the longer duration wins and powers add up.
//! Durations count status ticks, not milliseconds.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::battle::units::Unit;
use crate::core::types::UnitId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusKind {
    /// Blocks strikes and movement while active
    Stun,
    /// Halves movement (floored at 1)
    Slow,
    /// Physical damage every tick
    Poison,
    /// Magical damage every tick, doubled
    Burn,
    /// Halves the unit's balance in the dodge contest when attacking
    Blind,
    /// Adds its power to base attack
    Berserk,
    /// Absorbs incoming strike damage up to its power
    Shield,
}

impl StatusKind {
    pub fn name(&self) -> &'static str {
        match self {
            StatusKind::Stun => "stun",
            StatusKind::Slow => "slow",
            StatusKind::Poison => "poison",
            StatusKind::Burn => "burn",
            StatusKind::Blind => "blind",
            StatusKind::Berserk => "berserk",
            StatusKind::Shield => "shield",
        }
    }

    /// Damage dealt per tick at `power`, before defense
    /// Health lost per tick; defenses do not apply
    fn periodic(&self, power: i32) -> Option<i32> {
        match self {
            StatusKind::Poison => Some(power),
            StatusKind::Burn => Some(power * 2),
            _ => None,
        }
    }
}

/// An active effect on one unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEffect {
    pub kind: StatusKind,
    pub target: UnitId,
    /// Status ticks left
    pub remaining: u32,
    pub power: i32,
}

/// What `apply` did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Applied {
    pub kind: StatusKind,
    pub remaining: u32,
    pub power: i32,
    /// Merged into an existing entry rather than started fresh
    pub stacked: bool,
}

/// What happened to one effect during a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    pub kind: StatusKind,
    /// Health actually removed by the periodic effect
    pub damage: i32,
    pub expired: bool,
}

/// Result of a shield soaking a strike
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Absorption {
    pub absorbed: i32,
    pub remaining_damage: i32,
    /// The shield was used up and removed
    pub depleted: bool,
}

/// Active effects for every unit
///
/// Keyed by `UnitId` in a `BTreeMap` so ticking visits units in a fixed
/// order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatusTracker {
    effects: BTreeMap<UnitId, Vec<StatusEffect>>,
}

impl StatusTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply or stack an effect on `unit`
    pub fn apply(&mut self, unit: &mut Unit, kind: StatusKind, duration: u32, power: i32) -> Applied {
        let effects = self.effects.entry(unit.id).or_default();

        if let Some(existing) = effects.iter_mut().find(|e| e.kind == kind) {
            existing.remaining = existing.remaining.max(duration);
            existing.power += power;
            return Applied {
                kind,
                remaining: existing.remaining,
                power: existing.power,
                stacked: true,
            };
        }

        effects.push(StatusEffect {
            kind,
            target: unit.id,
            remaining: duration,
            power,
        });
        on_onset(unit, kind);

        Applied {
            kind,
            remaining: duration,
            power,
            stacked: false,
        }
    }

    /// Run one status tick for `unit`
    ///
    /// Periodic damage goes straight to health. Effects reaching zero
    /// remaining ticks are removed and their onset undone.
    pub fn tick(&mut self, unit: &mut Unit) -> Vec<TickReport> {
        let Some(effects) = self.effects.get_mut(&unit.id) else {
            return Vec::new();
        };

        let mut reports = Vec::with_capacity(effects.len());
        for effect in effects.iter_mut() {
            let damage = match effect.kind.periodic(effect.power) {
                Some(amount) => unit.health.spend(amount.max(0)),
                None => 0,
            };

            effect.remaining = effect.remaining.saturating_sub(1);
            reports.push(TickReport {
                kind: effect.kind,
                damage,
                expired: effect.remaining == 0,
            });
        }

        effects.retain(|e| e.remaining > 0);
        if effects.is_empty() {
            self.effects.remove(&unit.id);
        }
        for report in reports.iter().filter(|r| r.expired) {
            on_expiry(unit, report.kind);
        }

        reports
    }

    /// Let an active Shield soak up to `damage`
    pub fn absorb(&mut self, unit: UnitId, damage: i32) -> Absorption {
        let Some(effects) = self.effects.get_mut(&unit) else {
            return Absorption {
                remaining_damage: damage,
                ..Absorption::default()
            };
        };
        let Some(shield) = effects.iter_mut().find(|e| e.kind == StatusKind::Shield) else {
            return Absorption {
                remaining_damage: damage,
                ..Absorption::default()
            };
        };

        let absorbed = damage.min(shield.power).max(0);
        shield.power -= absorbed;
        let depleted = shield.power <= 0;
        if depleted {
            effects.retain(|e| e.kind != StatusKind::Shield);
            if effects.is_empty() {
                self.effects.remove(&unit);
            }
        }

        Absorption {
            absorbed,
            remaining_damage: damage - absorbed,
            depleted,
        }
    }

    /// Attack bonus from Berserk, 0 if none
    pub fn bonus_attack(&self, unit: UnitId) -> i32 {
        self.get(unit, StatusKind::Berserk)
            .map(|e| e.power)
            .unwrap_or(0)
    }

    pub fn get(&self, unit: UnitId, kind: StatusKind) -> Option<&StatusEffect> {
        self.effects_of(unit).iter().find(|e| e.kind == kind)
    }

    pub fn has(&self, unit: UnitId, kind: StatusKind) -> bool {
        self.get(unit, kind).is_some()
    }

    pub fn effects_of(&self, unit: UnitId) -> &[StatusEffect] {
        self.effects.get(&unit).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Units with at least one active effect, in id order
    pub fn tracked_units(&self) -> Vec<UnitId> {
        self.effects.keys().copied().collect()
    }

    /// Drop every effect on a unit (death or removal)
    pub fn clear_unit(&mut self, unit: UnitId) {
        self.effects.remove(&unit);
    }

    /// Total active effects across all units
    pub fn len(&self) -> usize {
        self.effects.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }
}

fn on_onset(unit: &mut Unit, kind: StatusKind) {
    match kind {
        StatusKind::Stun => unit.stunned = true,
        StatusKind::Slow => {
            unit.slowed = true;
            unit.stats.movement = (unit.stats.base_movement / 2).max(1);
        }
        _ => {}
    }
}

fn on_expiry(unit: &mut Unit, kind: StatusKind) {
    match kind {
        StatusKind::Stun => unit.stunned = false,
        StatusKind::Slow => {
            unit.slowed = false;
            unit.stats.movement = unit.stats.base_movement;
        }
        _ => {}
    }
}
