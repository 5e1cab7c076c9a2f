//! Per-pair engagement state machine
//!
//! One `Engagement` drives a single attacker against a single defender until
//! the defender falls, the attacker retreats or retargets, or the pair
//! becomes invalid. Waiting is a `remaining` field on the phase; `advance`
//! spends a time budget across as many phases as it covers.
//!
//! Loop: cooldown -> mode check -> adjacency (move or retarget) -> stamina
//! gate -> windup -> strike -> death check -> recover -> cooldown.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::battle::engagement::hostiles_within;
use crate::battle::hex::HexCoord;
use crate::battle::pathfinding::{
    closest_reachable_tile, farthest_reachable_tile, find_clear_path, path_length,
};
use crate::battle::units::UnitMode;
use crate::combat::damage::{
    attack_success_chance, calculate_damage, roll_dodge, DamageContext, DamageType,
};
use crate::combat::events::CombatEventKind;
use crate::combat::field::Battlefield;
use crate::combat::modifiers::{flank_position, terrain_modifier};
use crate::combat::status::StatusKind;
use crate::core::types::{EngagementId, Millis, UnitId};

/// A special attack: extra power and its own damage type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skill {
    pub id: u32,
    pub power: i32,
    pub damage_type: DamageType,
}

/// Who attacks whom, and with what (`None` = basic attack)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngagementAction {
    pub attacker: UnitId,
    pub defender: UnitId,
    pub skill: Option<Skill>,
}

impl EngagementAction {
    pub fn basic(attacker: UnitId, defender: UnitId) -> Self {
        Self {
            attacker,
            defender,
            skill: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AbortReason {
    /// Attacker or defender left the battle, or the attacker changed target
    Stale,
    /// No tile brings the attacker closer
    Unreachable,
    /// Replaced by a newer engagement for the same attacker
    Cancelled,
    /// Ran past `max_engagement_ms`
    TimedOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EngagementOutcome {
    /// Defender defeated
    Resolved,
    /// A closer hostile was found; a follow-up engagement targets it
    Retargeted(UnitId),
    Retreated,
    Aborted(AbortReason),
}

/// Where a move leads once it completes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovePurpose {
    Approach,
    Retreat,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Phase {
    AwaitCooldown {
        remaining: Millis,
    },
    ModeCheck,
    DefenceWait {
        remaining: Millis,
    },
    AdjacencyCheck,
    Moving {
        destination: HexCoord,
        steps: u32,
        remaining: Millis,
        purpose: MovePurpose,
    },
    PreconditionGate,
    Windup {
        remaining: Millis,
    },
    ExecuteStrike,
    DeathCheck,
    Recover {
        remaining: Millis,
    },
    DeathDelay {
        remaining: Millis,
    },
    Done(EngagementOutcome),
}

impl Phase {
    pub fn name(&self) -> &'static str {
        match self {
            Phase::AwaitCooldown { .. } => "await_cooldown",
            Phase::ModeCheck => "mode_check",
            Phase::DefenceWait { .. } => "defence_wait",
            Phase::AdjacencyCheck => "adjacency_check",
            Phase::Moving { .. } => "moving",
            Phase::PreconditionGate => "precondition_gate",
            Phase::Windup { .. } => "windup",
            Phase::ExecuteStrike => "execute_strike",
            Phase::DeathCheck => "death_check",
            Phase::Recover { .. } => "recover",
            Phase::DeathDelay { .. } => "death_delay",
            Phase::Done(_) => "done",
        }
    }

    fn remaining_mut(&mut self) -> Option<&mut Millis> {
        match self {
            Phase::AwaitCooldown { remaining }
            | Phase::DefenceWait { remaining }
            | Phase::Moving { remaining, .. }
            | Phase::Windup { remaining }
            | Phase::Recover { remaining }
            | Phase::DeathDelay { remaining } => Some(remaining),
            _ => None,
        }
    }
}

/// A running attacker/defender pair
#[derive(Debug, Clone)]
pub struct Engagement {
    pub id: EngagementId,
    pub action: EngagementAction,
    phase: Phase,
    /// Time since the engagement started
    elapsed: Millis,
    /// Clock used to stamp events while advancing
    clock: Millis,
    consecutive_skips: u32,
    /// Destination held while moving
    reservation: Option<HexCoord>,
    strikes: u32,
}

impl Engagement {
    pub fn new(id: EngagementId, action: EngagementAction, field: &Battlefield) -> Self {
        Self {
            id,
            action,
            phase: Phase::AwaitCooldown {
                remaining: cooldown_for(field, action.attacker),
            },
            elapsed: 0,
            clock: field.now_ms,
            consecutive_skips: 0,
            reservation: None,
            strikes: 0,
        }
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn elapsed(&self) -> Millis {
        self.elapsed
    }

    pub fn strikes(&self) -> u32 {
        self.strikes
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.phase, Phase::Done(_))
    }

    /// Does this engagement name a unit that is gone, or an attacker that
    /// has turned to another target?
    ///
    /// During the death delay the defender is gone on purpose.
    pub fn is_stale(&self, field: &Battlefield) -> bool {
        let Some(attacker) = field.roster.get(self.action.attacker) else {
            return true;
        };
        if matches!(self.phase, Phase::DeathDelay { .. } | Phase::Done(_)) {
            return false;
        }
        !field.roster.contains(self.action.defender)
            || attacker.target != Some(self.action.defender)
    }

    /// Release anything this engagement holds on the grid
    pub fn release(&mut self, field: &mut Battlefield) {
        if let Some(coord) = self.reservation.take() {
            field.grid.release(coord, self.action.attacker);
        }
    }

    /// End early without running further phases
    pub fn abort(&mut self, field: &mut Battlefield, reason: AbortReason) -> EngagementOutcome {
        self.release(field);
        let outcome = EngagementOutcome::Aborted(reason);
        self.phase = Phase::Done(outcome);
        outcome
    }

    /// Spend `budget` milliseconds starting at `start_ms`
    ///
    /// Returns the outcome once the engagement has finished.
    pub fn advance(
        &mut self,
        field: &mut Battlefield,
        start_ms: Millis,
        budget: Millis,
    ) -> Option<EngagementOutcome> {
        self.clock = start_ms;
        let mut budget = budget;

        loop {
            if let Phase::Done(outcome) = self.phase {
                return Some(outcome);
            }

            if self.is_stale(field) {
                trace!(engagement = self.id.0, "dropping stale engagement");
                return Some(self.abort(field, AbortReason::Stale));
            }

            if let Some(remaining) = self.phase.remaining_mut() {
                if *remaining > budget {
                    *remaining -= budget;
                    self.elapsed += budget;
                    return None;
                }
                let spent = *remaining;
                *remaining = 0;
                budget -= spent;
                self.elapsed += spent;
                self.clock += spent;
            }

            field.now_ms = self.clock;
            self.phase = self.step(field);
        }
    }

    /// Run the current phase to completion and pick the next one
    fn step(&mut self, field: &mut Battlefield) -> Phase {
        let EngagementAction {
            attacker, defender, ..
        } = self.action;

        match self.phase.clone() {
            Phase::AwaitCooldown { .. } => Phase::ModeCheck,

            Phase::ModeCheck => self.check_mode(field),

            Phase::DefenceWait { .. } => Phase::AwaitCooldown {
                remaining: cooldown_for(field, attacker),
            },

            Phase::AdjacencyCheck => self.check_adjacency(field),

            Phase::Moving {
                destination,
                steps,
                purpose,
                ..
            } => self.finish_move(field, destination, steps, purpose),

            Phase::PreconditionGate => self.gate(field),

            Phase::Windup { .. } => Phase::ExecuteStrike,

            Phase::ExecuteStrike => self.strike(field),

            Phase::DeathCheck => {
                let defeated = field
                    .roster
                    .get(defender)
                    .map(|d| !d.is_alive())
                    .unwrap_or(true);
                if !defeated {
                    return Phase::Recover {
                        remaining: field.config.post_strike_ms,
                    };
                }

                let event = field
                    .event(CombatEventKind::UnitDefeated)
                    .attacker(attacker)
                    .defender(defender)
                    .message("defeated in combat");
                field.emit(event);
                field.remove_unit(defender);
                if let Some(unit) = field.roster.get_mut(attacker) {
                    unit.target = None;
                }
                field.award_defeat(attacker);

                Phase::DeathDelay {
                    remaining: field.config.death_delay_ms,
                }
            }

            Phase::Recover { .. } => Phase::AwaitCooldown {
                remaining: cooldown_for(field, attacker),
            },

            Phase::DeathDelay { .. } => Phase::Done(EngagementOutcome::Resolved),

            Phase::Done(outcome) => Phase::Done(outcome),
        }
    }

    fn check_mode(&mut self, field: &mut Battlefield) -> Phase {
        let Some(unit) = field.roster.get(self.action.attacker) else {
            return Phase::Done(EngagementOutcome::Aborted(AbortReason::Stale));
        };

        if unit.mode == UnitMode::Defence || unit.stunned {
            return Phase::DefenceWait {
                remaining: field.config.defence_wait_ms,
            };
        }

        if unit.mode == UnitMode::Retreat {
            return self.begin_retreat(field);
        }

        Phase::AdjacencyCheck
    }

    fn begin_retreat(&mut self, field: &mut Battlefield) -> Phase {
        let EngagementAction {
            attacker, defender, ..
        } = self.action;
        let (Some(unit), Some(threat)) = (field.roster.get(attacker), field.roster.get(defender))
        else {
            return Phase::Done(EngagementOutcome::Aborted(AbortReason::Stale));
        };
        let start = unit.position;
        let budget = unit.stats.movement;

        let destination =
            farthest_reachable_tile(&field.grid, start, budget, threat.position, Some(attacker));
        match destination.and_then(|d| self.begin_move(field, start, d, MovePurpose::Retreat)) {
            Some(phase) => phase,
            None => {
                let event = field
                    .event(CombatEventKind::Retreated)
                    .attacker(attacker)
                    .defender(defender)
                    .message("held ground, no tile to fall back to");
                field.emit(event);
                Phase::Done(EngagementOutcome::Retreated)
            }
        }
    }

    fn check_adjacency(&mut self, field: &mut Battlefield) -> Phase {
        let EngagementAction {
            attacker, defender, ..
        } = self.action;
        let (Some(unit), Some(target)) = (field.roster.get(attacker), field.roster.get(defender))
        else {
            return Phase::Done(EngagementOutcome::Aborted(AbortReason::Stale));
        };

        let start = unit.position;
        let goal = target.position;
        let budget = unit.stats.movement;

        if field.grid.are_adjacent(start, goal) {
            return Phase::PreconditionGate;
        }

        // A closer hostile takes priority over walking to the old target
        let current_distance = field.grid.distance(start, goal);
        let closer = hostiles_within(
            &field.grid,
            &field.roster,
            attacker,
            field.config.retarget_radius,
        )
        .into_iter()
        .filter(|id| *id != defender)
        .find(|id| {
            field
                .roster
                .get(*id)
                .map(|u| field.grid.distance(start, u.position) < current_distance)
                .unwrap_or(false)
        });

        if let Some(new_target) = closer {
            let event = field
                .event(CombatEventKind::Retargeted)
                .attacker(attacker)
                .defender(new_target)
                .message(format!("switching from {}", defender));
            field.emit(event);
            return Phase::Done(EngagementOutcome::Retargeted(new_target));
        }

        let destination = closest_reachable_tile(&field.grid, start, budget, goal, Some(attacker));
        if let Some(phase) =
            destination.and_then(|d| self.begin_move(field, start, d, MovePurpose::Approach))
        {
            return phase;
        }

        let event = field
            .event(CombatEventKind::TargetUnreachable)
            .attacker(attacker)
            .defender(defender)
            .message("no tile brings the attacker closer");
        field.emit(event);
        Phase::Done(EngagementOutcome::Aborted(AbortReason::Unreachable))
    }

    /// Reserve the destination and start walking; `None` if no clear path
    fn begin_move(
        &mut self,
        field: &mut Battlefield,
        start: HexCoord,
        destination: HexCoord,
        purpose: MovePurpose,
    ) -> Option<Phase> {
        let attacker = self.action.attacker;
        let path = find_clear_path(&field.grid, start, destination, attacker)?;
        let steps = path_length(&path);
        if steps == 0 {
            return None;
        }

        field.grid.reserve(destination, attacker).ok()?;
        self.reservation = Some(destination);

        let event = field
            .event(CombatEventKind::MovementStarted)
            .attacker(attacker)
            .amount(steps as i32)
            .message(format!("{:?} -> {:?}", start, destination));
        field.emit(event);

        Some(Phase::Moving {
            destination,
            steps,
            remaining: steps as Millis * field.config.move_step_ms,
            purpose,
        })
    }

    fn finish_move(
        &mut self,
        field: &mut Battlefield,
        destination: HexCoord,
        steps: u32,
        purpose: MovePurpose,
    ) -> Phase {
        let EngagementAction {
            attacker, defender, ..
        } = self.action;
        self.reservation = None;

        let moved = relocate(field, attacker, destination);
        if !moved {
            field.grid.release(destination, attacker);
        }

        let event = field
            .event(CombatEventKind::MovementCompleted)
            .attacker(attacker)
            .amount(if moved { steps as i32 } else { 0 })
            .message(format!("{:?}", destination));
        field.emit(event);

        match purpose {
            MovePurpose::Approach => Phase::AwaitCooldown {
                remaining: cooldown_for(field, attacker),
            },
            MovePurpose::Retreat => {
                let event = field
                    .event(CombatEventKind::Retreated)
                    .attacker(attacker)
                    .defender(defender)
                    .amount(steps as i32);
                field.emit(event);
                Phase::Done(EngagementOutcome::Retreated)
            }
        }
    }

    /// Low stamina makes a strike less likely, but never impossible forever
    fn gate(&mut self, field: &mut Battlefield) -> Phase {
        let Some(unit) = field.roster.get(self.action.attacker) else {
            return Phase::Done(EngagementOutcome::Aborted(AbortReason::Stale));
        };
        let stamina = unit.stamina.current();
        let max = unit.stamina.max();

        if stamina * 2 < max && self.consecutive_skips < field.config.max_consecutive_skips {
            let draw = field.rng.gen_range(0..max);
            if stamina < draw {
                self.consecutive_skips += 1;
                trace!(
                    unit = %self.action.attacker,
                    stamina,
                    draw,
                    "too tired to strike"
                );
                return Phase::AwaitCooldown {
                    remaining: cooldown_for(field, self.action.attacker),
                };
            }
        }

        self.consecutive_skips = 0;
        self.begin_strike(field)
    }

    fn begin_strike(&mut self, field: &mut Battlefield) -> Phase {
        let EngagementAction {
            attacker, defender, ..
        } = self.action;
        let orientation = field.grid.orientation;
        let defender_pos = field.roster.get(defender).map(|d| d.position);

        if let Some(unit) = field.roster.get_mut(attacker) {
            if let Some(facing) = defender_pos.and_then(|p| unit.position.direction_to(&p, orientation)) {
                unit.facing = facing;
            }
        }

        let event = field
            .event(CombatEventKind::AttackStarted)
            .attacker(attacker)
            .defender(defender);
        field.emit(event);

        Phase::Windup {
            remaining: field.config.strike_windup_ms,
        }
    }

    fn strike(&mut self, field: &mut Battlefield) -> Phase {
        let EngagementAction {
            attacker: attacker_id,
            defender: defender_id,
            skill,
        } = self.action;

        // The defender may have stepped away or the attacker been stunned
        // during the windup
        match (field.roster.get(attacker_id), field.roster.get(defender_id)) {
            (Some(attacker), Some(defender)) => {
                if attacker.stunned {
                    return Phase::ModeCheck;
                }
                if !field.grid.are_adjacent(attacker.position, defender.position) {
                    return Phase::AdjacencyCheck;
                }
            }
            _ => return Phase::Done(EngagementOutcome::Aborted(AbortReason::Stale)),
        }

        // Stamina is paid only for a swing that connects or is dodged
        let cost = field.config.strike_stamina_cost;
        if let Some(unit) = field.roster.get_mut(attacker_id) {
            unit.stamina.spend(cost);
        }

        let (Some(attacker), Some(defender)) =
            (field.roster.get(attacker_id), field.roster.get(defender_id))
        else {
            return Phase::Done(EngagementOutcome::Aborted(AbortReason::Stale));
        };

        self.strikes += 1;

        let success = attack_success_chance(
            attacker.balance.current(),
            defender.balance.current(),
            field.statuses.has(attacker_id, StatusKind::Blind),
        );
        if roll_dodge(success, &mut field.rng) {
            let event = field
                .event(CombatEventKind::AttackDodged)
                .attacker(attacker_id)
                .defender(defender_id)
                .message(format!("{} dodged the attack", defender.name));
            field.emit(event);
            return Phase::Recover {
                remaining: field.config.post_dodge_ms,
            };
        }

        let ctx = DamageContext {
            damage_type: skill.map(|s| s.damage_type).unwrap_or_default(),
            skill_power: skill.map(|s| s.power).unwrap_or(0),
            bonus_attack: field.statuses.bonus_attack(attacker_id),
            variation: field.config.damage_variation,
            terrain: terrain_modifier(
                field
                    .grid
                    .elevation_difference(attacker.position, defender.position),
            ),
            flank: if field.config.flanking {
                flank_position(&field.grid, attacker, defender)
            } else {
                None
            },
        };
        let roll = calculate_damage(attacker, defender, &ctx, &mut field.rng);

        let absorption = field.statuses.absorb(defender_id, roll.amount);
        if absorption.depleted {
            let event = field
                .event(CombatEventKind::StatusExpired)
                .defender(defender_id)
                .message(StatusKind::Shield.name());
            field.emit(event);
        }
        let damage = absorption.remaining_damage;

        // Balance soaks the hit first; the rest goes to health
        let mut staggered = false;
        if let Some(target) = field.roster.get_mut(defender_id) {
            let had_balance = !target.balance.is_depleted();
            let absorbed = target.balance.spend(damage);
            target.health.spend(damage - absorbed);
            staggered = had_balance && target.balance.is_depleted();
        }

        if roll.critical {
            let event = field
                .event(CombatEventKind::CriticalHit)
                .attacker(attacker_id)
                .defender(defender_id)
                .amount(roll.amount);
            field.emit(event);
        }
        let event = field
            .event(CombatEventKind::DamageDealt)
            .attacker(attacker_id)
            .defender(defender_id)
            .amount(damage)
            .message(match absorption.absorbed {
                0 => String::new(),
                n => format!("{} absorbed by shield", n),
            });
        field.emit(event);
        if staggered {
            let event = field
                .event(CombatEventKind::UnitStaggered)
                .attacker(attacker_id)
                .defender(defender_id);
            field.emit(event);
        }

        debug!(
            attacker = %attacker_id,
            defender = %defender_id,
            damage,
            critical = roll.critical,
            "strike landed"
        );
        Phase::DeathCheck
    }
}

/// Cooldown before the attacker's next action, never zero
fn cooldown_for(field: &Battlefield, attacker: UnitId) -> Millis {
    field
        .roster
        .get(attacker)
        .map(|u| u.stats.attack_interval_ms)
        .unwrap_or(0)
        .max(1)
}

/// Move a unit to a tile it has reserved; false if the grid refused
fn relocate(field: &mut Battlefield, id: UnitId, destination: HexCoord) -> bool {
    let orientation = field.grid.orientation;
    let Some(origin) = field.roster.get(id).map(|u| u.position) else {
        return false;
    };

    if field.grid.set_occupant(destination, id).is_err() {
        return false;
    }
    if field.grid.clear_occupant(origin, id).is_err() {
        tracing::warn!(unit = %id, ?origin, "origin tile held by another unit");
    }

    if let Some(unit) = field.roster.get_mut(id) {
        if let Some(facing) = origin.direction_to(&destination, orientation) {
            unit.facing = facing;
        }
        unit.position = destination;
    }
    true
}
