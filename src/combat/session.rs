//! Combat session - one battle from setup to teardown
//!
//! The session owns the battlefield and the engagement scheduler. Callers
//! spawn units, queue engagements and drive time with `tick`; everything
//! that happens is published on the event bus.

use tracing::info;

use crate::battle::engagement::{find_all_engagements, nearest_hostile};
use crate::battle::grid::HexGrid;
use crate::battle::hex::HexCoord;
use crate::battle::pathfinding;
use crate::battle::units::{Unit, UnitMode, UnitSpawn};
use crate::combat::events::{CombatEvent, EventBus, SubscriptionId};
use crate::combat::field::Battlefield;
use crate::combat::scheduler::{EngagementReport, EngagementScheduler};
use crate::combat::sequence::{EngagementAction, Phase, Skill};
use crate::combat::status::{Applied, StatusKind, StatusTracker};
use crate::core::config::CombatConfig;
use crate::core::error::{CombatError, Result};
use crate::core::types::{EngagementId, Millis, Side, UnitId};
use crate::scenario::Scenario;

#[derive(Debug)]
pub struct CombatSession {
    field: Battlefield,
    scheduler: EngagementScheduler,
    next_regen_ms: Millis,
    next_status_ms: Millis,
}

impl CombatSession {
    pub fn new(grid: HexGrid, config: CombatConfig) -> Result<Self> {
        config.validate()?;
        let next_regen_ms = config.regen_interval_ms;
        let next_status_ms = config.status_tick_ms;

        info!(
            width = grid.width,
            height = grid.height,
            seed = config.seed,
            "combat session started"
        );

        Ok(Self {
            field: Battlefield::new(grid, config),
            scheduler: EngagementScheduler::new(),
            next_regen_ms,
            next_status_ms,
        })
    }

    /// Build the grid and spawn every unit a scenario lists
    pub fn from_scenario(scenario: &Scenario) -> Result<Self> {
        scenario.validate()?;
        let mut session = Self::new(scenario.map.build_grid(), scenario.combat.clone())?;
        for spawn in &scenario.units {
            session.spawn_unit(spawn)?;
        }
        Ok(session)
    }

    pub fn spawn_unit(&mut self, spawn: &UnitSpawn) -> Result<UnitId> {
        self.field.spawn(spawn)
    }

    /// Take a unit off the field; its engagements are dropped next tick
    pub fn remove_unit(&mut self, id: UnitId) -> Result<Unit> {
        self.field
            .remove_unit(id)
            .ok_or(CombatError::StaleReference(id))
    }

    pub fn queue_engagement(
        &mut self,
        attacker: UnitId,
        defender: UnitId,
        skill: Option<Skill>,
    ) -> Result<EngagementId> {
        let action = EngagementAction {
            attacker,
            defender,
            skill,
        };
        self.scheduler.queue(&mut self.field, action)
    }

    /// Engage the closest hostile, if any remain
    pub fn engage_nearest(&mut self, unit: UnitId) -> Result<Option<EngagementId>> {
        if !self.field.roster.contains(unit) {
            return Err(CombatError::StaleReference(unit));
        }
        match nearest_hostile(&self.field.grid, &self.field.roster, unit) {
            Some(target) => self.queue_engagement(unit, target, None).map(Some),
            None => Ok(None),
        }
    }

    /// Queue every idle unit against a hostile it is touching
    pub fn detect_contacts(&mut self) -> Vec<EngagementId> {
        let contacts = find_all_engagements(&self.field.grid, &self.field.roster);
        let mut queued = Vec::new();

        for contact in contacts {
            if self.scheduler.is_engaged(contact.attacker_id) {
                continue;
            }
            if let Ok(id) = self.queue_engagement(contact.attacker_id, contact.defender_id, None) {
                queued.push(id);
            }
        }
        queued
    }

    /// Advance the battle by `dt_ms`
    ///
    /// Engagements run in slices cut at every regeneration pulse and status
    /// tick due inside the window, so the event log stays in time order
    /// across pulses. Within one slice each engagement advances in turn.
    pub fn tick(&mut self, dt_ms: Millis) {
        let end = self.field.now_ms + dt_ms;
        let mut cursor = self.field.now_ms;

        loop {
            let pulse = self.next_regen_ms.min(self.next_status_ms);
            let slice_end = pulse.min(end);

            if slice_end > cursor {
                self.field.now_ms = cursor;
                self.scheduler.tick(&mut self.field, cursor, slice_end - cursor);
                cursor = slice_end;
            }
            if pulse > end {
                break;
            }

            self.field.now_ms = pulse;
            if self.next_regen_ms == pulse {
                self.field.regenerate();
                self.next_regen_ms += self.field.config.regen_interval_ms;
            }
            if self.next_status_ms == pulse {
                self.field.tick_statuses();
                self.next_status_ms += self.field.config.status_tick_ms;
            }
        }

        self.field.now_ms = end;
    }

    /// Tick in `step_ms` slices until no engagement is running or
    /// `limit_ms` has passed; returns the time spent
    pub fn run_until_idle(&mut self, step_ms: Millis, limit_ms: Millis) -> Millis {
        let step = step_ms.max(1);
        let mut spent = 0;
        while !self.is_idle() && spent < limit_ms {
            self.tick(step);
            spent += step;
        }
        spent
    }

    pub fn apply_status(
        &mut self,
        unit: UnitId,
        kind: StatusKind,
        duration: u32,
        power: i32,
    ) -> Result<Applied> {
        self.field.apply_status(unit, kind, duration, power)
    }

    pub fn set_mode(&mut self, unit: UnitId, mode: UnitMode) -> Result<()> {
        let unit = self
            .field
            .roster
            .get_mut(unit)
            .ok_or(CombatError::StaleReference(unit))?;
        unit.mode = mode;
        Ok(())
    }

    pub fn subscribe<F>(&mut self, handler: F) -> SubscriptionId
    where
        F: FnMut(&CombatEvent) + 'static,
    {
        self.field.events.subscribe(handler)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.field.events.unsubscribe(id)
    }

    pub fn events(&self) -> &EventBus {
        &self.field.events
    }

    /// Tiles `unit` could move to within `budget` hexes right now
    pub fn reachable_tiles(&self, unit: UnitId, budget: u32) -> Result<Vec<HexCoord>> {
        let unit = self
            .field
            .roster
            .get(unit)
            .ok_or(CombatError::StaleReference(unit))?;
        Ok(pathfinding::reachable_tiles(
            &self.field.grid,
            unit.position,
            budget,
            Some(unit.id),
        ))
    }

    /// Walkable path between two tiles, ignoring occupants
    pub fn find_path(&self, from: HexCoord, to: HexCoord) -> Result<Vec<HexCoord>> {
        for coord in [from, to] {
            if !self.field.grid.in_bounds(coord) {
                return Err(CombatError::OutOfBounds(coord));
            }
        }
        pathfinding::find_path(&self.field.grid, from, to)
            .ok_or(CombatError::InvalidAdjacency { from, to })
    }

    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.field.roster.get(id)
    }

    pub fn units(&self) -> impl Iterator<Item = &Unit> {
        self.field.roster.iter()
    }

    pub fn grid(&self) -> &HexGrid {
        &self.field.grid
    }

    pub fn statuses(&self) -> &StatusTracker {
        &self.field.statuses
    }

    pub fn config(&self) -> &CombatConfig {
        &self.field.config
    }

    pub fn now_ms(&self) -> Millis {
        self.field.now_ms
    }

    pub fn is_engaged(&self, unit: UnitId) -> bool {
        self.scheduler.is_engaged(unit)
    }

    pub fn phase_of(&self, attacker: UnitId) -> Option<&Phase> {
        self.scheduler.phase_of(attacker)
    }

    pub fn active_engagements(&self) -> usize {
        self.scheduler.active_count()
    }

    /// Reports of engagements that ended since the last call
    pub fn take_finished(&mut self) -> Vec<EngagementReport> {
        self.scheduler.take_finished()
    }

    /// No engagement is running
    pub fn is_idle(&self) -> bool {
        self.scheduler.active_count() == 0
    }

    /// The side still standing once the other has no living units
    pub fn winner(&self) -> Option<Side> {
        let players = self.field.roster.count_side(Side::Player);
        let enemies = self.field.roster.count_side(Side::Enemy);
        match (players, enemies) {
            (0, 0) => None,
            (_, 0) => Some(Side::Player),
            (0, _) => Some(Side::Enemy),
            _ => None,
        }
    }

    /// One side has been eliminated
    pub fn battle_over(&self) -> bool {
        let players = self.field.roster.count_side(Side::Player);
        let enemies = self.field.roster.count_side(Side::Enemy);
        players == 0 || enemies == 0
    }
}
