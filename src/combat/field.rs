//! Shared battle state handed to engagements each tick
//!
//! The grid, the unit roster, active status effects, the event bus, the
//! random source and the clock. Owned by one `CombatSession`; nothing here
//! outlives the battle.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, warn};

use crate::battle::grid::HexGrid;
use crate::battle::units::{Roster, Unit, UnitSpawn};
use crate::combat::events::{CombatEvent, CombatEventKind, EventBus};
use crate::combat::leveling::grant_experience;
use crate::combat::status::{Applied, StatusKind, StatusTracker};
use crate::core::config::CombatConfig;
use crate::core::error::{CombatError, Result};
use crate::core::types::{Millis, UnitId};

#[derive(Debug)]
pub struct Battlefield {
    pub grid: HexGrid,
    pub roster: Roster,
    pub statuses: StatusTracker,
    pub events: EventBus,
    pub config: CombatConfig,
    pub rng: ChaCha8Rng,
    /// Simulation time used to stamp events
    pub now_ms: Millis,
}

impl Battlefield {
    pub fn new(grid: HexGrid, config: CombatConfig) -> Self {
        Self {
            grid,
            roster: Roster::new(),
            statuses: StatusTracker::new(),
            events: EventBus::new(config.event_log_capacity),
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            config,
            now_ms: 0,
        }
    }

    /// Start an event stamped with the current time
    pub fn event(&self, kind: CombatEventKind) -> CombatEvent {
        CombatEvent::new(self.now_ms, kind)
    }

    pub fn emit(&mut self, event: CombatEvent) {
        self.events.publish(event);
    }

    /// Place a new unit on its spawn tile
    pub fn spawn(&mut self, spawn: &UnitSpawn) -> Result<UnitId> {
        let coord = spawn.position;
        let tile = self
            .grid
            .tile_at(coord)
            .ok_or(CombatError::OutOfBounds(coord))?;
        if !tile.walkable {
            return Err(CombatError::NotWalkable(coord));
        }

        let id = self.roster.next_id();
        self.grid.set_occupant(coord, id)?;
        self.roster.insert(spawn.build(id));

        debug!(unit = %id, ?coord, "spawned {}", spawn.name);
        Ok(id)
    }

    /// Take a unit out of the battle
    ///
    /// Clears its tile, any tile it reserved for a move, its status effects
    /// and every target pointing at it.
    pub fn remove_unit(&mut self, id: UnitId) -> Option<Unit> {
        let unit = self.roster.remove(id)?;

        if let Err(e) = self.grid.clear_occupant(unit.position, id) {
            warn!(unit = %id, "tile out of sync on removal: {}", e);
        }
        self.grid.release_all(id);
        self.statuses.clear_unit(id);
        self.roster.clear_targets_of(id);

        info!(unit = %id, "{} removed from battle", unit.name);
        Some(unit)
    }

    /// Apply or stack a status effect and announce it
    pub fn apply_status(
        &mut self,
        id: UnitId,
        kind: StatusKind,
        duration: u32,
        power: i32,
    ) -> Result<Applied> {
        let unit = self
            .roster
            .get_mut(id)
            .ok_or(CombatError::StaleReference(id))?;
        let applied = self.statuses.apply(unit, kind, duration, power);

        let event = self
            .event(CombatEventKind::StatusApplied)
            .defender(id)
            .amount(applied.power)
            .message(format!("{} for {} ticks", kind.name(), applied.remaining));
        self.emit(event);
        Ok(applied)
    }

    /// One status tick for every affected unit, in id order
    pub fn tick_statuses(&mut self) {
        for id in self.statuses.tracked_units() {
            let Some(unit) = self.roster.get_mut(id) else {
                self.statuses.clear_unit(id);
                continue;
            };
            let reports = self.statuses.tick(unit);
            let died = !unit.is_alive();

            for report in reports {
                if report.damage > 0 {
                    let event = self
                        .event(CombatEventKind::StatusDamage)
                        .defender(id)
                        .amount(report.damage)
                        .message(report.kind.name());
                    self.emit(event);
                }
                if report.expired {
                    let event = self
                        .event(CombatEventKind::StatusExpired)
                        .defender(id)
                        .message(report.kind.name());
                    self.emit(event);
                }
            }

            if died {
                let event = self
                    .event(CombatEventKind::UnitDefeated)
                    .defender(id)
                    .message("succumbed to status effects");
                self.emit(event);
                self.remove_unit(id);
            }
        }
    }

    /// Restore stamina and balance on every living unit
    pub fn regenerate(&mut self) {
        let stamina = self.config.stamina_regen;
        let balance = self.config.balance_regen;
        for unit in self.roster.iter_mut().filter(|u| u.is_alive()) {
            unit.stamina.restore(stamina);
            unit.balance.restore(balance);
        }
    }

    /// Credit a defeat to `victor`, announcing any level gained
    pub fn award_defeat(&mut self, victor: UnitId) {
        let amount = self.config.experience_per_defeat;
        let Some(unit) = self.roster.get_mut(victor) else {
            return;
        };

        if let Some(level) = grant_experience(unit, amount) {
            let event = self
                .event(CombatEventKind::LevelUp)
                .attacker(victor)
                .amount(level as i32)
                .message(format!("reached level {}", level));
            self.emit(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::hex::{HexCoord, Orientation};
    use crate::battle::terrain::Terrain;
    use crate::battle::unit_type::UnitClass;
    use crate::core::types::Side;

    fn field() -> Battlefield {
        Battlefield::new(
            HexGrid::new(6, 6, Orientation::PointyTop),
            CombatConfig::default(),
        )
    }

    fn spawn_at(col: i32, row: i32) -> UnitSpawn {
        UnitSpawn::new("u", Side::Player, UnitClass::Infantry, HexCoord::new(col, row))
    }

    #[test]
    fn test_spawn_occupies_tile() {
        let mut field = field();
        let id = field.spawn(&spawn_at(2, 2)).unwrap();

        assert_eq!(field.grid.occupant_at(HexCoord::new(2, 2)), Some(id));
        assert_eq!(field.roster.get(id).unwrap().position, HexCoord::new(2, 2));
    }

    #[test]
    fn test_spawn_rejects_bad_tiles() {
        let mut field = field();
        field.grid.set_terrain(HexCoord::new(1, 1), Terrain::Cliff);
        field.spawn(&spawn_at(2, 2)).unwrap();

        assert!(matches!(
            field.spawn(&spawn_at(2, 2)),
            Err(CombatError::OccupiedTile { .. })
        ));
        assert!(matches!(
            field.spawn(&spawn_at(1, 1)),
            Err(CombatError::NotWalkable(_))
        ));
        assert!(matches!(
            field.spawn(&spawn_at(9, 9)),
            Err(CombatError::OutOfBounds(_))
        ));
        assert_eq!(field.roster.len(), 1);
    }

    #[test]
    fn test_remove_unit_clears_links() {
        let mut field = field();
        let a = field.spawn(&spawn_at(1, 1)).unwrap();
        let b = field.spawn(&spawn_at(2, 1)).unwrap();
        field.roster.get_mut(a).unwrap().target = Some(b);
        field.apply_status(b, StatusKind::Poison, 3, 2).unwrap();

        assert!(field.remove_unit(b).is_some());

        assert_eq!(field.grid.occupant_at(HexCoord::new(2, 1)), None);
        assert_eq!(field.roster.get(a).unwrap().target, None);
        assert!(field.statuses.effects_of(b).is_empty());
        assert!(field.remove_unit(b).is_none());
    }

    #[test]
    fn test_remove_unit_releases_move_reservation() {
        let mut field = field();
        let mover = field.spawn(&spawn_at(1, 1)).unwrap();
        let other = field.spawn(&spawn_at(4, 4)).unwrap();
        let destination = HexCoord::new(3, 3);
        field.grid.reserve(destination, mover).unwrap();
        assert!(!field.grid.is_free_for(destination, Some(other)));

        field.remove_unit(mover);

        assert!(field.grid.is_free_for(destination, Some(other)));
    }

    #[test]
    fn test_lethal_poison_removes_unit() {
        let mut field = field();
        let id = field
            .spawn(&spawn_at(1, 1).with_pools(3, 10, 10).with_defense(0, 0))
            .unwrap();
        field.apply_status(id, StatusKind::Poison, 5, 5).unwrap();

        field.tick_statuses();

        assert!(field.roster.get(id).is_none());
        assert_eq!(field.events.of_kind(CombatEventKind::UnitDefeated).count(), 1);
    }

    #[test]
    fn test_regenerate_clamps() {
        let mut field = field();
        let id = field.spawn(&spawn_at(1, 1)).unwrap();
        field.roster.get_mut(id).unwrap().stamina.spend(3);

        field.regenerate();

        let unit = field.roster.get(id).unwrap();
        assert_eq!(unit.stamina.current(), unit.stamina.max() - 2);
        assert_eq!(unit.balance.current(), unit.balance.max());
    }
}
