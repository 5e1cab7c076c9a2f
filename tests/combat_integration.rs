//! Combat session integration tests

use std::cell::RefCell;
use std::rc::Rc;

use hex_skirmish::battle::*;
use hex_skirmish::combat::*;
use hex_skirmish::core::types::{Side, UnitId};
use hex_skirmish::{CombatConfig, CombatSession, Scenario};

fn session(size: u32, config: CombatConfig) -> CombatSession {
    CombatSession::new(HexGrid::new(size, size, Orientation::PointyTop), config).unwrap()
}

fn soldier(side: Side, col: i32, row: i32) -> UnitSpawn {
    UnitSpawn::new("soldier", side, UnitClass::Infantry, HexCoord::new(col, row))
        .with_pools(100, 10, 10)
        .with_attack(10)
        .with_defense(0, 0)
        .with_critical(0.0, 1.5)
        .with_attack_interval(1000)
}

/// Tick until an event of `kind` shows up or `limit_ms` passes
fn run_until(session: &mut CombatSession, kind: CombatEventKind, limit_ms: u64) -> bool {
    let mut spent = 0;
    while spent < limit_ms {
        if session.events().of_kind(kind).next().is_some() {
            return true;
        }
        session.tick(100);
        spent += 100;
    }
    session.events().of_kind(kind).next().is_some()
}

fn first_damage(session: &CombatSession) -> Option<i32> {
    session
        .events()
        .of_kind(CombatEventKind::DamageDealt)
        .next()
        .map(|e| e.amount)
}

#[test]
fn test_adjacent_strike_damage_range() {
    // 5x5 pointy grid, attacker (2,2) against adjacent defender (2,3)
    let mut session = session(5, CombatConfig::default());
    let attacker = session.spawn_unit(&soldier(Side::Player, 2, 2)).unwrap();
    let defender = session.spawn_unit(&soldier(Side::Enemy, 2, 3)).unwrap();
    assert!(session.grid().are_adjacent(HexCoord::new(2, 2), HexCoord::new(2, 3)));

    session.queue_engagement(attacker, defender, None).unwrap();
    assert!(run_until(&mut session, CombatEventKind::DamageDealt, 120_000));

    let damage = first_damage(&session).unwrap();
    assert!((9..=11).contains(&damage), "damage {} out of range", damage);
}

#[test]
fn test_moves_to_single_free_tile() {
    let defender_pos = HexCoord::new(2, 2);
    let open_tile = HexCoord::new(1, 2);

    // Wall off every neighbor of the defender except one
    let mut grid = HexGrid::new(5, 5, Orientation::PointyTop);
    for neighbor in defender_pos.neighbors(Orientation::PointyTop) {
        if neighbor != open_tile {
            grid.set_terrain(neighbor, Terrain::Cliff);
        }
    }
    let mut session = CombatSession::new(grid, CombatConfig::default()).unwrap();
    let attacker = session
        .spawn_unit(&soldier(Side::Player, 0, 2).with_movement(2))
        .unwrap();
    let defender = session
        .spawn_unit(&soldier(Side::Enemy, defender_pos.col, defender_pos.row))
        .unwrap();

    assert_eq!(
        closest_reachable_tile(
            session.grid(),
            HexCoord::new(0, 2),
            2,
            defender_pos,
            Some(attacker)
        ),
        Some(open_tile)
    );

    session.queue_engagement(attacker, defender, None).unwrap();
    assert!(run_until(&mut session, CombatEventKind::MovementCompleted, 10_000));

    let position = session.unit(attacker).unwrap().position;
    assert_eq!(position, open_tile);
    assert!(session.grid().are_adjacent(position, defender_pos));
    assert_eq!(session.grid().occupant_at(open_tile), Some(attacker));
}

#[test]
fn test_defence_mode_halves_damage() {
    let setup = |mode: UnitMode| {
        let mut session = session(5, CombatConfig::default());
        let attacker = session
            .spawn_unit(&soldier(Side::Player, 2, 2).with_attack(40))
            .unwrap();
        let defender = session
            .spawn_unit(&soldier(Side::Enemy, 2, 3).with_mode(mode))
            .unwrap();
        session.queue_engagement(attacker, defender, None).unwrap();
        assert!(run_until(&mut session, CombatEventKind::DamageDealt, 120_000));
        first_damage(&session).unwrap()
    };

    let normal = setup(UnitMode::Normal);
    let defended = setup(UnitMode::Defence);

    assert_eq!(defended, (normal as f32 * 0.5).round() as i32);
}

#[test]
fn test_poison_stacks_and_expires() {
    let mut session = session(5, CombatConfig::default());
    let unit = session.spawn_unit(&soldier(Side::Player, 1, 1)).unwrap();

    session.apply_status(unit, StatusKind::Poison, 2, 5).unwrap();
    session.apply_status(unit, StatusKind::Poison, 2, 5).unwrap();

    let effects = session.statuses().effects_of(unit);
    assert_eq!(effects.len(), 1);
    assert_eq!(effects[0].power, 10);
    assert_eq!(effects[0].remaining, 2);

    session.tick(1000);
    session.tick(1000);

    let dealt: i32 = session
        .events()
        .of_kind(CombatEventKind::StatusDamage)
        .map(|e| e.amount)
        .sum();
    assert_eq!(dealt, 20);
    assert_eq!(session.unit(unit).unwrap().health.current(), 80);
    assert!(!session.statuses().has(unit, StatusKind::Poison));
    assert_eq!(
        session.events().of_kind(CombatEventKind::StatusExpired).count(),
        1
    );
}

#[test]
fn test_fight_resolves_with_defeat() {
    let mut session = session(6, CombatConfig::default());
    let attacker = session
        .spawn_unit(&soldier(Side::Player, 2, 2).with_attack(30))
        .unwrap();
    let defender = session
        .spawn_unit(&soldier(Side::Enemy, 3, 2).with_pools(40, 10, 10))
        .unwrap();

    session.queue_engagement(attacker, defender, None).unwrap();
    session.run_until_idle(100, 300_000);

    assert!(session.is_idle());
    assert!(session.unit(defender).is_none());
    assert!(session.battle_over());
    assert_eq!(session.winner(), Some(Side::Player));
    assert_eq!(session.unit(attacker).unwrap().experience, 50);

    let reports = session.take_finished();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].outcome, EngagementOutcome::Resolved);
}

#[test]
fn test_every_engagement_terminates() {
    let config = CombatConfig {
        max_engagement_ms: 20_000,
        ..CombatConfig::default()
    };
    let mut session = session(8, config);
    let a = session
        .spawn_unit(&soldier(Side::Player, 2, 2).with_mode(UnitMode::Defence))
        .unwrap();
    let b = session
        .spawn_unit(&soldier(Side::Enemy, 3, 2).with_mode(UnitMode::Defence))
        .unwrap();

    session.queue_engagement(a, b, None).unwrap();
    session.queue_engagement(b, a, None).unwrap();
    session.run_until_idle(250, 60_000);

    assert!(session.is_idle());
    let reports = session.take_finished();
    assert_eq!(reports.len(), 2);
    assert!(reports
        .iter()
        .all(|r| r.outcome == EngagementOutcome::Aborted(AbortReason::TimedOut)));
}

#[test]
fn test_retargets_to_adjacent_hostile() {
    let mut session = session(8, CombatConfig::default());
    let attacker = session.spawn_unit(&soldier(Side::Player, 0, 0)).unwrap();
    let far = session.spawn_unit(&soldier(Side::Enemy, 6, 0)).unwrap();
    let near = session.spawn_unit(&soldier(Side::Enemy, 1, 0)).unwrap();

    session.queue_engagement(attacker, far, None).unwrap();
    session.tick(1000);

    let reports = session.take_finished();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].outcome, EngagementOutcome::Retargeted(near));
    assert_eq!(session.unit(attacker).unwrap().target, Some(near));
    assert!(session.is_engaged(attacker));
    assert_eq!(
        session.events().of_kind(CombatEventKind::Retargeted).count(),
        1
    );
}

#[test]
fn test_retreat_moves_away() {
    let mut session = session(8, CombatConfig::default());
    let attacker = session
        .spawn_unit(&soldier(Side::Player, 3, 3).with_mode(UnitMode::Retreat))
        .unwrap();
    let defender = session.spawn_unit(&soldier(Side::Enemy, 4, 3)).unwrap();
    let before = session.grid().distance(HexCoord::new(3, 3), HexCoord::new(4, 3));

    session.queue_engagement(attacker, defender, None).unwrap();
    session.run_until_idle(100, 10_000);

    let reports = session.take_finished();
    assert_eq!(reports[0].outcome, EngagementOutcome::Retreated);
    let position = session.unit(attacker).unwrap().position;
    assert!(session.grid().distance(position, HexCoord::new(4, 3)) > before);
    assert_eq!(session.unit(attacker).unwrap().target, None);
    assert_eq!(
        session.events().of_kind(CombatEventKind::Retreated).count(),
        1
    );
}

#[test]
fn test_removed_defender_drops_engagement_silently() {
    let mut session = session(6, CombatConfig::default());
    let a = session.spawn_unit(&soldier(Side::Player, 2, 2)).unwrap();
    let b = session.spawn_unit(&soldier(Side::Enemy, 3, 2)).unwrap();

    session.queue_engagement(a, b, None).unwrap();
    session.remove_unit(b).unwrap();
    session.tick(100);

    assert!(session.is_idle());
    assert_eq!(
        session.events().of_kind(CombatEventKind::EngagementEnded).count(),
        0
    );
    assert!(matches!(
        session.queue_engagement(a, b, None),
        Err(hex_skirmish::CombatError::StaleReference(id)) if id == b
    ));
}

#[test]
fn test_requeue_replaces_engagement() {
    let mut session = session(6, CombatConfig::default());
    let a = session.spawn_unit(&soldier(Side::Player, 2, 2)).unwrap();
    let b = session.spawn_unit(&soldier(Side::Enemy, 3, 2)).unwrap();
    let c = session.spawn_unit(&soldier(Side::Enemy, 1, 2)).unwrap();

    session.queue_engagement(a, b, None).unwrap();
    session.queue_engagement(a, c, None).unwrap();

    assert_eq!(session.active_engagements(), 1);
    assert_eq!(session.unit(a).unwrap().target, Some(c));
    let reports = session.take_finished();
    assert_eq!(
        reports[0].outcome,
        EngagementOutcome::Aborted(AbortReason::Cancelled)
    );
}

#[test]
fn test_reserved_tile_blocks_second_mover() {
    let defender_pos = HexCoord::new(2, 2);
    let open_tile = HexCoord::new(1, 2);
    let mut grid = HexGrid::new(5, 5, Orientation::PointyTop);
    for neighbor in defender_pos.neighbors(Orientation::PointyTop) {
        if neighbor != open_tile {
            grid.set_terrain(neighbor, Terrain::Cliff);
        }
    }
    let mut session = CombatSession::new(grid, CombatConfig::default()).unwrap();
    let first = session.spawn_unit(&soldier(Side::Player, 0, 2)).unwrap();
    let second = session.spawn_unit(&soldier(Side::Player, 0, 1)).unwrap();
    let defender = session.spawn_unit(&soldier(Side::Enemy, 2, 2)).unwrap();

    session.queue_engagement(first, defender, None).unwrap();
    session.queue_engagement(second, defender, None).unwrap();
    session.tick(1000);

    assert_eq!(
        session.grid().tile_at(open_tile).unwrap().reserved_by(),
        Some(first)
    );
    let reports = session.take_finished();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].action.attacker, second);
    assert_eq!(
        reports[0].outcome,
        EngagementOutcome::Aborted(AbortReason::Unreachable)
    );
}

#[test]
fn test_subscribers_mirror_log() {
    let mut session = session(6, CombatConfig::default());
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    session.subscribe(move |event| sink.borrow_mut().push(event.kind));

    let a = session.spawn_unit(&soldier(Side::Player, 2, 2)).unwrap();
    let b = session.spawn_unit(&soldier(Side::Enemy, 3, 2)).unwrap();
    session.queue_engagement(a, b, None).unwrap();
    session.tick(3000);

    let logged: Vec<_> = session.events().log().map(|e| e.kind).collect();
    assert_eq!(*seen.borrow(), logged);
    assert_eq!(logged[0], CombatEventKind::EngagementQueued);
}

#[test]
fn test_same_seed_same_events() {
    let run = || {
        let mut session = session(8, CombatConfig::default());
        let a = session.spawn_unit(&soldier(Side::Player, 2, 2)).unwrap();
        let b = session.spawn_unit(&soldier(Side::Enemy, 5, 4)).unwrap();
        session.queue_engagement(a, b, None).unwrap();
        session.queue_engagement(b, a, None).unwrap();
        for _ in 0..100 {
            session.tick(100);
        }
        session.events().log().cloned().collect::<Vec<_>>()
    };

    assert_eq!(run(), run());
}

#[test]
fn test_skill_uses_its_damage_type() {
    let mut session = session(5, CombatConfig::default());
    let attacker = session.spawn_unit(&soldier(Side::Player, 2, 2)).unwrap();
    let defender = session
        .spawn_unit(&soldier(Side::Enemy, 2, 3).with_defense(1000, 0))
        .unwrap();
    let firebolt = Skill {
        id: 7,
        power: 10,
        damage_type: DamageType::Magical,
    };

    session
        .queue_engagement(attacker, defender, Some(firebolt))
        .unwrap();
    assert!(run_until(&mut session, CombatEventKind::DamageDealt, 120_000));

    // 20 base against zero magical defense, plus or minus 10%
    let damage = first_damage(&session).unwrap();
    assert!((18..=22).contains(&damage), "damage {}", damage);
}

#[test]
fn test_scenario_runs_to_completion() {
    let scenario = Scenario::from_toml_str(
        r#"
[combat]
seed = 5

[map]
width = 8
height = 5

[[units]]
name = "Blue"
side = "player"
position = { col = 1, row = 2 }
base_attack = 25

[[units]]
name = "Red"
side = "enemy"
position = { col = 6, row = 2 }
health = 40
"#,
    )
    .unwrap();
    let mut session = CombatSession::from_scenario(&scenario).unwrap();
    let ids: Vec<UnitId> = session.units().map(|u| u.id).collect();
    assert_eq!(ids.len(), 2);

    let mut elapsed = 0;
    while !session.battle_over() && elapsed < 600_000 {
        for id in &ids {
            if session.unit(*id).is_some() && !session.is_engaged(*id) {
                session.engage_nearest(*id).unwrap();
            }
        }
        session.tick(100);
        elapsed += 100;
    }

    assert!(session.battle_over());
    assert!(session.winner().is_some());
}
