//! Contact detection between hostile units
//!
//! Units come into contact when adjacent. Callers decide which contacts
//! become queued engagements.

use crate::battle::grid::HexGrid;
use crate::battle::units::{Roster, Unit};
use crate::core::types::UnitId;

/// Potential engagement between two units
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PotentialEngagement {
    pub attacker_id: UnitId,
    pub defender_id: UnitId,
    pub distance: u32,
}

/// Detect if two units are in melee contact
pub fn detect_engagement(
    grid: &HexGrid,
    unit_a: &Unit,
    unit_b: &Unit,
) -> Option<PotentialEngagement> {
    // Friendly units and the dead don't fight
    if !unit_a.is_hostile_to(unit_b) || !unit_a.is_alive() || !unit_b.is_alive() {
        return None;
    }

    let distance = grid.distance(unit_a.position, unit_b.position);

    // Must be adjacent (distance 1) for melee engagement
    if distance != 1 {
        return None;
    }

    Some(PotentialEngagement {
        attacker_id: unit_a.id,
        defender_id: unit_b.id,
        distance,
    })
}

/// Find every attacker/defender contact on the field, in id order
///
/// Both directions of a contact are reported; each unit may want to strike.
pub fn find_all_engagements(grid: &HexGrid, roster: &Roster) -> Vec<PotentialEngagement> {
    let mut engagements = Vec::new();

    for attacker in roster.iter() {
        for defender in roster.iter() {
            if let Some(engagement) = detect_engagement(grid, attacker, defender) {
                engagements.push(engagement);
            }
        }
    }

    engagements
}

/// Closest living hostile to `unit_id`, ties broken by lower id
pub fn nearest_hostile(grid: &HexGrid, roster: &Roster, unit_id: UnitId) -> Option<UnitId> {
    let unit = roster.get(unit_id)?;

    roster
        .iter()
        .filter(|other| other.is_alive() && unit.is_hostile_to(other))
        .min_by_key(|other| (grid.distance(unit.position, other.position), other.id))
        .map(|other| other.id)
}

/// Hostiles of `unit_id` within `radius` hexes, nearest first
pub fn hostiles_within(
    grid: &HexGrid,
    roster: &Roster,
    unit_id: UnitId,
    radius: u32,
) -> Vec<UnitId> {
    let Some(unit) = roster.get(unit_id) else {
        return Vec::new();
    };

    let mut found: Vec<(u32, UnitId)> = roster
        .iter()
        .filter(|other| other.is_alive() && unit.is_hostile_to(other))
        .map(|other| (grid.distance(unit.position, other.position), other.id))
        .filter(|(distance, _)| *distance <= radius)
        .collect();
    found.sort();
    found.into_iter().map(|(_, id)| id).collect()
}
