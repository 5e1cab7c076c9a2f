//! A* pathfinding and reachability for battle grids
//!
//! Every step costs 1; the heuristic is hex distance, which is exact on an
//! open grid and never overestimates.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, VecDeque};

use ahash::AHashMap;

use crate::battle::grid::{HexGrid, Tile};
use crate::battle::hex::HexCoord;
use crate::core::types::UnitId;

/// Node in the A* open set
#[derive(Debug, Clone, PartialEq, Eq)]
struct PathNode {
    coord: HexCoord,
    f_cost: u32, // g_cost + heuristic
    h_cost: u32,
}

impl Ord for PathNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse order for min-heap; ties go to the node nearer the goal,
        // then to the lower coordinate so results are reproducible
        other
            .f_cost
            .cmp(&self.f_cost)
            .then_with(|| other.h_cost.cmp(&self.h_cost))
            .then_with(|| other.coord.cmp(&self.coord))
    }
}

impl PartialOrd for PathNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Find a path over walkable tiles, ignoring occupants
///
/// The returned path includes both `start` and `goal`. Returns None if
/// either end is off the grid or unwalkable, or no path exists.
pub fn find_path(grid: &HexGrid, start: HexCoord, goal: HexCoord) -> Option<Vec<HexCoord>> {
    search(grid, start, goal, |tile| tile.walkable)
}

/// Find a path that avoids tiles occupied or reserved by other units
///
/// `mover`'s own tile and reservation count as passable.
pub fn find_clear_path(
    grid: &HexGrid,
    start: HexCoord,
    goal: HexCoord,
    mover: UnitId,
) -> Option<Vec<HexCoord>> {
    search(grid, start, goal, |tile| tile.is_free_for(Some(mover)))
}

fn search(
    grid: &HexGrid,
    start: HexCoord,
    goal: HexCoord,
    passable: impl Fn(&Tile) -> bool,
) -> Option<Vec<HexCoord>> {
    let start_ok = grid.tile_at(start).is_some_and(|t| t.walkable);
    let goal_ok = grid.tile_at(goal).is_some_and(|t| passable(t));
    if !start_ok || !goal_ok {
        return None;
    }

    if start == goal {
        return Some(vec![start]);
    }

    let mut open_set = BinaryHeap::new();
    let mut came_from: AHashMap<HexCoord, HexCoord> = AHashMap::new();
    let mut g_scores: AHashMap<HexCoord, u32> = AHashMap::new();

    g_scores.insert(start, 0);
    let h = grid.distance(start, goal);
    open_set.push(PathNode {
        coord: start,
        f_cost: h,
        h_cost: h,
    });

    while let Some(current) = open_set.pop() {
        if current.coord == goal {
            return Some(reconstruct_path(&came_from, current.coord));
        }

        let current_g = g_scores.get(&current.coord).copied().unwrap_or(u32::MAX);
        // Stale heap entry
        if current.f_cost > current_g.saturating_add(current.h_cost) {
            continue;
        }

        for neighbor in grid.neighbors(current.coord) {
            let Some(tile) = grid.tile_at(neighbor) else {
                continue;
            };
            if !passable(tile) {
                continue;
            }

            let tentative_g = current_g + 1;
            let neighbor_g = g_scores.get(&neighbor).copied().unwrap_or(u32::MAX);

            if tentative_g < neighbor_g {
                came_from.insert(neighbor, current.coord);
                g_scores.insert(neighbor, tentative_g);

                let h_cost = grid.distance(neighbor, goal);
                open_set.push(PathNode {
                    coord: neighbor,
                    f_cost: tentative_g + h_cost,
                    h_cost,
                });
            }
        }
    }

    None // No path found
}

/// Reconstruct path from came_from map
fn reconstruct_path(
    came_from: &AHashMap<HexCoord, HexCoord>,
    mut current: HexCoord,
) -> Vec<HexCoord> {
    let mut path = vec![current];
    while let Some(&prev) = came_from.get(&current) {
        path.push(prev);
        current = prev;
    }
    path.reverse();
    path
}

/// Number of steps in a path (tiles minus the starting tile)
pub fn path_length(path: &[HexCoord]) -> u32 {
    path.len().saturating_sub(1) as u32
}

/// Breadth-first expansion up to `budget` hops, with the hop count of each
/// tile
///
/// Tiles held by other units are neither returned nor expanded. The start
/// tile is excluded. Order is discovery order, which is deterministic.
pub fn reachable_with_steps(
    grid: &HexGrid,
    start: HexCoord,
    budget: u32,
    mover: Option<UnitId>,
) -> Vec<(HexCoord, u32)> {
    let mut found = Vec::new();
    if grid.tile_at(start).is_none() || budget == 0 {
        return found;
    }

    let mut steps: AHashMap<HexCoord, u32> = AHashMap::new();
    let mut queue = VecDeque::new();
    steps.insert(start, 0);
    queue.push_back(start);

    while let Some(current) = queue.pop_front() {
        let current_steps = steps[&current];
        if current_steps >= budget {
            continue;
        }

        for neighbor in grid.neighbors(current) {
            if steps.contains_key(&neighbor) {
                continue;
            }
            steps.insert(neighbor, current_steps + 1);

            if grid.is_free_for(neighbor, mover) {
                found.push((neighbor, current_steps + 1));
                queue.push_back(neighbor);
            }
        }
    }

    found
}

/// Tiles reachable from `start` within `budget` hops
pub fn reachable_tiles(
    grid: &HexGrid,
    start: HexCoord,
    budget: u32,
    mover: Option<UnitId>,
) -> Vec<HexCoord> {
    reachable_with_steps(grid, start, budget, mover)
        .into_iter()
        .map(|(coord, _)| coord)
        .collect()
}

/// The reachable tile that gets closest to `target`
///
/// Only tiles strictly closer to `target` than `start` qualify, so a unit
/// never shuffles sideways. Ties prefer the shorter move, then the lower
/// row, then the lower column.
pub fn closest_reachable_tile(
    grid: &HexGrid,
    start: HexCoord,
    budget: u32,
    target: HexCoord,
    mover: Option<UnitId>,
) -> Option<HexCoord> {
    let current_distance = grid.distance(start, target);

    reachable_with_steps(grid, start, budget, mover)
        .into_iter()
        .filter(|(coord, _)| *coord != target)
        .map(|(coord, steps)| (grid.distance(coord, target), steps, coord))
        .filter(|(distance, _, _)| *distance < current_distance)
        .min_by_key(|(distance, steps, coord)| (*distance, *steps, coord.row, coord.col))
        .map(|(_, _, coord)| coord)
}

/// The reachable tile farthest from `threat`, for retreats
///
/// Ties prefer the shorter move, then the lower row, then the lower column.
pub fn farthest_reachable_tile(
    grid: &HexGrid,
    start: HexCoord,
    budget: u32,
    threat: HexCoord,
    mover: Option<UnitId>,
) -> Option<HexCoord> {
    let current_distance = grid.distance(start, threat);

    reachable_with_steps(grid, start, budget, mover)
        .into_iter()
        .map(|(coord, steps)| (grid.distance(coord, threat), steps, coord))
        .filter(|(distance, _, _)| *distance > current_distance)
        .min_by_key(|(distance, steps, coord)| {
            (std::cmp::Reverse(*distance), *steps, coord.row, coord.col)
        })
        .map(|(_, _, coord)| coord)
}
