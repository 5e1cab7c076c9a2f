//! Battle grid: dense tile store with occupancy and move reservations
//!
//! The grid owns every tile. Units are referenced by `UnitId` only; the
//! roster owns the units and the session keeps both sides of the link in
//! step.

use serde::{Deserialize, Serialize};

use crate::battle::hex::{HexCoord, Orientation};
use crate::battle::terrain::{OpenTerrain, Terrain, TerrainSource};
use crate::core::error::{CombatError, Result};
use crate::core::types::UnitId;

/// A single tile on the battle grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tile {
    pub coord: HexCoord,
    pub terrain: Terrain,
    pub walkable: bool,
    pub elevation: i8,
    occupant: Option<UnitId>,
    reserved_by: Option<UnitId>,
}

impl Tile {
    pub fn new(coord: HexCoord, terrain: Terrain) -> Self {
        Self {
            coord,
            terrain,
            walkable: terrain.is_walkable(),
            elevation: terrain.default_elevation(),
            occupant: None,
            reserved_by: None,
        }
    }

    pub fn occupant(&self) -> Option<UnitId> {
        self.occupant
    }

    pub fn reserved_by(&self) -> Option<UnitId> {
        self.reserved_by
    }

    /// Can `unit` stand here (or move here) right now?
    pub fn is_free_for(&self, unit: Option<UnitId>) -> bool {
        let held_by_other = |slot: Option<UnitId>| slot.is_some() && slot != unit;
        self.walkable && !held_by_other(self.occupant) && !held_by_other(self.reserved_by)
    }
}

/// The full battle grid
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HexGrid {
    tiles: Vec<Tile>,
    pub width: u32,
    pub height: u32,
    pub orientation: Orientation,
}

impl HexGrid {
    /// Create a grid of open terrain
    pub fn new(width: u32, height: u32, orientation: Orientation) -> Self {
        Self::from_source(width, height, orientation, &OpenTerrain)
    }

    /// Create a grid, asking `source` for every tile's terrain
    pub fn from_source(
        width: u32,
        height: u32,
        orientation: Orientation,
        source: &impl TerrainSource,
    ) -> Self {
        let mut tiles = Vec::with_capacity((width * height) as usize);
        for row in 0..height as i32 {
            for col in 0..width as i32 {
                let coord = HexCoord::new(col, row);
                let cell = source.cell_at(coord);
                let mut tile = Tile::new(coord, cell.terrain);
                tile.walkable = cell.walkable;
                tile.elevation = cell.elevation;
                tiles.push(tile);
            }
        }

        Self {
            tiles,
            width,
            height,
            orientation,
        }
    }

    /// Check if coordinate is within grid bounds
    pub fn in_bounds(&self, coord: HexCoord) -> bool {
        coord.col >= 0
            && coord.row >= 0
            && coord.col < self.width as i32
            && coord.row < self.height as i32
    }

    fn index_of(&self, coord: HexCoord) -> Option<usize> {
        self.in_bounds(coord)
            .then(|| coord.row as usize * self.width as usize + coord.col as usize)
    }

    /// Get the tile at the given coordinate
    pub fn tile_at(&self, coord: HexCoord) -> Option<&Tile> {
        self.index_of(coord).map(|i| &self.tiles[i])
    }

    fn tile_mut(&mut self, coord: HexCoord) -> Result<&mut Tile> {
        match self.index_of(coord) {
            Some(i) => Ok(&mut self.tiles[i]),
            None => Err(CombatError::OutOfBounds(coord)),
        }
    }

    pub fn tiles(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.iter()
    }

    /// Hex distance using this grid's orientation
    pub fn distance(&self, a: HexCoord, b: HexCoord) -> u32 {
        a.distance(&b, self.orientation)
    }

    /// In-bounds, walkable neighbors (at most 6)
    ///
    /// Empty when `coord` itself is off the grid or unwalkable, so the
    /// relation stays symmetric.
    pub fn neighbors(&self, coord: HexCoord) -> Vec<HexCoord> {
        if !self.tile_at(coord).is_some_and(|t| t.walkable) {
            return Vec::new();
        }
        coord
            .neighbors(self.orientation)
            .into_iter()
            .filter(|n| self.tile_at(*n).is_some_and(|t| t.walkable))
            .collect()
    }

    /// Are two tiles neighbors on this grid?
    pub fn are_adjacent(&self, a: HexCoord, b: HexCoord) -> bool {
        self.neighbors(a).contains(&b)
    }

    pub fn occupant_at(&self, coord: HexCoord) -> Option<UnitId> {
        self.tile_at(coord).and_then(|t| t.occupant)
    }

    /// Is the tile walkable and not held by anyone other than `unit`?
    pub fn is_free_for(&self, coord: HexCoord, unit: Option<UnitId>) -> bool {
        self.tile_at(coord).is_some_and(|t| t.is_free_for(unit))
    }

    /// Place `unit` on the tile
    ///
    /// Fails without mutating if another unit occupies or has reserved it.
    pub fn set_occupant(&mut self, coord: HexCoord, unit: UnitId) -> Result<()> {
        let tile = self.tile_mut(coord)?;
        if !tile.walkable {
            return Err(CombatError::NotWalkable(coord));
        }
        if let Some(other) = tile.occupant.filter(|o| *o != unit) {
            return Err(CombatError::OccupiedTile {
                coord,
                occupant: other,
            });
        }
        if let Some(other) = tile.reserved_by.filter(|o| *o != unit) {
            return Err(CombatError::OccupiedTile {
                coord,
                occupant: other,
            });
        }
        tile.occupant = Some(unit);
        if tile.reserved_by == Some(unit) {
            tile.reserved_by = None;
        }
        Ok(())
    }

    /// Remove `unit` from the tile
    ///
    /// Fails without mutating if the tile is held by a different unit.
    pub fn clear_occupant(&mut self, coord: HexCoord, unit: UnitId) -> Result<()> {
        let tile = self.tile_mut(coord)?;
        match tile.occupant {
            Some(current) if current == unit => {
                tile.occupant = None;
                Ok(())
            }
            Some(current) => Err(CombatError::OccupiedTile {
                coord,
                occupant: current,
            }),
            None => Ok(()),
        }
    }

    /// Hold a tile for the duration of an in-flight move
    pub fn reserve(&mut self, coord: HexCoord, unit: UnitId) -> Result<()> {
        let tile = self.tile_mut(coord)?;
        if !tile.walkable {
            return Err(CombatError::NotWalkable(coord));
        }
        if !tile.is_free_for(Some(unit)) {
            let occupant = tile.occupant.or(tile.reserved_by).unwrap_or(unit);
            return Err(CombatError::OccupiedTile { coord, occupant });
        }
        tile.reserved_by = Some(unit);
        Ok(())
    }

    /// Drop a reservation held by `unit`; other units' reservations are kept
    pub fn release(&mut self, coord: HexCoord, unit: UnitId) {
        if let Ok(tile) = self.tile_mut(coord) {
            if tile.reserved_by == Some(unit) {
                tile.reserved_by = None;
            }
        }
    }

    /// Drop every reservation `unit` holds
    pub fn release_all(&mut self, unit: UnitId) {
        for tile in self.tiles.iter_mut() {
            if tile.reserved_by == Some(unit) {
                tile.reserved_by = None;
            }
        }
    }

    /// Set terrain at a coordinate
    pub fn set_terrain(&mut self, coord: HexCoord, terrain: Terrain) {
        if let Ok(tile) = self.tile_mut(coord) {
            tile.terrain = terrain;
            tile.walkable = terrain.is_walkable();
        }
    }

    /// Set elevation at a coordinate
    pub fn set_elevation(&mut self, coord: HexCoord, elevation: i8) {
        if let Ok(tile) = self.tile_mut(coord) {
            tile.elevation = elevation;
        }
    }

    /// Get elevation difference (positive = from is higher)
    pub fn elevation_difference(&self, from: HexCoord, to: HexCoord) -> i8 {
        let from_elev = self.tile_at(from).map(|t| t.elevation).unwrap_or(0);
        let to_elev = self.tile_at(to).map(|t| t.elevation).unwrap_or(0);
        from_elev - to_elev
    }
}
