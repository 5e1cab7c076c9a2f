//! Battle field - hex grid, terrain, movement and the units standing on it
//!
//! Everything here is spatial. Rules for resolving fights live in `combat`.

pub mod engagement;
pub mod grid;
pub mod hex;
pub mod pathfinding;
pub mod terrain;
pub mod unit_type;
pub mod units;

// Re-exports for convenient access
pub use engagement::{
    detect_engagement, find_all_engagements, hostiles_within, nearest_hostile, PotentialEngagement,
};
pub use grid::{HexGrid, Tile};
pub use hex::{HexCoord, HexDirection, Orientation};
pub use pathfinding::{
    closest_reachable_tile, farthest_reachable_tile, find_clear_path, find_path, path_length,
    reachable_tiles, reachable_with_steps,
};
pub use terrain::{AsciiTerrain, OpenTerrain, Terrain, TerrainCell, TerrainSource};
pub use unit_type::{ClassProfile, UnitClass};
pub use units::{CombatStats, Pool, Roster, Unit, UnitMode, UnitSpawn};
