use thiserror::Error;

use crate::battle::hex::HexCoord;
use crate::core::types::UnitId;

#[derive(Error, Debug)]
pub enum CombatError {
    #[error("No path between {from:?} and {to:?}")]
    InvalidAdjacency { from: HexCoord, to: HexCoord },

    #[error("Tile {coord:?} is held by {occupant:?}")]
    OccupiedTile { coord: HexCoord, occupant: UnitId },

    #[error("Unit no longer exists: {0:?}")]
    StaleReference(UnitId),

    #[error("Cannot spend {requested} from pool holding {available}")]
    ResourceUnderflow { requested: i32, available: i32 },

    #[error("Coordinate out of bounds: {0:?}")]
    OutOfBounds(HexCoord),

    #[error("Tile is not walkable: {0:?}")]
    NotWalkable(HexCoord),

    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CombatError>;
