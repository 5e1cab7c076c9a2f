//! Battle terrain types and the terrain source consumed at grid build time

use serde::{Deserialize, Serialize};

use crate::battle::hex::HexCoord;

/// Terrain tag for a battle tile
///
/// Movement cost is uniform across walkable terrain; the tag decides
/// walkability and the default elevation fed to the terrain modifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Terrain {
    #[default]
    Open,
    Rough,
    Forest,
    Hill,
    ShallowWater,
    DeepWater, // Impassable
    Cliff,     // Impassable
    Road,
}

impl Terrain {
    /// Can units stand on this terrain?
    pub fn is_walkable(&self) -> bool {
        !matches!(self, Terrain::DeepWater | Terrain::Cliff)
    }

    /// Elevation assigned when the source does not give one
    pub fn default_elevation(&self) -> i8 {
        match self {
            Terrain::Hill => 2,
            Terrain::Cliff => 3,
            Terrain::ShallowWater | Terrain::DeepWater => -1,
            _ => 0,
        }
    }

    /// Parse a single map character
    pub fn from_symbol(symbol: char) -> Option<Self> {
        match symbol {
            '.' => Some(Terrain::Open),
            ',' => Some(Terrain::Rough),
            'T' => Some(Terrain::Forest),
            '^' => Some(Terrain::Hill),
            '~' => Some(Terrain::ShallowWater),
            'w' => Some(Terrain::DeepWater),
            '#' => Some(Terrain::Cliff),
            '=' => Some(Terrain::Road),
            _ => None,
        }
    }

    pub fn symbol(&self) -> char {
        match self {
            Terrain::Open => '.',
            Terrain::Rough => ',',
            Terrain::Forest => 'T',
            Terrain::Hill => '^',
            Terrain::ShallowWater => '~',
            Terrain::DeepWater => 'w',
            Terrain::Cliff => '#',
            Terrain::Road => '=',
        }
    }
}

/// Terrain description for one tile, as supplied by a terrain source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerrainCell {
    pub terrain: Terrain,
    pub walkable: bool,
    pub elevation: i8,
}

impl From<Terrain> for TerrainCell {
    fn from(terrain: Terrain) -> Self {
        Self {
            terrain,
            walkable: terrain.is_walkable(),
            elevation: terrain.default_elevation(),
        }
    }
}

/// Supplies terrain for every tile when a grid is built
pub trait TerrainSource {
    fn cell_at(&self, coord: HexCoord) -> TerrainCell;
}

/// Every tile open and walkable
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenTerrain;

impl TerrainSource for OpenTerrain {
    fn cell_at(&self, _coord: HexCoord) -> TerrainCell {
        Terrain::Open.into()
    }
}

/// Terrain read from a character map, one string per row
///
/// Unknown characters and coordinates outside the map read as open ground.
#[derive(Debug, Clone, Default)]
pub struct AsciiTerrain {
    rows: Vec<Vec<Terrain>>,
}

impl AsciiTerrain {
    pub fn new<S: AsRef<str>>(rows: &[S]) -> Self {
        let rows = rows
            .iter()
            .map(|line| {
                line.as_ref()
                    .chars()
                    .filter(|c| !c.is_whitespace())
                    .map(|c| Terrain::from_symbol(c).unwrap_or_default())
                    .collect()
            })
            .collect();
        Self { rows }
    }
}

impl TerrainSource for AsciiTerrain {
    fn cell_at(&self, coord: HexCoord) -> TerrainCell {
        if coord.row < 0 || coord.col < 0 {
            return Terrain::Open.into();
        }
        self.rows
            .get(coord.row as usize)
            .and_then(|row| row.get(coord.col as usize))
            .copied()
            .unwrap_or_default()
            .into()
    }
}
