//! Battle scenarios loaded from TOML
//!
//! ```toml
//! [combat]
//! seed = 7
//!
//! [map]
//! width = 6
//! height = 4
//! orientation = "pointy_top"
//! terrain = [
//!     ". . . . . .",
//!     ". T T . . .",
//!     ". . # . . .",
//!     ". . . . . .",
//! ]
//!
//! [[units]]
//! name = "Sergeant"
//! side = "player"
//! class = "infantry"
//! position = { col = 0, row = 1 }
//! base_attack = 14
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::battle::grid::HexGrid;
use crate::battle::hex::Orientation;
use crate::battle::terrain::AsciiTerrain;
use crate::battle::units::UnitSpawn;
use crate::core::config::CombatConfig;
use crate::core::error::{CombatError, Result};

/// Map section of a scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapSpec {
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub orientation: Orientation,
    /// One string per row; see `Terrain::from_symbol`. Empty means open
    /// ground everywhere.
    #[serde(default)]
    pub terrain: Vec<String>,
}

impl MapSpec {
    pub fn build_grid(&self) -> HexGrid {
        let source = AsciiTerrain::new(&self.terrain);
        HexGrid::from_source(self.width, self.height, self.orientation, &source)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub combat: CombatConfig,
    pub map: MapSpec,
    #[serde(default)]
    pub units: Vec<UnitSpawn>,
}

impl Scenario {
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let scenario: Scenario = toml::from_str(source)?;
        scenario.validate()?;
        Ok(scenario)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<()> {
        self.combat.validate()?;
        if self.map.width == 0 || self.map.height == 0 {
            return Err(CombatError::InvalidConfig(format!(
                "map must be at least 1x1, got {}x{}",
                self.map.width, self.map.height
            )));
        }
        Ok(())
    }
}
