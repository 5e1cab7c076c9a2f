//! Hex coordinate system for battle grids (offset coordinates)
//!
//! Tiles are addressed by (col, row). Pointy-top grids shove odd rows half a
//! hex to the right; flat-top grids shove odd columns half a hex down. The
//! neighbor offsets therefore depend on the orientation and on the parity of
//! the row (pointy) or column (flat), giving four direction tables.

use serde::{Deserialize, Serialize};

/// Grid orientation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    #[default]
    PointyTop,
    FlatTop,
}

// Offsets in HexDirection::all() order. Rows grow downward.
const POINTY_EVEN_ROW: [(i32, i32); 6] = [(1, 0), (0, -1), (-1, -1), (-1, 0), (-1, 1), (0, 1)];
const POINTY_ODD_ROW: [(i32, i32); 6] = [(1, 0), (1, -1), (0, -1), (-1, 0), (0, 1), (1, 1)];
const FLAT_EVEN_COL: [(i32, i32); 6] = [(1, -1), (0, -1), (-1, -1), (-1, 0), (0, 1), (1, 0)];
const FLAT_ODD_COL: [(i32, i32); 6] = [(1, 0), (0, -1), (-1, 0), (-1, 1), (0, 1), (1, 1)];

/// Offset hex coordinate
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub struct HexCoord {
    pub col: i32,
    pub row: i32,
}

impl HexCoord {
    pub fn new(col: i32, row: i32) -> Self {
        Self { col, row }
    }

    /// Direction table for this coordinate's parity
    fn offsets(&self, orientation: Orientation) -> &'static [(i32, i32); 6] {
        match orientation {
            Orientation::PointyTop if self.row & 1 == 0 => &POINTY_EVEN_ROW,
            Orientation::PointyTop => &POINTY_ODD_ROW,
            Orientation::FlatTop if self.col & 1 == 0 => &FLAT_EVEN_COL,
            Orientation::FlatTop => &FLAT_ODD_COL,
        }
    }

    /// Axial (q, r) equivalent of this offset coordinate
    pub fn to_axial(&self, orientation: Orientation) -> (i32, i32) {
        match orientation {
            Orientation::PointyTop => (self.col - (self.row - (self.row & 1)) / 2, self.row),
            Orientation::FlatTop => (self.col, self.row - (self.col - (self.col & 1)) / 2),
        }
    }

    /// Hex distance (minimum number of steps on an unobstructed grid)
    pub fn distance(&self, other: &Self, orientation: Orientation) -> u32 {
        let (q1, r1) = self.to_axial(orientation);
        let (q2, r2) = other.to_axial(orientation);
        let dq = q1 - q2;
        let dr = r1 - r2;
        ((dq.abs() + dr.abs() + (dq + dr).abs()) / 2) as u32
    }

    /// All 6 neighboring coordinates, unbounded
    pub fn neighbors(&self, orientation: Orientation) -> [HexCoord; 6] {
        let offsets = self.offsets(orientation);
        let mut result = [*self; 6];
        for (slot, (dc, dr)) in result.iter_mut().zip(offsets.iter()) {
            *slot = HexCoord::new(self.col + dc, self.row + dr);
        }
        result
    }

    /// Neighbor in one direction
    pub fn step(&self, direction: HexDirection, orientation: Orientation) -> HexCoord {
        let (dc, dr) = self.offsets(orientation)[direction.index()];
        HexCoord::new(self.col + dc, self.row + dr)
    }

    /// Direction from self to an adjacent coordinate, if it is adjacent
    pub fn direction_to(&self, other: &Self, orientation: Orientation) -> Option<HexDirection> {
        self.neighbors(orientation)
            .iter()
            .position(|n| n == other)
            .map(|i| HexDirection::all()[i])
    }

    /// Is `other` one step away?
    pub fn is_adjacent(&self, other: &Self, orientation: Orientation) -> bool {
        self.distance(other, orientation) == 1
    }
}

/// Direction for hex facing
///
/// Named for pointy-top grids, counterclockwise from East. On flat-top grids
/// the same six slots are rotated by 30 degrees (East is the upper-right
/// edge).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum HexDirection {
    #[default]
    East,
    NorthEast,
    NorthWest,
    West,
    SouthWest,
    SouthEast,
}

impl HexDirection {
    /// Slot index in the direction tables
    pub fn index(&self) -> usize {
        match self {
            HexDirection::East => 0,
            HexDirection::NorthEast => 1,
            HexDirection::NorthWest => 2,
            HexDirection::West => 3,
            HexDirection::SouthWest => 4,
            HexDirection::SouthEast => 5,
        }
    }

    /// Get opposite direction
    pub fn opposite(&self) -> Self {
        HexDirection::all()[(self.index() + 3) % 6]
    }

    /// Number of 60-degree turns between two directions (0..=3)
    pub fn turns_to(&self, other: &Self) -> u32 {
        let diff = (self.index() as i32 - other.index() as i32).rem_euclid(6) as u32;
        diff.min(6 - diff)
    }

    /// All directions
    pub fn all() -> [HexDirection; 6] {
        [
            HexDirection::East,
            HexDirection::NorthEast,
            HexDirection::NorthWest,
            HexDirection::West,
            HexDirection::SouthWest,
            HexDirection::SouthEast,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOTH: [Orientation; 2] = [Orientation::PointyTop, Orientation::FlatTop];

    #[test]
    fn test_hex_coord_creation() {
        let coord = HexCoord::new(5, 10);
        assert_eq!(coord.col, 5);
        assert_eq!(coord.row, 10);
    }

    #[test]
    fn test_hex_distance_same() {
        let a = HexCoord::new(3, 3);
        for orientation in BOTH {
            assert_eq!(a.distance(&a, orientation), 0);
        }
    }

    #[test]
    fn test_neighbors_are_distance_one() {
        for orientation in BOTH {
            for coord in [HexCoord::new(2, 2), HexCoord::new(3, 3), HexCoord::new(2, 3)] {
                for n in coord.neighbors(orientation) {
                    assert_eq!(coord.distance(&n, orientation), 1, "{coord:?} -> {n:?}");
                }
            }
        }
    }

    #[test]
    fn test_pointy_parity_tables() {
        let even = HexCoord::new(2, 2);
        assert!(even.is_adjacent(&HexCoord::new(2, 3), Orientation::PointyTop));
        assert!(even.is_adjacent(&HexCoord::new(1, 3), Orientation::PointyTop));
        assert!(!even.is_adjacent(&HexCoord::new(3, 3), Orientation::PointyTop));

        let odd = HexCoord::new(2, 3);
        assert!(odd.is_adjacent(&HexCoord::new(3, 2), Orientation::PointyTop));
        assert!(!odd.is_adjacent(&HexCoord::new(1, 2), Orientation::PointyTop));
    }

    #[test]
    fn test_flat_parity_tables() {
        let even = HexCoord::new(2, 2);
        assert!(even.is_adjacent(&HexCoord::new(3, 1), Orientation::FlatTop));
        assert!(!even.is_adjacent(&HexCoord::new(3, 3), Orientation::FlatTop));

        let odd = HexCoord::new(3, 2);
        assert!(odd.is_adjacent(&HexCoord::new(4, 3), Orientation::FlatTop));
        assert!(!odd.is_adjacent(&HexCoord::new(4, 1), Orientation::FlatTop));
    }

    #[test]
    fn test_direction_round_trip() {
        for orientation in BOTH {
            let origin = HexCoord::new(4, 5);
            for dir in HexDirection::all() {
                let n = origin.step(dir, orientation);
                assert_eq!(origin.direction_to(&n, orientation), Some(dir));
                assert_eq!(n.direction_to(&origin, orientation), Some(dir.opposite()));
            }
        }
    }

    #[test]
    fn test_negative_coordinates_distance() {
        let a = HexCoord::new(-1, -1);
        let b = HexCoord::new(0, 0);
        assert_eq!(a.distance(&b, Orientation::PointyTop), 1);
    }

    #[test]
    fn test_direction_opposite() {
        assert_eq!(HexDirection::East.opposite(), HexDirection::West);
        assert_eq!(HexDirection::NorthEast.opposite(), HexDirection::SouthWest);
    }

    #[test]
    fn test_turns_between_directions() {
        assert_eq!(HexDirection::East.turns_to(&HexDirection::East), 0);
        assert_eq!(HexDirection::East.turns_to(&HexDirection::SouthEast), 1);
        assert_eq!(HexDirection::East.turns_to(&HexDirection::NorthWest), 2);
        assert_eq!(HexDirection::East.turns_to(&HexDirection::West), 3);
    }
}
