//! Hex Skirmish - real-time tactical combat on a hex grid
//!
//! Units on an offset-coordinate hex grid fight in attacker/defender pairs.
//! Each pair runs a timed state machine (cooldown, movement, strike, death)
//! driven by a single-threaded scheduler, with every outcome published on a
//! combat event bus.

pub mod battle;
pub mod combat;
pub mod core;
pub mod scenario;

pub use crate::combat::CombatSession;
pub use crate::core::{CombatConfig, CombatError, Result};
pub use crate::scenario::Scenario;
