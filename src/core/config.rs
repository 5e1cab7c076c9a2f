//! Combat configuration with documented constants
//!
//! All timing and tuning values for a battle are collected here. A session
//! owns its own copy; there is no process-wide config.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::error::{CombatError, Result};
use crate::core::types::Millis;

/// Configuration for one combat session
///
/// Durations are simulation milliseconds. Changing them affects pacing,
/// not the outcome rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    // === RANDOMNESS ===
    /// Seed for the session random source
    ///
    /// Two sessions with the same seed, setup and tick sequence produce the
    /// same event stream.
    pub seed: u64,

    // === EVENT LOG ===
    /// Number of events kept in the ring log before the oldest is dropped
    pub event_log_capacity: usize,

    // === ENGAGEMENT TIMING ===
    /// How long a unit in Defence mode (or stunned) waits before re-checking
    pub defence_wait_ms: Millis,

    /// Delay between AttackStarted and the dodge/damage resolution
    pub strike_windup_ms: Millis,

    /// Recovery after an attack was dodged
    pub post_dodge_ms: Millis,

    /// Recovery after a strike landed and the defender survived
    pub post_strike_ms: Millis,

    /// Time the attacker spends on a defeated defender before the
    /// engagement resolves
    pub death_delay_ms: Millis,

    /// Time to cross one hex
    ///
    /// A move of N steps suspends the engagement for N * move_step_ms.
    pub move_step_ms: Millis,

    /// Hard ceiling on a single engagement's lifetime
    ///
    /// Guarantees termination for pairs stuck in Defence mode or behind
    /// blocked terrain that keeps reopening.
    pub max_engagement_ms: Millis,

    // === ENGAGEMENT RULES ===
    /// Stamina spent per strike attempt
    pub strike_stamina_cost: i32,

    /// Consecutive low-stamina skips before a strike is forced
    ///
    /// Bounds starvation when stamina regeneration is slower than drain.
    pub max_consecutive_skips: u32,

    /// Radius searched for a closer alternate target when the current
    /// defender is not adjacent
    pub retarget_radius: u32,

    /// Apply the facing-based flanking multiplier in the damage pipeline
    pub flanking: bool,

    /// Half-width of the uniform damage variation (0.1 = plus/minus 10%)
    pub damage_variation: f32,

    // === REGENERATION ===
    /// Interval between stamina/balance regeneration pulses
    pub regen_interval_ms: Millis,

    /// Stamina restored per pulse
    pub stamina_regen: i32,

    /// Balance restored per pulse
    pub balance_regen: i32,

    // === STATUS EFFECTS ===
    /// Length of one status tick; effect durations count these
    pub status_tick_ms: Millis,

    // === PROGRESSION ===
    /// Experience granted for defeating a unit
    pub experience_per_defeat: u32,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            seed: 12345,

            event_log_capacity: 100,

            // Engagement timing
            defence_wait_ms: 1000,
            strike_windup_ms: 500,
            post_dodge_ms: 500,
            post_strike_ms: 250,
            death_delay_ms: 1000,
            move_step_ms: 200,
            max_engagement_ms: 300_000,

            // Engagement rules
            strike_stamina_cost: 1,
            max_consecutive_skips: 8,
            retarget_radius: 1,
            flanking: false,
            damage_variation: 0.1,

            // Regeneration
            regen_interval_ms: 1000,
            stamina_regen: 1,
            balance_regen: 1,

            // Status effects
            status_tick_ms: 1000,

            // Progression
            experience_per_defeat: 50,
        }
    }
}

impl CombatConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a config from TOML; missing keys keep their defaults
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: CombatConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file from disk
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        if self.event_log_capacity == 0 {
            return Err(CombatError::InvalidConfig(
                "event_log_capacity must be at least 1".into(),
            ));
        }

        // Every loop in the engagement state machine passes through one of
        // these waits; a zero would let a pair spin without advancing time.
        if self.defence_wait_ms == 0 || self.move_step_ms == 0 {
            return Err(CombatError::InvalidConfig(
                "defence_wait_ms and move_step_ms must be positive".into(),
            ));
        }

        if self.regen_interval_ms == 0 || self.status_tick_ms == 0 {
            return Err(CombatError::InvalidConfig(
                "regen_interval_ms and status_tick_ms must be positive".into(),
            ));
        }

        if !(0.0..1.0).contains(&self.damage_variation) {
            return Err(CombatError::InvalidConfig(format!(
                "damage_variation ({}) must be in [0, 1)",
                self.damage_variation
            )));
        }

        if self.strike_stamina_cost < 0 || self.stamina_regen < 0 || self.balance_regen < 0 {
            return Err(CombatError::InvalidConfig(
                "stamina and balance amounts must not be negative".into(),
            ));
        }

        Ok(())
    }
}
