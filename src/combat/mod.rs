//! Combat rules - damage, status effects, events and the engagement loop
//!
//! `CombatSession` is the entry point. It owns a `Battlefield` and an
//! `EngagementScheduler`; each queued attacker/defender pair runs as an
//! `Engagement` state machine advanced by `CombatSession::tick`.

pub mod damage;
pub mod events;
pub mod field;
pub mod leveling;
pub mod modifiers;
pub mod scheduler;
pub mod sequence;
pub mod session;
pub mod status;

pub use damage::{
    attack_success_chance, calculate_damage, roll_dodge, DamageContext,
    DamageRoll, DamageType,
};
pub use events::{CombatEvent, CombatEventKind, EventBus, SubscriptionId};
pub use field::Battlefield;
pub use modifiers::{flank_position, terrain_modifier, type_advantage, FlankPosition};
pub use scheduler::{EngagementReport, EngagementScheduler};
pub use sequence::{
    AbortReason, Engagement, EngagementAction, EngagementOutcome, Phase, Skill,
};
pub use session::CombatSession;
pub use status::{StatusEffect, StatusKind, StatusTracker};
