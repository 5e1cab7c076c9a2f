//! Engagement scheduler
//!
//! Runs every active engagement once per tick, in the order they were
//! queued. Each attacker has at most one engagement; queuing another one
//! for the same attacker cancels the old.

use ahash::AHashMap;
use tracing::{debug, warn};

use crate::combat::events::CombatEventKind;
use crate::combat::field::Battlefield;
use crate::combat::sequence::{
    AbortReason, Engagement, EngagementAction, EngagementOutcome, Phase,
};
use crate::core::error::{CombatError, Result};
use crate::core::types::{EngagementId, Millis, UnitId};

/// A finished engagement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngagementReport {
    pub id: EngagementId,
    pub action: EngagementAction,
    pub outcome: EngagementOutcome,
    pub strikes: u32,
    pub elapsed_ms: Millis,
}

#[derive(Debug, Default)]
pub struct EngagementScheduler {
    active: Vec<Engagement>,
    /// Attacker -> its engagement
    by_attacker: AHashMap<UnitId, EngagementId>,
    finished: Vec<EngagementReport>,
    next_id: u64,
}

impl EngagementScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start an engagement, replacing any the attacker already has
    pub fn queue(&mut self, field: &mut Battlefield, action: EngagementAction) -> Result<EngagementId> {
        let EngagementAction {
            attacker, defender, ..
        } = action;

        let attacker_unit = field
            .roster
            .get(attacker)
            .ok_or(CombatError::StaleReference(attacker))?;
        let defender_unit = field
            .roster
            .get(defender)
            .ok_or(CombatError::StaleReference(defender))?;
        if attacker == defender {
            return Err(CombatError::InvalidTarget(format!(
                "{} cannot engage itself",
                attacker
            )));
        }
        if !attacker_unit.is_hostile_to(defender_unit) {
            return Err(CombatError::InvalidTarget(format!(
                "{} and {} fight for the same side",
                attacker, defender
            )));
        }

        if self.by_attacker.contains_key(&attacker) {
            self.cancel(field, attacker);
        }

        if let Some(unit) = field.roster.get_mut(attacker) {
            unit.target = Some(defender);
        }

        let id = EngagementId(self.next_id);
        self.next_id += 1;
        self.active.push(Engagement::new(id, action, field));
        self.by_attacker.insert(attacker, id);

        let mut event = field
            .event(CombatEventKind::EngagementQueued)
            .attacker(attacker)
            .defender(defender);
        if let Some(skill) = action.skill {
            event = event.message(format!("skill {}", skill.id));
        }
        field.emit(event);

        debug!(engagement = id.0, %attacker, %defender, "engagement queued");
        Ok(id)
    }

    /// Cancel the attacker's engagement, if any
    pub fn cancel(&mut self, field: &mut Battlefield, attacker: UnitId) -> bool {
        let Some(id) = self.by_attacker.remove(&attacker) else {
            return false;
        };
        let Some(index) = self.active.iter().position(|e| e.id == id) else {
            return false;
        };

        let mut engagement = self.active.remove(index);
        let outcome = engagement.abort(field, AbortReason::Cancelled);
        self.finish(field, engagement, outcome);
        true
    }

    /// Advance every engagement by `dt` starting at `start_ms`
    pub fn tick(&mut self, field: &mut Battlefield, start_ms: Millis, dt: Millis) {
        let max_ms = field.config.max_engagement_ms;
        let mut active = std::mem::take(&mut self.active);
        let mut follow_ups = Vec::new();

        // Prune pairs naming units that left the battle
        active.retain_mut(|engagement| {
            if !engagement.is_stale(field) {
                return true;
            }
            let outcome = engagement.abort(field, AbortReason::Stale);
            self.finish(field, engagement.clone(), outcome);
            false
        });

        let mut running = Vec::with_capacity(active.len());
        for mut engagement in active {
            let mut outcome = engagement.advance(field, start_ms, dt);

            if outcome.is_none() && engagement.elapsed() >= max_ms {
                warn!(engagement = engagement.id.0, "engagement timed out");
                outcome = Some(engagement.abort(field, AbortReason::TimedOut));
            }

            match outcome {
                None => running.push(engagement),
                Some(outcome) => {
                    if let EngagementOutcome::Retargeted(new_target) = outcome {
                        follow_ups.push(EngagementAction {
                            defender: new_target,
                            ..engagement.action
                        });
                    }
                    self.finish(field, engagement, outcome);
                }
            }
        }

        self.active = running;

        for action in follow_ups {
            if let Err(e) = self.queue(field, action) {
                warn!(attacker = %action.attacker, "retarget follow-up rejected: {}", e);
            }
        }
    }

    fn finish(&mut self, field: &mut Battlefield, engagement: Engagement, outcome: EngagementOutcome) {
        let EngagementAction {
            attacker, defender, ..
        } = engagement.action;

        if self.by_attacker.get(&attacker) == Some(&engagement.id) {
            self.by_attacker.remove(&attacker);
        }

        // Clear the attacker's target unless a follow-up takes over
        if !matches!(outcome, EngagementOutcome::Retargeted(_)) {
            if let Some(unit) = field.roster.get_mut(attacker) {
                if unit.target == Some(defender) {
                    unit.target = None;
                }
            }
        }

        if outcome != EngagementOutcome::Aborted(AbortReason::Stale) {
            let event = field
                .event(CombatEventKind::EngagementEnded)
                .attacker(attacker)
                .defender(defender)
                .amount(engagement.strikes() as i32)
                .message(format!("{:?}", outcome));
            field.emit(event);
        }

        debug!(engagement = engagement.id.0, ?outcome, "engagement finished");
        self.finished.push(EngagementReport {
            id: engagement.id,
            action: engagement.action,
            outcome,
            strikes: engagement.strikes(),
            elapsed_ms: engagement.elapsed(),
        });
    }

    pub fn is_engaged(&self, unit: UnitId) -> bool {
        self.by_attacker.contains_key(&unit)
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Current phase of the attacker's engagement
    pub fn phase_of(&self, attacker: UnitId) -> Option<&Phase> {
        let id = self.by_attacker.get(&attacker)?;
        self.active.iter().find(|e| e.id == *id).map(|e| e.phase())
    }

    pub fn engagements(&self) -> impl Iterator<Item = &Engagement> {
        self.active.iter()
    }

    /// Drain reports of finished engagements
    pub fn take_finished(&mut self) -> Vec<EngagementReport> {
        std::mem::take(&mut self.finished)
    }
}
