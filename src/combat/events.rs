//! Combat event bus
//!
//! Every observable thing that happens in a battle is published here.
//! Events go into a bounded ring log (oldest dropped first) and are then
//! handed to subscribers synchronously, in publish order.

use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::types::{Millis, UnitId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CombatEventKind {
    EngagementQueued,
    EngagementEnded,
    AttackStarted,
    AttackDodged,
    DamageDealt,
    CriticalHit,
    UnitStaggered,
    UnitDefeated,
    StatusApplied,
    StatusExpired,
    StatusDamage,
    MovementStarted,
    MovementCompleted,
    TargetUnreachable,
    Retargeted,
    Retreated,
    LevelUp,
}

/// A published combat event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatEvent {
    pub time_ms: Millis,
    pub kind: CombatEventKind,
    pub attacker: Option<UnitId>,
    pub defender: Option<UnitId>,
    /// Damage, steps, level; whatever number the kind carries
    pub amount: i32,
    pub message: String,
}

impl CombatEvent {
    pub fn new(time_ms: Millis, kind: CombatEventKind) -> Self {
        Self {
            time_ms,
            kind,
            attacker: None,
            defender: None,
            amount: 0,
            message: String::new(),
        }
    }

    pub fn attacker(mut self, id: UnitId) -> Self {
        self.attacker = Some(id);
        self
    }

    pub fn defender(mut self, id: UnitId) -> Self {
        self.defender = Some(id);
        self
    }

    pub fn amount(mut self, amount: i32) -> Self {
        self.amount = amount;
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Does this event name `unit` on either side?
    pub fn involves(&self, unit: UnitId) -> bool {
        self.attacker == Some(unit) || self.defender == Some(unit)
    }
}

impl fmt::Display for CombatEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:>7}ms] {:?}", self.time_ms, self.kind)?;
        if let Some(attacker) = self.attacker {
            write!(f, " {}", attacker)?;
        }
        if let Some(defender) = self.defender {
            write!(f, " -> {}", defender)?;
        }
        if self.amount != 0 {
            write!(f, " ({})", self.amount)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        Ok(())
    }
}

/// Handle returned by `subscribe`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

pub type EventHandler = Box<dyn FnMut(&CombatEvent)>;

/// Ring log plus synchronous subscribers
pub struct EventBus {
    log: VecDeque<CombatEvent>,
    capacity: usize,
    subscribers: Vec<(SubscriptionId, EventHandler)>,
    next_subscription: u64,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            log: VecDeque::with_capacity(capacity),
            capacity,
            subscribers: Vec::new(),
            next_subscription: 0,
        }
    }

    /// Log the event, then notify every subscriber
    pub fn publish(&mut self, event: CombatEvent) {
        tracing::debug!(target: "hex_skirmish::events", "{}", event);

        if self.log.len() >= self.capacity {
            self.log.pop_front(); // Remove oldest
        }
        self.log.push_back(event.clone());

        for (_, handler) in self.subscribers.iter_mut() {
            handler(&event);
        }
    }

    pub fn subscribe<F>(&mut self, handler: F) -> SubscriptionId
    where
        F: FnMut(&CombatEvent) + 'static,
    {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.subscribers.push((id, Box::new(handler)));
        id
    }

    /// Returns false if the id was not subscribed
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sub, _)| *sub != id);
        self.subscribers.len() != before
    }

    /// The last `n` events, oldest first
    pub fn recent(&self, n: usize) -> impl Iterator<Item = &CombatEvent> {
        self.log.iter().skip(self.log.len().saturating_sub(n))
    }

    /// Everything still in the log, oldest first
    pub fn log(&self) -> impl Iterator<Item = &CombatEvent> {
        self.log.iter()
    }

    /// Logged events of one kind
    pub fn of_kind(&self, kind: CombatEventKind) -> impl Iterator<Item = &CombatEvent> {
        self.log.iter().filter(move |e| e.kind == kind)
    }

    pub fn clear_log(&mut self) {
        self.log.clear();
    }

    pub fn len(&self) -> usize {
        self.log.len()
    }

    pub fn is_empty(&self) -> bool {
        self.log.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(100)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("logged", &self.log.len())
            .field("capacity", &self.capacity)
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn event(time: Millis) -> CombatEvent {
        CombatEvent::new(time, CombatEventKind::AttackStarted)
    }

    #[test]
    fn test_log_drops_oldest() {
        let mut bus = EventBus::new(3);
        for t in 0..5 {
            bus.publish(event(t));
        }

        assert_eq!(bus.len(), 3);
        let times: Vec<_> = bus.log().map(|e| e.time_ms).collect();
        assert_eq!(times, vec![2, 3, 4]);
    }

    #[test]
    fn test_subscribers_see_publish_order() {
        let mut bus = EventBus::default();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        bus.subscribe(move |e| sink.borrow_mut().push(e.time_ms));

        bus.publish(event(1));
        bus.publish(event(2));

        assert_eq!(*seen.borrow(), vec![1, 2]);
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let mut bus = EventBus::default();
        let count = Rc::new(RefCell::new(0));
        let sink = Rc::clone(&count);
        let id = bus.subscribe(move |_| *sink.borrow_mut() += 1);

        bus.publish(event(1));
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        bus.publish(event(2));

        assert_eq!(*count.borrow(), 1);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_recent_returns_tail() {
        let mut bus = EventBus::new(10);
        for t in 0..6 {
            bus.publish(event(t));
        }

        let tail: Vec<_> = bus.recent(2).map(|e| e.time_ms).collect();
        assert_eq!(tail, vec![4, 5]);
        assert_eq!(bus.recent(50).count(), 6);
    }

    #[test]
    fn test_event_display() {
        let text = CombatEvent::new(1500, CombatEventKind::DamageDealt)
            .attacker(UnitId(1))
            .defender(UnitId(2))
            .amount(9)
            .to_string();

        assert!(text.contains("DamageDealt"));
        assert!(text.contains("#1 -> #2"));
        assert!(text.contains("(9)"));
    }
}
