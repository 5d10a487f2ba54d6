//! Encounter events for the presentation layer.
//!
//! The core never calls into dialogue, audio or UI. It publishes events on a
//! bounded channel and whoever presents the fight drains them once per frame.

use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam_channel::{bounded, Receiver, Sender};
use selva_common::BossId;
use serde::{Deserialize, Serialize};

use crate::boss::BossKind;
use crate::threat::ThreatState;

/// How an encounter ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncounterOutcome {
    /// Final boss defeated
    Victory,
    /// Player health reached zero
    Defeat,
    /// Left before either side won
    Abandoned,
}

/// When a boss speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DialogueMoment {
    /// Boss enters
    Intro,
    /// Threat state changed
    ThreatChange(ThreatState),
    /// Attack fired in this state
    Attack(ThreatState),
    /// Final boss raises a spirit
    Revival,
    /// Boss falls
    Defeat,
}

/// Events published by the director.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EncounterEvent {
    /// A boss moved to a new threat state
    ThreatStateChanged {
        /// Boss instance
        boss: BossId,
        /// Which boss
        kind: BossKind,
        /// Previous state
        from: ThreatState,
        /// New state
        to: ThreatState,
    },
    /// A phase's primary boss reached zero health
    BossDefeated {
        /// Which boss
        kind: BossKind,
        /// Phase index
        phase: usize,
    },
    /// The next phase started
    PhaseAdvanced {
        /// New phase index
        phase: usize,
        /// Its boss
        kind: BossKind,
    },
    /// The encounter is over
    EncounterEnded {
        /// Outcome
        outcome: EncounterOutcome,
    },
    /// A heavy attack fired
    SpecialMoveTriggered {
        /// Boss instance
        boss: BossId,
        /// Which boss
        kind: BossKind,
    },
    /// A line of dialogue should be shown
    DialogueCue {
        /// Speaker
        boss: BossKind,
        /// Occasion
        moment: DialogueMoment,
    },
    /// A spirit of an earlier boss rose
    SpiritRevived {
        /// Spirit instance
        boss: BossId,
        /// Which boss it copies
        kind: BossKind,
    },
    /// A spirit was destroyed
    SpiritBanished {
        /// Spirit instance
        boss: BossId,
        /// Which boss it copied
        kind: BossKind,
    },
    /// The player took damage
    PlayerDamaged {
        /// Damage applied
        amount: f32,
        /// Health left
        remaining: f32,
    },
    /// A boss took damage
    BossDamaged {
        /// Boss instance
        boss: BossId,
        /// Damage applied
        amount: f32,
        /// Health left
        remaining: f32,
    },
    /// The counter-attack window opened or closed
    AttackModeChanged {
        /// Whether it is now open
        active: bool,
    },
}

/// Event bus for broadcasting encounter events.
#[derive(Debug)]
pub struct EventBus {
    sender: Sender<EncounterEvent>,
    receiver: Receiver<EncounterEvent>,
    capacity: usize,
    dropped: AtomicU64,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl EventBus {
    /// Creates a new event bus with the given capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity);
        Self {
            sender,
            receiver,
            capacity,
            dropped: AtomicU64::new(0),
        }
    }

    /// Publishes an event to the bus.
    pub fn publish(&self, event: EncounterEvent) {
        // Non-blocking send - if full, event is dropped
        if self.sender.try_send(event).is_err() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Drains all pending events.
    pub fn drain(&self) -> Vec<EncounterEvent> {
        self.receiver.try_iter().collect()
    }

    /// Returns the number of pending events.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }

    /// Returns the channel capacity.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Events lost because the bus was full.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_and_drain() {
        let bus = EventBus::new(8);
        bus.publish(EncounterEvent::AttackModeChanged { active: true });
        bus.publish(EncounterEvent::EncounterEnded {
            outcome: EncounterOutcome::Victory,
        });
        assert_eq!(bus.pending_count(), 2);

        let events = bus.drain();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], EncounterEvent::AttackModeChanged { active: true });
        assert_eq!(bus.pending_count(), 0);
    }

    #[test]
    fn test_full_bus_drops_without_blocking() {
        let bus = EventBus::new(1);
        bus.publish(EncounterEvent::AttackModeChanged { active: true });
        bus.publish(EncounterEvent::AttackModeChanged { active: false });
        assert_eq!(bus.capacity(), 1);
        assert_eq!(bus.dropped(), 1);
        assert_eq!(bus.drain().len(), 1);
    }

    #[test]
    fn test_events_serialize() {
        let json = serde_json::to_string(&EncounterEvent::EncounterEnded {
            outcome: EncounterOutcome::Defeat,
        })
        .expect("serialize");
        assert!(json.contains("defeat"));
    }
}
