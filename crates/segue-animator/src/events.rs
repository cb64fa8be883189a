//! Transition lifecycle events.
//!
//! The driver pushes an event for every state change of a transition. Hosts
//! poll them after each hook call, e.g. to log, to drive an accessibility
//! announcement, or to assert ordering in tests.
//!
//! ```ignore
//! animator.on_animation_end(&mut tree, page);
//! for event in animator.drain_events() {
//!     if let TransitionEvent::Completed { transition_id } = event {
//!         println!("{transition_id} finished");
//!     }
//! }
//! ```

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::types::{Direction, Side, TransitionId};

/// Why a transition was dropped before any marker was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbortReason {
    /// The incoming element is not attached under a parent.
    NoParent,
    /// The surface refused to insert the duplicate.
    DuplicateRejected,
    /// The duplicate could not be found again after insertion.
    DuplicateNotFound,
}

/// Event emitted when a transition changes state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransitionEvent {
    /// Markers applied, both elements animating.
    Started {
        transition_id: TransitionId,
        direction: Direction,
        outgoing_key: String,
        incoming_key: String,
    },
    /// One participant finished; the other is still pending.
    SideCompleted {
        transition_id: TransitionId,
        side: Side,
    },
    /// Both participants finished and the shared markers were cleared.
    Completed { transition_id: TransitionId },
    /// The safety timeout forced cleanup.
    TimedOut {
        transition_id: TransitionId,
        /// Completion signals seen before the timeout (0 or 1).
        received: u8,
    },
    /// The transition never started.
    Aborted {
        transition_id: TransitionId,
        reason: AbortReason,
    },
}

impl TransitionEvent {
    pub fn transition_id(&self) -> &TransitionId {
        match self {
            Self::Started { transition_id, .. }
            | Self::SideCompleted { transition_id, .. }
            | Self::Completed { transition_id }
            | Self::TimedOut { transition_id, .. }
            | Self::Aborted { transition_id, .. } => transition_id,
        }
    }

    /// Whether this event ends the transition.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed { .. } | Self::TimedOut { .. } | Self::Aborted { .. }
        )
    }
}

/// Queue for collecting transition events between polls.
#[derive(Debug, Default)]
pub struct EventQueue {
    events: VecDeque<TransitionEvent>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: TransitionEvent) {
        self.events.push_back(event);
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn pop(&mut self) -> Option<TransitionEvent> {
        self.events.pop_front()
    }

    pub fn drain(&mut self) -> impl Iterator<Item = TransitionEvent> + '_ {
        self.events.drain(..)
    }

    pub fn peek(&self) -> Option<&TransitionEvent> {
        self.events.front()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Pending events for one transition.
    pub fn events_for(&self, id: &TransitionId) -> Vec<&TransitionEvent> {
        self.events
            .iter()
            .filter(|e| e.transition_id() == id)
            .collect()
    }
}
