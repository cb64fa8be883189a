//! Navigation history and direction inference.
//!
//! Each namespace keeps a back-stack of page keys, most recent last, stored
//! as a JSON array in the session store. Entering a key already on the stack
//! is a backward navigation and truncates the stack before that key;
//! entering any other key is forward and pushes the key being left.

use serde::Serialize;
use tracing::{debug, warn};

use crate::store::SessionStore;
use crate::types::Direction;

/// Outcome of [`HistoryTracker::resolve_direction`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub direction: Direction,
    /// The stack as persisted after this resolution.
    pub stack: Vec<String>,
}

/// Owns the session store and the read-modify-write cycle on it.
#[derive(Debug)]
pub struct HistoryTracker<S> {
    store: S,
}

impl<S: SessionStore> HistoryTracker<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Classify the navigation `outgoing_key -> incoming_key` and persist the
    /// updated stack for `namespace`.
    ///
    /// Storage failures never block navigation: a failed write is logged and
    /// the direction is still returned.
    pub fn resolve_direction(
        &mut self,
        namespace: &str,
        incoming_key: &str,
        outgoing_key: &str,
    ) -> Resolution {
        let mut stack = self.stack(namespace);

        let direction = match stack.iter().position(|key| key == incoming_key) {
            Some(index) => {
                stack.truncate(index);
                Direction::Backward
            }
            None => {
                stack.push(outgoing_key.to_string());
                Direction::Forward
            }
        };

        self.persist(namespace, &stack);
        debug!(
            namespace,
            incoming_key,
            outgoing_key,
            ?direction,
            depth = stack.len(),
            "resolved navigation direction"
        );

        Resolution { direction, stack }
    }

    /// Current stack for `namespace`. Missing or malformed state reads as empty.
    pub fn stack(&self, namespace: &str) -> Vec<String> {
        let Some(raw) = self.store.get_item(namespace) else {
            return Vec::new();
        };
        match serde_json::from_str::<Vec<String>>(&raw) {
            Ok(stack) => stack,
            Err(error) => {
                warn!(
                    %error,
                    namespace,
                    "persisted navigation history is malformed; treating it as empty"
                );
                Vec::new()
            }
        }
    }

    /// Forget the history of `namespace`.
    pub fn clear(&mut self, namespace: &str) {
        if let Err(error) = self.store.remove_item(namespace) {
            warn!(%error, namespace, "failed to clear navigation history");
        }
    }

    fn persist(&mut self, namespace: &str, stack: &[String]) {
        let encoded = match serde_json::to_string(stack) {
            Ok(encoded) => encoded,
            Err(error) => {
                warn!(%error, namespace, "failed to encode navigation history");
                return;
            }
        };
        if let Err(error) = self.store.set_item(namespace, &encoded) {
            warn!(%error, namespace, "failed to persist navigation history");
        }
    }
}
