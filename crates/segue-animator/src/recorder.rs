//! Single-slot record of the last unmounted page.

use tracing::trace;

/// Identity of the most recently unmounted page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageNode<N> {
    pub key: String,
    pub element: N,
}

/// Holds at most one [`PageNode`]. Unmount overwrites it; mount only reads it,
/// so rapid sequential mounts all pair with the same predecessor.
#[derive(Debug)]
pub struct TransitionRecorder<N> {
    last: Option<PageNode<N>>,
}

impl<N> Default for TransitionRecorder<N> {
    fn default() -> Self {
        Self { last: None }
    }
}

impl<N: Copy> TransitionRecorder<N> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a page leaving the tree. Unkeyed pages are ignored.
    pub fn on_unmount(&mut self, key: Option<&str>, element: N) {
        let Some(key) = key.filter(|k| !k.is_empty()) else {
            trace!("unmount without key ignored");
            return;
        };
        self.last = Some(PageNode {
            key: key.to_string(),
            element,
        });
    }

    /// The page recorded by the last keyed unmount, if any.
    pub fn last(&self) -> Option<&PageNode<N>> {
        self.last.as_ref()
    }

    pub fn clear(&mut self) {
        self.last = None;
    }
}
