//! The orchestrator bound to a host's page lifecycle.

use std::fmt::Debug;
use std::hash::Hash;

use segue_config::{MarkerConfig, SegueConfig};
use segue_dom::Surface;
use tracing::trace;

use crate::driver::{AnimationDriver, TransitionRecord};
use crate::events::{EventQueue, TransitionEvent};
use crate::history::HistoryTracker;
use crate::recorder::{PageNode, TransitionRecorder};
use crate::store::SessionStore;
use crate::types::{IdGenerator, TransitionId};

/// Settings for one [`Animator`].
#[derive(Debug, Clone, PartialEq)]
pub struct AnimatorConfig {
    /// History namespace (one per app or section).
    pub namespace: String,
    pub markers: MarkerConfig,
    pub safety_timeout_ms: Option<u64>,
}

impl AnimatorConfig {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            markers: MarkerConfig::default(),
            safety_timeout_ms: None,
        }
    }

    pub fn with_markers(mut self, markers: MarkerConfig) -> Self {
        self.markers = markers;
        self
    }

    pub fn with_safety_timeout(mut self, timeout_ms: u64) -> Self {
        self.safety_timeout_ms = Some(timeout_ms);
        self
    }
}

impl From<&SegueConfig> for AnimatorConfig {
    fn from(config: &SegueConfig) -> Self {
        Self {
            namespace: config.transition.namespace.clone(),
            markers: config.markers.clone(),
            safety_timeout_ms: config.transition.safety_timeout_ms,
        }
    }
}

/// Page-transition orchestrator.
///
/// Bind [`on_mount`](Self::on_mount) and [`on_unmount`](Self::on_unmount) to
/// the host's keyed page roots and forward each participant's
/// "animation finished" signal to [`on_animation_end`](Self::on_animation_end).
/// Every hook takes `&mut self`, so a hook can never re-enter the
/// orchestrator mid-update.
#[derive(Debug)]
pub struct Animator<S, N> {
    namespace: String,
    history: HistoryTracker<S>,
    recorder: TransitionRecorder<N>,
    driver: AnimationDriver<N>,
}

impl<S, N> Animator<S, N>
where
    S: SessionStore,
    N: Copy + Eq + Hash + Debug,
{
    pub fn new(config: AnimatorConfig, store: S) -> Self {
        Self::with_ids(config, store, IdGenerator::new())
    }

    /// Like [`new`](Self::new) with a caller-supplied id generator.
    pub fn with_ids(config: AnimatorConfig, store: S, ids: IdGenerator) -> Self {
        Self {
            namespace: config.namespace,
            history: HistoryTracker::new(store),
            recorder: TransitionRecorder::new(),
            driver: AnimationDriver::with_ids(config.markers, ids)
                .with_safety_timeout(config.safety_timeout_ms),
        }
    }

    pub fn from_config(config: &SegueConfig, store: S) -> Self {
        Self::new(AnimatorConfig::from(config), store)
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// A keyed page root was attached.
    ///
    /// Starts a transition when a previous page is on record; otherwise (the
    /// first page of a session, or an unkeyed node) nothing changes.
    pub fn on_mount<D>(
        &mut self,
        surface: &mut D,
        key: Option<&str>,
        element: N,
    ) -> Option<TransitionId>
    where
        D: Surface<Node = N>,
    {
        let Some(key) = key.filter(|k| !k.is_empty()) else {
            trace!("mount without key ignored");
            return None;
        };
        let Some(PageNode {
            key: last_key,
            element: last_element,
        }) = self.recorder.last().cloned()
        else {
            trace!(key, "first page of the session; no transition");
            return None;
        };

        let resolution = self
            .history
            .resolve_direction(&self.namespace, key, &last_key);
        self.driver.start(
            surface,
            resolution.direction,
            &last_key,
            last_element,
            key,
            element,
        )
    }

    /// A keyed page root was detached.
    pub fn on_unmount(&mut self, key: Option<&str>, element: N) {
        self.recorder.on_unmount(key, element);
    }

    /// `element` reported that its motion finished.
    pub fn on_animation_end<D>(&mut self, surface: &mut D, element: N) -> Option<TransitionId>
    where
        D: Surface<Node = N>,
    {
        self.driver.complete(surface, element)
    }

    /// Advance the safety timeout clock. Returns transitions forced to finish.
    pub fn tick<D>(&mut self, surface: &mut D, delta_ms: f64) -> Vec<TransitionId>
    where
        D: Surface<Node = N>,
    {
        self.driver.tick(surface, delta_ms)
    }

    /// Current back-stack of this orchestrator's namespace.
    pub fn history(&self) -> Vec<String> {
        self.history.stack(&self.namespace)
    }

    pub fn clear_history(&mut self) {
        self.history.clear(&self.namespace);
    }

    pub fn last_page(&self) -> Option<&PageNode<N>> {
        self.recorder.last()
    }

    pub fn transition(&self, id: &TransitionId) -> Option<&TransitionRecord<N>> {
        self.driver.record(id)
    }

    pub fn in_flight(&self) -> usize {
        self.driver.in_flight()
    }

    pub fn events(&self) -> &EventQueue {
        self.driver.events()
    }

    pub fn drain_events(&mut self) -> impl Iterator<Item = TransitionEvent> + '_ {
        self.driver.drain_events()
    }

    pub fn store(&self) -> &S {
        self.history.store()
    }

    pub fn store_mut(&mut self) -> &mut S {
        self.history.store_mut()
    }
}
