//! Animation driver: starts transitions and joins their completion signals.
//!
//! Starting a transition duplicates the outgoing page next to the incoming
//! one and tags both with role and direction markers; the stylesheet does the
//! motion. Each participant then reports completion once through
//! [`AnimationDriver::complete`]:
//!
//! ```text
//!            first signal                second signal
//! Waiting ─────────────────► Half ─────────────────────► Done (cleanup, record dropped)
//!    (outgoing side: duplicate removed immediately)
//! ```
//!
//! Records are keyed by transition id, and the container-level in-progress
//! marker is reference counted, so overlapping transitions finish
//! independently.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

use segue_config::MarkerConfig;
use segue_dom::Surface;
use tracing::{debug, trace, warn};

use crate::events::{AbortReason, EventQueue, TransitionEvent};
use crate::types::{Direction, IdGenerator, Side, TransitionId};

/// State of one in-flight transition.
#[derive(Debug, Clone)]
pub struct TransitionRecord<N> {
    pub id: TransitionId,
    pub direction: Direction,
    /// Live duplicate of the page being left.
    pub outgoing: N,
    pub incoming: N,
    /// Root container and incoming parent, both holding the in-progress marker.
    pub root: N,
    pub parent: N,
    pub outgoing_completed: bool,
    pub incoming_completed: bool,
    pub elapsed_ms: f64,
    seq: u64,
}

/// Result of feeding one completion signal into a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Join {
    /// This side already reported.
    Repeated,
    /// First distinct signal.
    Half,
    /// Second distinct signal.
    Done,
}

impl<N: Copy + Eq> TransitionRecord<N> {
    /// Distinct completion signals received so far (0, 1 or 2).
    pub fn received(&self) -> u8 {
        u8::from(self.outgoing_completed) + u8::from(self.incoming_completed)
    }

    pub fn side_of(&self, element: N) -> Option<Side> {
        if element == self.outgoing {
            Some(Side::Outgoing)
        } else if element == self.incoming {
            Some(Side::Incoming)
        } else {
            None
        }
    }

    fn join(&mut self, side: Side) -> Join {
        let flag = match side {
            Side::Outgoing => &mut self.outgoing_completed,
            Side::Incoming => &mut self.incoming_completed,
        };
        if *flag {
            return Join::Repeated;
        }
        *flag = true;
        if self.received() == 2 { Join::Done } else { Join::Half }
    }
}

/// Drives transitions on a [`Surface`] whose handles are `N`.
#[derive(Debug)]
pub struct AnimationDriver<N> {
    markers: MarkerConfig,
    ids: IdGenerator,
    records: HashMap<TransitionId, TransitionRecord<N>>,
    /// Outstanding holders of the in-progress marker, per element.
    holds: HashMap<N, usize>,
    safety_timeout_ms: Option<f64>,
    next_seq: u64,
    events: EventQueue,
}

impl<N: Copy + Eq + Hash + Debug> AnimationDriver<N> {
    pub fn new(markers: MarkerConfig) -> Self {
        Self::with_ids(markers, IdGenerator::new())
    }

    pub fn with_ids(markers: MarkerConfig, ids: IdGenerator) -> Self {
        Self {
            markers,
            ids,
            records: HashMap::new(),
            holds: HashMap::new(),
            safety_timeout_ms: None,
            next_seq: 0,
            events: EventQueue::new(),
        }
    }

    /// Force cleanup of transitions older than `timeout_ms`; see [`tick`](Self::tick).
    pub fn with_safety_timeout(mut self, timeout_ms: Option<u64>) -> Self {
        self.safety_timeout_ms = timeout_ms.map(|ms| ms as f64);
        self
    }

    pub fn markers(&self) -> &MarkerConfig {
        &self.markers
    }

    /// Start a transition from `outgoing` (a possibly detached page) to
    /// `incoming` (the freshly attached page).
    ///
    /// Returns the id of the started transition, or `None` if it was aborted
    /// before any marker was applied.
    pub fn start<S>(
        &mut self,
        surface: &mut S,
        direction: Direction,
        outgoing_key: &str,
        outgoing: N,
        incoming_key: &str,
        incoming: N,
    ) -> Option<TransitionId>
    where
        S: Surface<Node = N>,
    {
        let id = self.ids.next_id();
        debug_assert!(
            !self.records.contains_key(&id),
            "transition id {id} reused while in flight"
        );

        let Some(parent) = surface.parent(incoming) else {
            return self.abort(id, AbortReason::NoParent);
        };

        let id_attr = self.markers.id_attribute.clone();
        surface.set_attribute(outgoing, &id_attr, id.as_str());
        let inserted = surface.insert_duplicate(parent, outgoing);
        // Only the duplicate keeps the id so the lookup below cannot land on
        // an original that the host left attached.
        surface.remove_attribute(outgoing, &id_attr);
        let Some(inserted) = inserted else {
            return self.abort(id, AbortReason::DuplicateRejected);
        };
        let Some(duplicate) = surface.query_attribute(parent, &id_attr, id.as_str()) else {
            surface.remove(inserted);
            return self.abort(id, AbortReason::DuplicateNotFound);
        };

        let root = surface.root();
        self.hold(surface, root);
        self.hold(surface, parent);

        // A page mounted by a still-running transition carries its incoming
        // markers; the duplicate must not inherit them.
        surface.remove_class(duplicate, &self.markers.incoming);
        surface.remove_class(duplicate, &self.markers.direction_class(true));
        surface.remove_class(duplicate, &self.markers.direction_class(false));

        let direction_class = self.markers.direction_class(direction.is_forward());
        surface.add_class(duplicate, &self.markers.outgoing);
        surface.add_class(duplicate, &direction_class);
        surface.add_class(incoming, &self.markers.incoming);
        surface.add_class(incoming, &direction_class);

        let seq = self.next_seq;
        self.next_seq += 1;
        self.records.insert(
            id.clone(),
            TransitionRecord {
                id: id.clone(),
                direction,
                outgoing: duplicate,
                incoming,
                root,
                parent,
                outgoing_completed: false,
                incoming_completed: false,
                elapsed_ms: 0.0,
                seq,
            },
        );

        debug!(%id, ?direction, outgoing_key, incoming_key, "transition started");
        self.events.push(TransitionEvent::Started {
            transition_id: id.clone(),
            direction,
            outgoing_key: outgoing_key.to_string(),
            incoming_key: incoming_key.to_string(),
        });
        Some(id)
    }

    fn abort(&mut self, id: TransitionId, reason: AbortReason) -> Option<TransitionId> {
        warn!(%id, ?reason, "transition aborted; page shown without animation");
        self.events.push(TransitionEvent::Aborted {
            transition_id: id,
            reason,
        });
        None
    }

    /// Feed a completion signal fired by `element`.
    ///
    /// Signals from elements outside every in-flight transition, and repeated
    /// signals from a side that already reported, are ignored. Returns the id
    /// of the transition the signal counted towards.
    pub fn complete<S>(&mut self, surface: &mut S, element: N) -> Option<TransitionId>
    where
        S: Surface<Node = N>,
    {
        let Some((id, side)) = self
            .records
            .values()
            .filter_map(|record| record.side_of(element).map(|side| (record, side)))
            .min_by_key(|(record, _)| record.seq)
            .map(|(record, side)| (record.id.clone(), side))
        else {
            trace!(?element, "completion signal outside any transition");
            return None;
        };

        let record = self.records.get_mut(&id)?;
        let join = record.join(side);
        if join == Join::Repeated {
            trace!(%id, ?side, "repeated completion signal ignored");
            return None;
        }

        if side == Side::Outgoing
            && surface
                .attribute(element, &self.markers.id_attribute)
                .is_some_and(|value| value == id.as_str())
        {
            surface.remove(element);
        }

        match join {
            Join::Half => {
                trace!(%id, ?side, "first completion signal");
                self.events.push(TransitionEvent::SideCompleted {
                    transition_id: id.clone(),
                    side,
                });
            }
            Join::Done => {
                if let Some(record) = self.records.remove(&id) {
                    self.release_markers(surface, &record);
                }
                debug!(%id, "transition completed");
                self.events.push(TransitionEvent::Completed {
                    transition_id: id.clone(),
                });
            }
            Join::Repeated => {}
        }
        Some(id)
    }

    /// Advance in-flight transitions by `delta_ms`. With a safety timeout
    /// configured, transitions that reach it are cleaned up as if both
    /// signals had arrived. Returns the ids that timed out.
    ///
    /// Deltas that are not finite and positive are ignored.
    pub fn tick<S>(&mut self, surface: &mut S, delta_ms: f64) -> Vec<TransitionId>
    where
        S: Surface<Node = N>,
    {
        if !(delta_ms.is_finite() && delta_ms > 0.0) {
            trace!(delta_ms, "tick ignored");
            return Vec::new();
        }
        for record in self.records.values_mut() {
            record.elapsed_ms += delta_ms;
        }
        let Some(timeout) = self.safety_timeout_ms else {
            return Vec::new();
        };

        let mut expired: Vec<_> = self
            .records
            .values()
            .filter(|record| record.elapsed_ms >= timeout)
            .map(|record| (record.seq, record.id.clone()))
            .collect();
        expired.sort();

        let mut timed_out = Vec::with_capacity(expired.len());
        for (_, id) in expired {
            let Some(record) = self.records.remove(&id) else {
                continue;
            };
            surface.remove(record.outgoing);
            self.release_markers(surface, &record);
            warn!(
                %id,
                received = record.received(),
                elapsed_ms = record.elapsed_ms,
                "transition timed out waiting for completion; forced cleanup"
            );
            self.events.push(TransitionEvent::TimedOut {
                transition_id: id.clone(),
                received: record.received(),
            });
            timed_out.push(id);
        }
        timed_out
    }

    fn release_markers<S>(&mut self, surface: &mut S, record: &TransitionRecord<N>)
    where
        S: Surface<Node = N>,
    {
        self.release(surface, record.root);
        self.release(surface, record.parent);
        let direction_class = self.markers.direction_class(record.direction.is_forward());
        surface.remove_class(record.incoming, &self.markers.incoming);
        surface.remove_class(record.incoming, &direction_class);
    }

    fn hold<S>(&mut self, surface: &mut S, node: N)
    where
        S: Surface<Node = N>,
    {
        let count = self.holds.entry(node).or_insert(0);
        if *count == 0 {
            surface.add_class(node, &self.markers.in_progress);
        }
        *count += 1;
    }

    fn release<S>(&mut self, surface: &mut S, node: N)
    where
        S: Surface<Node = N>,
    {
        let Some(count) = self.holds.get_mut(&node) else {
            return;
        };
        *count -= 1;
        if *count == 0 {
            self.holds.remove(&node);
            surface.remove_class(node, &self.markers.in_progress);
        }
    }

    pub fn record(&self, id: &TransitionId) -> Option<&TransitionRecord<N>> {
        self.records.get(id)
    }

    pub fn in_flight(&self) -> usize {
        self.records.len()
    }

    pub fn is_idle(&self) -> bool {
        self.records.is_empty()
    }

    pub fn events(&self) -> &EventQueue {
        &self.events
    }

    pub fn drain_events(&mut self) -> impl Iterator<Item = TransitionEvent> + '_ {
        self.events.drain()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use segue_dom::{Element, ElementTree, NodeId};

    struct Fixture {
        tree: ElementTree,
        outlet: NodeId,
        home: NodeId,
        settings: NodeId,
        driver: AnimationDriver<NodeId>,
    }

    /// `home` mounted then unmounted, `settings` mounted in the outlet.
    fn fixture() -> Fixture {
        let mut tree = ElementTree::new();
        let root = tree.root();
        let outlet = tree.append_element(root, Element::new("main")).unwrap();
        let home = tree
            .append_element(outlet, Element::new("section").with_attr("data-key", "home"))
            .unwrap();
        tree.detach(home).unwrap();
        let settings = tree
            .append_element(outlet, Element::new("section").with_attr("data-key", "settings"))
            .unwrap();
        let driver =
            AnimationDriver::with_ids(MarkerConfig::default(), IdGenerator::with_salt("t"));
        Fixture {
            tree,
            outlet,
            home,
            settings,
            driver,
        }
    }

    fn start(f: &mut Fixture, direction: Direction) -> TransitionId {
        f.driver
            .start(&mut f.tree, direction, "home", f.home, "settings", f.settings)
            .unwrap()
    }

    #[test]
    fn test_start_applies_markers() {
        let mut f = fixture();
        let id = start(&mut f, Direction::Forward);
        let record = f.driver.record(&id).unwrap().clone();

        let root = f.tree.root();
        assert!(f.tree.element(root).unwrap().has_class("anim-parent"));
        assert!(f.tree.element(f.outlet).unwrap().has_class("anim-parent"));

        let duplicate = f.tree.element(record.outgoing).unwrap();
        assert_eq!(duplicate.classes, vec!["anim-last-element", "anim-direction-next"]);
        assert_eq!(duplicate.attr("data-anim-id"), Some("anim-t-1"));
        assert_eq!(duplicate.attr("data-key"), Some("home"));

        let incoming = f.tree.element(f.settings).unwrap();
        assert_eq!(incoming.classes, vec!["anim-next-element", "anim-direction-next"]);

        // Original stays detached and unmarked.
        assert!(!f.tree.is_attached(f.home));
        assert_eq!(f.tree.element(f.home).unwrap().attr("data-anim-id"), None);
        assert_eq!(f.tree.child_elements(f.outlet), vec![f.settings, record.outgoing]);
    }

    #[test]
    fn test_backward_direction_class() {
        let mut f = fixture();
        start(&mut f, Direction::Backward);
        assert!(f.tree.element(f.settings).unwrap().has_class("anim-direction-prev"));
    }

    #[test]
    fn test_join_in_either_order() {
        for outgoing_first in [true, false] {
            let mut f = fixture();
            let id = start(&mut f, Direction::Forward);
            let duplicate = f.driver.record(&id).unwrap().outgoing;
            let order = if outgoing_first {
                [duplicate, f.settings]
            } else {
                [f.settings, duplicate]
            };

            assert_eq!(f.driver.complete(&mut f.tree, order[0]), Some(id.clone()));
            assert_eq!(f.driver.record(&id).unwrap().received(), 1);
            assert_eq!(f.driver.complete(&mut f.tree, order[1]), Some(id.clone()));

            assert!(f.driver.is_idle());
            assert!(!f.tree.is_attached(duplicate));
            assert_eq!(f.tree.child_elements(f.outlet), vec![f.settings]);
            assert!(f.tree.find_by_class("anim-parent").is_empty());
            assert!(f.tree.element(f.settings).unwrap().classes.is_empty());

            let completed = f
                .driver
                .drain_events()
                .filter(|e| matches!(e, TransitionEvent::Completed { .. }))
                .count();
            assert_eq!(completed, 1);
        }
    }

    #[test]
    fn test_repeated_signal_does_not_complete() {
        let mut f = fixture();
        let id = start(&mut f, Direction::Forward);

        assert!(f.driver.complete(&mut f.tree, f.settings).is_some());
        assert!(f.driver.complete(&mut f.tree, f.settings).is_none());
        assert_eq!(f.driver.record(&id).unwrap().received(), 1);
        assert!(!f.tree.find_by_class("anim-parent").is_empty());
    }

    #[test]
    fn test_single_outgoing_signal_leaves_shared_markers() {
        let mut f = fixture();
        let id = start(&mut f, Direction::Forward);
        let duplicate = f.driver.record(&id).unwrap().outgoing;

        f.driver.complete(&mut f.tree, duplicate);

        assert!(!f.tree.is_attached(duplicate));
        assert_eq!(f.tree.find_by_class("anim-parent").len(), 2);
        assert!(f.tree.element(f.settings).unwrap().has_class("anim-next-element"));
        assert_eq!(f.driver.in_flight(), 1);
    }

    #[test]
    fn test_unrelated_signal_is_ignored() {
        let mut f = fixture();
        start(&mut f, Direction::Forward);
        assert!(f.driver.complete(&mut f.tree, f.outlet).is_none());
        assert!(f.driver.complete(&mut f.tree, f.home).is_none());
    }

    #[test]
    fn test_no_parent_aborts_without_mutation() {
        let mut f = fixture();
        f.tree.detach(f.settings).unwrap();

        let started = f
            .driver
            .start(&mut f.tree, Direction::Forward, "home", f.home, "settings", f.settings);
        assert!(started.is_none());
        assert!(f.tree.find_by_class("anim-parent").is_empty());
        assert!(f.tree.child_elements(f.outlet).is_empty());
        assert!(matches!(
            f.driver.drain_events().next(),
            Some(TransitionEvent::Aborted {
                reason: AbortReason::NoParent,
                ..
            })
        ));
    }

    /// Tree whose lookups never find anything.
    struct Blind(ElementTree);

    impl Surface for Blind {
        type Node = NodeId;

        fn root(&self) -> NodeId {
            Surface::root(&self.0)
        }
        fn parent(&self, node: NodeId) -> Option<NodeId> {
            Surface::parent(&self.0, node)
        }
        fn is_attached(&self, node: NodeId) -> bool {
            Surface::is_attached(&self.0, node)
        }
        fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
            self.0.attribute(node, name)
        }
        fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
            self.0.set_attribute(node, name, value)
        }
        fn remove_attribute(&mut self, node: NodeId, name: &str) {
            self.0.remove_attribute(node, name)
        }
        fn has_class(&self, node: NodeId, class: &str) -> bool {
            Surface::has_class(&self.0, node, class)
        }
        fn add_class(&mut self, node: NodeId, class: &str) {
            Surface::add_class(&mut self.0, node, class)
        }
        fn remove_class(&mut self, node: NodeId, class: &str) {
            Surface::remove_class(&mut self.0, node, class)
        }
        fn insert_duplicate(&mut self, parent: NodeId, source: NodeId) -> Option<NodeId> {
            self.0.insert_duplicate(parent, source)
        }
        fn query_attribute(&self, _scope: NodeId, _name: &str, _value: &str) -> Option<NodeId> {
            None
        }
        fn detach(&mut self, node: NodeId) {
            Surface::detach(&mut self.0, node)
        }
        fn remove(&mut self, node: NodeId) {
            Surface::remove(&mut self.0, node)
        }
    }

    #[test]
    fn test_lost_duplicate_is_removed_on_abort() {
        let f = fixture();
        let nodes_before = f.tree.node_count();
        let mut driver = f.driver;
        let mut surface = Blind(f.tree);

        let started = driver.start(
            &mut surface,
            Direction::Forward,
            "home",
            f.home,
            "settings",
            f.settings,
        );
        assert!(started.is_none());

        let tree = &surface.0;
        assert_eq!(tree.child_elements(f.outlet), vec![f.settings]);
        assert_eq!(tree.node_count(), nodes_before);
        assert_eq!(tree.element(f.home).unwrap().attr("data-anim-id"), None);
        assert!(tree.find_by_class("anim-parent").is_empty());
        assert!(tree.element(f.settings).unwrap().classes.is_empty());
        assert!(matches!(
            driver.drain_events().next(),
            Some(TransitionEvent::Aborted {
                reason: AbortReason::DuplicateNotFound,
                ..
            })
        ));
    }

    #[test]
    fn test_rejected_duplicate_aborts_without_mutation() {
        let mut f = fixture();
        f.tree.remove(f.home).unwrap();

        let started = f.driver.start(
            &mut f.tree,
            Direction::Backward,
            "home",
            f.home,
            "settings",
            f.settings,
        );
        assert!(started.is_none());
        assert!(f.driver.is_idle());
        assert_eq!(f.tree.child_elements(f.outlet), vec![f.settings]);
        assert!(f.tree.find_by_class("anim-parent").is_empty());
        assert!(matches!(
            f.driver.drain_events().next(),
            Some(TransitionEvent::Aborted {
                reason: AbortReason::DuplicateRejected,
                ..
            })
        ));
    }

    #[test]
    fn test_finished_duplicate_is_freed() {
        let mut f = fixture();
        let nodes_before = f.tree.node_count();
        let id = start(&mut f, Direction::Forward);
        let duplicate = f.driver.record(&id).unwrap().outgoing;
        assert_eq!(f.tree.node_count(), nodes_before + 1);

        f.driver.complete(&mut f.tree, duplicate);
        assert!(f.tree.element(duplicate).is_none());
        assert_eq!(f.tree.node_count(), nodes_before);

        // A late repeat of the freed duplicate's signal still counts as repeated.
        assert!(f.driver.complete(&mut f.tree, duplicate).is_none());
        assert_eq!(f.driver.record(&id).unwrap().received(), 1);
    }

    #[test]
    fn test_overlapping_transitions_keep_shared_marker() {
        let mut f = fixture();
        let first = start(&mut f, Direction::Forward);

        let about = f
            .tree
            .append_element(f.outlet, Element::new("section").with_attr("data-key", "about"))
            .unwrap();
        let second = f
            .driver
            .start(&mut f.tree, Direction::Forward, "home", f.home, "about", about)
            .unwrap();
        assert_ne!(first, second);

        let first_dup = f.driver.record(&first).unwrap().outgoing;
        f.driver.complete(&mut f.tree, first_dup);
        f.driver.complete(&mut f.tree, f.settings);

        assert!(f.tree.element(f.outlet).unwrap().has_class("anim-parent"));
        assert!(f.tree.element(about).unwrap().has_class("anim-next-element"));

        let second_dup = f.driver.record(&second).unwrap().outgoing;
        f.driver.complete(&mut f.tree, second_dup);
        f.driver.complete(&mut f.tree, about);
        assert!(f.tree.find_by_class("anim-parent").is_empty());
        assert!(f.driver.is_idle());
    }

    #[test]
    fn test_safety_timeout_forces_cleanup() {
        let mut f = fixture();
        f.driver = AnimationDriver::with_ids(MarkerConfig::default(), IdGenerator::with_salt("t"))
            .with_safety_timeout(Some(500));
        let id = start(&mut f, Direction::Forward);
        let duplicate = f.driver.record(&id).unwrap().outgoing;
        f.driver.complete(&mut f.tree, f.settings);

        assert!(f.driver.tick(&mut f.tree, 300.0).is_empty());
        assert_eq!(f.driver.tick(&mut f.tree, 250.0), vec![id.clone()]);

        assert!(f.driver.is_idle());
        assert!(!f.tree.is_attached(duplicate));
        assert!(f.tree.find_by_class("anim-parent").is_empty());
        let last = f.driver.drain_events().last();
        assert_eq!(
            last,
            Some(TransitionEvent::TimedOut {
                transition_id: id,
                received: 1
            })
        );
    }

    #[test]
    fn test_tick_ignores_invalid_deltas() {
        let mut f = fixture();
        f.driver = AnimationDriver::with_ids(MarkerConfig::default(), IdGenerator::with_salt("t"))
            .with_safety_timeout(Some(500));
        let id = start(&mut f, Direction::Forward);

        for delta in [f64::NAN, f64::INFINITY, -1_000.0, 0.0] {
            assert!(f.driver.tick(&mut f.tree, delta).is_empty());
        }
        assert_eq!(f.driver.record(&id).unwrap().elapsed_ms, 0.0);

        assert_eq!(f.driver.tick(&mut f.tree, 500.0), vec![id]);
        assert!(f.driver.is_idle());
    }

    #[test]
    fn test_tick_without_timeout_keeps_records() {
        let mut f = fixture();
        let id = start(&mut f, Direction::Forward);
        assert!(f.driver.tick(&mut f.tree, 60_000.0).is_empty());
        assert_eq!(f.driver.record(&id).unwrap().elapsed_ms, 60_000.0);
    }
}
