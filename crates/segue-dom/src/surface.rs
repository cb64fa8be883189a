//! The tree operations a transition needs from its host.

use std::fmt::Debug;
use std::hash::Hash;

use tracing::trace;

use crate::tree::ElementTree;
use crate::NodeId;

/// Host-side element tree as seen by the transition orchestrator.
///
/// Mutations on unknown handles are no-ops: a page torn down by the host
/// mid-transition must not take the orchestrator down with it.
pub trait Surface {
    /// Stable handle to an element. Handles stay valid after detach.
    type Node: Copy + Eq + Hash + Debug;

    /// Container that receives the in-progress marker (the document body).
    fn root(&self) -> Self::Node;

    fn parent(&self, node: Self::Node) -> Option<Self::Node>;

    fn is_attached(&self, node: Self::Node) -> bool;

    fn attribute(&self, node: Self::Node, name: &str) -> Option<String>;

    fn set_attribute(&mut self, node: Self::Node, name: &str, value: &str);

    fn remove_attribute(&mut self, node: Self::Node, name: &str);

    fn has_class(&self, node: Self::Node, class: &str) -> bool;

    fn add_class(&mut self, node: Self::Node, class: &str);

    fn remove_class(&mut self, node: Self::Node, class: &str);

    /// Insert a structural duplicate of `source` as the last child of
    /// `parent`. Returns the inserted node, or `None` when nothing was
    /// inserted.
    fn insert_duplicate(&mut self, parent: Self::Node, source: Self::Node) -> Option<Self::Node>;

    /// Find a live element under `scope` whose attribute `name` is `value`.
    fn query_attribute(&self, scope: Self::Node, name: &str, value: &str) -> Option<Self::Node>;

    /// Unlink `node` from its parent. The node stays addressable.
    fn detach(&mut self, node: Self::Node);

    /// Unlink `node` and release it with its subtree for good.
    fn remove(&mut self, node: Self::Node);
}

impl Surface for ElementTree {
    type Node = NodeId;

    fn root(&self) -> NodeId {
        ElementTree::root(self)
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        ElementTree::parent(self, node)
    }

    fn is_attached(&self, node: NodeId) -> bool {
        ElementTree::is_attached(self, node)
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.element(node)?.attr(name).map(str::to_string)
    }

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        if let Err(error) = self.with_element_mut(node, |el| el.set_attr(name, value)) {
            trace!(%error, name, "set_attribute skipped");
        }
    }

    fn remove_attribute(&mut self, node: NodeId, name: &str) {
        if let Err(error) = self.with_element_mut(node, |el| el.remove_attr(name)) {
            trace!(%error, name, "remove_attribute skipped");
        }
    }

    fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.element(node).is_some_and(|el| el.has_class(class))
    }

    fn add_class(&mut self, node: NodeId, class: &str) {
        if let Err(error) = self.with_element_mut(node, |el| el.add_class(class)) {
            trace!(%error, class, "add_class skipped");
        }
    }

    fn remove_class(&mut self, node: NodeId, class: &str) {
        if let Err(error) = self.with_element_mut(node, |el| el.remove_class(class)) {
            trace!(%error, class, "remove_class skipped");
        }
    }

    fn insert_duplicate(&mut self, parent: NodeId, source: NodeId) -> Option<NodeId> {
        self.append_duplicate(parent, source)
            .inspect_err(|error| trace!(%error, "insert_duplicate failed"))
            .ok()
    }

    fn query_attribute(&self, scope: NodeId, name: &str, value: &str) -> Option<NodeId> {
        self.find_by_attribute(scope, name, value)
    }

    fn detach(&mut self, node: NodeId) {
        if let Err(error) = ElementTree::detach(self, node) {
            trace!(%error, "detach skipped");
        }
    }

    fn remove(&mut self, node: NodeId) {
        match ElementTree::remove(self, node) {
            Ok(freed) => trace!(%node, freed, "node removed"),
            Err(error) => trace!(%error, "remove skipped"),
        }
    }
}
