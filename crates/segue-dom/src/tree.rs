//! Arena-backed element tree.
//!
//! Nodes live in a slot arena with a free list. A detached subtree stays
//! addressable by its [`NodeId`] so a host can keep referring to an
//! unmounted page while it animates away; [`ElementTree::remove`] frees the
//! subtree and recycles its slots. Every slot carries a generation, so a
//! handle to a removed node never resolves to whatever reuses the slot.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::{DomError, Result};

/// Generational handle to a node in an [`ElementTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

/// A node in the tree: an element or a run of text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
}

impl Node {
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(element) => Some(element),
            Node::Text(_) => None,
        }
    }
}

/// An element with its attributes. Classes are kept apart from the other
/// attributes so marker classes can be toggled without reparsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub tag: String,
    pub attributes: BTreeMap<String, String>,
    pub classes: Vec<String>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attributes: BTreeMap::new(),
            classes: Vec::new(),
        }
    }

    pub fn with_class(mut self, class: &str) -> Self {
        self.add_class(class);
        self
    }

    pub fn with_attr(mut self, name: &str, value: &str) -> Self {
        self.set_attr(name, value);
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Set an attribute. `class` replaces the class list.
    pub fn set_attr(&mut self, name: &str, value: &str) {
        if name == "class" {
            self.classes.clear();
            for class in value.split_whitespace() {
                self.add_class(class);
            }
            return;
        }
        self.attributes.insert(name.to_string(), value.to_string());
    }

    pub fn remove_attr(&mut self, name: &str) {
        if name == "class" {
            self.classes.clear();
        } else {
            self.attributes.remove(name);
        }
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    /// Add a class if not already present. Returns whether it was added.
    pub fn add_class(&mut self, class: &str) -> bool {
        if class.is_empty() || self.has_class(class) {
            return false;
        }
        self.classes.push(class.to_string());
        true
    }

    /// Remove a class. Returns whether it was present.
    pub fn remove_class(&mut self, class: &str) -> bool {
        let before = self.classes.len();
        self.classes.retain(|c| c != class);
        before != self.classes.len()
    }
}

/// Owned copy of a subtree, used to graft a duplicate back into the arena.
#[derive(Debug, Clone)]
struct Snapshot {
    value: Node,
    children: Vec<Snapshot>,
}

#[derive(Debug, Clone)]
struct Entry {
    value: Node,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    entry: Option<Entry>,
}

/// In-memory element tree rooted at a container element (`body` by default).
#[derive(Debug, Clone)]
pub struct ElementTree {
    slots: Vec<Slot>,
    free_list: Vec<u32>,
    root: NodeId,
}

impl Default for ElementTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ElementTree {
    /// Create a tree whose root is an empty `body` element.
    pub fn new() -> Self {
        Self::rooted(Element::new("body"))
    }

    /// Create a tree with a custom root element.
    pub fn with_root(root: Element) -> Result<Self> {
        if root.tag.trim().is_empty() {
            return Err(DomError::InvalidTag(root.tag));
        }
        Ok(Self::rooted(root))
    }

    fn rooted(root: Element) -> Self {
        let mut tree = Self {
            slots: Vec::new(),
            free_list: Vec::new(),
            root: NodeId {
                index: 0,
                generation: 0,
            },
        };
        tree.root = tree.alloc(Node::Element(root), None);
        tree
    }

    fn alloc(&mut self, value: Node, parent: Option<NodeId>) -> NodeId {
        let entry = Some(Entry {
            value,
            parent,
            children: Vec::new(),
        });
        if let Some(index) = self.free_list.pop() {
            let slot = &mut self.slots[index as usize];
            slot.entry = entry;
            NodeId {
                index,
                generation: slot.generation,
            }
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                entry,
            });
            NodeId {
                index,
                generation: 0,
            }
        }
    }

    fn entry(&self, id: NodeId) -> Option<&Entry> {
        let slot = self.slots.get(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.entry.as_ref()
    }

    fn entry_mut(&mut self, id: NodeId) -> Option<&mut Entry> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.entry.as_mut()
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.entry(id).map(|entry| &entry.value)
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        self.node(id).and_then(Node::as_element)
    }

    /// Number of live nodes, attached or not.
    pub fn node_count(&self) -> usize {
        self.slots.len() - self.free_list.len()
    }

    /// Run `f` against a mutable element.
    pub fn with_element_mut<R>(
        &mut self,
        id: NodeId,
        f: impl FnOnce(&mut Element) -> R,
    ) -> Result<R> {
        let entry = self.entry_mut(id).ok_or(DomError::UnknownNode(id))?;
        match &mut entry.value {
            Node::Element(element) => Ok(f(element)),
            Node::Text(_) => Err(DomError::NotAnElement(id)),
        }
    }

    /// Append a new element as the last child of `parent`.
    pub fn append_element(&mut self, parent: NodeId, element: Element) -> Result<NodeId> {
        if element.tag.trim().is_empty() {
            return Err(DomError::InvalidTag(element.tag));
        }
        self.append_node(parent, Node::Element(element))
    }

    /// Append a text node as the last child of `parent`.
    pub fn append_text(&mut self, parent: NodeId, text: impl Into<String>) -> Result<NodeId> {
        self.append_node(parent, Node::Text(text.into()))
    }

    fn append_node(&mut self, parent: NodeId, value: Node) -> Result<NodeId> {
        match self.node(parent) {
            None => return Err(DomError::UnknownNode(parent)),
            Some(Node::Text(_)) => return Err(DomError::NotAnElement(parent)),
            Some(Node::Element(_)) => {}
        }
        let id = self.alloc(value, Some(parent));
        if let Some(entry) = self.entry_mut(parent) {
            entry.children.push(id);
        }
        Ok(id)
    }

    fn capture(&self, id: NodeId) -> Option<Snapshot> {
        let entry = self.entry(id)?;
        Some(Snapshot {
            value: entry.value.clone(),
            children: entry
                .children
                .iter()
                .filter_map(|&child| self.capture(child))
                .collect(),
        })
    }

    /// Append a structural duplicate of `source` (and its whole subtree) as
    /// the last child of `parent`. `source` may be detached.
    pub fn append_duplicate(&mut self, parent: NodeId, source: NodeId) -> Result<NodeId> {
        let snapshot = self.capture(source).ok_or(DomError::UnknownNode(source))?;
        self.graft(parent, &snapshot)
    }

    fn graft(&mut self, parent: NodeId, snapshot: &Snapshot) -> Result<NodeId> {
        let id = self.append_node(parent, snapshot.value.clone())?;
        for child in &snapshot.children {
            self.graft(id, child)?;
        }
        Ok(id)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.entry(id)?.parent
    }

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.entry(id)
            .map(|entry| entry.children.clone())
            .unwrap_or_default()
    }

    /// Element children only.
    pub fn child_elements(&self, id: NodeId) -> Vec<NodeId> {
        self.entry(id)
            .map(|entry| {
                entry
                    .children
                    .iter()
                    .copied()
                    .filter(|&child| self.element(child).is_some())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Whether `id` is reachable from the root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut current = id;
        loop {
            if current == self.root {
                return true;
            }
            match self.parent(current) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    /// Detach `id` from its parent. The subtree stays addressable.
    pub fn detach(&mut self, id: NodeId) -> Result<()> {
        if id == self.root {
            return Ok(());
        }
        let entry = self.entry_mut(id).ok_or(DomError::UnknownNode(id))?;
        let Some(parent) = entry.parent.take() else {
            return Ok(());
        };
        if let Some(parent) = self.entry_mut(parent) {
            parent.children.retain(|&child| child != id);
        }
        Ok(())
    }

    /// Detach `id` and free its whole subtree. Handles into the subtree stop
    /// resolving. Removing an already removed node is a no-op; the root is
    /// never removed.
    pub fn remove(&mut self, id: NodeId) -> Result<usize> {
        if id == self.root {
            return Ok(0);
        }
        if self.entry(id).is_none() {
            return Ok(0);
        }
        self.detach(id)?;

        let mut freed = 0;
        let mut pending = vec![id];
        while let Some(next) = pending.pop() {
            let slot = &mut self.slots[next.index as usize];
            if slot.generation != next.generation {
                continue;
            }
            let Some(entry) = slot.entry.take() else {
                continue;
            };
            slot.generation = slot.generation.wrapping_add(1);
            self.free_list.push(next.index);
            pending.extend(entry.children);
            freed += 1;
        }
        Ok(freed)
    }

    /// Nodes of the subtree rooted at `scope` (inclusive), in document order.
    pub fn descendants(&self, scope: NodeId) -> Descendants<'_> {
        let pending = if self.entry(scope).is_some() {
            vec![scope]
        } else {
            Vec::new()
        };
        Descendants {
            tree: self,
            pending,
        }
    }

    /// First element in the subtree of `scope` (inclusive) whose attribute
    /// `name` equals `value`.
    pub fn find_by_attribute(&self, scope: NodeId, name: &str, value: &str) -> Option<NodeId> {
        self.descendants(scope).find(|&id| {
            self.element(id)
                .is_some_and(|element| element.attr(name) == Some(value))
        })
    }

    /// Attached elements carrying `class`, in document order.
    pub fn find_by_class(&self, class: &str) -> Vec<NodeId> {
        self.descendants(self.root)
            .filter(|&id| self.element(id).is_some_and(|element| element.has_class(class)))
            .collect()
    }

    /// First attached element with the given tag, in document order.
    pub fn find_by_tag(&self, tag: &str) -> Option<NodeId> {
        self.descendants(self.root).find(|&id| {
            self.element(id)
                .is_some_and(|element| element.tag.eq_ignore_ascii_case(tag))
        })
    }
}

/// Pre-order walk over a subtree; see [`ElementTree::descendants`].
pub struct Descendants<'a> {
    tree: &'a ElementTree,
    pending: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.pending.pop()?;
        if let Some(entry) = self.tree.entry(id) {
            self.pending.extend(entry.children.iter().rev());
        }
        Some(id)
    }
}
