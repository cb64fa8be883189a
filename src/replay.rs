//! Headless navigation replay.
//!
//! A [`Replay`] plays the part of a router: it owns an [`ElementTree`], swaps
//! one keyed page at a time inside an outlet element and reports every
//! lifecycle hook to an [`Animator`]. Both completion signals are delivered
//! immediately, so each step ends with the tree at rest, and the replaced
//! page is freed.

use segue_animator::{Animator, AnimatorConfig, Direction, SessionStore, TransitionEvent};
use segue_dom::{DomError, Element, ElementTree, NodeId};
use thiserror::Error;
use tracing::{debug, info};

/// Attribute carrying a page's key in replayed markup.
pub const PAGE_KEY_ATTRIBUTE: &str = "data-key";

#[derive(Error, Debug)]
pub enum ReplayError {
    #[error(transparent)]
    Dom(#[from] DomError),

    #[error("no element with id {0:?}")]
    MissingOutlet(String),

    #[error("outlet has no child element with a {PAGE_KEY_ATTRIBUTE} attribute")]
    MissingPage,
}

/// Outcome of one navigation.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub key: String,
    /// `None` when no transition started (first page, or an aborted start).
    pub direction: Option<Direction>,
    pub events: Vec<TransitionEvent>,
}

pub struct Replay<S> {
    tree: ElementTree,
    outlet: NodeId,
    current: NodeId,
    current_key: String,
    animator: Animator<S, NodeId>,
}

impl<S: SessionStore> Replay<S> {
    /// Parse `markup`, locate the outlet by `id` and mount its first keyed
    /// child as the session's first page.
    pub fn boot(
        markup: &str,
        outlet_id: &str,
        config: AnimatorConfig,
        store: S,
    ) -> Result<Self, ReplayError> {
        let tree = ElementTree::from_html(markup)?;
        Self::with_tree(tree, outlet_id, Animator::new(config, store))
    }

    pub fn with_tree(
        mut tree: ElementTree,
        outlet_id: &str,
        mut animator: Animator<S, NodeId>,
    ) -> Result<Self, ReplayError> {
        let outlet = tree
            .find_by_attribute(tree.root(), "id", outlet_id)
            .ok_or_else(|| ReplayError::MissingOutlet(outlet_id.to_string()))?;
        let (current, current_key) = tree
            .child_elements(outlet)
            .into_iter()
            .find_map(|id| {
                let key = tree.element(id)?.attr(PAGE_KEY_ATTRIBUTE)?;
                Some((id, key.to_string()))
            })
            .ok_or(ReplayError::MissingPage)?;

        animator.on_mount(&mut tree, Some(current_key.as_str()), current);
        info!(key = %current_key, namespace = animator.namespace(), "replay booted");
        Ok(Self {
            tree,
            outlet,
            current,
            current_key,
            animator,
        })
    }

    /// Replace the current page with a fresh one keyed `key` and run the
    /// resulting transition to completion.
    pub fn visit(&mut self, key: &str) -> Result<Step, ReplayError> {
        let previous = self.current;
        self.animator
            .on_unmount(Some(self.current_key.as_str()), previous);
        self.tree.detach(previous)?;

        let page = self.tree.append_element(
            self.outlet,
            Element::new("section").with_attr(PAGE_KEY_ATTRIBUTE, key),
        )?;
        self.tree.append_text(page, key)?;
        self.current = page;
        self.current_key = key.to_string();

        let mut direction = None;
        if let Some(id) = self.animator.on_mount(&mut self.tree, Some(key), page) {
            let duplicate = self.animator.transition(&id).map(|record| {
                direction = Some(record.direction);
                record.outgoing
            });
            if let Some(duplicate) = duplicate {
                self.animator.on_animation_end(&mut self.tree, duplicate);
            }
            self.animator.on_animation_end(&mut self.tree, page);
        }
        self.tree.remove(previous)?;

        let events: Vec<_> = self.animator.drain_events().collect();
        debug!(key, ?direction, events = events.len(), "visited");
        Ok(Step {
            key: key.to_string(),
            direction,
            events,
        })
    }

    pub fn current_key(&self) -> &str {
        &self.current_key
    }

    pub fn history(&self) -> Vec<String> {
        self.animator.history()
    }

    /// Markup of the whole document body.
    pub fn markup(&self) -> String {
        self.tree.outer_html(self.tree.root())
    }

    pub fn tree(&self) -> &ElementTree {
        &self.tree
    }

    pub fn animator(&self) -> &Animator<S, NodeId> {
        &self.animator
    }

    pub fn animator_mut(&mut self) -> &mut Animator<S, NodeId> {
        &mut self.animator
    }
}
