//! Page transitions for single-page applications.
//!
//! The [`Animator`] is bound to a host view framework's lifecycle: call
//! [`Animator::on_unmount`] when a keyed page root is detached,
//! [`Animator::on_mount`] when the next one is attached, and
//! [`Animator::on_animation_end`] whenever a participating element reports
//! that its motion finished.
//!
//! # Architecture
//!
//! ```text
//! Animator
//!   ├── HistoryTracker     (namespaced back-stack in a SessionStore)
//!   ├── TransitionRecorder (last unmounted page, single slot)
//!   └── AnimationDriver    (in-flight TransitionRecords keyed by id)
//!         └── EventQueue   (Started / SideCompleted / Completed / TimedOut / Aborted)
//! ```
//!
//! Motion itself is delegated to stylesheet rules keyed on a small marker
//! vocabulary (see [`segue_config::MarkerConfig`]).

pub mod animator;
pub mod driver;
pub mod error;
pub mod events;
pub mod history;
pub mod recorder;
pub mod store;
pub mod types;

pub use animator::{Animator, AnimatorConfig};
pub use driver::{AnimationDriver, TransitionRecord};
pub use error::StoreError;
pub use events::{AbortReason, EventQueue, TransitionEvent};
pub use history::{HistoryTracker, Resolution};
pub use recorder::{PageNode, TransitionRecorder};
pub use store::{FileSessionStore, MemorySessionStore, SessionStore};
pub use types::{Direction, IdGenerator, Side, TransitionId};
