//! Core transition types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Navigation direction inferred from the history stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// A page not on the back-stack.
    Forward,
    /// A return to a page already on the back-stack.
    Backward,
}

impl Direction {
    pub fn is_forward(self) -> bool {
        matches!(self, Self::Forward)
    }
}

/// Which participant of a transition reported completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    /// The duplicate of the page being left.
    Outgoing,
    /// The page being entered.
    Incoming,
}

/// Unique identifier of one transition, also written to the id attribute
/// of the outgoing duplicate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransitionId(String);

impl TransitionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TransitionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

const SALT_ALPHABET: [char; 36] = [
    'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i', 'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r',
    's', 't', 'u', 'v', 'w', 'x', 'y', 'z', '0', '1', '2', '3', '4', '5', '6', '7', '8', '9',
];

/// Generates transition ids of the form `anim-<salt>-<n>`.
///
/// The counter makes ids unique within one generator; the random salt keeps
/// two orchestrators sharing a document from colliding.
#[derive(Debug, Clone)]
pub struct IdGenerator {
    salt: String,
    next: u64,
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::with_salt(nanoid::nanoid!(6, &SALT_ALPHABET))
    }

    /// Deterministic ids, for tests and replays.
    pub fn with_salt(salt: impl Into<String>) -> Self {
        Self {
            salt: salt.into(),
            next: 1,
        }
    }

    pub fn next_id(&mut self) -> TransitionId {
        let id = TransitionId(format!("anim-{}-{}", self.salt, self.next));
        self.next += 1;
        id
    }
}
