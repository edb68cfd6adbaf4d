//! Listener lifetime and document readiness.
//!
//! The browser original attaches an `error` listener per icon and clears it
//! with `onerror = null` on the terminal transition. Here that lifetime is an
//! explicit subscribe/unsubscribe on a [`ListenerSet`]; unsubscription on the
//! terminal transition is a functional requirement (it is what keeps the
//! placeholder from re-entering the machine), not an optimization.

use crate::dom::NodeId;
use crate::error::ParseError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::str::FromStr;

/// Document readiness at the time the controller is installed.
///
/// Mirrors `document.readyState`: while `Loading`, structural content may not
/// be available yet and initialization must be deferred to the load signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadyState {
  Loading,
  Interactive,
  Complete,
}

impl ReadyState {
  /// True when the document's structural content is already available.
  pub fn structure_available(self) -> bool {
    !matches!(self, ReadyState::Loading)
  }
}

impl FromStr for ReadyState {
  type Err = ParseError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "loading" => Ok(ReadyState::Loading),
      "interactive" => Ok(ReadyState::Interactive),
      "complete" => Ok(ReadyState::Complete),
      other => Err(ParseError::InvalidReadyState {
        value: other.to_string(),
      }),
    }
  }
}

/// Set of nodes with an active failure listener.
#[derive(Debug, Clone, Default)]
pub struct ListenerSet {
  active: HashSet<NodeId>,
}

impl ListenerSet {
  pub fn new() -> Self {
    Self::default()
  }

  /// Subscribe a node. Returns false when it was already subscribed, which
  /// doubles as the per-element one-time guard for repeated initialization.
  pub fn subscribe(&mut self, id: NodeId) -> bool {
    self.active.insert(id)
  }

  /// Permanently detach a node's listener. Returns false when it was not
  /// subscribed.
  pub fn unsubscribe(&mut self, id: NodeId) -> bool {
    self.active.remove(&id)
  }

  pub fn is_subscribed(&self, id: NodeId) -> bool {
    self.active.contains(&id)
  }

  pub fn len(&self) -> usize {
    self.active.len()
  }

  pub fn is_empty(&self) -> bool {
    self.active.is_empty()
  }
}
