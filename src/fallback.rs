//! The icon fallback state machine.
//!
//! Every qualifying icon image cycles through up to two alternate URLs before
//! settling on a fixed placeholder. The per-element position in that chain is
//! the `data-step` attribute, written by the markup generator as "0" and
//! advanced forward-only here; it must live on the element (not in a local)
//! because setting a new source restarts the browser's load and a later
//! failure re-enters the same transition with no other state.
//!
//! The step is typed internally; the string attribute is parsed only at the
//! boundary and anything unparsable is treated as exhausted, matching the
//! fall-to-placeholder-on-uncertainty policy.

use crate::dom::{Document, Node, NodeId};
use crate::events::{ListenerSet, ReadyState};

/// Terminal asset shown once the alternates are exhausted. Never itself
/// subject to fallback: the listener is detached before it is assigned.
pub const PLACEHOLDER_SRC: &str = "/static/icons/inv_misc_questionmark.jpg";

/// Attribute carrying the per-element step counter.
pub const STEP_ATTR: &str = "data-step";
/// First alternate URL attribute.
pub const ALT1_ATTR: &str = "data-alt1";
/// Second alternate URL attribute.
pub const ALT2_ATTR: &str = "data-alt2";

/// Class markers selecting the images the controller manages.
pub const ICON_CLASSES: [&str; 2] = ["item-icon", "gem-icon"];

/// Position of an element in the fallback chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackStep {
  /// Not yet failed (attribute absent or "0").
  Initial,
  /// First alternate has been attempted ("1").
  TriedAlt1,
  /// Second alternate attempted, or any unparsable counter value ("2", junk).
  Exhausted,
}

impl FallbackStep {
  /// Parse the boundary attribute. Absent defaults to `Initial`; anything
  /// other than "0" or "1" exhausts the chain.
  pub fn from_attr(value: Option<&str>) -> Self {
    match value.map(str::trim) {
      None | Some("0") | Some("") => FallbackStep::Initial,
      Some("1") => FallbackStep::TriedAlt1,
      Some(_) => FallbackStep::Exhausted,
    }
  }

  /// Serialized form written back to the attribute.
  pub fn as_attr(self) -> &'static str {
    match self {
      FallbackStep::Initial => "0",
      FallbackStep::TriedAlt1 => "1",
      FallbackStep::Exhausted => "2",
    }
  }
}

/// What a single failure event did to an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
  /// Source rewritten to the first alternate.
  ToAlt1,
  /// Source rewritten to the second alternate.
  ToAlt2,
  /// Listener detached and source rewritten to the placeholder.
  Placeholder,
}

/// Counters describing what the controller has done so far.
#[derive(Debug, Default, Clone)]
pub struct FallbackDiagnostics {
  /// Elements that received a failure listener.
  pub hooked: usize,
  /// Transitions onto the first alternate.
  pub to_alt1: usize,
  /// Transitions onto the second alternate.
  pub to_alt2: usize,
  /// Terminal transitions onto the placeholder.
  pub exhausted: usize,
  /// Failure events delivered to elements with no active listener.
  pub ignored_events: usize,
}

/// True when an element matches `img.item-icon, img.gem-icon`.
pub fn is_icon_image(node: &Node) -> bool {
  let html_img = node
    .tag_name()
    .map(|tag| tag.eq_ignore_ascii_case("img"))
    .unwrap_or(false)
    && node
      .namespace()
      .map(|ns| ns.is_empty())
      .unwrap_or(false);
  html_img && ICON_CLASSES.iter().any(|class| node.has_class(class))
}

fn present_alt(doc: &Document, id: NodeId, attr: &str) -> Option<String> {
  doc
    .get_attribute(id, attr)
    .filter(|v| !v.trim().is_empty())
    .map(|v| v.to_string())
}

/// Attaches failure listeners to qualifying icons and advances each element's
/// fallback chain as failure events arrive.
#[derive(Debug, Default, Clone)]
pub struct FallbackController {
  listeners: ListenerSet,
  pending: bool,
  diagnostics: FallbackDiagnostics,
}

impl FallbackController {
  pub fn new() -> Self {
    Self::default()
  }

  /// Entry point mirroring the original readiness check: initialize now when
  /// the document structure is available, otherwise defer until
  /// [`document_loaded`](Self::document_loaded) fires.
  pub fn install(&mut self, doc: &Document, ready: ReadyState) {
    if ready.structure_available() {
      self.initialize(doc);
    } else {
      self.pending = true;
    }
  }

  /// Load-readiness signal; completes a deferred [`install`](Self::install).
  pub fn document_loaded(&mut self, doc: &Document) {
    if self.pending {
      self.pending = false;
      self.initialize(doc);
    }
  }

  /// Attach a failure listener to every qualifying icon in the document.
  ///
  /// Mutates no sources. Absence of matching elements is not an error.
  /// Already-hooked elements are skipped, so repeated initialization of the
  /// same document cannot attach duplicates.
  pub fn initialize(&mut self, doc: &Document) {
    for id in doc.elements() {
      if is_icon_image(doc.node(id)) && self.listeners.subscribe(id) {
        self.diagnostics.hooked += 1;
      }
    }
  }

  /// True while the element still participates in fallback handling.
  pub fn is_subscribed(&self, id: NodeId) -> bool {
    self.listeners.is_subscribed(id)
  }

  /// Number of elements with an active listener.
  pub fn subscribed_count(&self) -> usize {
    self.listeners.len()
  }

  /// Handle a load-failure event for one element.
  ///
  /// Returns `None` when the element has no active listener (either it never
  /// matched, or its terminal transition already detached it); the event is
  /// absorbed and nothing is mutated. A missing alternate at the current step
  /// is treated identically to an exhausted chain: the machine advances
  /// straight to the placeholder instead of attempting an empty source.
  pub fn handle_load_failure(&mut self, doc: &mut Document, id: NodeId) -> Option<Transition> {
    if !self.listeners.is_subscribed(id) {
      self.diagnostics.ignored_events += 1;
      return None;
    }

    let step = FallbackStep::from_attr(doc.get_attribute(id, STEP_ATTR));
    let transition = match step {
      FallbackStep::Initial => match present_alt(doc, id, ALT1_ATTR) {
        Some(alt1) => {
          doc.set_attribute(id, STEP_ATTR, FallbackStep::TriedAlt1.as_attr());
          doc.set_attribute(id, "src", &alt1);
          self.diagnostics.to_alt1 += 1;
          Transition::ToAlt1
        }
        None => self.settle(doc, id),
      },
      FallbackStep::TriedAlt1 => match present_alt(doc, id, ALT2_ATTR) {
        Some(alt2) => {
          doc.set_attribute(id, STEP_ATTR, FallbackStep::Exhausted.as_attr());
          doc.set_attribute(id, "src", &alt2);
          self.diagnostics.to_alt2 += 1;
          Transition::ToAlt2
        }
        None => self.settle(doc, id),
      },
      FallbackStep::Exhausted => self.settle(doc, id),
    };

    Some(transition)
  }

  /// Terminal transition: detach the listener, then assign the placeholder.
  /// Detaching first guarantees a failing placeholder load cannot recurse.
  /// `data-step` is left as-is; the element is inert from here on.
  fn settle(&mut self, doc: &mut Document, id: NodeId) -> Transition {
    self.listeners.unsubscribe(id);
    doc.set_attribute(id, "src", PLACEHOLDER_SRC);
    self.diagnostics.exhausted += 1;
    Transition::Placeholder
  }

  pub fn diagnostics(&self) -> &FallbackDiagnostics {
    &self.diagnostics
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn step_parses_absent_and_zero_as_initial() {
    assert_eq!(FallbackStep::from_attr(None), FallbackStep::Initial);
    assert_eq!(FallbackStep::from_attr(Some("0")), FallbackStep::Initial);
    assert_eq!(FallbackStep::from_attr(Some(" 0 ")), FallbackStep::Initial);
    assert_eq!(FallbackStep::from_attr(Some("")), FallbackStep::Initial);
  }

  #[test]
  fn step_parses_one_as_tried_alt1() {
    assert_eq!(FallbackStep::from_attr(Some("1")), FallbackStep::TriedAlt1);
  }

  #[test]
  fn step_treats_anything_else_as_exhausted() {
    assert_eq!(FallbackStep::from_attr(Some("2")), FallbackStep::Exhausted);
    assert_eq!(FallbackStep::from_attr(Some("7")), FallbackStep::Exhausted);
    assert_eq!(FallbackStep::from_attr(Some("-1")), FallbackStep::Exhausted);
    assert_eq!(FallbackStep::from_attr(Some("abc")), FallbackStep::Exhausted);
  }

  #[test]
  fn step_round_trips_through_attr_form() {
    for step in [
      FallbackStep::Initial,
      FallbackStep::TriedAlt1,
      FallbackStep::Exhausted,
    ] {
      assert_eq!(FallbackStep::from_attr(Some(step.as_attr())), step);
    }
  }

  #[test]
  fn icon_selector_requires_img_tag_and_marker_class() {
    let doc = Document::parse_html(
      r#"
      <img id="a" class="item-icon" src="x">
      <img id="b" class="gem-icon" src="x">
      <img id="c" class="portrait" src="x">
      <div id="d" class="item-icon"></div>
      <img id="e" src="x">
      "#,
    )
    .expect("parse html");

    let matched: Vec<&str> = doc
      .elements()
      .filter(|&id| is_icon_image(doc.node(id)))
      .filter_map(|id| doc.get_attribute(id, "id"))
      .collect();
    assert_eq!(matched, vec!["a", "b"]);
  }

  #[test]
  fn svg_namespaced_image_is_not_selected() {
    let doc = Document::parse_html(r#"<svg><image class="item-icon" href="x"/></svg>"#)
      .expect("parse html");
    assert!(doc
      .elements()
      .all(|id| !is_icon_image(doc.node(id))));
  }
}
