//! Load simulation and static fallback resolution.
//!
//! The browser drives the fallback machine with real load failures. A static
//! pipeline has no network, so this module supplies the missing half: a
//! [`LoadOracle`] answers "does this URL load?", and [`settle_document`]
//! pumps simulated failure events through the controller until every hooked
//! icon either loads or exhausts its chain. The per-icon candidate list is
//! also exposed directly for cache-warming style tooling.

use crate::dom::{Document, NodeId};
use crate::events::ReadyState;
use crate::fallback::{FallbackController, ALT1_ATTR, ALT2_ATTR, PLACEHOLDER_SRC};
use crate::runtime::RuntimeToggles;
use serde::Serialize;
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use url::Url;

/// Decides whether a URL would load successfully.
pub trait LoadOracle {
  fn loads(&self, url: &str) -> bool;
}

/// Oracle backed by an explicit set of loadable URLs.
#[derive(Debug, Default, Clone)]
pub struct UrlSetOracle {
  available: HashSet<String>,
}

impl UrlSetOracle {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn insert(&mut self, url: impl Into<String>) {
    self.available.insert(url.into());
  }
}

impl<S: Into<String>> FromIterator<S> for UrlSetOracle {
  fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
    Self {
      available: iter.into_iter().map(Into::into).collect(),
    }
  }
}

impl LoadOracle for UrlSetOracle {
  fn loads(&self, url: &str) -> bool {
    self.available.contains(url)
  }
}

/// Oracle that maps site-absolute paths onto a web root on disk.
///
/// `/static/icons/foo.jpg` loads when `<web_root>/static/icons/foo.jpg`
/// exists. Remote (`http`/`https`) sources cannot be checked from disk and
/// are rejected unless `assume_remote` is set; `data:` URLs always load.
#[derive(Debug, Clone)]
pub struct DiskOracle {
  web_root: PathBuf,
  assume_remote: bool,
}

impl DiskOracle {
  pub fn new(web_root: impl Into<PathBuf>) -> Self {
    Self {
      web_root: web_root.into(),
      assume_remote: false,
    }
  }

  /// Treat remote URLs as loadable instead of failing them.
  pub fn with_assume_remote(mut self, assume_remote: bool) -> Self {
    self.assume_remote = assume_remote;
    self
  }
}

impl LoadOracle for DiskOracle {
  fn loads(&self, url: &str) -> bool {
    let trimmed = url.trim();
    if trimmed.is_empty() {
      return false;
    }
    if trimmed.starts_with("data:") {
      return true;
    }
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
      return self.assume_remote;
    }
    if trimmed.starts_with("file://") {
      return Url::parse(trimmed)
        .ok()
        .and_then(|u| u.to_file_path().ok())
        .map(|p| p.is_file())
        .unwrap_or(false);
    }

    // Site-absolute or relative path: strip query/fragment, join the root.
    let path = trimmed
      .split(['?', '#'])
      .next()
      .unwrap_or("")
      .trim_start_matches('/');
    if path.is_empty() {
      return false;
    }
    self.web_root.join(path).is_file()
  }
}

/// Resolve a source against an optional document base URL.
///
/// Falls back to the raw (trimmed) source when no base is set or resolution
/// fails, so oracles always receive something to judge.
pub fn resolve_src(base: Option<&str>, src: &str) -> String {
  let trimmed = src.trim();
  match base {
    Some(base) => {
      resolve_against_base(base, trimmed).unwrap_or_else(|| trimmed.to_string())
    }
    None => trimmed.to_string(),
  }
}

fn resolve_against_base(base: &str, reference: &str) -> Option<String> {
  // Normalize file:// bases that point to directories so Url::join keeps the
  // directory segment.
  let mut base_candidate = base.to_string();
  if base_candidate.starts_with("file://") {
    let path = &base_candidate["file://".len()..];
    if Path::new(path).is_dir() && !base_candidate.ends_with('/') {
      base_candidate.push('/');
    }
  }

  let base_url = Url::parse(&base_candidate)
    .or_else(|_| {
      Url::from_file_path(&base_candidate).map_err(|()| url::ParseError::RelativeUrlWithoutBase)
    })
    .ok()?;

  base_url.join(reference).ok().map(|u| u.to_string())
}

/// Priority-ordered candidate sources for one icon: current source, the two
/// alternates, then the placeholder. Empty entries are skipped and duplicates
/// are dropped (first occurrence wins).
pub fn icon_candidates(doc: &Document, id: NodeId) -> Vec<String> {
  let mut ordered = Vec::new();
  let mut seen: HashSet<String> = HashSet::new();

  let raw = [
    doc.get_attribute(id, "src"),
    doc.get_attribute(id, ALT1_ATTR),
    doc.get_attribute(id, ALT2_ATTR),
    Some(PLACEHOLDER_SRC),
  ];
  for candidate in raw.into_iter().flatten() {
    let trimmed = candidate.trim();
    if trimmed.is_empty() {
      continue;
    }
    if seen.insert(trimmed.to_string()) {
      ordered.push(trimmed.to_string());
    }
  }

  ordered
}

/// Hard limits for the settle event pump.
#[derive(Debug, Clone, Copy)]
pub struct SettleLimits {
  /// Maximum number of simulated load events across the whole document.
  pub max_load_events: usize,
}

impl Default for SettleLimits {
  fn default() -> Self {
    Self {
      max_load_events: 10_000,
    }
  }
}

impl SettleLimits {
  /// Apply `ICONFALL_SETTLE_MAX_EVENTS` on top of the defaults.
  pub fn from_toggles(toggles: &RuntimeToggles) -> Self {
    let defaults = Self::default();
    Self {
      max_load_events: toggles
        .usize_with_default("ICONFALL_SETTLE_MAX_EVENTS", defaults.max_load_events),
    }
  }
}

/// Final state of one icon after settling.
#[derive(Debug, Clone, Serialize)]
pub struct IconOutcome {
  /// Arena id of the element.
  pub node: NodeId,
  /// Source attribute before any simulated failure.
  pub initial_src: Option<String>,
  /// Planned candidate chain, computed before the pump ran.
  pub candidates: Vec<String>,
  /// Source the element converged on.
  pub final_src: String,
  /// Failure events consumed by this element's state machine.
  pub failures: u32,
  /// True once the terminal transition detached the listener.
  pub exhausted: bool,
}

/// Result of settling a whole document.
#[derive(Debug, Clone, Serialize)]
pub struct SettleReport {
  /// Per-icon outcomes in document order.
  pub icons: Vec<IconOutcome>,
  /// Elements that received a failure listener.
  pub hooked: usize,
  /// Simulated load events processed.
  pub load_events: usize,
  /// True when the pump stopped on `max_load_events` instead of quiescence.
  pub limited: bool,
}

/// Initialize a controller on the document and pump simulated loads to
/// quiescence.
///
/// Each hooked icon's current source is loaded through the oracle; every
/// rejected load dispatches one failure event, and each transition re-enqueues
/// the element so its rewritten source is attempted next. Failure events
/// arriving after the terminal transition are absorbed without mutation, so
/// the pump always quiesces: an element sees at most one event per chain
/// position plus one inert placeholder probe.
pub fn settle_document(
  doc: &mut Document,
  oracle: &dyn LoadOracle,
  limits: SettleLimits,
) -> SettleReport {
  let mut controller = FallbackController::new();
  controller.install(doc, ReadyState::Complete);

  let hooked: Vec<NodeId> = doc
    .elements()
    .filter(|&id| controller.is_subscribed(id))
    .collect();

  let mut initial: HashMap<NodeId, Option<String>> = HashMap::new();
  let mut candidates: HashMap<NodeId, Vec<String>> = HashMap::new();
  for &id in &hooked {
    initial.insert(id, doc.get_attribute(id, "src").map(str::to_string));
    candidates.insert(id, icon_candidates(doc, id));
  }

  let mut failures: HashMap<NodeId, u32> = HashMap::new();
  let mut queue: VecDeque<NodeId> = hooked.iter().copied().collect();
  let mut load_events = 0usize;
  let mut limited = false;

  while let Some(id) = queue.pop_front() {
    if load_events >= limits.max_load_events {
      limited = true;
      break;
    }
    load_events += 1;

    let src = doc.get_attribute(id, "src").map(str::to_string);
    let loadable = src
      .as_deref()
      .map(|s| !s.trim().is_empty() && oracle.loads(&resolve_src(doc.base_url(), s)))
      .unwrap_or(false);
    if loadable {
      continue;
    }

    if controller.handle_load_failure(doc, id).is_some() {
      *failures.entry(id).or_default() += 1;
      // Every transition rewrites the source, which restarts the load.
      queue.push_back(id);
    }
  }

  let icons = hooked
    .iter()
    .map(|&id| IconOutcome {
      node: id,
      initial_src: initial.remove(&id).flatten(),
      candidates: candidates.remove(&id).unwrap_or_default(),
      final_src: doc
        .get_attribute(id, "src")
        .unwrap_or_default()
        .to_string(),
      failures: failures.get(&id).copied().unwrap_or(0),
      exhausted: !controller.is_subscribed(id),
    })
    .collect();

  SettleReport {
    icons,
    hooked: hooked.len(),
    load_events,
    limited,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn first_img(doc: &Document) -> NodeId {
    doc
      .elements()
      .find(|&id| doc.node(id).tag_name() == Some("img"))
      .expect("img element")
  }

  #[test]
  fn icon_candidates_are_ordered_and_deduplicated() {
    let doc = Document::parse_html(
      r#"<img class="item-icon" src="/a.jpg" data-alt1="/b.jpg" data-alt2="/a.jpg">"#,
    )
    .expect("parse html");
    let img = first_img(&doc);
    assert_eq!(
      icon_candidates(&doc, img),
      vec![
        "/a.jpg".to_string(),
        "/b.jpg".to_string(),
        PLACEHOLDER_SRC.to_string()
      ]
    );
  }

  #[test]
  fn icon_candidates_skip_empty_entries() {
    let doc = Document::parse_html(r#"<img class="item-icon" src="" data-alt1="  ">"#)
      .expect("parse html");
    let img = first_img(&doc);
    assert_eq!(icon_candidates(&doc, img), vec![PLACEHOLDER_SRC.to_string()]);
  }

  #[test]
  fn resolve_src_joins_relative_references() {
    assert_eq!(
      resolve_src(Some("https://example.com/gear/page.html"), "icons/a.jpg"),
      "https://example.com/gear/icons/a.jpg"
    );
    assert_eq!(
      resolve_src(Some("https://example.com/gear/page.html"), "/static/a.jpg"),
      "https://example.com/static/a.jpg"
    );
  }

  #[test]
  fn resolve_src_without_base_returns_trimmed_input() {
    assert_eq!(resolve_src(None, " /a.jpg "), "/a.jpg");
  }

  #[test]
  fn url_set_oracle_matches_exactly() {
    let oracle: UrlSetOracle = ["/a.jpg"].into_iter().collect();
    assert!(oracle.loads("/a.jpg"));
    assert!(!oracle.loads("/b.jpg"));
  }

  #[test]
  fn disk_oracle_maps_site_absolute_paths() {
    let root = std::env::temp_dir().join(format!("iconfall-disk-oracle-{}", std::process::id()));
    let icons = root.join("static").join("icons");
    std::fs::create_dir_all(&icons).expect("create web root");
    std::fs::write(icons.join("ok.jpg"), b"jpg").expect("write icon");

    let oracle = DiskOracle::new(&root);
    assert!(oracle.loads("/static/icons/ok.jpg"));
    assert!(oracle.loads("/static/icons/ok.jpg?v=2"));
    assert!(!oracle.loads("/static/icons/missing.jpg"));
    assert!(!oracle.loads("https://example.com/remote.jpg"));
    assert!(oracle.loads("data:image/png;base64,AAAA"));

    let remote = DiskOracle::new(&root).with_assume_remote(true);
    assert!(remote.loads("https://example.com/remote.jpg"));

    std::fs::remove_dir_all(&root).ok();
  }
}
