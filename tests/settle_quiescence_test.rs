use icon_fallback::dom::{Document, NodeId};
use icon_fallback::fallback::PLACEHOLDER_SRC;
use icon_fallback::loader::{settle_document, SettleLimits, UrlSetOracle};

fn element_by_id(doc: &Document, id_attr: &str) -> NodeId {
  doc
    .elements()
    .find(|&id| doc.get_attribute(id, "id") == Some(id_attr))
    .expect("element by id")
}

#[test]
fn settles_on_second_alternate_when_only_it_loads() {
  let mut doc = Document::parse_html(
    r#"<img id="i" class="item-icon" src="/bad.jpg" data-alt1="/a.png" data-alt2="/b.png">"#,
  )
  .expect("parse html");
  let oracle: UrlSetOracle = ["/b.png"].into_iter().collect();

  let report = settle_document(&mut doc, &oracle, SettleLimits::default());

  let img = element_by_id(&doc, "i");
  assert_eq!(doc.get_attribute(img, "src"), Some("/b.png"));
  assert_eq!(doc.get_attribute(img, "data-step"), Some("2"));

  assert_eq!(report.hooked, 1);
  assert!(!report.limited);
  let outcome = &report.icons[0];
  assert_eq!(outcome.initial_src.as_deref(), Some("/bad.jpg"));
  assert_eq!(outcome.final_src, "/b.png");
  assert_eq!(outcome.failures, 2);
  assert!(!outcome.exhausted, "listener should still be attached");
}

#[test]
fn settles_on_placeholder_without_looping_when_nothing_loads() {
  let mut doc = Document::parse_html(
    r#"<img id="i" class="item-icon" src="/bad.jpg" data-alt1="/a.png" data-alt2="/b.png">"#,
  )
  .expect("parse html");
  let oracle = UrlSetOracle::new();

  let report = settle_document(&mut doc, &oracle, SettleLimits::default());

  let img = element_by_id(&doc, "i");
  assert_eq!(doc.get_attribute(img, "src"), Some(PLACEHOLDER_SRC));
  assert!(!report.limited, "pump must quiesce on its own");
  // src, alt1, alt2, placeholder: four probes, then silence even though the
  // placeholder itself does not load.
  assert_eq!(report.load_events, 4);
  let outcome = &report.icons[0];
  assert_eq!(outcome.final_src, PLACEHOLDER_SRC);
  assert_eq!(outcome.failures, 3);
  assert!(outcome.exhausted);
}

#[test]
fn loading_initial_source_needs_no_transitions() {
  let mut doc = Document::parse_html(
    r#"<img id="i" class="item-icon" src="/good.jpg" data-alt1="/a.png">"#,
  )
  .expect("parse html");
  let oracle: UrlSetOracle = ["/good.jpg"].into_iter().collect();

  let report = settle_document(&mut doc, &oracle, SettleLimits::default());

  let img = element_by_id(&doc, "i");
  assert_eq!(doc.get_attribute(img, "src"), Some("/good.jpg"));
  assert_eq!(doc.get_attribute(img, "data-step"), None);
  let outcome = &report.icons[0];
  assert_eq!(outcome.failures, 0);
  assert!(!outcome.exhausted);
}

#[test]
fn elements_settle_independently() {
  let mut doc = Document::parse_html(
    r#"
    <img id="a" class="item-icon" src="/good.jpg">
    <img id="b" class="gem-icon" src="/bad.jpg" data-alt1="/gem.png">
    <img id="c" class="item-icon" src="/bad.jpg">
    "#,
  )
  .expect("parse html");
  let oracle: UrlSetOracle = ["/good.jpg", "/gem.png"].into_iter().collect();

  let report = settle_document(&mut doc, &oracle, SettleLimits::default());
  assert_eq!(report.hooked, 3);

  assert_eq!(doc.get_attribute(element_by_id(&doc, "a"), "src"), Some("/good.jpg"));
  assert_eq!(doc.get_attribute(element_by_id(&doc, "b"), "src"), Some("/gem.png"));
  assert_eq!(
    doc.get_attribute(element_by_id(&doc, "c"), "src"),
    Some(PLACEHOLDER_SRC)
  );
}

#[test]
fn outcomes_are_reported_in_document_order() {
  let mut doc = Document::parse_html(
    r#"
    <img id="first" class="item-icon" src="/bad.jpg">
    <p>filler</p>
    <img id="second" class="gem-icon" src="/bad.jpg">
    "#,
  )
  .expect("parse html");
  let oracle = UrlSetOracle::new();

  let report = settle_document(&mut doc, &oracle, SettleLimits::default());
  let ids: Vec<NodeId> = report.icons.iter().map(|o| o.node).collect();
  assert_eq!(ids[0], element_by_id(&doc, "first"));
  assert_eq!(ids[1], element_by_id(&doc, "second"));
}

#[test]
fn planned_candidates_are_recorded() {
  let mut doc = Document::parse_html(
    r#"<img id="i" class="item-icon" src="/bad.jpg" data-alt1="/a.png" data-alt2="/b.png">"#,
  )
  .expect("parse html");
  let oracle = UrlSetOracle::new();

  let report = settle_document(&mut doc, &oracle, SettleLimits::default());
  assert_eq!(
    report.icons[0].candidates,
    vec![
      "/bad.jpg".to_string(),
      "/a.png".to_string(),
      "/b.png".to_string(),
      PLACEHOLDER_SRC.to_string()
    ]
  );
}

#[test]
fn event_budget_sets_the_limited_flag() {
  let mut doc = Document::parse_html(
    r#"
    <img id="a" class="item-icon" src="/bad.jpg" data-alt1="/a.png" data-alt2="/b.png">
    <img id="b" class="item-icon" src="/bad.jpg" data-alt1="/a.png" data-alt2="/b.png">
    "#,
  )
  .expect("parse html");
  let oracle = UrlSetOracle::new();

  let report = settle_document(&mut doc, &oracle, SettleLimits { max_load_events: 3 });
  assert!(report.limited);
  assert_eq!(report.load_events, 3);
}

#[test]
fn non_icon_images_are_untouched_by_settling() {
  let mut doc = Document::parse_html(
    r#"
    <img id="icon" class="item-icon" src="/bad.jpg">
    <img id="banner" src="/also-bad.jpg">
    "#,
  )
  .expect("parse html");
  let oracle = UrlSetOracle::new();

  let report = settle_document(&mut doc, &oracle, SettleLimits::default());
  assert_eq!(report.hooked, 1);
  assert_eq!(
    doc.get_attribute(element_by_id(&doc, "banner"), "src"),
    Some("/also-bad.jpg")
  );
}
