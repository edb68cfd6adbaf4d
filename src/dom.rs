//! Minimal static DOM for icon fallback resolution.
//!
//! HTML is parsed with html5ever (scripting disabled) and converted into an
//! id-addressable arena. The arena keeps nodes in document order, so a plain
//! index walk visits elements exactly as a `querySelectorAll` over the whole
//! document would. Only element attributes are ever mutated; the tree shape
//! is fixed after parsing.

use crate::error::{Error, ParseError, Result};
use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use html5ever::tree_builder::TreeBuilderOpts;
use html5ever::ParseOpts;
use markup5ever_rcdom::{Handle, NodeData as RcNodeData, RcDom};
use serde::Serialize;

pub const HTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

/// Stable identity of a node within its [`Document`].
///
/// Ids are assigned in document order during parsing and never reused, which
/// makes them suitable keys for listener registries and per-element reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(pub usize);

#[derive(Debug, Clone)]
pub enum NodeData {
  Document,
  Element {
    tag_name: String,
    namespace: String,
    attributes: Vec<(String, String)>,
  },
  Text {
    content: String,
  },
}

#[derive(Debug, Clone)]
pub struct Node {
  pub id: NodeId,
  pub parent: Option<NodeId>,
  pub children: Vec<NodeId>,
  pub data: NodeData,
}

impl Node {
  pub fn is_element(&self) -> bool {
    matches!(self.data, NodeData::Element { .. })
  }

  pub fn tag_name(&self) -> Option<&str> {
    match &self.data {
      NodeData::Element { tag_name, .. } => Some(tag_name),
      _ => None,
    }
  }

  pub fn namespace(&self) -> Option<&str> {
    match &self.data {
      NodeData::Element { namespace, .. } => Some(namespace),
      _ => None,
    }
  }

  pub fn text_content(&self) -> Option<&str> {
    match &self.data {
      NodeData::Text { content } => Some(content),
      _ => None,
    }
  }

  /// Attribute lookup by case-insensitive name.
  pub fn get_attribute_ref(&self, name: &str) -> Option<&str> {
    match &self.data {
      NodeData::Element { attributes, .. } => attributes
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str()),
      _ => None,
    }
  }

  pub fn get_attribute(&self, name: &str) -> Option<String> {
    self.get_attribute_ref(name).map(|v| v.to_string())
  }

  pub fn attributes_iter(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
    let attrs: &[(String, String)] = match &self.data {
      NodeData::Element { attributes, .. } => attributes,
      _ => &[],
    };
    attrs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
  }

  /// Check if this element has a specific class (exact, case-sensitive match).
  pub fn has_class(&self, class: &str) -> bool {
    if let Some(class_attr) = self.get_attribute_ref("class") {
      class_attr.split_ascii_whitespace().any(|c| c == class)
    } else {
      false
    }
  }

  fn set_attribute(&mut self, name: &str, value: &str) {
    if let NodeData::Element { attributes, .. } = &mut self.data {
      if let Some((_, v)) = attributes
        .iter_mut()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
      {
        *v = value.to_string();
      } else {
        attributes.push((name.to_string(), value.to_string()));
      }
    }
  }
}

/// A parsed HTML document as a node arena.
#[derive(Debug, Clone, Default)]
pub struct Document {
  nodes: Vec<Node>,
  base_url: Option<String>,
}

impl Document {
  /// Parse an HTML string into a document.
  ///
  /// Scripting is disabled in the tree builder, and template contents are
  /// left inert (never entered), matching how a non-executing renderer sees
  /// the page.
  pub fn parse_html(html: &str) -> Result<Document> {
    let opts = ParseOpts {
      tree_builder: TreeBuilderOpts {
        scripting_enabled: false,
        ..Default::default()
      },
      ..Default::default()
    };

    let mut bytes = html.as_bytes();
    let dom = parse_document(RcDom::default(), opts)
      .from_utf8()
      .read_from(&mut bytes)
      .map_err(|e| {
        Error::Parse(ParseError::InvalidHtml {
          message: format!("Failed to parse HTML: {}", e),
        })
      })?;

    let mut doc = Document::default();
    doc.convert_handle(&dom.document, None);
    Ok(doc)
  }

  fn convert_handle(&mut self, handle: &Handle, parent: Option<NodeId>) {
    let data = match &handle.data {
      RcNodeData::Document => NodeData::Document,
      RcNodeData::Element { name, attrs, .. } => {
        let namespace = if name.ns.as_ref() == HTML_NAMESPACE {
          String::new()
        } else {
          name.ns.to_string()
        };
        let attrs_ref = attrs.borrow();
        let mut attributes = Vec::with_capacity(attrs_ref.len());
        for attr in attrs_ref.iter() {
          attributes.push((attr.name.local.to_string(), attr.value.to_string()));
        }
        NodeData::Element {
          tag_name: name.local.to_string(),
          namespace,
          attributes,
        }
      }
      RcNodeData::Text { contents } => NodeData::Text {
        content: contents.borrow().to_string(),
      },
      // Doctype, comments, and processing instructions carry nothing the
      // fallback machinery can observe.
      _ => return,
    };

    let id = NodeId(self.nodes.len());
    self.nodes.push(Node {
      id,
      parent,
      children: Vec::new(),
      data,
    });
    if let Some(parent) = parent {
      self.nodes[parent.0].children.push(id);
    }

    // Template contents live in rcdom's `template_contents`, not in
    // `children`, so inert template subtrees are skipped here naturally.
    for child in handle.children.borrow().iter() {
      self.convert_handle(child, Some(id));
    }
  }

  /// The document root node (always present after a successful parse).
  pub fn root(&self) -> NodeId {
    NodeId(0)
  }

  pub fn len(&self) -> usize {
    self.nodes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.nodes.is_empty()
  }

  pub fn node(&self, id: NodeId) -> &Node {
    &self.nodes[id.0]
  }

  /// All node ids in document order.
  pub fn descendants(&self) -> impl Iterator<Item = NodeId> + '_ {
    (0..self.nodes.len()).map(NodeId)
  }

  /// All element node ids in document order.
  pub fn elements(&self) -> impl Iterator<Item = NodeId> + '_ {
    self
      .nodes
      .iter()
      .filter(|n| n.is_element())
      .map(|n| n.id)
  }

  pub fn get_attribute(&self, id: NodeId, name: &str) -> Option<&str> {
    self.node(id).get_attribute_ref(name)
  }

  pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) {
    self.nodes[id.0].set_attribute(name, value);
  }

  pub fn has_class(&self, id: NodeId, class: &str) -> bool {
    self.node(id).has_class(class)
  }

  /// Base URL used to resolve relative sources, when known.
  pub fn base_url(&self) -> Option<&str> {
    self.base_url.as_deref()
  }

  pub fn set_base_url(&mut self, base_url: Option<String>) {
    self.base_url = base_url;
  }
}
