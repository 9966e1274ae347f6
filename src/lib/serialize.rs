//! Pretty rendering for documents that have no prior formatting.
//!
//! Existing files are written back through the tree's verbatim `Display`;
//! [`render`] only lays out fresh documents, using the configured [`Style`].

use crate::model::{
  POM_NAMESPACE, POM_SCHEMA_LOCATION, PROJECT_TAG, Project, XSI_NAMESPACE,
};
use crate::reconcile::{ReconcileError, Reconciler};
use crate::tree::{Document, Element, Node};

#[cfg(feature = "tracing")]
use tracing::debug;

const XML_DECLARATION: &str = "xml version=\"1.0\" encoding=\"UTF-8\"";

/// Layout of freshly written documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Style {
  /// Repeated once per nesting level.
  pub indent_unit: String,
  pub line_ending: String,
}

impl Default for Style {
  fn default() -> Self {
    Self {
      indent_unit: "  ".to_string(),
      line_ending: "\n".to_string(),
    }
  }
}

impl Style {
  pub fn new(indent_width: usize, line_ending: &str) -> Self {
    Self {
      indent_unit: " ".repeat(indent_width),
      line_ending: line_ending.to_string(),
    }
  }
}

/// Builds the tree of a brand-new document for `model`.
pub fn fresh_document(model: &Project, style: &Style) -> Result<Document, ReconcileError> {
  let mut root = Element::new(PROJECT_TAG)
    .with_attribute("xmlns", POM_NAMESPACE)
    .with_attribute("xmlns:xsi", XSI_NAMESPACE)
    .with_attribute("xsi:schemaLocation", POM_SCHEMA_LOCATION);
  root.self_closing = true;

  let mut document = Document::new(root);
  document
    .prolog
    .push(Node::Instruction(XML_DECLARATION.to_string()));

  Reconciler::new(style).reconcile(model, &mut document)?;
  Ok(document)
}

/// Renders `model` as a complete new document.
pub fn render_model(model: &Project, style: &Style) -> Result<String, ReconcileError> {
  Ok(render(&fresh_document(model, style)?, style))
}

/// Renders `document` with uniform indentation and line endings.
///
/// Elements holding only character data keep it verbatim. In elements with
/// child elements, whitespace-only text is discarded and re-created from
/// `style`, and other text is trimmed onto its own line.
pub fn render(document: &Document, style: &Style) -> String {
  let mut out = String::new();

  for node in document.prolog.iter().filter(|node| !node.is_whitespace()) {
    out.push_str(&node.to_string());
    out.push_str(&style.line_ending);
  }
  render_element(&document.root, 0, style, &mut out);
  out.push_str(&style.line_ending);
  for node in document.epilog.iter().filter(|node| !node.is_whitespace()) {
    out.push_str(&node.to_string());
    out.push_str(&style.line_ending);
  }

  #[cfg(feature = "tracing")]
  debug!("Rendered fresh document of {} bytes", out.len());

  out
}

fn render_element(element: &Element, depth: usize, style: &Style, out: &mut String) {
  let indent = style.indent_unit.repeat(depth);

  out.push('<');
  out.push_str(&element.name);
  for attribute in &element.attributes {
    out.push(' ');
    out.push_str(&attribute.name);
    out.push('=');
    out.push(attribute.quote);
    out.push_str(&attribute.value);
    out.push(attribute.quote);
  }

  if element.children.is_empty() {
    out.push_str("/>");
    return;
  }
  out.push('>');

  if element
    .children
    .iter()
    .all(|node| matches!(node, Node::Text(_) | Node::CData(_)))
  {
    for node in &element.children {
      out.push_str(&node.to_string());
    }
  } else {
    let child_indent = format!("{}{}", indent, style.indent_unit);
    for node in element.children.iter().filter(|node| !node.is_whitespace()) {
      out.push_str(&style.line_ending);
      out.push_str(&child_indent);
      match node {
        Node::Element(child) => render_element(child, depth + 1, style, out),
        other => out.push_str(&render_inline(other)),
      }
    }
    out.push_str(&style.line_ending);
    out.push_str(&indent);
  }

  out.push_str("</");
  out.push_str(&element.name);
  out.push('>');
}

fn render_inline(node: &Node) -> String {
  match node {
    Node::Text(text) => text.trim().to_string(),
    other => other.to_string(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::Dependency;
  use crate::parse::parse_document;
  use pretty_assertions::assert_eq;

  #[test]
  fn test_render_fresh_project() {
    let mut project = Project::new("org.example", "app", "1.0.0");
    project.properties.insert("z", "1");
    project.properties.insert("a", "2");
    project
      .dependencies
      .push(Dependency::new("org.example", "lib", Some("2.0")));

    let output = render_model(&project, &Style::default()).unwrap();

    let expected = r#"<?xml version="1.0" encoding="UTF-8"?>
<project xmlns="http://maven.apache.org/POM/4.0.0" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xsi:schemaLocation="http://maven.apache.org/POM/4.0.0 http://maven.apache.org/xsd/maven-4.0.0.xsd">
  <modelVersion>4.0.0</modelVersion>
  <groupId>org.example</groupId>
  <artifactId>app</artifactId>
  <version>1.0.0</version>
  <properties>
    <a>2</a>
    <z>1</z>
  </properties>
  <dependencies>
    <dependency>
      <groupId>org.example</groupId>
      <artifactId>lib</artifactId>
      <version>2.0</version>
    </dependency>
  </dependencies>
</project>
"#;
    assert_eq!(output, expected);
  }

  #[test]
  fn test_fresh_document_declares_namespaces() {
    let document = fresh_document(&Project::default(), &Style::default()).unwrap();

    assert_eq!(document.root.attribute("xmlns").as_deref(), Some(POM_NAMESPACE));
    assert_eq!(
      document.root.attribute("xsi:schemaLocation").as_deref(),
      Some(POM_SCHEMA_LOCATION)
    );
    assert!(document.root.self_closing);
  }

  #[test]
  fn test_render_empty_project() {
    let output = render_model(&Project::default(), &Style::new(4, "\r\n")).unwrap();
    assert!(output.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\r\n<project "));
    assert!(output.ends_with("/>\r\n"));
  }

  #[test]
  fn test_render_applies_style_uniformly() {
    let document = parse_document("<a>\n<b>  x </b>\n      <!--c-->\n  <d><e/></d></a>").unwrap();
    let style = Style::new(4, "\r\n");

    assert_eq!(
      render(&document, &style),
      "<a>\r\n    <b>  x </b>\r\n    <!--c-->\r\n    <d>\r\n        <e/>\r\n    </d>\r\n</a>\r\n"
    );
  }

  #[test]
  fn test_render_keeps_surrounding_whitespace_of_values() {
    let project = Project {
      name: Some(" padded ".to_string()),
      description: Some("  ".to_string()),
      ..Project::default()
    };

    let output = render_model(&project, &Style::default()).unwrap();

    assert!(output.contains("\n  <name> padded </name>\n"), "{}", output);
    assert!(output.contains("\n  <description>  </description>\n"), "{}", output);
  }

  #[test]
  fn test_render_is_deterministic() {
    let project = Project::new("g", "a", "1");
    let style = Style::default();
    assert_eq!(
      render_model(&project, &style).unwrap(),
      render_model(&project, &style).unwrap()
    );
  }
}
