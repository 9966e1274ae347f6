//! Synchronizes a [`Document`] with the values of a [`Project`] model.
//!
//! The model and the tree are walked together, field by field, in the
//! model's canonical order:
//!
//! 1. Scalars update the text of their existing element, are removed with the
//!    whitespace run in front of them when the model value is gone, and are
//!    created at their canonical position when new.
//! 2. Nested records recurse into their element, creating it first if needed.
//! 3. Lists are aligned by position: shared indices recurse, extra model
//!    items are appended after the last existing item and surplus elements
//!    are removed.
//! 4. Property maps are re-emitted in ascending key order, carrying each
//!    existing property's leading whitespace and comments along.
//!
//! Untouched nodes keep their exact formatting. New nodes copy the
//! indentation of their siblings.

use std::collections::BTreeMap;

use crate::model::{Field, FieldValue, PROJECT_TAG, Project, Record};
use crate::ordered::OrderedKeyMap;
use crate::serialize::Style;
use crate::tree::{Document, Element, Node};

#[cfg(feature = "tracing")]
use tracing::{debug, trace};

/// Reconciles `document` against `model` using indentation detected from the
/// document itself.
pub fn reconcile<'d>(
  model: &Project,
  document: &'d mut Document,
) -> Result<&'d mut Document, ReconcileError> {
  Reconciler::detect(document, &Style::default()).reconcile(model, document)
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ReconcileError {
  #[error("Document root is <{found}>, expected <{expected}>")]
  UnexpectedRoot {
    expected: &'static str,
    found: String,
  },
  #[error("Element {path} must only contain text")]
  UnexpectedShape { path: String },
  #[error("Element <{tag}> occurs more than once in {path}")]
  AmbiguousElement { path: String, tag: String },
}

/// Formatting used for nodes the reconciler creates.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciler {
  indent_unit: String,
  line_ending: String,
}

impl Reconciler {
  pub fn new(style: &Style) -> Self {
    Self {
      indent_unit: style.indent_unit.clone(),
      line_ending: style.line_ending.clone(),
    }
  }

  /// Picks up the line ending and indent unit already used by `document`,
  /// falling back to `fallback` for whatever it does not show.
  pub fn detect(document: &Document, fallback: &Style) -> Self {
    let text = document.to_string();
    let line_ending = if text.contains("\r\n") {
      "\r\n".to_string()
    } else if text.contains('\n') {
      "\n".to_string()
    } else {
      fallback.line_ending.clone()
    };

    let indent_unit = observed_indent(&document.root)
      .filter(|indent| !indent.is_empty())
      .unwrap_or_else(|| fallback.indent_unit.clone());

    #[cfg(feature = "tracing")]
    debug!(?indent_unit, ?line_ending, "Detected document layout");

    Self {
      indent_unit,
      line_ending,
    }
  }

  /// Applies the model to the tree.
  ///
  /// On error the document is left exactly as it was.
  pub fn reconcile<'d>(
    &self,
    model: &Project,
    document: &'d mut Document,
  ) -> Result<&'d mut Document, ReconcileError> {
    if document.root.name != PROJECT_TAG {
      return Err(ReconcileError::UnexpectedRoot {
        expected: PROJECT_TAG,
        found: document.root.name.clone(),
      });
    }

    let mut root = document.root.clone();
    self.record(&mut root, "", &model.fields(), PROJECT_TAG)?;
    document.root = root;

    Ok(document)
  }

  fn record(
    &self,
    element: &mut Element,
    indent: &str,
    fields: &[Field<'_>],
    path: &str,
  ) -> Result<(), ReconcileError> {
    for field in fields {
      if element.positions_of(field.tag).len() > 1 {
        return Err(ReconcileError::AmbiguousElement {
          path: path.to_string(),
          tag: field.tag.to_string(),
        });
      }
    }

    for (index, field) in fields.iter().enumerate() {
      let field_path = format!("{}/{}", path, field.tag);
      match element.position_of(field.tag) {
        Some(position) => self.update(element, position, indent, &field.value, &field_path)?,
        None if !field.value.is_empty() => {
          #[cfg(feature = "tracing")]
          trace!("Creating {}", field_path);

          let child_indent = self.child_indent(element, indent);
          let created = self.create(field.tag, &child_indent, &field.value, &field_path)?;
          self.insert_field(element, indent, &child_indent, fields, index, created);
        }
        None => {}
      }
    }

    Ok(())
  }

  /// Brings the existing child at `position` in line with `value`.
  fn update(
    &self,
    element: &mut Element,
    position: usize,
    indent: &str,
    value: &FieldValue<'_>,
    path: &str,
  ) -> Result<(), ReconcileError> {
    let child_indent = self.indent_at(element, position, indent);
    let Some(child) = element.children.get_mut(position).and_then(Node::as_element_mut) else {
      return Ok(());
    };

    match value {
      FieldValue::Text(None) | FieldValue::Record(None) => {
        #[cfg(feature = "tracing")]
        trace!("Removing {}", path);

        remove_child(element, position);
      }
      FieldValue::Text(Some(text)) => update_text(child, text, path)?,
      FieldValue::Record(Some(fields)) => self.record(child, &child_indent, fields, path)?,
      FieldValue::List { item, items } => {
        if items.is_empty() {
          if child.position_of(item).is_some() {
            remove_child(element, position);
          }
        } else {
          self.list(child, &child_indent, item, items, path)?;
        }
      }
      FieldValue::Properties(map) => {
        if map.is_empty() {
          if child.has_child_elements() {
            remove_child(element, position);
          }
        } else {
          self.properties(child, &child_indent, map, path)?;
        }
      }
    }

    Ok(())
  }

  /// Builds a new element for `value`, laid out for `indent`.
  fn create(
    &self,
    tag: &str,
    indent: &str,
    value: &FieldValue<'_>,
    path: &str,
  ) -> Result<Element, ReconcileError> {
    let element = match value {
      FieldValue::Text(text) => Element::with_text(tag, text.unwrap_or_default()),
      FieldValue::Record(fields) => {
        let mut element = Element::new(tag);
        if let Some(fields) = fields {
          self.record(&mut element, indent, fields, path)?;
        }
        element
      }
      FieldValue::List { item, items } => {
        let mut element = Element::new(tag);
        self.list(&mut element, indent, item, items, path)?;
        element
      }
      FieldValue::Properties(map) => {
        let mut element = Element::new(tag);
        self.properties(&mut element, indent, map, path)?;
        element
      }
    };
    Ok(element)
  }

  /// Inserts `created` after the closest preceding field that exists, or
  /// before the closest following one, or at the end.
  fn insert_field(
    &self,
    element: &mut Element,
    indent: &str,
    child_indent: &str,
    fields: &[Field<'_>],
    index: usize,
    created: Element,
  ) {
    let separator = format!("{}{}", self.line_ending, child_indent);

    let preceding = fields[..index]
      .iter()
      .rev()
      .find_map(|field| element.position_of(field.tag));
    if let Some(position) = preceding {
      element.children.insert(position + 1, Node::Element(created));
      element.children.insert(position + 1, Node::Text(separator));
      return;
    }

    let following = fields[index + 1..]
      .iter()
      .find_map(|field| element.position_of(field.tag));
    if let Some(position) = following {
      element.children.insert(position, Node::Text(separator));
      element.children.insert(position, Node::Element(created));
      return;
    }

    self.append(element, indent, child_indent, Node::Element(created));
  }

  fn append(&self, element: &mut Element, indent: &str, child_indent: &str, node: Node) {
    element.self_closing = false;
    let separator = Node::Text(format!("{}{}", self.line_ending, child_indent));

    if let Some(last) = element.children.last()
      && is_line_break(last)
    {
      let at = element.children.len() - 1;
      element.children.insert(at, node);
      element.children.insert(at, separator);
    } else {
      element.children.push(separator);
      element.children.push(node);
      element
        .children
        .push(Node::Text(format!("{}{}", self.line_ending, indent)));
    }
  }

  fn list(
    &self,
    container: &mut Element,
    indent: &str,
    item: &str,
    items: &[FieldValue<'_>],
    path: &str,
  ) -> Result<(), ReconcileError> {
    let positions = container.positions_of(item);

    for (index, (&position, value)) in positions.iter().zip(items).enumerate() {
      let item_path = format!("{}/{}[{}]", path, item, index);
      let item_indent = self.indent_at(container, position, indent);
      let Some(child) = container.children.get_mut(position).and_then(Node::as_element_mut) else {
        continue;
      };
      match value {
        FieldValue::Text(text) => update_text(child, text.unwrap_or_default(), &item_path)?,
        FieldValue::Record(Some(fields)) => self.record(child, &item_indent, fields, &item_path)?,
        _ => {}
      }
    }

    if items.len() > positions.len() {
      let (item_indent, separator) = match positions.last() {
        Some(&last) => {
          let item_indent = self.indent_at(container, last, indent);
          let separator = leading_line_break(container, last)
            .unwrap_or_else(|| format!("{}{}", self.line_ending, item_indent));
          (item_indent, separator)
        }
        None => {
          let item_indent = self.child_indent(container, indent);
          let separator = format!("{}{}", self.line_ending, item_indent);
          (item_indent, separator)
        }
      };

      // Comments sharing the last item's line stay with it.
      let mut insert_at = positions.last().map(|&last| {
        let mut at = last + 1;
        while container.children.get(at).is_some_and(trails_on_same_line) {
          at += 1;
        }
        at
      });
      for (index, value) in items.iter().enumerate().skip(positions.len()) {
        #[cfg(feature = "tracing")]
        trace!("Appending {}/{}[{}]", path, item, index);

        let item_path = format!("{}/{}[{}]", path, item, index);
        let created = Node::Element(self.create(item, &item_indent, value, &item_path)?);
        match insert_at {
          Some(at) => {
            container.children.insert(at, Node::Text(separator.clone()));
            container.children.insert(at + 1, created);
            insert_at = Some(at + 2);
          }
          None => self.append(container, indent, &item_indent, created),
        }
      }
    }

    for &position in positions.iter().skip(items.len()).rev() {
      #[cfg(feature = "tracing")]
      trace!("Removing surplus {} at {}", item, path);

      remove_child(container, position);
    }

    Ok(())
  }

  fn properties(
    &self,
    container: &mut Element,
    indent: &str,
    map: &OrderedKeyMap,
    path: &str,
  ) -> Result<(), ReconcileError> {
    if let Some(child) = container.child_elements().find(|child| child.has_child_elements()) {
      return Err(ReconcileError::UnexpectedShape {
        path: format!("{}/{}", path, child.name),
      });
    }

    let separator = format!("{}{}", self.line_ending, self.child_indent(container, indent));

    // Each kept property owns the whitespace and comments in front of it.
    let mut units: BTreeMap<String, Vec<Node>> = BTreeMap::new();
    let mut pending: Vec<Node> = Vec::new();
    let mut had_elements = false;
    for node in std::mem::take(&mut container.children) {
      match node {
        Node::Element(mut property) => {
          had_elements = true;
          let mut unit = std::mem::take(&mut pending);
          match map.get(&property.name) {
            Some(value) if !units.contains_key(&property.name) => {
              if property.text().trim() != value {
                property.set_text(value);
              }
              let key = property.name.clone();
              unit.push(Node::Element(property));
              units.insert(key, unit);
            }
            _ => {
              #[cfg(feature = "tracing")]
              trace!("Dropping property {}/{}", path, property.name);
            }
          }
        }
        other => pending.push(other),
      }
    }

    for (key, value) in map {
      match units.remove(key) {
        Some(unit) => container.children.extend(unit),
        None => {
          #[cfg(feature = "tracing")]
          trace!("Adding property {}/{}", path, key);

          container.children.push(Node::Text(separator.clone()));
          container
            .children
            .push(Node::Element(Element::with_text(key, value)));
        }
      }
    }

    let closes_line = pending.last().is_some_and(is_line_break);
    container.children.extend(pending);
    if !had_elements && !closes_line {
      container
        .children
        .push(Node::Text(format!("{}{}", self.line_ending, indent)));
    }
    container.self_closing = false;

    Ok(())
  }

  /// Indentation of the child at `position`, read from the whitespace in
  /// front of it.
  fn indent_at(&self, element: &Element, position: usize, parent_indent: &str) -> String {
    leading_line_break(element, position)
      .and_then(|run| run.rsplit('\n').next().map(str::to_string))
      .unwrap_or_else(|| self.child_indent(element, parent_indent))
  }

  /// Indentation used by the existing children of `element`, or one unit
  /// deeper than `parent_indent`.
  fn child_indent(&self, element: &Element, parent_indent: &str) -> String {
    element
      .children
      .iter()
      .enumerate()
      .filter(|(_, node)| matches!(node, Node::Element(_)))
      .find_map(|(position, _)| leading_line_break(element, position))
      .and_then(|run| run.rsplit('\n').next().map(str::to_string))
      .unwrap_or_else(|| format!("{}{}", parent_indent, self.indent_unit))
  }
}

/// First indentation found in front of a child of `root`.
fn observed_indent(root: &Element) -> Option<String> {
  root
    .children
    .iter()
    .enumerate()
    .filter(|(_, node)| matches!(node, Node::Element(_)))
    .find_map(|(position, _)| leading_line_break(root, position))
    .and_then(|run| run.rsplit('\n').next().map(str::to_string))
}

/// The whitespace run directly before the child at `position`, if it holds a
/// line break.
fn leading_line_break(element: &Element, position: usize) -> Option<String> {
  let previous = element.children.get(position.checked_sub(1)?)?;
  match previous {
    Node::Text(text) if is_line_break(previous) => Some(text.clone()),
    _ => None,
  }
}

fn is_line_break(node: &Node) -> bool {
  matches!(node, Node::Text(text) if text.contains('\n')) && node.is_whitespace()
}

fn trails_on_same_line(node: &Node) -> bool {
  matches!(node, Node::Comment(_)) || (node.is_whitespace() && !is_line_break(node))
}

/// Removes the child at `position` together with the whitespace run in front
/// of it.
fn remove_child(element: &mut Element, position: usize) {
  if position >= element.children.len() {
    return;
  }
  element.children.remove(position);
  if let Some(previous) = position.checked_sub(1)
    && element.children.get(previous).is_some_and(Node::is_whitespace)
  {
    element.children.remove(previous);
  }
}

fn update_text(element: &mut Element, value: &str, path: &str) -> Result<(), ReconcileError> {
  if element.has_child_elements() {
    return Err(ReconcileError::UnexpectedShape {
      path: path.to_string(),
    });
  }
  if element.text().trim() != value {
    #[cfg(feature = "tracing")]
    trace!("Updating {} to {:?}", path, value);

    element.set_text(value);
  }
  Ok(())
}
