//! Formatting-preserving document tree.
//!
//! Every node keeps the exact text it was parsed from, so rendering an
//! unmodified [`Document`] with `Display` reproduces the input byte for byte.
//! Text nodes hold raw character data with entity references left undecoded;
//! use [`Element::text`] for the decoded value.

use std::fmt;

const BYTE_ORDER_MARK: char = '\u{feff}';

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
  pub bom: bool,
  /// Nodes before the root element: declaration, comments, whitespace.
  pub prolog: Vec<Node>,
  pub root: Element,
  /// Nodes after the root element.
  pub epilog: Vec<Node>,
}

impl Document {
  pub fn new(root: Element) -> Self {
    Self {
      bom: false,
      prolog: Vec::new(),
      root,
      epilog: Vec::new(),
    }
  }
}

impl fmt::Display for Document {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if self.bom {
      write!(f, "{}", BYTE_ORDER_MARK)?;
    }
    for node in &self.prolog {
      write!(f, "{}", node)?;
    }
    write!(f, "{}", self.root)?;
    for node in &self.epilog {
      write!(f, "{}", node)?;
    }
    Ok(())
  }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
  Element(Element),
  /// Raw character data, whitespace included.
  Text(String),
  /// Content between `<!--` and `-->`.
  Comment(String),
  /// Content between `<![CDATA[` and `]]>`.
  CData(String),
  /// Content between `<?` and `?>`, e.g. the XML declaration.
  Instruction(String),
  /// Content between `<!` and `>`, e.g. a DOCTYPE.
  Declaration(String),
}

impl Node {
  pub fn as_element(&self) -> Option<&Element> {
    match self {
      Node::Element(element) => Some(element),
      _ => None,
    }
  }

  pub fn as_element_mut(&mut self) -> Option<&mut Element> {
    match self {
      Node::Element(element) => Some(element),
      _ => None,
    }
  }

  /// True for a text run made only of whitespace.
  pub fn is_whitespace(&self) -> bool {
    matches!(self, Node::Text(text) if text.chars().all(char::is_whitespace))
  }
}

impl fmt::Display for Node {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Node::Element(element) => write!(f, "{}", element),
      Node::Text(text) => write!(f, "{}", text),
      Node::Comment(comment) => write!(f, "<!--{}-->", comment),
      Node::CData(data) => write!(f, "<![CDATA[{}]]>", data),
      Node::Instruction(instruction) => write!(f, "<?{}?>", instruction),
      Node::Declaration(declaration) => write!(f, "<!{}>", declaration),
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
  /// Whitespace between the previous token and the name.
  pub leading: String,
  pub name: String,
  /// The `=` with any surrounding whitespace.
  pub assign: String,
  pub quote: char,
  /// Raw value, entities undecoded.
  pub value: String,
}

impl Attribute {
  pub fn new(name: impl Into<String>, value: &str) -> Self {
    Self {
      leading: " ".to_string(),
      name: name.into(),
      assign: "=".to_string(),
      quote: '"',
      value: escape_attribute(value),
    }
  }
}

impl fmt::Display for Attribute {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "{}{}{}{}{}{}",
      self.leading, self.name, self.assign, self.quote, self.value, self.quote
    )
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
  pub name: String,
  pub attributes: Vec<Attribute>,
  /// Whitespace between the last attribute and `>` or `/>`.
  pub tag_tail: String,
  pub self_closing: bool,
  pub children: Vec<Node>,
  /// Whitespace between the name and `>` in the closing tag.
  pub close_tail: String,
}

impl Element {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      attributes: Vec::new(),
      tag_tail: String::new(),
      self_closing: false,
      children: Vec::new(),
      close_tail: String::new(),
    }
  }

  /// An element holding `value` as escaped character data.
  pub fn with_text(name: impl Into<String>, value: &str) -> Self {
    let mut element = Self::new(name);
    if !value.is_empty() {
      element.children.push(Node::Text(escape_text(value)));
    }
    element
  }

  pub fn with_attribute(mut self, name: impl Into<String>, value: &str) -> Self {
    self.attributes.push(Attribute::new(name, value));
    self
  }

  pub fn attribute(&self, name: &str) -> Option<String> {
    self
      .attributes
      .iter()
      .find(|attribute| attribute.name == name)
      .map(|attribute| decode_entities_lossy(&attribute.value))
  }

  pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
    self.children.iter().filter_map(Node::as_element)
  }

  pub fn has_child_elements(&self) -> bool {
    self.child_elements().next().is_some()
  }

  /// Index in `children` of the first element named `name`.
  pub fn position_of(&self, name: &str) -> Option<usize> {
    self
      .children
      .iter()
      .position(|node| matches!(node, Node::Element(element) if element.name == name))
  }

  /// Indices in `children` of every element named `name`.
  pub fn positions_of(&self, name: &str) -> Vec<usize> {
    self
      .children
      .iter()
      .enumerate()
      .filter_map(|(index, node)| match node {
        Node::Element(element) if element.name == name => Some(index),
        _ => None,
      })
      .collect()
  }

  /// Decoded character data of this element, comments and nested elements
  /// excluded.
  pub fn text(&self) -> String {
    let mut text = String::new();
    for node in &self.children {
      match node {
        Node::Text(raw) => text.push_str(&decode_entities_lossy(raw)),
        Node::CData(data) => text.push_str(data),
        _ => {}
      }
    }
    text
  }

  /// Replaces the character data of this element with `value`.
  ///
  /// Text and CDATA nodes are dropped and the escaped value takes the place
  /// of the first of them; comments stay where they are.
  pub fn set_text(&mut self, value: &str) {
    let first = self
      .children
      .iter()
      .position(|node| matches!(node, Node::Text(_) | Node::CData(_)))
      .unwrap_or(self.children.len());
    self
      .children
      .retain(|node| !matches!(node, Node::Text(_) | Node::CData(_)));
    if !value.is_empty() {
      self.children.insert(first, Node::Text(escape_text(value)));
    }
    self.self_closing = false;
  }
}

impl fmt::Display for Element {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "<{}", self.name)?;
    for attribute in &self.attributes {
      write!(f, "{}", attribute)?;
    }
    write!(f, "{}", self.tag_tail)?;
    if self.self_closing && self.children.is_empty() {
      return write!(f, "/>");
    }
    write!(f, ">")?;
    for child in &self.children {
      write!(f, "{}", child)?;
    }
    write!(f, "</{}{}>", self.name, self.close_tail)
  }
}

pub fn escape_text(value: &str) -> String {
  let mut escaped = String::with_capacity(value.len());
  for ch in value.chars() {
    match ch {
      '&' => escaped.push_str("&amp;"),
      '<' => escaped.push_str("&lt;"),
      '>' => escaped.push_str("&gt;"),
      _ => escaped.push(ch),
    }
  }
  escaped
}

pub fn escape_attribute(value: &str) -> String {
  escape_text(value).replace('"', "&quot;")
}

/// Decodes the predefined and numeric entity references in `raw`.
///
/// Returns `None` on an unknown or unterminated reference.
pub fn decode_entities(raw: &str) -> Option<String> {
  let mut decoded = String::with_capacity(raw.len());
  let mut rest = raw;
  while let Some(amp) = rest.find('&') {
    decoded.push_str(&rest[..amp]);
    let after = &rest[amp + 1..];
    let semi = after.find(';')?;
    decoded.push(decode_entity(&after[..semi])?);
    rest = &after[semi + 1..];
  }
  decoded.push_str(rest);
  Some(decoded)
}

fn decode_entities_lossy(raw: &str) -> String {
  decode_entities(raw).unwrap_or_else(|| raw.to_string())
}

fn decode_entity(entity: &str) -> Option<char> {
  match entity {
    "amp" => Some('&'),
    "lt" => Some('<'),
    "gt" => Some('>'),
    "quot" => Some('"'),
    "apos" => Some('\''),
    _ => {
      if let Some(hex) = entity.strip_prefix("#x") {
        u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
      } else if let Some(dec) = entity.strip_prefix('#') {
        dec.parse::<u32>().ok().and_then(char::from_u32)
      } else {
        None
      }
    }
  }
}
