//! Markup parser producing a formatting-preserving [`Document`].
//!
//! The parser is structural only: it knows nothing about the POM schema. It
//! records every byte of the input in some node so the tree can be rendered
//! back verbatim.

use crate::tree::{Attribute, Document, Element, Node, decode_entities};

#[cfg(feature = "tracing")]
use tracing::{debug, trace};

const BYTE_ORDER_MARK: &str = "\u{feff}";

/// Deepest element nesting accepted, root included.
const MAX_DEPTH: usize = 256;

/// Parses `input` into a [`Document`].
pub fn parse_document(input: &str) -> Result<Document, ParseError> {
  #[cfg(feature = "tracing")]
  debug!("Parsing document of {} bytes", input.len());

  let (bom, body) = match input.strip_prefix(BYTE_ORDER_MARK) {
    Some(body) => (true, body),
    None => (false, input),
  };

  let mut document = Parser::new(body).parse()?;
  document.bom = bom;
  Ok(document)
}

/// Errors raised while reading a document, either as markup or as a model.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
  #[error("Invalid markup at line {line}, column {column}: {message}")]
  Syntax {
    line: u32,
    column: u32,
    message: String,
  },
  #[error("Unexpected root element <{0}>, expected <project>")]
  UnexpectedRoot(String),
  #[error("Duplicated tag <{tag}> in {path}")]
  DuplicateTag { path: String, tag: String },
  #[error("Element {path} must only contain text")]
  UnexpectedChildren { path: String },
  #[error("Missing required element <{tag}> in {path}")]
  MissingField { path: String, tag: &'static str },
}

struct Cursor<'a> {
  input: &'a str,
  pos: usize,
  line: u32,
  col: u32,
}

impl<'a> Cursor<'a> {
  fn new(input: &'a str) -> Self {
    Self {
      input,
      pos: 0,
      line: 1,
      col: 1,
    }
  }

  fn current(&self) -> Option<u8> {
    self.input.as_bytes().get(self.pos).copied()
  }

  fn starts_with(&self, pattern: &str) -> bool {
    self.rest().starts_with(pattern)
  }

  fn rest(&self) -> &'a str {
    self.input.get(self.pos..).unwrap_or_default()
  }

  fn is_eof(&self) -> bool {
    self.pos >= self.input.len()
  }

  fn advance(&mut self) {
    if let Some(b) = self.current() {
      self.pos += 1;
      if b == b'\n' {
        self.line += 1;
        self.col = 1;
      } else if b & 0xC0 != 0x80 {
        // count characters, not continuation bytes
        self.col += 1;
      }
    }
  }

  fn advance_by(&mut self, count: usize) {
    for _ in 0..count {
      self.advance();
    }
  }

  fn slice_from(&self, start: usize) -> &'a str {
    self.input.get(start..self.pos).unwrap_or_default()
  }
}

struct Parser<'a> {
  cursor: Cursor<'a>,
}

impl<'a> Parser<'a> {
  fn new(input: &'a str) -> Self {
    Self {
      cursor: Cursor::new(input),
    }
  }

  fn parse(&mut self) -> Result<Document, ParseError> {
    let prolog = self.parse_misc()?;
    if self.cursor.is_eof() {
      return Err(self.error("missing root element"));
    }

    let root = self.parse_element(1)?;
    let epilog = self.parse_misc()?;
    if !self.cursor.is_eof() {
      return Err(self.error("content after root element"));
    }

    #[cfg(feature = "tracing")]
    debug!(
      "Parsed <{}> with {} prolog and {} epilog nodes",
      root.name,
      prolog.len(),
      epilog.len()
    );

    Ok(Document {
      bom: false,
      prolog,
      root,
      epilog,
    })
  }

  /// Whitespace, comments, instructions and declarations outside the root.
  fn parse_misc(&mut self) -> Result<Vec<Node>, ParseError> {
    let mut nodes = Vec::new();

    while !self.cursor.is_eof() {
      if self.cursor.starts_with("<!--") {
        nodes.push(self.parse_comment()?);
      } else if self.cursor.starts_with("<?") {
        nodes.push(self.parse_instruction()?);
      } else if self.cursor.starts_with("<!") {
        nodes.push(self.parse_declaration()?);
      } else if self.cursor.current() == Some(b'<') {
        break;
      } else {
        let start = self.cursor.pos;
        while let Some(b) = self.cursor.current() {
          if b == b'<' {
            break;
          }
          if !b.is_ascii_whitespace() {
            return Err(self.error("text outside root element"));
          }
          self.cursor.advance();
        }
        nodes.push(Node::Text(self.cursor.slice_from(start).to_string()));
      }
    }

    Ok(nodes)
  }

  fn parse_element(&mut self, depth: usize) -> Result<Element, ParseError> {
    if depth > MAX_DEPTH {
      return Err(self.error("nesting too deep"));
    }
    let (open_line, open_col) = (self.cursor.line, self.cursor.col);
    self.expect("<")?;
    let name = self.parse_name()?;

    #[cfg(feature = "tracing")]
    trace!("Parsing element <{}> at {}:{}", name, open_line, open_col);

    let mut element = Element::new(name);

    loop {
      let leading = self.take_whitespace();
      match self.cursor.current() {
        Some(b'/') | Some(b'>') => {
          element.tag_tail = leading.to_string();
          break;
        }
        Some(_) if leading.is_empty() => {
          return Err(self.error("expected whitespace before attribute"));
        }
        Some(_) => {
          let attribute = self.parse_attribute(leading)?;
          if element.attributes.iter().any(|a| a.name == attribute.name) {
            return Err(self.error(&format!("duplicate attribute '{}'", attribute.name)));
          }
          element.attributes.push(attribute);
        }
        None => return Err(self.error("unterminated start tag")),
      }
    }

    if self.cursor.starts_with("/>") {
      self.cursor.advance_by(2);
      element.self_closing = true;
      return Ok(element);
    }
    self.expect(">")?;

    loop {
      if self.cursor.starts_with("</") {
        self.cursor.advance_by(2);
        let close_name = self.parse_name()?;
        if close_name != element.name {
          return Err(self.error(&format!(
            "mismatched closing tag </{}>, expected </{}>",
            close_name, element.name
          )));
        }
        element.close_tail = self.take_whitespace().to_string();
        self.expect(">")?;
        break;
      } else if self.cursor.starts_with("<!--") {
        element.children.push(self.parse_comment()?);
      } else if self.cursor.starts_with("<![CDATA[") {
        self.cursor.advance_by("<![CDATA[".len());
        let data = self.take_until("]]>", "unterminated CDATA section")?;
        element.children.push(Node::CData(data.to_string()));
      } else if self.cursor.starts_with("<?") {
        element.children.push(self.parse_instruction()?);
      } else if self.cursor.starts_with("<!") {
        return Err(self.error("declaration inside element content"));
      } else if self.cursor.current() == Some(b'<') {
        element.children.push(Node::Element(self.parse_element(depth + 1)?));
      } else if self.cursor.is_eof() {
        return Err(ParseError::Syntax {
          line: open_line,
          column: open_col,
          message: format!("unclosed element <{}>", element.name),
        });
      } else {
        element.children.push(self.parse_text()?);
      }
    }

    Ok(element)
  }

  fn parse_attribute(&mut self, leading: &str) -> Result<Attribute, ParseError> {
    let name = self.parse_name()?;

    let assign_start = self.cursor.pos;
    self.take_whitespace();
    self.expect("=")?;
    self.take_whitespace();
    let assign = self.cursor.slice_from(assign_start).to_string();

    let quote = match self.cursor.current() {
      Some(b'"') => '"',
      Some(b'\'') => '\'',
      _ => return Err(self.error("expected quoted attribute value")),
    };
    self.cursor.advance();

    let start = self.cursor.pos;
    loop {
      match self.cursor.current() {
        Some(b) if char::from(b) == quote => break,
        Some(b'<') => return Err(self.error("'<' in attribute value")),
        Some(_) => self.cursor.advance(),
        None => return Err(self.error("unterminated attribute value")),
      }
    }
    let value = self.cursor.slice_from(start).to_string();
    if decode_entities(&value).is_none() {
      return Err(self.error("invalid entity reference in attribute value"));
    }
    self.cursor.advance();

    Ok(Attribute {
      leading: leading.to_string(),
      name,
      assign,
      quote,
      value,
    })
  }

  fn parse_text(&mut self) -> Result<Node, ParseError> {
    let (line, column) = (self.cursor.line, self.cursor.col);
    let start = self.cursor.pos;
    while let Some(b) = self.cursor.current() {
      if b == b'<' {
        break;
      }
      self.cursor.advance();
    }

    let raw = self.cursor.slice_from(start);
    if decode_entities(raw).is_none() {
      return Err(ParseError::Syntax {
        line,
        column,
        message: "invalid entity reference in character data".to_string(),
      });
    }
    Ok(Node::Text(raw.to_string()))
  }

  fn parse_comment(&mut self) -> Result<Node, ParseError> {
    self.cursor.advance_by("<!--".len());
    let comment = self.take_until("-->", "unterminated comment")?;
    Ok(Node::Comment(comment.to_string()))
  }

  fn parse_instruction(&mut self) -> Result<Node, ParseError> {
    self.cursor.advance_by("<?".len());
    let instruction = self.take_until("?>", "unterminated processing instruction")?;
    Ok(Node::Instruction(instruction.to_string()))
  }

  /// `<!DOCTYPE ...>` and friends, with a bracketed internal subset.
  fn parse_declaration(&mut self) -> Result<Node, ParseError> {
    self.cursor.advance_by("<!".len());
    let start = self.cursor.pos;
    let mut depth = 0usize;
    loop {
      match self.cursor.current() {
        Some(b'[') => depth += 1,
        Some(b']') => depth = depth.saturating_sub(1),
        Some(b'>') if depth == 0 => break,
        Some(_) => {}
        None => return Err(self.error("unterminated declaration")),
      }
      self.cursor.advance();
    }
    let declaration = self.cursor.slice_from(start).to_string();
    self.cursor.advance();
    Ok(Node::Declaration(declaration))
  }

  fn parse_name(&mut self) -> Result<String, ParseError> {
    let start = self.cursor.pos;
    match self.cursor.current() {
      Some(b) if is_name_start(b) => self.cursor.advance(),
      _ => return Err(self.error("expected name")),
    }
    while let Some(b) = self.cursor.current() {
      if !is_name_char(b) {
        break;
      }
      self.cursor.advance();
    }
    Ok(self.cursor.slice_from(start).to_string())
  }

  fn take_whitespace(&mut self) -> &'a str {
    let start = self.cursor.pos;
    while let Some(b) = self.cursor.current() {
      if !matches!(b, b' ' | b'\t' | b'\r' | b'\n') {
        break;
      }
      self.cursor.advance();
    }
    self.cursor.slice_from(start)
  }

  /// Consumes up to and including `pattern`, returning what came before it.
  fn take_until(&mut self, pattern: &str, message: &str) -> Result<&'a str, ParseError> {
    let start = self.cursor.pos;
    match self.cursor.rest().find(pattern) {
      Some(offset) => {
        self.cursor.advance_by(offset);
        let content = self.cursor.slice_from(start);
        self.cursor.advance_by(pattern.len());
        Ok(content)
      }
      None => Err(self.error(message)),
    }
  }

  fn expect(&mut self, token: &str) -> Result<(), ParseError> {
    if self.cursor.starts_with(token) {
      self.cursor.advance_by(token.len());
      Ok(())
    } else {
      Err(self.error(&format!("expected '{}'", token)))
    }
  }

  fn error(&self, message: &str) -> ParseError {
    ParseError::Syntax {
      line: self.cursor.line,
      column: self.cursor.col,
      message: message.to_string(),
    }
  }
}

fn is_name_start(b: u8) -> bool {
  b.is_ascii_alphabetic() || matches!(b, b'_' | b':') || b >= 0x80
}

fn is_name_char(b: u8) -> bool {
  is_name_start(b) || b.is_ascii_digit() || matches!(b, b'-' | b'.')
}
