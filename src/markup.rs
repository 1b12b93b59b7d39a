// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Markup fragment tree: parse, rewrite, serialize.
//!
//! The annotation engine needs to rewrite HTML fragments that the search
//! engine already decorated with `<mark>` elements. Doing that against a live
//! DOM ties the logic to a browser, so instead fragments are parsed into a
//! small tagged-union tree, rewritten as pure values, and serialized back.
//!
//! The parser handles the constrained fragment language the engine actually
//! emits: nested elements, double/single-quoted attributes, character
//! entities. It is not a general HTML5 parser and does not try to be; input
//! comes from our own renderer, so malformed markup is a protocol error and
//! fails loudly.

use std::fmt;

/// A parsed markup fragment node.
///
/// Attribute order is preserved so a rewritten tree serializes byte-for-byte
/// compatibly with what the engine produced. Rewrites build new trees; nothing
/// mutates in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkupNode {
    Text(String),
    Element {
        tag: String,
        attrs: Vec<(String, String)>,
        children: Vec<MarkupNode>,
    },
}

impl MarkupNode {
    /// Shorthand for building an element node.
    pub fn element(tag: &str, attrs: Vec<(String, String)>, children: Vec<MarkupNode>) -> Self {
        MarkupNode::Element {
            tag: tag.to_string(),
            attrs,
            children,
        }
    }

    /// Plain-text content of this subtree, markup stripped.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            MarkupNode::Text(text) => out.push_str(text),
            MarkupNode::Element { children, .. } => {
                for child in children {
                    child.collect_text(out);
                }
            }
        }
    }
}

/// Error type for fragment parsing failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkupError {
    /// Input ended inside a tag, e.g. `<mark class="hi`.
    UnterminatedTag { position: usize },
    /// An element was never closed before the fragment ended.
    UnclosedElement { tag: String },
    /// A closing tag did not match the innermost open element.
    MismatchedClosingTag { expected: String, found: String },
    /// A closing tag appeared with no open element.
    UnexpectedClosingTag { found: String },
    /// A tag with no name, e.g. `<>`.
    EmptyTagName { position: usize },
    /// An unrecognized character entity, e.g. `&bogus;`.
    BadEntity { entity: String },
}

impl fmt::Display for MarkupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarkupError::UnterminatedTag { position } => {
                write!(f, "unterminated tag at byte {}", position)
            }
            MarkupError::UnclosedElement { tag } => {
                write!(f, "element <{}> never closed", tag)
            }
            MarkupError::MismatchedClosingTag { expected, found } => {
                write!(f, "expected </{}>, found </{}>", expected, found)
            }
            MarkupError::UnexpectedClosingTag { found } => {
                write!(f, "closing tag </{}> with no open element", found)
            }
            MarkupError::EmptyTagName { position } => {
                write!(f, "empty tag name at byte {}", position)
            }
            MarkupError::BadEntity { entity } => {
                write!(f, "unrecognized entity &{};", entity)
            }
        }
    }
}

impl std::error::Error for MarkupError {}

/// Parse an HTML fragment into a sequence of sibling nodes.
pub fn parse_fragment(input: &str) -> Result<Vec<MarkupNode>, MarkupError> {
    let mut parser = Parser { src: input, pos: 0 };
    let nodes = parser.parse_siblings(None)?;
    Ok(nodes)
}

/// Serialize a sequence of sibling nodes back to an HTML string.
pub fn serialize(nodes: &[MarkupNode]) -> String {
    let mut out = String::new();
    for node in nodes {
        serialize_node(node, &mut out);
    }
    out
}

fn serialize_node(node: &MarkupNode, out: &mut String) {
    match node {
        MarkupNode::Text(text) => escape_into(text, out),
        MarkupNode::Element {
            tag,
            attrs,
            children,
        } => {
            out.push('<');
            out.push_str(tag);
            for (name, value) in attrs {
                out.push(' ');
                out.push_str(name);
                out.push_str("=\"");
                escape_into(value, out);
                out.push('"');
            }
            out.push('>');
            for child in children {
                serialize_node(child, out);
            }
            out.push_str("</");
            out.push_str(tag);
            out.push('>');
        }
    }
}

/// Escape text for embedding in markup (element content or attribute value).
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    escape_into(text, &mut out);
    out
}

pub(crate) fn escape_into(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn eof(&self) -> bool {
        self.pos >= self.src.len()
    }

    /// Parse siblings until EOF (no enclosing element) or until the closing
    /// tag of `enclosing` is consumed.
    fn parse_siblings(&mut self, enclosing: Option<&str>) -> Result<Vec<MarkupNode>, MarkupError> {
        let mut nodes = Vec::new();
        loop {
            if self.eof() {
                return match enclosing {
                    Some(tag) => Err(MarkupError::UnclosedElement {
                        tag: tag.to_string(),
                    }),
                    None => Ok(nodes),
                };
            }
            if self.rest().starts_with("</") {
                let found = self.parse_closing_tag()?;
                return match enclosing {
                    Some(tag) if tag.eq_ignore_ascii_case(&found) => Ok(nodes),
                    Some(tag) => Err(MarkupError::MismatchedClosingTag {
                        expected: tag.to_string(),
                        found,
                    }),
                    None => Err(MarkupError::UnexpectedClosingTag { found }),
                };
            }
            if self.rest().starts_with('<') {
                nodes.push(self.parse_element()?);
            } else {
                nodes.push(MarkupNode::Text(self.parse_text()?));
            }
        }
    }

    fn parse_closing_tag(&mut self) -> Result<String, MarkupError> {
        let open_pos = self.pos;
        self.pos += 2; // "</"
        let name = self.take_name();
        if name.is_empty() {
            return Err(MarkupError::EmptyTagName { position: open_pos });
        }
        self.skip_whitespace();
        if !self.rest().starts_with('>') {
            return Err(MarkupError::UnterminatedTag { position: open_pos });
        }
        self.pos += 1;
        Ok(name)
    }

    fn parse_element(&mut self) -> Result<MarkupNode, MarkupError> {
        let open_pos = self.pos;
        self.pos += 1; // '<'
        let tag = self.take_name();
        if tag.is_empty() {
            return Err(MarkupError::EmptyTagName { position: open_pos });
        }

        let mut attrs = Vec::new();
        loop {
            self.skip_whitespace();
            if self.eof() {
                return Err(MarkupError::UnterminatedTag { position: open_pos });
            }
            if self.rest().starts_with("/>") {
                self.pos += 2;
                return Ok(MarkupNode::Element {
                    tag,
                    attrs,
                    children: Vec::new(),
                });
            }
            if self.rest().starts_with('>') {
                self.pos += 1;
                break;
            }
            attrs.push(self.parse_attribute(open_pos)?);
        }

        let children = self.parse_siblings(Some(&tag))?;
        Ok(MarkupNode::Element {
            tag,
            attrs,
            children,
        })
    }

    fn parse_attribute(&mut self, open_pos: usize) -> Result<(String, String), MarkupError> {
        let name = self.take_name();
        if name.is_empty() {
            return Err(MarkupError::UnterminatedTag { position: open_pos });
        }
        self.skip_whitespace();
        if !self.rest().starts_with('=') {
            // Boolean attribute, e.g. `hidden`.
            return Ok((name, String::new()));
        }
        self.pos += 1;
        self.skip_whitespace();

        let quote = match self.rest().chars().next() {
            Some(q @ ('"' | '\'')) => q,
            _ => return Err(MarkupError::UnterminatedTag { position: open_pos }),
        };
        self.pos += 1;
        let value_start = self.pos;
        match self.rest().find(quote) {
            Some(len) => {
                let raw = &self.src[value_start..value_start + len];
                self.pos = value_start + len + 1;
                Ok((name, decode_entities(raw)?))
            }
            None => Err(MarkupError::UnterminatedTag { position: open_pos }),
        }
    }

    fn parse_text(&mut self) -> Result<String, MarkupError> {
        let start = self.pos;
        let raw = match self.rest().find('<') {
            Some(len) => {
                self.pos = start + len;
                &self.src[start..start + len]
            }
            None => {
                self.pos = self.src.len();
                &self.src[start..]
            }
        };
        decode_entities(raw)
    }

    /// Tag and attribute names: ASCII alphanumeric plus `-` and `_`.
    fn take_name(&mut self) -> String {
        let rest = self.rest();
        let len = rest
            .bytes()
            .take_while(|b| b.is_ascii_alphanumeric() || *b == b'-' || *b == b'_')
            .count();
        let name = rest[..len].to_string();
        self.pos += len;
        name
    }

    fn skip_whitespace(&mut self) {
        let len = self
            .rest()
            .bytes()
            .take_while(|b| b.is_ascii_whitespace())
            .count();
        self.pos += len;
    }
}

/// Decode character entities in raw text or attribute content.
///
/// A `&` that does not introduce a well-formed entity is kept literally,
/// matching browser fragment behavior; a well-formed but unrecognized named
/// entity is an error.
fn decode_entities(raw: &str) -> Result<String, MarkupError> {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp + 1..];
        // Entities are short; look for the terminating ';' nearby only.
        let semi = after
            .char_indices()
            .take(10)
            .find(|(_, c)| *c == ';')
            .map(|(i, _)| i);
        match semi {
            Some(len) => {
                let name = &after[..len];
                match decode_entity(name) {
                    Some(c) => out.push(c),
                    None => {
                        return Err(MarkupError::BadEntity {
                            entity: name.to_string(),
                        })
                    }
                }
                rest = &after[len + 1..];
            }
            None => {
                out.push('&');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    Ok(out)
}

fn decode_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => {
            let code = if let Some(hex) = name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok()?
            } else if let Some(dec) = name.strip_prefix('#') {
                dec.parse::<u32>().ok()?
            } else {
                return None;
            };
            char::from_u32(code)
        }
    }
}
