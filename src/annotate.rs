// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Annotation engine: rewrite highlighted result markup into clickable links.
//!
//! Result fields arrive as HTML fragments that may already contain
//! `<mark class="hit-highlight">` elements from hit highlighting. Two tree
//! rewrites turn them into query-triggering anchors without disturbing that
//! markup:
//!
//! - [`wrap_syllables`] for jyutping text: every whitespace-delimited word
//!   becomes exactly one anchor, even when a highlight splits the word into
//!   several nodes. The anchor's target is the word's plain text.
//! - [`wrap_characters`] for traditional-character text: every Unicode scalar
//!   gets its own anchor. Content inside a highlight keeps its per-character
//!   anchors nested inside the cloned highlight element.
//!
//! Cloned elements keep tag and attributes verbatim; only anchors are added.
//! Link targets are percent-encoded the way `encodeURIComponent` would.

use crate::markup::{parse_fragment, serialize, MarkupError, MarkupNode};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Class applied to syllable anchors.
pub const SYLLABLE_LINK_CLASS: &str = "jyutping-link";
/// Class applied to per-character anchors.
pub const CHARACTER_LINK_CLASS: &str = "character-link";

/// `encodeURIComponent` leaves `- _ . ! ~ * ' ( )` unescaped.
const QUERY_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Percent-encode a link target for a `?q=` href.
pub fn encode_query(target: &str) -> String {
    utf8_percent_encode(target, QUERY_SET).to_string()
}

/// Parse a jyutping fragment, wrap its syllables in anchors, serialize back.
pub fn annotate_jyutping(html: &str) -> Result<String, MarkupError> {
    let nodes = parse_fragment(html)?;
    Ok(serialize(&wrap_syllables(&nodes)))
}

/// Parse a character fragment, wrap each scalar in an anchor, serialize back.
pub fn annotate_characters(html: &str) -> Result<String, MarkupError> {
    let nodes = parse_fragment(html)?;
    Ok(serialize(&wrap_characters(&nodes)))
}

/// Wrap whitespace-delimited syllable runs in query anchors.
///
/// Maintains one open anchor accumulator: non-whitespace text and inline
/// elements flow into it, whitespace flushes it. The flushed anchor's href is
/// the trimmed accumulated plain text, so `<mark>lou</mark>5` and the `5`
/// after it end up inside a single `?q=lou5` link.
pub fn wrap_syllables(nodes: &[MarkupNode]) -> Vec<MarkupNode> {
    let mut wrapper = SyllableWrapper {
        out: Vec::new(),
        link: None,
        text: String::new(),
    };
    for node in nodes {
        wrapper.process(node);
    }
    wrapper.flush();
    wrapper.out
}

struct SyllableWrapper {
    out: Vec<MarkupNode>,
    /// Children of the currently open anchor, if any.
    link: Option<Vec<MarkupNode>>,
    /// Plain-text accumulation for the open anchor's link target.
    text: String,
}

impl SyllableWrapper {
    fn process(&mut self, node: &MarkupNode) {
        match node {
            MarkupNode::Text(text) => {
                for run in split_whitespace_runs(text) {
                    if run.chars().all(char::is_whitespace) {
                        self.flush();
                        self.out.push(MarkupNode::Text(run.to_string()));
                    } else {
                        self.link
                            .get_or_insert_with(Vec::new)
                            .push(MarkupNode::Text(run.to_string()));
                        self.text.push_str(run);
                    }
                }
            }
            MarkupNode::Element {
                tag,
                attrs,
                children,
            } => {
                // No whitespace boundary has intervened, so the element joins
                // the word currently being accumulated.
                let mut cloned_children = Vec::new();
                for child in children {
                    clone_collecting_text(child, &mut cloned_children, &mut self.text);
                }
                self.link
                    .get_or_insert_with(Vec::new)
                    .push(MarkupNode::Element {
                        tag: tag.clone(),
                        attrs: attrs.clone(),
                        children: cloned_children,
                    });
            }
        }
    }

    fn flush(&mut self) {
        let target = self.text.trim();
        if self.link.is_some() && !target.is_empty() {
            let href = format!("?q={}", encode_query(target));
            let children = self.link.take().unwrap_or_default();
            self.out.push(MarkupNode::Element {
                tag: "a".to_string(),
                attrs: vec![
                    ("class".to_string(), SYLLABLE_LINK_CLASS.to_string()),
                    ("href".to_string(), href),
                ],
                children,
            });
            self.text.clear();
        }
    }
}

/// Deep-clone a subtree, appending its plain text to the open anchor target.
fn clone_collecting_text(node: &MarkupNode, target: &mut Vec<MarkupNode>, text: &mut String) {
    match node {
        MarkupNode::Text(content) => {
            target.push(MarkupNode::Text(content.clone()));
            text.push_str(content);
        }
        MarkupNode::Element {
            tag,
            attrs,
            children,
        } => {
            let mut cloned_children = Vec::new();
            for child in children {
                clone_collecting_text(child, &mut cloned_children, text);
            }
            target.push(MarkupNode::Element {
                tag: tag.clone(),
                attrs: attrs.clone(),
                children: cloned_children,
            });
        }
    }
}

/// Split text into alternating whitespace / non-whitespace runs.
fn split_whitespace_runs(text: &str) -> Vec<&str> {
    let mut runs = Vec::new();
    let mut start = 0;
    let mut in_whitespace = None;
    for (idx, c) in text.char_indices() {
        let ws = c.is_whitespace();
        match in_whitespace {
            Some(prev) if prev != ws => {
                runs.push(&text[start..idx]);
                start = idx;
                in_whitespace = Some(ws);
            }
            None => in_whitespace = Some(ws),
            _ => {}
        }
    }
    if start < text.len() {
        runs.push(&text[start..]);
    }
    runs
}

/// Wrap every Unicode scalar in its own query anchor.
///
/// Unlike the syllable case, anchors never merge across element boundaries:
/// characters inside a highlight get their anchors nested inside the cloned
/// highlight element.
pub fn wrap_characters(nodes: &[MarkupNode]) -> Vec<MarkupNode> {
    let mut out = Vec::new();
    for node in nodes {
        wrap_characters_into(node, &mut out);
    }
    out
}

fn wrap_characters_into(node: &MarkupNode, out: &mut Vec<MarkupNode>) {
    match node {
        MarkupNode::Text(text) => {
            for c in text.chars() {
                out.push(character_link(c));
            }
        }
        MarkupNode::Element {
            tag,
            attrs,
            children,
        } => {
            let mut cloned_children = Vec::new();
            for child in children {
                wrap_characters_into(child, &mut cloned_children);
            }
            out.push(MarkupNode::Element {
                tag: tag.clone(),
                attrs: attrs.clone(),
                children: cloned_children,
            });
        }
    }
}

fn character_link(c: char) -> MarkupNode {
    let text = c.to_string();
    MarkupNode::Element {
        tag: "a".to_string(),
        attrs: vec![
            ("href".to_string(), format!("?q={}", encode_query(&text))),
            ("class".to_string(), CHARACTER_LINK_CLASS.to_string()),
        ],
        children: vec![MarkupNode::Text(text)],
    }
}
