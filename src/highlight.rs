// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Hit highlighting: raw field text + match spans → marked-up HTML.
//!
//! The engine reports where a query matched inside a field as half-open byte
//! ranges over the raw UTF-8 text. This module renders those ranges as
//! `<mark class="hit-highlight">` elements with everything HTML-escaped, so
//! the output can feed straight into the annotation engine.
//!
//! Span coordinates are byte offsets and must land on `char` boundaries;
//! anything else is a protocol error, not something to paper over.

use crate::markup::escape_into;
use std::fmt;

/// Class applied to every highlight element.
pub const HIGHLIGHT_CLASS: &str = "hit-highlight";

/// A half-open byte range `[start, end)` into a field's raw text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchSpan {
    pub start: usize,
    pub end: usize,
}

impl MatchSpan {
    pub fn new(start: usize, end: usize) -> Self {
        MatchSpan { start, end }
    }
}

/// Error type for malformed match spans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HighlightError {
    /// `end < start`.
    Inverted { start: usize, end: usize },
    /// Span extends past the end of the text.
    OutOfBounds { end: usize, text_len: usize },
    /// Span boundary falls inside a multi-byte character.
    NotCharBoundary { offset: usize },
}

impl fmt::Display for HighlightError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HighlightError::Inverted { start, end } => {
                write!(f, "inverted span: start {} > end {}", start, end)
            }
            HighlightError::OutOfBounds { end, text_len } => {
                write!(f, "span end {} past text length {}", end, text_len)
            }
            HighlightError::NotCharBoundary { offset } => {
                write!(f, "span offset {} not on a char boundary", offset)
            }
        }
    }
}

impl std::error::Error for HighlightError {}

/// Render `text` with the given match spans wrapped in highlight marks.
///
/// Spans are stable-sorted by start; input order is not trusted. A span that
/// overlaps its predecessor is clamped to begin where the predecessor ended,
/// and skipped entirely if nothing remains. With no spans the result is just
/// the escaped text.
pub fn highlight(text: &str, spans: &[MatchSpan]) -> Result<String, HighlightError> {
    if spans.is_empty() {
        let mut out = String::with_capacity(text.len());
        escape_into(text, &mut out);
        return Ok(out);
    }

    for span in spans {
        if span.end < span.start {
            return Err(HighlightError::Inverted {
                start: span.start,
                end: span.end,
            });
        }
        if span.end > text.len() {
            return Err(HighlightError::OutOfBounds {
                end: span.end,
                text_len: text.len(),
            });
        }
        for offset in [span.start, span.end] {
            if !text.is_char_boundary(offset) {
                return Err(HighlightError::NotCharBoundary { offset });
            }
        }
    }

    let mut sorted = spans.to_vec();
    sorted.sort_by_key(|span| span.start);

    let mut out = String::with_capacity(text.len() + sorted.len() * 36);
    let mut last = 0;
    for span in sorted {
        // Clamp overlap against the previous span.
        let start = span.start.max(last);
        if start >= span.end {
            continue;
        }
        escape_into(&text[last..start], &mut out);
        out.push_str("<mark class=\"");
        out.push_str(HIGHLIGHT_CLASS);
        out.push_str("\">");
        escape_into(&text[start..span.end], &mut out);
        out.push_str("</mark>");
        last = span.end;
    }
    escape_into(&text[last..], &mut out);
    Ok(out)
}
