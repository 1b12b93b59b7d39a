// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Result renderer: decoded entries → mountable markup trees.
//!
//! Builds the result card as a [`MarkupNode`] tree rather than live DOM
//! nodes: one `ul.card` with a row per entry (annotated jyutping and
//! characters, indented english definitions, source attribution), an optional
//! trailing "More" button, and `debug-info` dumps of the raw payload when the
//! `debug=1` toggle is on. The host serializes and mounts the tree.

use crate::annotate::{wrap_characters, wrap_syllables};
use crate::markup::{parse_fragment, serialize, MarkupError, MarkupNode};
use crate::protocol::{Entry, SearchResultPage};

/// Render switches derived from the URL.
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderOptions {
    /// `debug=1`: dump timing and raw entry JSON alongside the results.
    pub debug: bool,
}

/// Render a result page. An empty page renders nothing at all; the host
/// shows its explanation panel instead.
pub fn render_page(
    page: &SearchResultPage,
    can_load_more: bool,
    options: &RenderOptions,
) -> Result<Vec<MarkupNode>, MarkupError> {
    if page.results.is_empty() {
        return Ok(Vec::new());
    }

    let mut card_children = Vec::new();

    if options.debug {
        card_children.push(debug_dump(&page.timings));
        card_children.push(MarkupNode::element("hr", vec![], vec![]));
    }

    for entry in &page.results {
        render_entry(entry, options, &mut card_children)?;
    }

    let mut out = vec![MarkupNode::element(
        "ul",
        vec![("class".to_string(), "card".to_string())],
        card_children,
    )];

    if can_load_more {
        out.push(MarkupNode::element(
            "button",
            vec![("class".to_string(), "load-more-btn".to_string())],
            vec![MarkupNode::Text("More".to_string())],
        ));
    }

    Ok(out)
}

/// Render one entry into card rows: the title row, one row per english
/// definition, and the attribution line.
fn render_entry(
    entry: &Entry,
    options: &RenderOptions,
    out: &mut Vec<MarkupNode>,
) -> Result<(), MarkupError> {
    let jyutping = wrap_syllables(&parse_fragment(&entry.jyutping)?);
    let characters = wrap_characters(&parse_fragment(&entry.characters)?);

    let jyutping_title = MarkupNode::element(
        "h3",
        vec![
            ("class".to_string(), "title".to_string()),
            ("title".to_string(), entry.entry_source.name().to_string()),
        ],
        jyutping,
    );
    let characters_title = MarkupNode::element(
        "h2",
        vec![("class".to_string(), "title".to_string())],
        characters,
    );

    out.push(MarkupNode::element(
        "li",
        vec![("class".to_string(), "card-item".to_string())],
        vec![
            MarkupNode::element(
                "span",
                vec![("class".to_string(), "item-jyutping".to_string())],
                vec![jyutping_title],
            ),
            MarkupNode::element(
                "span",
                vec![("class".to_string(), "item-english".to_string())],
                vec![characters_title],
            ),
        ],
    ));

    for english in &entry.english_definitions {
        // Pre-highlighted HTML from the engine.
        let children = parse_fragment(english)?;
        out.push(MarkupNode::element(
            "li",
            vec![("class".to_string(), "card-item".to_string())],
            vec![MarkupNode::element(
                "span",
                vec![("class".to_string(), "item-english indent".to_string())],
                children,
            )],
        ));
    }

    out.push(MarkupNode::element(
        "p",
        vec![(
            "class".to_string(),
            format!("item-english {}", entry.entry_source.css_class()),
        )],
        vec![MarkupNode::Text(
            entry.entry_source.attribution().to_string(),
        )],
    ));

    if options.debug {
        let raw = serde_json::to_value(entry).unwrap_or_default();
        out.push(debug_dump(&raw));
    }

    Ok(())
}

fn debug_dump(value: &serde_json::Value) -> MarkupNode {
    let pretty = serde_json::to_string_pretty(value).unwrap_or_default();
    MarkupNode::element(
        "div",
        vec![("class".to_string(), "debug-info".to_string())],
        vec![MarkupNode::element(
            "pre",
            vec![],
            vec![MarkupNode::Text(pretty)],
        )],
    )
}

/// [`render_page`] straight to an HTML string.
pub fn render_page_html(
    page: &SearchResultPage,
    can_load_more: bool,
    options: &RenderOptions,
) -> Result<String, MarkupError> {
    Ok(serialize(&render_page(page, can_load_more, options)?))
}

/// Explanatory state for a fatal initialization failure. Rendered instead of
/// results so the user never faces a silently dead input box.
pub fn render_unavailable(message: &str) -> MarkupNode {
    MarkupNode::element(
        "p",
        vec![("class".to_string(), "search-unavailable".to_string())],
        vec![MarkupNode::Text(format!(
            "Search is unavailable: {}",
            message
        ))],
    )
}
