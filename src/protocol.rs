// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Engine wire protocol: decode search result JSON into one canonical shape.
//!
//! The engine has shipped two payload shapes over its lifetime: a bare array
//! of entries, and an envelope `{results, timings}` where each result may
//! additionally wrap its display fields under `rendered_entry`. Both are
//! accepted here and normalized, so the rest of the crate only ever sees
//! [`SearchResultPage`]. A payload that fits neither shape is a loud
//! [`ProtocolError`], never a silently empty result list.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Which dictionary a result entry came from. Drives display styling and
/// attribution text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntrySource {
    CEDict,
    CCanto,
}

impl EntrySource {
    /// The wire name, as it appears in the engine's JSON.
    pub fn name(&self) -> &'static str {
        match self {
            EntrySource::CEDict => "CEDict",
            EntrySource::CCanto => "CCanto",
        }
    }

    /// CSS class used to colour the attribution line.
    pub fn css_class(&self) -> &'static str {
        match self {
            EntrySource::CEDict => "ce-dict",
            EntrySource::CCanto => "cc-canto",
        }
    }

    /// Human-readable attribution line.
    pub fn attribution(&self) -> &'static str {
        match self {
            EntrySource::CEDict => "(Sourced from CEDict)",
            EntrySource::CCanto => "(Sourced from CC-Canto)",
        }
    }
}

/// One decoded result entry. The `characters` and `jyutping` fields are HTML
/// fragments that may already contain highlight markup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub characters: String,
    pub jyutping: String,
    pub english_definitions: Vec<String>,
    pub entry_source: EntrySource,
}

/// The canonical result envelope.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResultPage {
    pub results: Vec<Entry>,
    /// Opaque diagnostic payload, dumped verbatim by the debug panel.
    pub timings: Value,
}

/// Error type for malformed engine payloads.
#[derive(Debug)]
pub enum ProtocolError {
    /// The payload is not valid JSON or fits neither known shape.
    Decode(serde_json::Error),
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::Decode(err) => write!(f, "malformed search result payload: {}", err),
        }
    }
}

impl std::error::Error for ProtocolError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProtocolError::Decode(err) => Some(err),
        }
    }
}

/// Either protocol shape for one entry.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawEntry {
    Wrapped { rendered_entry: Entry },
    Flat(Entry),
}

impl RawEntry {
    fn into_entry(self) -> Entry {
        match self {
            RawEntry::Wrapped { rendered_entry } => rendered_entry,
            RawEntry::Flat(entry) => entry,
        }
    }
}

/// Either protocol shape for a whole page.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawPage {
    Envelope {
        results: Vec<RawEntry>,
        #[serde(default)]
        timings: Value,
    },
    Bare(Vec<RawEntry>),
}

/// Decode an engine payload, accepting both historical shapes.
pub fn decode_page(json: &str) -> Result<SearchResultPage, ProtocolError> {
    let raw: RawPage = serde_json::from_str(json).map_err(ProtocolError::Decode)?;
    Ok(match raw {
        RawPage::Envelope { results, timings } => SearchResultPage {
            results: results.into_iter().map(RawEntry::into_entry).collect(),
            timings,
        },
        RawPage::Bare(results) => SearchResultPage {
            results: results.into_iter().map(RawEntry::into_entry).collect(),
            timings: Value::Null,
        },
    })
}
