//! Browser front-end core for a Jyutping dictionary search engine.
//!
//! The engine itself (index construction from a binary blob, prefix search,
//! ranking) is an external collaborator reached through the [`session::SearchEngine`]
//! trait. This crate owns everything around it: acquiring the dictionary
//! blob, driving query and pagination state, and rewriting the engine's
//! highlighted result markup into interactive, link-wrapped markup.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  bytes   ┌────────────────┐  JSON   ┌──────────────┐
//! │   cache.rs   │─────────▶│ external engine│────────▶│ protocol.rs  │
//! │ (AssetCache) │          │ (host-provided)│         │ (decode_page)│
//! └──────────────┘          └────────────────┘         └──────┬───────┘
//!        ▲                          ▲                         │
//!        │                   ┌──────┴───────┐                 ▼
//!        │                   │  session.rs  │          ┌──────────────┐
//!   IndexedDB / fetch        │ (controller, │          │ annotate.rs  │
//!   (wasm.rs, feature)       │   tickets)   │          │ highlight.rs │
//!                            └──────────────┘          └──────┬───────┘
//!                                                             ▼
//!                                                      ┌──────────────┐
//!                                                      │  render.rs   │
//!                                                      │ (markup.rs)  │
//!                                                      └──────────────┘
//! ```
//!
//! Everything is expressed over the [`markup::MarkupNode`] tree rather than a
//! live DOM, so the whole pipeline runs and tests natively; the `wasm`
//! feature adds the browser bindings (IndexedDB blob store, `fetch` loader,
//! and a `wasm-bindgen` session surface).
//!
//! # Usage
//!
//! ```ignore
//! use jyutweb::session::{SessionController, SessionUpdate};
//! use jyutweb::render::{render_page_html, RenderOptions};
//!
//! let mut session = SessionController::new();
//! match session.handle_input(&engine, "lou5")? {
//!     SessionUpdate::Results { outcome, .. } => {
//!         let html = render_page_html(&outcome.page, outcome.can_load_more,
//!                                     &RenderOptions::default())?;
//!         // mount html, apply url action
//!     }
//!     _ => {}
//! }
//! ```

pub mod annotate;
pub mod cache;
pub mod highlight;
pub mod markup;
pub mod protocol;
pub mod render;
pub mod session;

#[cfg(feature = "wasm")]
pub mod wasm;

// Re-exports for the common pipeline.
pub use annotate::{annotate_characters, annotate_jyutping, wrap_characters, wrap_syllables};
pub use cache::{AssetCache, BlobFetcher, BlobStore, FetchError, LoadError};
pub use highlight::{highlight, HighlightError, MatchSpan};
pub use markup::{parse_fragment, serialize, MarkupError, MarkupNode};
pub use protocol::{decode_page, Entry, EntrySource, ProtocolError, SearchResultPage};
pub use render::{render_page, render_page_html, render_unavailable, RenderOptions};
pub use session::{
    InputPlan, SearchEngine, SearchOutcome, SessionController, SessionError, SessionState,
    SessionUpdate, Ticket, UrlAction, INITIAL_MAX_RESULTS,
};
