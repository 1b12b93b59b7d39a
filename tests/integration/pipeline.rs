//! Input event → session → protocol → annotation → rendered HTML.

use jyutweb::highlight::{highlight, MatchSpan};
use jyutweb::render::{render_page_html, RenderOptions};
use jyutweb::session::{
    EngineError, InputPlan, SearchEngine, SessionController, SessionUpdate, UrlAction,
};
use serde_json::json;

/// Stand-in for the wasm engine: one fixed entry, pre-highlighted the same
/// way the real engine highlights matches, repeated to fill the page.
struct DictEngine;

impl DictEngine {
    fn entry(query: &str) -> serde_json::Value {
        let jyutping = "lou5 si1";
        let spans = match jyutping.find(query) {
            Some(start) => vec![MatchSpan::new(start, start + query.len())],
            None => Vec::new(),
        };
        json!({
            "characters": "老師",
            "jyutping": highlight(jyutping, &spans).unwrap(),
            "english_definitions": ["teacher"],
            "entry_source": "CEDict",
        })
    }
}

impl SearchEngine for DictEngine {
    fn search(&self, query: &str, limit: usize) -> Result<String, EngineError> {
        Ok(json!({
            "results": vec![Self::entry(query); limit],
            "timings": {"total_ms": 1},
        })
        .to_string())
    }
}

fn results_of(update: SessionUpdate) -> (jyutweb::SearchOutcome, Option<UrlAction>) {
    match update {
        SessionUpdate::Results {
            outcome,
            url_action,
        } => (outcome, url_action),
        other => panic!("expected results, got {:?}", other),
    }
}

#[test]
fn typed_query_renders_annotated_card() {
    let mut session = SessionController::new();
    let (outcome, url_action) = results_of(session.handle_input(&DictEngine, "lou5").unwrap());

    assert_eq!(url_action, Some(UrlAction::Set("lou5".to_string())));
    assert_eq!(outcome.page.results.len(), 12);
    assert!(outcome.can_load_more);

    let html =
        render_page_html(&outcome.page, outcome.can_load_more, &RenderOptions::default()).unwrap();
    // The highlighted syllable merged into a single word link.
    assert!(html.contains(
        "<a class=\"jyutping-link\" href=\"?q=lou5\">\
         <mark class=\"hit-highlight\">lou5</mark></a>"
    ));
    // Every character is its own link.
    assert!(html.contains("<a href=\"?q=%E8%80%81\" class=\"character-link\">老</a>"));
    assert!(html.contains("<a href=\"?q=%E5%B8%AB\" class=\"character-link\">師</a>"));
    assert!(html.ends_with("<button class=\"load-more-btn\">More</button>"));
}

#[test]
fn initial_url_query_searches_before_any_keystroke() {
    // Page load with ?q=si1: the host feeds the parameter straight in.
    let mut session = SessionController::new();
    let (outcome, _) = results_of(session.handle_input(&DictEngine, "si1").unwrap());
    assert_eq!(session.state().current_query, "si1");
    assert_eq!(outcome.limit, 12);
}

#[test]
fn cleared_input_clears_url_and_renders_nothing() {
    let mut session = SessionController::new();
    session.handle_input(&DictEngine, "lou5").unwrap();

    match session.handle_input(&DictEngine, "").unwrap() {
        SessionUpdate::Cleared { url_action } => assert_eq!(url_action, UrlAction::Clear),
        other => panic!("expected cleared, got {:?}", other),
    }

    // Nothing to render: zero entries means zero markup.
    let empty = jyutweb::SearchResultPage {
        results: vec![],
        timings: serde_json::Value::Null,
    };
    assert_eq!(
        render_page_html(&empty, false, &RenderOptions::default()).unwrap(),
        ""
    );
}

#[test]
fn load_more_doubles_and_renders_more_rows() {
    let mut session = SessionController::new();
    session.handle_input(&DictEngine, "lou5").unwrap();
    let (outcome, url_action) = match session.load_more(&DictEngine).unwrap() {
        Some(update) => results_of(update),
        None => panic!("expected an update"),
    };
    assert_eq!(outcome.limit, 24);
    assert_eq!(outcome.page.results.len(), 24);
    assert_eq!(url_action, None);
}

#[test]
fn debug_toggle_dumps_payloads() {
    let mut session = SessionController::new();
    let (outcome, _) = results_of(session.handle_input(&DictEngine, "lou5").unwrap());
    let html = render_page_html(
        &outcome.page,
        outcome.can_load_more,
        &RenderOptions { debug: true },
    )
    .unwrap();
    assert!(html.contains("debug-info"));
    assert!(html.contains("total_ms"));
}

#[test]
fn out_of_order_completions_render_latest_query_only() {
    let mut session = SessionController::new();
    let engine = DictEngine;

    let slow = match session.plan_input("lou") {
        InputPlan::Search(request) => request,
        other => panic!("expected search plan, got {:?}", other),
    };
    let fast = match session.plan_input("lou5") {
        InputPlan::Search(request) => request,
        other => panic!("expected search plan, got {:?}", other),
    };

    // The newer search completes first.
    let fast_json = engine.search(&fast.query, fast.limit).unwrap();
    let rendered = session.complete(&fast, &fast_json).unwrap().unwrap();
    assert_eq!(rendered.query, "lou5");

    // The older completion straggles in afterwards and is dropped.
    let slow_json = engine.search(&slow.query, slow.limit).unwrap();
    assert!(session.complete(&slow, &slow_json).unwrap().is_none());
}

#[test]
fn legacy_bare_array_engine_works_end_to_end() {
    struct LegacyEngine;
    impl SearchEngine for LegacyEngine {
        fn search(&self, _query: &str, _limit: usize) -> Result<String, EngineError> {
            Ok(json!([{
                "characters": "係",
                "jyutping": "hai6",
                "english_definitions": ["to be"],
                "entry_source": "CCanto",
            }])
            .to_string())
        }
    }

    let mut session = SessionController::new();
    let (outcome, _) = results_of(session.handle_input(&LegacyEngine, "hai").unwrap());
    assert!(!outcome.can_load_more);

    let html =
        render_page_html(&outcome.page, outcome.can_load_more, &RenderOptions::default()).unwrap();
    assert!(html.contains("<p class=\"item-english cc-canto\">(Sourced from CC-Canto)</p>"));
    assert!(!html.contains("load-more-btn"));
}

#[test]
fn engine_failure_surfaces_as_session_error() {
    struct BrokenEngine;
    impl SearchEngine for BrokenEngine {
        fn search(&self, _query: &str, _limit: usize) -> Result<String, EngineError> {
            Err(EngineError {
                detail: "index corrupted".to_string(),
            })
        }
    }

    let mut session = SessionController::new();
    let err = session.handle_input(&BrokenEngine, "lou5").unwrap_err();
    assert!(err.to_string().contains("index corrupted"));
}
