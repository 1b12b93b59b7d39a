//! WebAssembly bindings for the dictionary front-end core.
//!
//! Provides the browser-facing surface:
//! - `load_dictionary`: tiered blob load (IndexedDB first, then `fetch`)
//! - `WebSession`: the session controller wrapped around a JS search callback
//!
//! The engine itself stays on the JS side as a callback returning result
//! JSON; everything here just drives the portable core and maps errors into
//! `JsValue` strings, matching the upstream engine's wasm conventions.

use crate::cache::{AssetCache, BlobFetcher, BlobStore, FetchError};
use crate::render::{render_page_html, RenderOptions};
use crate::session::{
    EngineError, SearchEngine, SessionController, SessionUpdate, UrlAction,
};
use js_sys::{Promise, Uint8Array};
use serde::Serialize;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{IdbDatabase, IdbOpenDbRequest, IdbRequest, IdbTransactionMode};

/// Fixed persistent store layout, shared with earlier deployments so an
/// already-cached blob survives the upgrade.
const DB_NAME: &str = "jyutping_dict_cache";
const DB_VERSION: u32 = 1;
const STORE_NAME: &str = "jyut";

fn js_detail(value: JsValue) -> String {
    value
        .as_string()
        .or_else(|| {
            value
                .dyn_ref::<js_sys::Error>()
                .map(|e| String::from(e.message()))
        })
        .unwrap_or_else(|| format!("{:?}", value))
}

/// Resolve an IndexedDB request into a future over its `result`.
fn idb_request_future(request: IdbRequest) -> JsFuture {
    let promise = Promise::new(&mut |resolve, reject| {
        let req = request.clone();
        let onsuccess = Closure::once_into_js(move |_: web_sys::Event| {
            let value = req.result().unwrap_or(JsValue::UNDEFINED);
            let _ = resolve.call1(&JsValue::UNDEFINED, &value);
        });
        request.set_onsuccess(Some(onsuccess.unchecked_ref()));

        let req = request.clone();
        let onerror = Closure::once_into_js(move |_: web_sys::Event| {
            let detail = req
                .error()
                .ok()
                .flatten()
                .map(JsValue::from)
                .unwrap_or_else(|| JsValue::from_str("IndexedDB request failed"));
            let _ = reject.call1(&JsValue::UNDEFINED, &detail);
        });
        request.set_onerror(Some(onerror.unchecked_ref()));
    });
    JsFuture::from(promise)
}

/// [`BlobStore`] over IndexedDB: one fixed-name database and object store,
/// keyed by filename. Schema creation happens idempotently on upgrade.
#[derive(Default)]
pub struct IdbBlobStore;

impl IdbBlobStore {
    async fn open(&self) -> Result<IdbDatabase, String> {
        let window = web_sys::window().ok_or("no window")?;
        let factory = window
            .indexed_db()
            .map_err(js_detail)?
            .ok_or("IndexedDB unavailable")?;
        let request: IdbOpenDbRequest = factory
            .open_with_u32(DB_NAME, DB_VERSION)
            .map_err(js_detail)?;

        let open_request = request.clone();
        let onupgradeneeded = Closure::once_into_js(move |_: web_sys::Event| {
            if let Ok(result) = open_request.result() {
                if let Ok(db) = result.dyn_into::<IdbDatabase>() {
                    if !db.object_store_names().contains(STORE_NAME) {
                        let _ = db.create_object_store(STORE_NAME);
                    }
                }
            }
        });
        request.set_onupgradeneeded(Some(onupgradeneeded.unchecked_ref()));

        let db = idb_request_future(request.into()).await.map_err(js_detail)?;
        db.dyn_into::<IdbDatabase>()
            .map_err(|_| "IndexedDB open returned a non-database".to_string())
    }
}

impl BlobStore for IdbBlobStore {
    type Error = String;

    async fn get(&self, filename: &str) -> Result<Option<Vec<u8>>, String> {
        let db = self.open().await?;
        let transaction = db.transaction_with_str(STORE_NAME).map_err(js_detail)?;
        let store = transaction.object_store(STORE_NAME).map_err(js_detail)?;
        let request = store.get(&JsValue::from_str(filename)).map_err(js_detail)?;
        let value = idb_request_future(request).await.map_err(js_detail)?;
        if value.is_undefined() || value.is_null() {
            return Ok(None);
        }
        Ok(Some(Uint8Array::new(&value).to_vec()))
    }

    async fn put(&self, filename: &str, bytes: &[u8]) -> Result<(), String> {
        let db = self.open().await?;
        let transaction = db
            .transaction_with_str_and_mode(STORE_NAME, IdbTransactionMode::Readwrite)
            .map_err(js_detail)?;
        let store = transaction.object_store(STORE_NAME).map_err(js_detail)?;
        let value = Uint8Array::from(bytes);
        let request = store
            .put_with_key(&value.into(), &JsValue::from_str(filename))
            .map_err(js_detail)?;
        idb_request_future(request).await.map_err(js_detail)?;
        Ok(())
    }
}

/// [`BlobFetcher`] over `fetch` with `cache: force-cache`; the blob never
/// changes under a given filename.
pub struct FetchBlobFetcher;

impl BlobFetcher for FetchBlobFetcher {
    async fn fetch(&self, filename: &str) -> Result<Vec<u8>, FetchError> {
        let transport = |value: JsValue| FetchError::Transport {
            detail: js_detail(value),
        };

        let window = web_sys::window().ok_or_else(|| FetchError::Transport {
            detail: "no window".to_string(),
        })?;
        let init = web_sys::RequestInit::new();
        init.set_cache(web_sys::RequestCache::ForceCache);

        let response = JsFuture::from(window.fetch_with_str_and_init(filename, &init))
            .await
            .map_err(transport)?;
        let response: web_sys::Response = response.dyn_into().map_err(transport)?;
        if !response.ok() {
            return Err(FetchError::Status {
                status: response.status(),
                status_text: response.status_text(),
            });
        }

        let buffer = JsFuture::from(response.array_buffer().map_err(transport)?)
            .await
            .map_err(transport)?;
        Ok(Uint8Array::new(&buffer).to_vec())
    }
}

/// Load the dictionary blob, IndexedDB first with network fallback.
///
/// A rejection here is the fatal-init case: the caller must disable search
/// and surface the message instead of leaving a dead input.
#[wasm_bindgen]
pub async fn load_dictionary(filename: String) -> Result<Uint8Array, JsValue> {
    let cache = AssetCache::new(IdbBlobStore, FetchBlobFetcher);
    let bytes = cache
        .load(&filename)
        .await
        .map_err(|err| JsValue::from_str(&err.to_string()))?;
    Ok(Uint8Array::from(bytes.as_slice()))
}

struct JsEngine<'a>(&'a js_sys::Function);

impl SearchEngine for JsEngine<'_> {
    fn search(&self, query: &str, limit: usize) -> Result<String, EngineError> {
        let result = self
            .0
            .call2(
                &JsValue::UNDEFINED,
                &JsValue::from_str(query),
                &JsValue::from_f64(limit as f64),
            )
            .map_err(|value| EngineError {
                detail: js_detail(value),
            })?;
        result.as_string().ok_or_else(|| EngineError {
            detail: "engine returned a non-string result".to_string(),
        })
    }
}

/// Session update for the JS host.
#[derive(Serialize)]
struct UpdateOutput {
    /// Rendered results HTML; empty on clear or stale.
    html: String,
    /// New value for the URL `q` parameter, when it should be set.
    url_query: Option<String>,
    /// True when the `q` parameter should be removed.
    clear_url: bool,
    /// True when a "load more" press may produce more results.
    can_load_more: bool,
    /// True when this update lost a race with a newer input and should be
    /// ignored.
    stale: bool,
}

/// The search session, driven from JS input events.
#[wasm_bindgen]
pub struct WebSession {
    controller: SessionController,
    search: js_sys::Function,
    options: RenderOptions,
}

#[wasm_bindgen]
impl WebSession {
    /// `search(query: string, limit: number) -> string` is the engine's JSON
    /// search interface; `debug` mirrors the `debug=1` URL toggle.
    #[wasm_bindgen(constructor)]
    pub fn new(search: js_sys::Function, debug: bool) -> WebSession {
        WebSession {
            controller: SessionController::new(),
            search,
            options: RenderOptions { debug },
        }
    }

    /// Feed one input event (or the initial URL `q` value) through the
    /// session. Returns `{html, url_query, clear_url, can_load_more, stale}`.
    pub fn handle_input(&mut self, text: &str) -> Result<JsValue, JsValue> {
        let update = self
            .controller
            .handle_input(&JsEngine(&self.search), text)
            .map_err(|err| JsValue::from_str(&err.to_string()))?;
        self.output(update)
    }

    /// Double the page size and re-run the current query.
    pub fn load_more(&mut self) -> Result<JsValue, JsValue> {
        let update = self
            .controller
            .load_more(&JsEngine(&self.search))
            .map_err(|err| JsValue::from_str(&err.to_string()))?;
        match update {
            Some(update) => self.output(update),
            None => self.output(SessionUpdate::Stale),
        }
    }

    fn output(&self, update: SessionUpdate) -> Result<JsValue, JsValue> {
        let output = match update {
            SessionUpdate::Cleared { .. } => UpdateOutput {
                html: String::new(),
                url_query: None,
                clear_url: true,
                can_load_more: false,
                stale: false,
            },
            SessionUpdate::Results {
                outcome,
                url_action,
            } => {
                let html = render_page_html(&outcome.page, outcome.can_load_more, &self.options)
                    .map_err(|err| JsValue::from_str(&err.to_string()))?;
                UpdateOutput {
                    html,
                    url_query: match url_action {
                        Some(UrlAction::Set(query)) => Some(query),
                        _ => None,
                    },
                    clear_url: false,
                    can_load_more: outcome.can_load_more,
                    stale: false,
                }
            }
            SessionUpdate::Stale => UpdateOutput {
                html: String::new(),
                url_query: None,
                clear_url: false,
                can_load_more: false,
                stale: true,
            },
        };
        serde_wasm_bindgen::to_value(&output).map_err(|err| JsValue::from_str(&err.to_string()))
    }
}
