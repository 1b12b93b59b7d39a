//! Asset cache behavior against an in-memory store and a counting fetcher.

use jyutweb::cache::{AssetCache, BlobFetcher, BlobStore, FetchError};
use jyutweb::markup::serialize;
use jyutweb::render::render_unavailable;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;

const DICT: &str = "full.jyp_dict";

#[derive(Default)]
struct MemStore {
    blobs: RefCell<HashMap<String, Vec<u8>>>,
}

impl BlobStore for MemStore {
    type Error = String;

    async fn get(&self, filename: &str) -> Result<Option<Vec<u8>>, String> {
        Ok(self.blobs.borrow().get(filename).cloned())
    }

    async fn put(&self, filename: &str, bytes: &[u8]) -> Result<(), String> {
        self.blobs
            .borrow_mut()
            .insert(filename.to_string(), bytes.to_vec());
        Ok(())
    }
}

struct Network {
    calls: Cell<usize>,
    response: Result<Vec<u8>, FetchError>,
}

impl BlobFetcher for Network {
    async fn fetch(&self, _filename: &str) -> Result<Vec<u8>, FetchError> {
        self.calls.set(self.calls.get() + 1);
        self.response.clone()
    }
}

#[tokio::test]
async fn cold_then_warm_load_fetches_exactly_once() {
    let network = Network {
        calls: Cell::new(0),
        response: Ok(b"dictionary blob".to_vec()),
    };
    let store = MemStore::default();
    let cache = AssetCache::new(&store, &network);

    // Cold: one fetch, write-back into the store.
    let first = cache.load(DICT).await.unwrap();
    assert_eq!(first, b"dictionary blob");
    assert_eq!(network.calls.get(), 1);
    assert!(store.blobs.borrow().contains_key(DICT));

    // Warm: served from the store, zero further fetches.
    let second = cache.load(DICT).await.unwrap();
    assert_eq!(second, first);
    assert_eq!(network.calls.get(), 1);
}

#[tokio::test]
async fn fatal_load_failure_renders_an_explanation() {
    let network = Network {
        calls: Cell::new(0),
        response: Err(FetchError::Status {
            status: 503,
            status_text: "Service Unavailable".to_string(),
        }),
    };
    let cache = AssetCache::new(MemStore::default(), network);

    let err = cache.load(DICT).await.unwrap_err();
    let html = serialize(&[render_unavailable(&err.to_string())]);
    assert!(html.contains("search-unavailable"));
    assert!(html.contains("full.jyp_dict"));
    assert!(html.contains("HTTP 503 Service Unavailable"));
}
