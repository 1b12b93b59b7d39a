// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Tiered asset cache: persistent-store-first, network-fallback blob loads.
//!
//! The dictionary blob is large and effectively immutable, so it is cached in
//! a persistent key-value store keyed by filename with no expiry: presence is
//! validity. A load tries the store first; any store failure or miss falls
//! through to a network fetch; a successful fetch is written back on a
//! best-effort basis.
//!
//! Error severity is asymmetric by design. Store trouble is *degraded*: it is
//! logged and the load recovers via the network. Fetch trouble with no cache
//! hit is *fatal*: there is no dictionary, so the caller must disable search
//! and surface an explanation rather than leave a dead input box.
//!
//! Net effect: at most one network transfer per filename per process
//! lifetime, unless the store is cleared externally.

use std::fmt;

/// Persistent key-value storage for binary blobs.
///
/// Implementations cover store opening as part of `get`/`put`; an open
/// failure surfaces as the operation's error. Each call is atomic, and both
/// are allowed to fail without failing the overall load.
pub trait BlobStore {
    type Error: fmt::Display;

    /// Read a blob by filename. `Ok(None)` is a miss.
    fn get(
        &self,
        filename: &str,
    ) -> impl std::future::Future<Output = Result<Option<Vec<u8>>, Self::Error>>;

    /// Write a blob back under its filename.
    fn put(
        &self,
        filename: &str,
        bytes: &[u8],
    ) -> impl std::future::Future<Output = Result<(), Self::Error>>;
}

/// Network access to the blob's fixed relative path.
///
/// Browser implementations should request with an aggressive cache directive
/// (`force-cache`): the blob never changes under a given filename.
pub trait BlobFetcher {
    fn fetch(
        &self,
        filename: &str,
    ) -> impl std::future::Future<Output = Result<Vec<u8>, FetchError>>;
}

impl<S: BlobStore> BlobStore for &S {
    type Error = S::Error;

    async fn get(&self, filename: &str) -> Result<Option<Vec<u8>>, Self::Error> {
        (**self).get(filename).await
    }

    async fn put(&self, filename: &str, bytes: &[u8]) -> Result<(), Self::Error> {
        (**self).put(filename, bytes).await
    }
}

impl<F: BlobFetcher> BlobFetcher for &F {
    async fn fetch(&self, filename: &str) -> Result<Vec<u8>, FetchError> {
        (**self).fetch(filename).await
    }
}

/// How a network fetch failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The server answered with a non-success status.
    Status { status: u16, status_text: String },
    /// The request never completed.
    Transport { detail: String },
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Status {
                status,
                status_text,
            } => write!(f, "HTTP {} {}", status, status_text),
            FetchError::Transport { detail } => write!(f, "transport failure: {}", detail),
        }
    }
}

/// Fatal load failure: no cache hit and the network fetch failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadError {
    pub filename: String,
    pub cause: FetchError,
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to load '{}': {}", self.filename, self.cause)
    }
}

impl std::error::Error for LoadError {}

/// The cache itself: a store tier over a fetch tier.
pub struct AssetCache<S, F> {
    store: S,
    fetcher: F,
}

impl<S: BlobStore, F: BlobFetcher> AssetCache<S, F> {
    pub fn new(store: S, fetcher: F) -> Self {
        AssetCache { store, fetcher }
    }

    /// Load a blob, store-first with network fallback and write-back.
    ///
    /// Never returns partial data. A store hit returns immediately with no
    /// network call and no freshness check. Store read and write failures are
    /// logged and swallowed; only a failed fetch with no cache hit is fatal.
    pub async fn load(&self, filename: &str) -> Result<Vec<u8>, LoadError> {
        match self.store.get(filename).await {
            Ok(Some(bytes)) => {
                tracing::debug!(filename, len = bytes.len(), "blob served from store");
                return Ok(bytes);
            }
            Ok(None) => {}
            Err(err) => {
                tracing::warn!(
                    filename,
                    error = %err,
                    "blob store read failed, falling back to network"
                );
            }
        }

        let bytes = self
            .fetcher
            .fetch(filename)
            .await
            .map_err(|cause| LoadError {
                filename: filename.to_string(),
                cause,
            })?;
        tracing::debug!(filename, len = bytes.len(), "blob fetched from network");

        if let Err(err) = self.store.put(filename, &bytes).await {
            tracing::warn!(filename, error = %err, "blob write-back failed");
        }

        Ok(bytes)
    }
}
