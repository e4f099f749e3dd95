//! Catalog seams used by the resolver.
//!
//! Both traits are infallible at the call site: catalog clients swallow
//! their own failures and report "no results" so the resolver can always
//! move on to the next source.

use async_trait::async_trait;
use thiserror::Error;

use crate::candidate::MediaCandidate;
use crate::itunes::{ItunesMedia, ItunesResult};

/// Failures inside a catalog client. Never crosses the client boundary.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Upstream answered with a non-2xx status.
    #[error("HTTP {status}: {reason}")]
    Status { status: u16, reason: String },

    /// Connection or transport failure.
    #[error("Network error: {0}")]
    Network(String),

    /// Response body did not match the expected shape.
    #[error("Decode error: {0}")]
    Decode(String),
}

/// Rich metadata catalog returning at most one best-guess candidate.
#[async_trait]
pub trait PrimaryCatalog: Send + Sync {
    async fn search(&self, query: &str) -> Vec<MediaCandidate>;
}

/// Simpler catalog searched once per media kind; results are raw.
#[async_trait]
pub trait SecondaryCatalog: Send + Sync {
    async fn search(&self, term: &str, media: ItunesMedia) -> Vec<ItunesResult>;
}

// ============================================================================
// Mock Implementations (Test Only)
// ============================================================================

#[cfg(test)]
pub mod mock {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    /// Primary catalog returning a fixed list and counting calls.
    #[derive(Default)]
    pub struct MockPrimary {
        pub results: Vec<MediaCandidate>,
        pub calls: AtomicUsize,
    }

    impl MockPrimary {
        pub fn new(results: Vec<MediaCandidate>) -> Self {
            Self {
                results,
                calls: AtomicUsize::new(0),
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PrimaryCatalog for MockPrimary {
        async fn search(&self, _query: &str) -> Vec<MediaCandidate> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.results.clone()
        }
    }

    /// Secondary catalog with separate movie and TV result lists.
    #[derive(Default)]
    pub struct MockSecondary {
        pub movies: Vec<ItunesResult>,
        pub tv_shows: Vec<ItunesResult>,
        pub requested: Mutex<Vec<ItunesMedia>>,
    }

    impl MockSecondary {
        pub fn new(movies: Vec<ItunesResult>, tv_shows: Vec<ItunesResult>) -> Self {
            Self {
                movies,
                tv_shows,
                requested: Mutex::new(Vec::new()),
            }
        }

        pub fn calls(&self) -> usize {
            self.requested.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl SecondaryCatalog for MockSecondary {
        async fn search(&self, _term: &str, media: ItunesMedia) -> Vec<ItunesResult> {
            self.requested.lock().unwrap().push(media);
            match media {
                ItunesMedia::Movie => self.movies.clone(),
                ItunesMedia::TvShow => self.tv_shows.clone(),
            }
        }
    }
}
