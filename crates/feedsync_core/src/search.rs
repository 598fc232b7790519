//! Debounced title search.
//!
//! The coordinator owns a worker thread that turns a stream of
//! keystroke-level query updates into at most one remote search per
//! quiet period. Results are upserted into the local post cache (so
//! observers see them) and the matching ids are published for the
//! search screen to render.

use feedsync_remote::{Collection, RemoteStore};
use feedsync_store::{LocalStore, RowCodec, Table};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::dedup::case_variants;
use crate::model::Post;

const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);
const QUERY_LIMIT: usize = 50;

/// Client-side result filter applied after the remote prefix search.
///
/// The remote store can range-query one field per query, so rating and
/// price constraints are filtered here.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchFilter {
    /// Minimum rating, inclusive.
    pub min_rating: Option<i64>,
    /// Minimum price per person, inclusive.
    pub min_price: Option<i64>,
    /// Maximum price per person, inclusive.
    pub max_price: Option<i64>,
}

impl SearchFilter {
    fn admits(&self, post: &Post) -> bool {
        if let Some(min) = self.min_rating {
            if post.rating < min {
                return false;
            }
        }
        if let Some(min) = self.min_price {
            if post.price_per_person < min {
                return false;
            }
        }
        if let Some(max) = self.max_price {
            if post.price_per_person > max {
                return false;
            }
        }
        true
    }
}

enum Command {
    Query(String),
}

struct Inner {
    local: Arc<LocalStore>,
    remote: Arc<dyn RemoteStore>,
    filter: RwLock<SearchFilter>,
    results: RwLock<Vec<String>>,
    searches_run: AtomicU64,
}

impl Inner {
    /// One remote search: case-variant prefix queries on the title,
    /// merged by document id, filtered client-side, cached locally.
    fn run_search(&self, query: &str) {
        let trimmed = query.trim();
        if trimmed.is_empty() {
            *self.results.write() = Vec::new();
            return;
        }

        let mut merged: BTreeMap<String, Post> = BTreeMap::new();
        for variant in case_variants(trimmed) {
            match self
                .remote
                .query_prefix(Collection::Reviews, "title", &variant, QUERY_LIMIT)
            {
                Ok(docs) => {
                    for (id, doc) in docs {
                        match Post::from_fields(&doc.fields) {
                            Ok(post) => {
                                merged.entry(id).or_insert(post);
                            }
                            Err(error) => {
                                tracing::warn!(%error, id, "skipping undecodable search result");
                            }
                        }
                    }
                }
                Err(error) => {
                    tracing::debug!(%error, variant, "search query failed, partial results");
                }
            }
        }

        let filter = self.filter.read().clone();
        let mut ids = Vec::new();
        for (id, post) in merged {
            if !filter.admits(&post) {
                continue;
            }
            match post.encode() {
                Ok(value) => {
                    self.local.upsert(Table::Posts, &id, value);
                    ids.push(id);
                }
                Err(error) => {
                    tracing::warn!(%error, id, "failed to cache search result");
                }
            }
        }

        *self.results.write() = ids;
        self.searches_run.fetch_add(1, Ordering::SeqCst);
    }
}

/// Debounced search over post titles.
pub struct SearchCoordinator {
    inner: Arc<Inner>,
    tx: Option<Sender<Command>>,
    handle: Option<JoinHandle<()>>,
}

impl SearchCoordinator {
    /// Creates a coordinator with the default debounce window.
    pub fn new(local: Arc<LocalStore>, remote: Arc<dyn RemoteStore>) -> Self {
        Self::with_debounce(local, remote, DEFAULT_DEBOUNCE)
    }

    /// Creates a coordinator with a custom debounce window.
    pub fn with_debounce(
        local: Arc<LocalStore>,
        remote: Arc<dyn RemoteStore>,
        debounce: Duration,
    ) -> Self {
        let inner = Arc::new(Inner {
            local,
            remote,
            filter: RwLock::new(SearchFilter::default()),
            results: RwLock::new(Vec::new()),
            searches_run: AtomicU64::new(0),
        });

        let (tx, rx) = mpsc::channel::<Command>();
        let worker = Arc::clone(&inner);
        let handle = thread::Builder::new()
            .name("feedsync-search".into())
            .spawn(move || {
                while let Ok(Command::Query(mut query)) = rx.recv() {
                    // Debounce: keep absorbing newer queries until the
                    // channel stays quiet for a full window.
                    loop {
                        match rx.recv_timeout(debounce) {
                            Ok(Command::Query(newer)) => query = newer,
                            Err(RecvTimeoutError::Timeout) => break,
                            Err(RecvTimeoutError::Disconnected) => return,
                        }
                    }
                    worker.run_search(&query);
                }
            })
            .expect("failed to spawn search worker");

        Self {
            inner,
            tx: Some(tx),
            handle: Some(handle),
        }
    }

    /// Submits a query update. Rapid successive calls coalesce into one
    /// remote search for the last value.
    pub fn set_query(&self, query: impl Into<String>) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(Command::Query(query.into()));
        }
    }

    /// Replaces the result filter. Applies to the next search run.
    pub fn set_filter(&self, filter: SearchFilter) {
        *self.inner.filter.write() = filter;
    }

    /// Returns the post ids of the latest completed search.
    pub fn latest_results(&self) -> Vec<String> {
        self.inner.results.read().clone()
    }

    /// Number of remote searches actually executed.
    pub fn searches_run(&self) -> u64 {
        self.inner.searches_run.load(Ordering::SeqCst)
    }
}

impl Drop for SearchCoordinator {
    fn drop(&mut self) {
        self.tx.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
