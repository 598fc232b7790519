//! Entity repositories.
//!
//! Each repository composes the local store, the remote store, the
//! counter transaction engine and the shared remote-write worker into
//! the uniform contract: observe local, mutate local optimistically,
//! mutate remote best-effort, refresh local from remote on demand.

mod comment;
mod follow;
mod like;
mod post;
mod profile;
mod restaurant;

pub use comment::{CommentRepository, NewComment};
pub use follow::FollowRepository;
pub use like::LikeRepository;
pub use post::{NewPost, PostRepository};
pub use profile::ProfileRepository;
pub use restaurant::RestaurantRepository;

use feedsync_remote::RemoteStore;
use feedsync_store::{LocalStore, Table};
use serde_json::Value;
use std::sync::Arc;

use crate::counter::CounterTxnEngine;
use crate::retry::RetryPolicy;
use crate::worker::RemoteWriteWorker;

/// Applies the clamped counter adjustment to a cached row, mirroring
/// the `max(0, x + delta)` the remote side uses. A missing row or a
/// non-object row is left untouched; refresh will reconcile it.
pub(crate) fn adjust_cached_counter(
    local: &LocalStore,
    table: Table,
    key: &str,
    field: &str,
    delta: i64,
) {
    if let Some(mut row) = local.get(table, key) {
        if let Some(obj) = row.as_object_mut() {
            let current = obj.get(field).and_then(Value::as_i64).unwrap_or(0);
            obj.insert(field.to_string(), Value::from((current + delta).max(0)));
            local.upsert(table, key, row);
        }
    }
}

/// The full repository set over one local/remote store pair.
///
/// All repositories share one remote-write worker (so best-effort
/// writes retain submission order) and one counter engine.
pub struct Repositories {
    /// Post repository.
    pub posts: PostRepository,
    /// Comment repository.
    pub comments: CommentRepository,
    /// Like repository.
    pub likes: LikeRepository,
    /// Follow repository.
    pub follows: FollowRepository,
    /// Restaurant repository.
    pub restaurants: RestaurantRepository,
    /// Profile repository.
    pub profiles: ProfileRepository,
    worker: Arc<RemoteWriteWorker>,
}

impl Repositories {
    /// Builds the repository set with the default retry policy.
    pub fn new(local: Arc<LocalStore>, remote: Arc<dyn RemoteStore>) -> Self {
        Self::with_retry(local, remote, RetryPolicy::default())
    }

    /// Builds the repository set with a custom retry policy.
    pub fn with_retry(
        local: Arc<LocalStore>,
        remote: Arc<dyn RemoteStore>,
        retry: RetryPolicy,
    ) -> Self {
        let worker = Arc::new(RemoteWriteWorker::new());
        let engine = Arc::new(CounterTxnEngine::new(Arc::clone(&remote), retry));
        Self {
            posts: PostRepository::new(
                Arc::clone(&local),
                Arc::clone(&remote),
                Arc::clone(&worker),
            ),
            comments: CommentRepository::new(
                Arc::clone(&local),
                Arc::clone(&remote),
                Arc::clone(&engine),
            ),
            likes: LikeRepository::new(
                Arc::clone(&local),
                Arc::clone(&engine),
                Arc::clone(&worker),
            ),
            follows: FollowRepository::new(
                Arc::clone(&local),
                Arc::clone(&remote),
                Arc::clone(&worker),
            ),
            restaurants: RestaurantRepository::new(Arc::clone(&local), Arc::clone(&remote)),
            profiles: ProfileRepository::new(Arc::clone(&local), Arc::clone(&remote)),
            worker,
        }
    }

    /// Blocks until every queued best-effort remote write has run.
    ///
    /// Useful in tests and before process shutdown.
    pub fn flush(&self) {
        self.worker.flush();
    }
}
