//! Like repository: post and comment like toggles.

use feedsync_remote::{Collection, DocRef};
use feedsync_store::{EdgeTable, LocalStore, Table};
use serde_json::json;
use std::sync::Arc;

use crate::counter::{CounterTxnEngine, EdgeMutation};
use crate::error::SyncResult;
use crate::model::now_millis;
use crate::repo::adjust_cached_counter;
use crate::worker::RemoteWriteWorker;

/// Toggles like edges for posts and comments.
///
/// A toggle sets the edge to the opposite of the last known **local**
/// state; because the local effect is applied first, rapid double-taps
/// are serialized by the store's write ordering. The remote effect is
/// a counter transaction queued on the background worker: its failure
/// is logged and swallowed, keeping the optimistic local state (the
/// documented no-rollback policy; `refresh` on the target entity
/// reconciles drift).
pub struct LikeRepository {
    local: Arc<LocalStore>,
    engine: Arc<CounterTxnEngine>,
    worker: Arc<RemoteWriteWorker>,
}

impl LikeRepository {
    /// Creates the repository.
    pub fn new(
        local: Arc<LocalStore>,
        engine: Arc<CounterTxnEngine>,
        worker: Arc<RemoteWriteWorker>,
    ) -> Self {
        Self {
            local,
            engine,
            worker,
        }
    }

    /// Returns whether `user_id` has liked the post, per local state.
    pub fn is_post_liked(&self, user_id: &str, post_id: &str) -> bool {
        self.local.has_edge(EdgeTable::PostLikes, post_id, user_id)
    }

    /// Returns whether `user_id` has liked the comment, per local state.
    pub fn is_comment_liked(&self, user_id: &str, comment_id: &str) -> bool {
        self.local
            .has_edge(EdgeTable::CommentLikes, comment_id, user_id)
    }

    /// Toggles a post like. Returns the new local liked state.
    pub fn toggle_post_like(&self, user_id: &str, post_id: &str) -> SyncResult<bool> {
        self.toggle(
            user_id,
            post_id,
            EdgeTable::PostLikes,
            Table::Posts,
            Collection::Reviews,
            "likedPostIds",
            "toggle_post_like",
        )
    }

    /// Toggles a comment like. Returns the new local liked state.
    pub fn toggle_comment_like(&self, user_id: &str, comment_id: &str) -> SyncResult<bool> {
        self.toggle(
            user_id,
            comment_id,
            EdgeTable::CommentLikes,
            Table::Comments,
            Collection::Comments,
            "likedCommentIds",
            "toggle_comment_like",
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn toggle(
        &self,
        user_id: &str,
        entity_id: &str,
        edge_table: EdgeTable,
        cache_table: Table,
        collection: Collection,
        member_field: &'static str,
        label: &'static str,
    ) -> SyncResult<bool> {
        let liked = self.local.has_edge(edge_table, entity_id, user_id);
        let delta: i64 = if liked { -1 } else { 1 };

        // Local effect first: edge row plus clamped cached counter.
        if liked {
            self.local.delete_edge(edge_table, entity_id, user_id);
        } else {
            self.local.put_edge(
                edge_table,
                entity_id,
                user_id,
                json!({ "createdAt": now_millis() }),
            );
        }
        adjust_cached_counter(&self.local, cache_table, entity_id, "likeCount", delta);

        // Remote effect: counter transaction, best-effort.
        let engine = Arc::clone(&self.engine);
        let aggregate = DocRef::new(collection, entity_id);
        let user_doc = DocRef::new(Collection::Users, user_id);
        let member = json!(entity_id);
        self.worker.submit(label, move || {
            let edge = if liked {
                EdgeMutation::RemoveMember {
                    doc: user_doc,
                    field: member_field.to_string(),
                    value: member,
                }
            } else {
                EdgeMutation::AddMember {
                    doc: user_doc,
                    field: member_field.to_string(),
                    value: member,
                }
            };
            engine
                .apply_delta(&aggregate, "likeCount", delta, &edge)
                .map(|_| ())
        });

        Ok(!liked)
    }
}
