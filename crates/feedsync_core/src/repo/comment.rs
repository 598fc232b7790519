//! Comment repository.

use feedsync_remote::{Collection, DocRef, RemoteStore};
use feedsync_store::{EdgeTable, LocalStore, Table, TypedSubscription, TypedTable};
use std::sync::Arc;
use uuid::Uuid;

use crate::counter::{CounterTxnEngine, EdgeMutation};
use crate::error::{SyncError, SyncResult};
use crate::model::{now_millis, Comment};
use crate::repo::adjust_cached_counter;

/// A mutation intent for creating a comment.
#[derive(Debug, Clone)]
pub struct NewComment {
    /// Parent post id.
    pub review_id: String,
    /// Parent comment id for threading, if any.
    pub parent_comment_id: Option<String>,
    /// Author user id.
    pub user_id: String,
    /// Optional rating, 0–5; 0 means no rating.
    pub rating: i64,
    /// Body text; must be non-empty.
    pub content: String,
    /// Image URLs.
    pub image_urls: Vec<String>,
}

/// Repository for comments.
///
/// Unlike the like toggles, comment creation runs its counter
/// transaction inline: the comment document and the post's
/// `commentCount` move together or not at all, and failure is surfaced
/// to the caller before anything is cached.
pub struct CommentRepository {
    local: Arc<LocalStore>,
    table: TypedTable<Comment>,
    engine: Arc<CounterTxnEngine>,
    remote: Arc<dyn RemoteStore>,
}

impl CommentRepository {
    /// Creates the repository.
    pub fn new(
        local: Arc<LocalStore>,
        remote: Arc<dyn RemoteStore>,
        engine: Arc<CounterTxnEngine>,
    ) -> Self {
        Self {
            table: TypedTable::new(Arc::clone(&local), Table::Comments),
            local,
            engine,
            remote,
        }
    }

    /// Subscribes to one comment in the local cache.
    pub fn observe(&self, comment_id: &str) -> TypedSubscription<Comment> {
        self.table.watch(comment_id)
    }

    /// Returns the cached comments of a post, oldest first.
    pub fn list_for_post(&self, post_id: &str) -> SyncResult<Vec<Comment>> {
        let mut comments: Vec<Comment> = self
            .table
            .scan()?
            .into_iter()
            .filter(|c| c.review_id == post_id)
            .collect();
        comments.sort_by_key(|c| c.created_at);
        Ok(comments)
    }

    /// Pulls a post's comments from the remote store into the cache.
    ///
    /// The prefix query over the full parent id acts as an equality
    /// filter, since no other id shares the whole id as a prefix.
    pub fn refresh_for_post(&self, post_id: &str) -> SyncResult<usize> {
        let results = self
            .remote
            .query_prefix(Collection::Comments, "reviewId", post_id, 500)?;
        let count = results.len();
        for (_, doc) in results {
            let comment = Comment::from_fields(&doc.fields)?;
            self.table.upsert(&comment)?;
        }
        Ok(count)
    }

    /// Creates a comment, bumping the parent post's comment counter in
    /// the same remote transaction, then caches it locally.
    pub fn create(&self, new: NewComment) -> SyncResult<Comment> {
        if new.content.trim().is_empty() {
            return Err(SyncError::validation("comment content must not be empty"));
        }
        if !(0..=5).contains(&new.rating) {
            return Err(SyncError::validation("rating must be between 0 and 5"));
        }

        let now = now_millis();
        let comment = Comment {
            id: Uuid::new_v4().simple().to_string(),
            review_id: new.review_id.clone(),
            parent_comment_id: new.parent_comment_id,
            user_id: new.user_id,
            rating: new.rating,
            content: new.content,
            image_urls: new.image_urls,
            like_count: 0,
            flagged: false,
            created_at: now,
            updated_at: now,
        };

        let post_doc = DocRef::new(Collection::Reviews, &new.review_id);
        self.engine.apply_delta(
            &post_doc,
            "commentCount",
            1,
            &EdgeMutation::CreateDoc {
                doc: DocRef::new(Collection::Comments, &comment.id),
                fields: comment.to_fields()?,
            },
        )?;

        self.table.upsert(&comment)?;
        adjust_cached_counter(&self.local, Table::Posts, &new.review_id, "commentCount", 1);
        Ok(comment)
    }

    /// Deletes a comment and decrements the parent post's counter in
    /// one remote transaction, then cleans up the cache.
    pub fn delete(&self, comment_id: &str) -> SyncResult<()> {
        let cached = self.table.get(comment_id)?;
        let review_id = match &cached {
            Some(comment) => comment.review_id.clone(),
            None => return Err(SyncError::not_found("comment", comment_id)),
        };

        let post_doc = DocRef::new(Collection::Reviews, &review_id);
        self.engine.apply_delta(
            &post_doc,
            "commentCount",
            -1,
            &EdgeMutation::DeleteDoc {
                doc: DocRef::new(Collection::Comments, comment_id),
            },
        )?;

        self.table.delete(comment_id);
        for user_id in self.local.edges_from(EdgeTable::CommentLikes, comment_id) {
            self.local
                .delete_edge(EdgeTable::CommentLikes, comment_id, &user_id);
        }
        adjust_cached_counter(&self.local, Table::Posts, &review_id, "commentCount", -1);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::RetryPolicy;
    use feedsync_remote::MemoryRemoteStore;
    use serde_json::json;
    use std::time::Duration;

    struct Fixture {
        local: Arc<LocalStore>,
        remote: Arc<MemoryRemoteStore>,
        repo: CommentRepository,
    }

    fn fixture() -> Fixture {
        let local = Arc::new(LocalStore::new());
        let remote = Arc::new(MemoryRemoteStore::new());
        let engine = Arc::new(CounterTxnEngine::new(
            Arc::clone(&remote) as Arc<dyn RemoteStore>,
            RetryPolicy::new(5)
                .with_initial_delay(Duration::from_millis(1))
                .with_max_delay(Duration::from_millis(2))
                .without_jitter(),
        ));
        let repo = CommentRepository::new(
            Arc::clone(&local),
            Arc::clone(&remote) as Arc<dyn RemoteStore>,
            engine,
        );
        Fixture {
            local,
            remote,
            repo,
        }
    }

    fn seed_post(f: &Fixture, post_id: &str, comment_count: i64) {
        f.local.upsert(
            Table::Posts,
            post_id,
            json!({ "commentCount": comment_count }),
        );
        f.remote
            .set(
                &DocRef::new(Collection::Reviews, post_id),
                [("commentCount".to_string(), json!(comment_count))]
                    .into_iter()
                    .collect(),
            )
            .unwrap();
    }

    fn new_comment(post_id: &str) -> NewComment {
        NewComment {
            review_id: post_id.into(),
            parent_comment_id: None,
            user_id: "u1".into(),
            rating: 0,
            content: "Looks delicious".into(),
            image_urls: Vec::new(),
        }
    }

    #[test]
    fn create_validates_intent() {
        let f = fixture();
        seed_post(&f, "p1", 0);
        let mut bad = new_comment("p1");
        bad.content = "  ".into();
        assert!(matches!(
            f.repo.create(bad),
            Err(SyncError::Validation { .. })
        ));
    }

    #[test]
    fn create_writes_document_and_counter_together() {
        let f = fixture();
        seed_post(&f, "p1", 2);

        let comment = f.repo.create(new_comment("p1")).unwrap();

        let remote_doc = f
            .remote
            .get(&DocRef::new(Collection::Comments, &comment.id))
            .unwrap()
            .unwrap();
        assert_eq!(remote_doc.str_field("content"), "Looks delicious");
        let post = f
            .remote
            .get(&DocRef::new(Collection::Reviews, "p1"))
            .unwrap()
            .unwrap();
        assert_eq!(post.i64_field("commentCount"), 3);
        assert_eq!(
            f.local.get(Table::Posts, "p1").unwrap()["commentCount"],
            json!(3)
        );
        assert!(f.local.get(Table::Comments, &comment.id).is_some());
    }

    #[test]
    fn create_offline_surfaces_failure_and_caches_nothing() {
        let f = fixture();
        seed_post(&f, "p1", 0);
        f.remote.set_offline(true);

        assert!(f.repo.create(new_comment("p1")).is_err());
        assert!(f.local.scan(Table::Comments).is_empty());
        assert_eq!(
            f.local.get(Table::Posts, "p1").unwrap()["commentCount"],
            json!(0)
        );
    }

    #[test]
    fn concurrent_creates_settle_counter_exactly() {
        let f = fixture();
        seed_post(&f, "p1", 1);
        let remote: Arc<dyn RemoteStore> = Arc::clone(&f.remote) as Arc<dyn RemoteStore>;

        let mut handles = Vec::new();
        for _ in 0..2 {
            let local = Arc::new(LocalStore::new());
            let engine = Arc::new(CounterTxnEngine::new(
                Arc::clone(&remote),
                RetryPolicy::new(20)
                    .with_initial_delay(Duration::from_millis(1))
                    .with_max_delay(Duration::from_millis(2))
                    .without_jitter(),
            ));
            let remote = Arc::clone(&remote);
            handles.push(std::thread::spawn(move || {
                let repo = CommentRepository::new(local, remote, engine);
                repo.create(new_comment("p1")).unwrap();
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        let post = f
            .remote
            .get(&DocRef::new(Collection::Reviews, "p1"))
            .unwrap()
            .unwrap();
        assert_eq!(post.i64_field("commentCount"), 3);
    }

    #[test]
    fn delete_decrements_and_cleans_edges() {
        let f = fixture();
        seed_post(&f, "p1", 0);
        let comment = f.repo.create(new_comment("p1")).unwrap();
        f.local
            .put_edge(EdgeTable::CommentLikes, &comment.id, "u2", json!({}));

        f.repo.delete(&comment.id).unwrap();

        assert!(f.local.get(Table::Comments, &comment.id).is_none());
        assert!(!f.local.has_edge(EdgeTable::CommentLikes, &comment.id, "u2"));
        assert!(f
            .remote
            .get(&DocRef::new(Collection::Comments, &comment.id))
            .unwrap()
            .is_none());
        let post = f
            .remote
            .get(&DocRef::new(Collection::Reviews, "p1"))
            .unwrap()
            .unwrap();
        assert_eq!(post.i64_field("commentCount"), 0);
    }

    #[test]
    fn delete_unknown_comment_is_not_found() {
        let f = fixture();
        assert!(matches!(
            f.repo.delete("ghost"),
            Err(SyncError::NotFound { .. })
        ));
    }

    #[test]
    fn list_for_post_orders_by_creation() {
        let f = fixture();
        for (id, at) in [("c2", 200), ("c1", 100)] {
            f.local.upsert(
                Table::Comments,
                id,
                json!({
                    "id": id, "reviewId": "p1", "userId": "u1", "rating": 0,
                    "content": "x", "imageUrls": [], "likeCount": 0, "flagged": false,
                    "createdAt": at, "updatedAt": at
                }),
            );
        }
        let comments = f.repo.list_for_post("p1").unwrap();
        assert_eq!(
            comments.iter().map(|c| c.id.as_str()).collect::<Vec<_>>(),
            vec!["c1", "c2"]
        );
    }

    #[test]
    fn refresh_for_post_fills_the_cache() {
        let f = fixture();
        seed_post(&f, "p1", 0);
        let created = f.repo.create(new_comment("p1")).unwrap();
        f.local.delete(Table::Comments, &created.id);

        let count = f.repo.refresh_for_post("p1").unwrap();
        assert_eq!(count, 1);
        assert!(f.local.get(Table::Comments, &created.id).is_some());
    }
}
