//! Post repository.

use feedsync_remote::{Collection, DocRef, FieldOp, RemoteStore};
use feedsync_store::{
    EdgeTable, LocalStore, RowCodec, Table, TableSubscription, TypedSubscription, TypedTable,
};
use std::sync::Arc;

use crate::error::{SyncError, SyncResult};
use crate::model::{now_millis, Comment, Post, PostStatus};
use crate::repo::adjust_cached_counter;
use crate::worker::RemoteWriteWorker;

/// A mutation intent for creating a post.
#[derive(Debug, Clone)]
pub struct NewPost {
    /// Author user id.
    pub user_id: String,
    /// Title; must be non-empty.
    pub title: String,
    /// Body text.
    pub content: String,
    /// Rating, 1–5.
    pub rating: i64,
    /// Image URLs (already uploaded).
    pub image_urls: Vec<String>,
    /// Price per person.
    pub price_per_person: i64,
    /// Denormalized author display name.
    pub author_name: String,
    /// Denormalized author avatar URL.
    pub author_avatar_url: String,
    /// Denormalized place name.
    pub place_name: String,
    /// Denormalized place address.
    pub place_address: String,
    /// Canonical restaurant id, if the post references a place.
    pub restaurant_id: Option<String>,
}

/// Repository for posts.
pub struct PostRepository {
    local: Arc<LocalStore>,
    table: TypedTable<Post>,
    remote: Arc<dyn RemoteStore>,
    worker: Arc<RemoteWriteWorker>,
}

impl PostRepository {
    /// Creates the repository.
    pub fn new(
        local: Arc<LocalStore>,
        remote: Arc<dyn RemoteStore>,
        worker: Arc<RemoteWriteWorker>,
    ) -> Self {
        Self {
            table: TypedTable::new(Arc::clone(&local), Table::Posts),
            local,
            remote,
            worker,
        }
    }

    /// Subscribes to a post in the local cache. Never touches the
    /// network; replays the latest known value immediately.
    pub fn observe(&self, post_id: &str) -> TypedSubscription<Post> {
        self.table.watch(post_id)
    }

    /// Subscribes to all post changes, for list screens.
    pub fn watch_feed(&self) -> TableSubscription {
        self.local.watch_table(Table::Posts)
    }

    /// Returns the cached post, if any.
    pub fn get_cached(&self, post_id: &str) -> SyncResult<Option<Post>> {
        Ok(self.table.get(post_id)?)
    }

    /// Pulls remote truth for one post and upserts it locally.
    ///
    /// A post deleted remotely is removed from the cache and reported
    /// as `NotFound`.
    pub fn refresh(&self, post_id: &str) -> SyncResult<()> {
        let doc_ref = DocRef::new(Collection::Reviews, post_id);
        match self.remote.get(&doc_ref)? {
            Some(doc) => {
                let post = Post::from_fields(&doc.fields)?;
                self.table.upsert(&post)?;
                Ok(())
            }
            None => {
                self.table.delete(post_id);
                Err(SyncError::not_found("post", post_id))
            }
        }
    }

    /// Drops the cached row, then refreshes. Manual recovery for the
    /// accepted drift window of optimistic mutations.
    pub fn force_resync(&self, post_id: &str) -> SyncResult<()> {
        self.table.delete(post_id);
        self.refresh(post_id)
    }

    /// Pulls up to `limit` posts into the cache, for feed lists.
    ///
    /// The underlying prefix query carries no recency ordering; feed
    /// screens sort what lands in the cache by `created_at`.
    pub fn refresh_batch(&self, limit: usize) -> SyncResult<usize> {
        let results = self
            .remote
            .query_prefix(Collection::Reviews, "title", "", limit)?;
        let count = results.len();
        for (_, doc) in results {
            let post = Post::from_fields(&doc.fields)?;
            self.table.upsert(&post)?;
        }
        Ok(count)
    }

    /// Creates a post remotely and caches it locally.
    ///
    /// Create-style mutations surface remote failure: without a
    /// server-assigned id there is no plausible local state to keep.
    pub fn create(&self, new: NewPost) -> SyncResult<Post> {
        if new.title.trim().is_empty() {
            return Err(SyncError::validation("post title must not be empty"));
        }
        if !(1..=5).contains(&new.rating) {
            return Err(SyncError::validation("rating must be between 1 and 5"));
        }

        let now = now_millis();
        let mut post = Post {
            id: String::new(),
            user_id: new.user_id.clone(),
            title: new.title,
            content: new.content,
            rating: new.rating,
            image_urls: new.image_urls,
            price_per_person: new.price_per_person,
            author_name: new.author_name,
            author_avatar_url: new.author_avatar_url,
            place_name: new.place_name,
            place_address: new.place_address,
            restaurant_id: new.restaurant_id.clone(),
            like_count: 0,
            comment_count: 0,
            status: PostStatus::Published,
            created_at: now,
            updated_at: now,
        };

        let mut fields = post.to_fields()?;
        fields.remove("id");
        let id = self.remote.add(Collection::Reviews, fields)?;
        post.id = id;
        self.table.upsert(&post)?;

        // Denormalized aggregates, best-effort: author post count and
        // restaurant rating totals.
        let author_doc = DocRef::new(Collection::Users, &new.user_id);
        let remote = Arc::clone(&self.remote);
        self.worker.submit("post_count_increment", move || {
            remote.update(
                &author_doc,
                &[("postCount".to_string(), FieldOp::ClampedIncrement(1))],
            )?;
            Ok(())
        });
        if let Some(restaurant_id) = new.restaurant_id {
            let rating = new.rating;
            let restaurant_doc = DocRef::new(Collection::Restaurants, &restaurant_id);
            adjust_cached_counter(
                &self.local,
                Table::Restaurants,
                &restaurant_id,
                "totalRatingPoints",
                rating,
            );
            adjust_cached_counter(
                &self.local,
                Table::Restaurants,
                &restaurant_id,
                "reviewCount",
                1,
            );
            let remote = Arc::clone(&self.remote);
            self.worker.submit("restaurant_rating_totals", move || {
                remote.update(
                    &restaurant_doc,
                    &[
                        ("totalRatingPoints".to_string(), FieldOp::Increment(rating)),
                        ("reviewCount".to_string(), FieldOp::Increment(1)),
                    ],
                )?;
                Ok(())
            });
        }

        Ok(post)
    }

    /// Deletes a post, cascading locally over its comments and like
    /// edges. The remote delete is issued inline and its failure is
    /// surfaced; remote children are cleaned up by the server-side
    /// cascade triggers.
    pub fn delete(&self, post_id: &str) -> SyncResult<()> {
        let cached = self.table.get(post_id)?;

        // Local cascade: the post row, its comments, and like edges.
        self.table.delete(post_id);
        for user_id in self.local.edges_from(EdgeTable::PostLikes, post_id) {
            self.local.delete_edge(EdgeTable::PostLikes, post_id, &user_id);
        }
        let comments: Vec<Comment> = self
            .local
            .scan(Table::Comments)
            .iter()
            .filter_map(|(_, v)| Comment::decode(v).ok())
            .filter(|c| c.review_id == post_id)
            .collect();
        for comment in &comments {
            self.local.delete(Table::Comments, &comment.id);
            for user_id in self.local.edges_from(EdgeTable::CommentLikes, &comment.id) {
                self.local
                    .delete_edge(EdgeTable::CommentLikes, &comment.id, &user_id);
            }
        }
        if let Some(post) = &cached {
            adjust_cached_counter(&self.local, Table::Profiles, &post.user_id, "postCount", -1);
        }

        self.remote
            .delete(&DocRef::new(Collection::Reviews, post_id))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feedsync_remote::MemoryRemoteStore;
    use serde_json::json;

    struct Fixture {
        local: Arc<LocalStore>,
        remote: Arc<MemoryRemoteStore>,
        repo: PostRepository,
        worker: Arc<RemoteWriteWorker>,
    }

    fn fixture() -> Fixture {
        let local = Arc::new(LocalStore::new());
        let remote = Arc::new(MemoryRemoteStore::new());
        let worker = Arc::new(RemoteWriteWorker::new());
        let repo = PostRepository::new(
            Arc::clone(&local),
            Arc::clone(&remote) as Arc<dyn RemoteStore>,
            Arc::clone(&worker),
        );
        Fixture {
            local,
            remote,
            repo,
            worker,
        }
    }

    fn new_post() -> NewPost {
        NewPost {
            user_id: "u1".into(),
            title: "Great pho".into(),
            content: "Broth was excellent".into(),
            rating: 5,
            image_urls: Vec::new(),
            price_per_person: 1200,
            author_name: "Alice".into(),
            author_avatar_url: String::new(),
            place_name: "Pho Thin".into(),
            place_address: "13 Lo Duc".into(),
            restaurant_id: None,
        }
    }

    #[test]
    fn create_validates_intent() {
        let f = fixture();
        let mut bad = new_post();
        bad.title = "   ".into();
        assert!(matches!(
            f.repo.create(bad),
            Err(SyncError::Validation { .. })
        ));

        let mut bad = new_post();
        bad.rating = 6;
        assert!(matches!(
            f.repo.create(bad),
            Err(SyncError::Validation { .. })
        ));
    }

    #[test]
    fn create_surfaces_remote_failure() {
        let f = fixture();
        f.remote.set_offline(true);
        assert!(matches!(
            f.repo.create(new_post()),
            Err(SyncError::Network { .. })
        ));
        // No orphaned local state without a server-assigned id.
        assert!(f.local.scan(Table::Posts).is_empty());
    }

    #[test]
    fn create_caches_locally_with_assigned_id() {
        let f = fixture();
        let post = f.repo.create(new_post()).unwrap();
        assert!(!post.id.is_empty());
        assert_eq!(f.repo.get_cached(&post.id).unwrap().unwrap(), post);
    }

    #[test]
    fn create_bumps_restaurant_totals() {
        let f = fixture();
        f.remote
            .set(
                &DocRef::new(Collection::Restaurants, "rest1"),
                [
                    ("totalRatingPoints".to_string(), json!(4)),
                    ("reviewCount".to_string(), json!(1)),
                ]
                .into_iter()
                .collect(),
            )
            .unwrap();
        let mut new = new_post();
        new.restaurant_id = Some("rest1".into());
        f.repo.create(new).unwrap();
        f.worker.flush();

        let doc = f
            .remote
            .get(&DocRef::new(Collection::Restaurants, "rest1"))
            .unwrap()
            .unwrap();
        assert_eq!(doc.i64_field("totalRatingPoints"), 9);
        assert_eq!(doc.i64_field("reviewCount"), 2);
    }

    #[test]
    fn refresh_pulls_remote_truth() {
        let f = fixture();
        let post = f.repo.create(new_post()).unwrap();

        // Remote moves ahead of the cache.
        f.remote
            .update(
                &DocRef::new(Collection::Reviews, &post.id),
                &[("likeCount".to_string(), FieldOp::Set(json!(7)))],
            )
            .unwrap();
        f.repo.refresh(&post.id).unwrap();
        assert_eq!(f.repo.get_cached(&post.id).unwrap().unwrap().like_count, 7);
    }

    #[test]
    fn refresh_missing_post_clears_cache() {
        let f = fixture();
        let post = f.repo.create(new_post()).unwrap();
        f.remote
            .delete(&DocRef::new(Collection::Reviews, &post.id))
            .unwrap();

        assert!(matches!(
            f.repo.refresh(&post.id),
            Err(SyncError::NotFound { .. })
        ));
        assert!(f.repo.get_cached(&post.id).unwrap().is_none());
    }

    #[test]
    fn observe_emits_refresh_results() {
        let f = fixture();
        let post = f.repo.create(new_post()).unwrap();
        let sub = f.repo.observe(&post.id);
        assert_eq!(sub.recv().unwrap().unwrap().unwrap(), post);

        f.remote
            .update(
                &DocRef::new(Collection::Reviews, &post.id),
                &[("likeCount".to_string(), FieldOp::Set(json!(2)))],
            )
            .unwrap();
        f.repo.refresh(&post.id).unwrap();
        assert_eq!(sub.recv().unwrap().unwrap().unwrap().like_count, 2);
    }

    #[test]
    fn delete_cascades_locally_and_remotely() {
        let f = fixture();
        let post = f.repo.create(new_post()).unwrap();
        f.local.upsert(
            Table::Comments,
            "c1",
            json!({
                "id": "c1", "reviewId": post.id, "userId": "u2", "rating": 0,
                "content": "x", "imageUrls": [], "likeCount": 0, "flagged": false,
                "createdAt": 0, "updatedAt": 0
            }),
        );
        f.local
            .put_edge(EdgeTable::PostLikes, &post.id, "u2", json!({}));
        f.local
            .put_edge(EdgeTable::CommentLikes, "c1", "u2", json!({}));

        f.repo.delete(&post.id).unwrap();

        assert!(f.local.scan(Table::Comments).is_empty());
        assert!(!f.local.has_edge(EdgeTable::PostLikes, &post.id, "u2"));
        assert!(!f.local.has_edge(EdgeTable::CommentLikes, "c1", "u2"));
        assert!(f
            .remote
            .get(&DocRef::new(Collection::Reviews, &post.id))
            .unwrap()
            .is_none());
    }

    #[test]
    fn refresh_batch_fills_the_cache() {
        let f = fixture();
        let a = f.repo.create(new_post()).unwrap();
        let b = f.repo.create(new_post()).unwrap();
        f.local.delete(Table::Posts, &a.id);
        f.local.delete(Table::Posts, &b.id);

        let count = f.repo.refresh_batch(10).unwrap();
        assert_eq!(count, 2);
        assert_eq!(f.local.scan(Table::Posts).len(), 2);
    }
}
