//! Profile repository.

use feedsync_remote::{Collection, DocRef, RemoteStore};
use feedsync_store::{LocalStore, Table, TypedSubscription, TypedTable};
use std::sync::Arc;

use crate::error::{SyncError, SyncResult};
use crate::model::UserProfile;

/// Repository for the cached user-profile projection.
///
/// Profiles are read-mostly on this side: counter drift from
/// best-effort follow and post mutations is reconciled by `refresh`,
/// which replaces the cached projection with remote truth.
pub struct ProfileRepository {
    table: TypedTable<UserProfile>,
    remote: Arc<dyn RemoteStore>,
}

impl ProfileRepository {
    /// Creates the repository.
    pub fn new(local: Arc<LocalStore>, remote: Arc<dyn RemoteStore>) -> Self {
        Self {
            table: TypedTable::new(local, Table::Profiles),
            remote,
        }
    }

    /// Subscribes to a profile in the local cache.
    pub fn observe(&self, user_id: &str) -> TypedSubscription<UserProfile> {
        self.table.watch(user_id)
    }

    /// Returns the cached profile, if any.
    pub fn get_cached(&self, user_id: &str) -> SyncResult<Option<UserProfile>> {
        Ok(self.table.get(user_id)?)
    }

    /// Pulls the remote user document and replaces the cached
    /// projection. A user deleted remotely is evicted from the cache
    /// and reported as `NotFound`.
    pub fn refresh(&self, user_id: &str) -> SyncResult<()> {
        let doc_ref = DocRef::new(Collection::Users, user_id);
        match self.remote.get(&doc_ref)? {
            Some(doc) => {
                let profile = UserProfile::from_fields(&doc.fields)?;
                self.table.upsert(&profile)?;
                Ok(())
            }
            None => {
                self.table.delete(user_id);
                Err(SyncError::not_found("profile", user_id))
            }
        }
    }

    /// Drops the cached projection, then refreshes.
    pub fn force_resync(&self, user_id: &str) -> SyncResult<()> {
        self.table.delete(user_id);
        self.refresh(user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feedsync_remote::MemoryRemoteStore;
    use serde_json::json;

    fn fixture() -> (Arc<LocalStore>, Arc<MemoryRemoteStore>, ProfileRepository) {
        let local = Arc::new(LocalStore::new());
        let remote = Arc::new(MemoryRemoteStore::new());
        let repo = ProfileRepository::new(
            Arc::clone(&local),
            Arc::clone(&remote) as Arc<dyn RemoteStore>,
        );
        (local, remote, repo)
    }

    fn seed_user(remote: &MemoryRemoteStore, user_id: &str, post_count: i64) {
        remote
            .set(
                &DocRef::new(Collection::Users, user_id),
                [
                    ("id".to_string(), json!(user_id)),
                    ("name".to_string(), json!("Alice")),
                    ("avatarUrl".to_string(), json!("")),
                    ("bio".to_string(), json!("")),
                    ("verified".to_string(), json!(false)),
                    ("postCount".to_string(), json!(post_count)),
                    ("followerCount".to_string(), json!(0)),
                    ("followingCount".to_string(), json!(0)),
                    ("totalLikesReceived".to_string(), json!(0)),
                    // Richer fields the projection drops.
                    ("likedPostIds".to_string(), json!(["r1"])),
                ]
                .into_iter()
                .collect(),
            )
            .unwrap();
    }

    #[test]
    fn refresh_projects_remote_document() {
        let (_, remote, repo) = fixture();
        seed_user(&remote, "u1", 4);

        repo.refresh("u1").unwrap();
        let profile = repo.get_cached("u1").unwrap().unwrap();
        assert_eq!(profile.name, "Alice");
        assert_eq!(profile.post_count, 4);
    }

    #[test]
    fn refresh_overwrites_drifted_cache() {
        let (local, remote, repo) = fixture();
        seed_user(&remote, "u1", 4);
        local.upsert(Table::Profiles, "u1", json!({ "postCount": 99 }));

        repo.refresh("u1").unwrap();
        assert_eq!(repo.get_cached("u1").unwrap().unwrap().post_count, 4);
    }

    #[test]
    fn refresh_missing_user_evicts_cache() {
        let (local, _, repo) = fixture();
        local.upsert(Table::Profiles, "ghost", json!({ "postCount": 1 }));

        assert!(matches!(
            repo.refresh("ghost"),
            Err(SyncError::NotFound { .. })
        ));
        assert!(local.get(Table::Profiles, "ghost").is_none());
    }

    #[test]
    fn observe_sees_refresh() {
        let (_, remote, repo) = fixture();
        seed_user(&remote, "u1", 0);
        let sub = repo.observe("u1");
        assert!(sub.recv().unwrap().unwrap().is_none());

        repo.refresh("u1").unwrap();
        let profile = sub.recv().unwrap().unwrap().unwrap();
        assert_eq!(profile.id, "u1");
    }
}
