//! Follow repository.

use feedsync_remote::{Collection, DocRef, FieldOp, RemoteStore};
use feedsync_store::{EdgeTable, LocalStore, Table};
use serde_json::json;
use std::sync::Arc;

use crate::error::{SyncError, SyncResult};
use crate::model::{now_millis, Follow};
use crate::repo::adjust_cached_counter;
use crate::worker::RemoteWriteWorker;

/// Toggles follow edges and maintains the follower/following counters.
///
/// The two counters live on two different user documents. They are
/// updated as two independent best-effort clamped increments, not one
/// cross-document transaction; this is the documented best-effort
/// behavior.
/// Under concurrent follow/unfollow toggling by different users the
/// counters can drift from the edge count; `refresh` on the affected
/// profiles is the reconciliation path.
pub struct FollowRepository {
    local: Arc<LocalStore>,
    remote: Arc<dyn RemoteStore>,
    worker: Arc<RemoteWriteWorker>,
}

impl FollowRepository {
    /// Creates the repository.
    pub fn new(
        local: Arc<LocalStore>,
        remote: Arc<dyn RemoteStore>,
        worker: Arc<RemoteWriteWorker>,
    ) -> Self {
        Self {
            local,
            remote,
            worker,
        }
    }

    /// Returns whether `follower_id` follows `following_id`, per local
    /// state.
    pub fn is_following(&self, follower_id: &str, following_id: &str) -> bool {
        self.local
            .has_edge(EdgeTable::Follows, follower_id, following_id)
    }

    /// Returns the ids `follower_id` follows, per local state.
    pub fn following_of(&self, follower_id: &str) -> Vec<String> {
        self.local.edges_from(EdgeTable::Follows, follower_id)
    }

    /// Toggles the follow edge. Returns the new local following state.
    ///
    /// Self-follow is rejected with a validation error. Remote failure
    /// is logged and swallowed; the optimistic local state stands.
    pub fn toggle_follow(&self, follower_id: &str, following_id: &str) -> SyncResult<bool> {
        if follower_id == following_id {
            return Err(SyncError::validation("cannot follow yourself"));
        }

        let following = self.is_following(follower_id, following_id);

        // Local effect: edge row plus both cached counters, clamped.
        if following {
            self.local
                .delete_edge(EdgeTable::Follows, follower_id, following_id);
        } else {
            self.local.put_edge(
                EdgeTable::Follows,
                follower_id,
                following_id,
                json!({ "createdAt": now_millis() }),
            );
        }
        let delta: i64 = if following { -1 } else { 1 };
        adjust_cached_counter(
            &self.local,
            Table::Profiles,
            follower_id,
            "followingCount",
            delta,
        );
        adjust_cached_counter(
            &self.local,
            Table::Profiles,
            following_id,
            "followerCount",
            delta,
        );

        // Remote effect: edge document plus two independent increments.
        let edge = Follow {
            follower_id: follower_id.to_string(),
            following_id: following_id.to_string(),
            created_at: now_millis(),
        };
        let edge_doc = DocRef::new(Collection::Follows, edge.edge_id());
        let follower_doc = DocRef::new(Collection::Users, follower_id);
        let following_doc = DocRef::new(Collection::Users, following_id);

        let remote = Arc::clone(&self.remote);
        self.worker.submit("follow_edge", move || {
            if following {
                remote.delete(&edge_doc)?;
            } else {
                remote.set(&edge_doc, edge.to_fields()?)?;
            }
            Ok(())
        });
        let remote = Arc::clone(&self.remote);
        self.worker.submit("follow_following_count", move || {
            remote.update(
                &follower_doc,
                &[("followingCount".to_string(), FieldOp::ClampedIncrement(delta))],
            )?;
            Ok(())
        });
        let remote = Arc::clone(&self.remote);
        self.worker.submit("follow_follower_count", move || {
            remote.update(
                &following_doc,
                &[("followerCount".to_string(), FieldOp::ClampedIncrement(delta))],
            )?;
            Ok(())
        });

        Ok(!following)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feedsync_remote::{Fields, MemoryRemoteStore};

    struct Fixture {
        local: Arc<LocalStore>,
        remote: Arc<MemoryRemoteStore>,
        repo: FollowRepository,
        worker: Arc<RemoteWriteWorker>,
    }

    fn fixture() -> Fixture {
        let local = Arc::new(LocalStore::new());
        let remote = Arc::new(MemoryRemoteStore::new());
        let worker = Arc::new(RemoteWriteWorker::new());
        for user in ["u1", "u2"] {
            local.upsert(
                Table::Profiles,
                user,
                json!({ "followerCount": 0, "followingCount": 0 }),
            );
            remote
                .set(&DocRef::new(Collection::Users, user), Fields::new())
                .unwrap();
        }
        let repo = FollowRepository::new(
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

    #[test]
    fn self_follow_is_rejected() {
        let f = fixture();
        assert!(matches!(
            f.repo.toggle_follow("u1", "u1"),
            Err(SyncError::Validation { .. })
        ));
    }

    #[test]
    fn toggle_updates_edges_and_counters() {
        let f = fixture();
        assert!(f.repo.toggle_follow("u1", "u2").unwrap());
        assert!(f.repo.is_following("u1", "u2"));
        assert_eq!(
            f.local.get(Table::Profiles, "u1").unwrap()["followingCount"],
            json!(1)
        );
        assert_eq!(
            f.local.get(Table::Profiles, "u2").unwrap()["followerCount"],
            json!(1)
        );

        f.worker.flush();
        let edge = f
            .remote
            .get(&DocRef::new(Collection::Follows, "u1_u2"))
            .unwrap();
        assert!(edge.is_some());
        let followee = f
            .remote
            .get(&DocRef::new(Collection::Users, "u2"))
            .unwrap()
            .unwrap();
        assert_eq!(followee.i64_field("followerCount"), 1);
    }

    #[test]
    fn toggle_parity_and_clamp() {
        let f = fixture();
        // N toggles: final state == (N is odd) XOR initial (false).
        for n in 1..=5 {
            let state = f.repo.toggle_follow("u1", "u2").unwrap();
            assert_eq!(state, n % 2 == 1);
        }
        f.worker.flush();

        assert!(f.repo.is_following("u1", "u2"));
        let follower = f
            .remote
            .get(&DocRef::new(Collection::Users, "u1"))
            .unwrap()
            .unwrap();
        assert_eq!(follower.i64_field("followingCount"), 1);
        assert!(follower.i64_field("followingCount") >= 0);
    }

    #[test]
    fn unfollow_never_drives_counters_negative() {
        let f = fixture();
        f.repo.toggle_follow("u1", "u2").unwrap();
        f.repo.toggle_follow("u1", "u2").unwrap();
        // A duplicate decrement arriving remotely clamps at zero.
        f.repo.toggle_follow("u1", "u2").unwrap();
        f.repo.toggle_follow("u1", "u2").unwrap();
        f.worker.flush();

        let followee = f
            .remote
            .get(&DocRef::new(Collection::Users, "u2"))
            .unwrap()
            .unwrap();
        assert_eq!(followee.i64_field("followerCount"), 0);
        assert_eq!(
            f.local.get(Table::Profiles, "u2").unwrap()["followerCount"],
            json!(0)
        );
    }

    #[test]
    fn offline_toggle_retains_local_edge() {
        let f = fixture();
        f.remote.set_offline(true);
        assert!(f.repo.toggle_follow("u1", "u2").unwrap());
        f.worker.flush();

        assert!(f.repo.is_following("u1", "u2"));
        f.remote.set_offline(false);
        assert!(f
            .remote
            .get(&DocRef::new(Collection::Follows, "u1_u2"))
            .unwrap()
            .is_none());
    }

    #[test]
    fn following_of_lists_targets() {
        let f = fixture();
        f.local.upsert(Table::Profiles, "u3", json!({}));
        f.repo.toggle_follow("u1", "u2").unwrap();
        f.repo.toggle_follow("u1", "u3").unwrap();
        assert_eq!(f.repo.following_of("u1"), vec!["u2", "u3"]);
    }
}
