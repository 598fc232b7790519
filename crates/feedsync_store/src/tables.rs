//! The local table set.

use parking_lot::RwLock;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

use crate::watch::{ChangeKind, RowSubscription, TableSubscription, WatchHub};

/// Row tables, keyed by primary id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    /// Published and draft posts.
    Posts,
    /// Comments under posts.
    Comments,
    /// Canonical place entities.
    Restaurants,
    /// Cached user profile projections.
    Profiles,
}

impl Table {
    /// Returns the table name for display and error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Table::Posts => "posts",
            Table::Comments => "comments",
            Table::Restaurants => "restaurants",
            Table::Profiles => "profiles",
        }
    }
}

/// Edge tables, keyed by the composite `(source_id, target_id)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeTable {
    /// `(post_id, user_id)`: user liked post.
    PostLikes,
    /// `(comment_id, user_id)`: user liked comment.
    CommentLikes,
    /// `(follower_id, following_id)`: follower follows followee.
    Follows,
}

impl EdgeTable {
    /// Returns the edge table name for display and error messages.
    pub fn name(&self) -> &'static str {
        match self {
            EdgeTable::PostLikes => "post_likes",
            EdgeTable::CommentLikes => "comment_likes",
            EdgeTable::Follows => "follows",
        }
    }
}

/// The in-process local cache shared by every repository.
///
/// `LocalStore` holds one map per row table and one map per edge table
/// behind a single `RwLock` each. All reads are synchronous and
/// infallible: a missing row is `None`, never an error. Writes emit to
/// live-query subscribers after commit, in commit order.
///
/// The store is `Send + Sync` and intended to be shared as an
/// `Arc<LocalStore>` across repositories.
pub struct LocalStore {
    /// Row tables.
    rows: RwLock<HashMap<Table, BTreeMap<String, Value>>>,
    /// Edge tables. Values carry edge payloads (e.g. a timestamp).
    edges: RwLock<HashMap<EdgeTable, BTreeMap<(String, String), Value>>>,
    /// Subscriber registry.
    hub: WatchHub,
}

impl LocalStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(HashMap::new()),
            edges: RwLock::new(HashMap::new()),
            hub: WatchHub::new(),
        }
    }

    /// Inserts or replaces a row, then notifies watchers.
    ///
    /// Emission happens while the table write lock is still held, so
    /// two writers racing on the same key deliver their values in the
    /// same order the map saw them.
    pub fn upsert(&self, table: Table, key: &str, value: Value) {
        let mut rows = self.rows.write();
        let map = rows.entry(table).or_default();
        let kind = match map.insert(key.to_string(), value.clone()) {
            Some(_) => ChangeKind::Update,
            None => ChangeKind::Insert,
        };
        self.hub.emit(table, key, kind, Some(value));
    }

    /// Gets a row by primary key.
    pub fn get(&self, table: Table, key: &str) -> Option<Value> {
        self.rows.read().get(&table)?.get(key).cloned()
    }

    /// Deletes a row. Returns true if a row existed.
    pub fn delete(&self, table: Table, key: &str) -> bool {
        let mut rows = self.rows.write();
        let existed = rows.entry(table).or_default().remove(key).is_some();
        if existed {
            self.hub.emit(table, key, ChangeKind::Delete, None);
        }
        existed
    }

    /// Scans all rows of a table in key order.
    ///
    /// Filtering is done with host-language iterator adapters; the store
    /// has no query DSL.
    pub fn scan(&self, table: Table) -> Vec<(String, Value)> {
        self.rows
            .read()
            .get(&table)
            .map(|map| map.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default()
    }

    /// Subscribes to a single row.
    ///
    /// The latest known value is replayed immediately; the snapshot and
    /// the registration happen under the table lock, so no change can
    /// fall between them.
    pub fn watch_row(&self, table: Table, key: &str) -> RowSubscription {
        let rows = self.rows.read();
        let current = rows.get(&table).and_then(|m| m.get(key)).cloned();
        self.hub.watch_row(table, key, current)
    }

    /// Subscribes to all changes in a table.
    pub fn watch_table(&self, table: Table) -> TableSubscription {
        self.hub.watch_table(table)
    }

    /// Inserts or replaces an edge.
    pub fn put_edge(&self, table: EdgeTable, source: &str, target: &str, value: Value) {
        self.edges
            .write()
            .entry(table)
            .or_default()
            .insert((source.to_string(), target.to_string()), value);
    }

    /// Deletes an edge. Returns true if the edge existed.
    pub fn delete_edge(&self, table: EdgeTable, source: &str, target: &str) -> bool {
        self.edges
            .write()
            .entry(table)
            .or_default()
            .remove(&(source.to_string(), target.to_string()))
            .is_some()
    }

    /// Checks whether an edge exists.
    pub fn has_edge(&self, table: EdgeTable, source: &str, target: &str) -> bool {
        self.edges
            .read()
            .get(&table)
            .is_some_and(|m| m.contains_key(&(source.to_string(), target.to_string())))
    }

    /// Returns all targets reachable from `source`.
    pub fn edges_from(&self, table: EdgeTable, source: &str) -> Vec<String> {
        self.edges
            .read()
            .get(&table)
            .map(|m| {
                m.range((source.to_string(), String::new())..)
                    .take_while(|((s, _), _)| s == source)
                    .map(|((_, t), _)| t.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Returns all sources pointing at `target`.
    ///
    /// **Warning**: this is a full scan of the edge table.
    pub fn edges_to(&self, table: EdgeTable, target: &str) -> Vec<String> {
        self.edges
            .read()
            .get(&table)
            .map(|m| {
                m.keys()
                    .filter(|(_, t)| t == target)
                    .map(|(s, _)| s.clone())
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl Default for LocalStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn upsert_get_delete() {
        let store = LocalStore::new();
        assert_eq!(store.get(Table::Posts, "p1"), None);

        store.upsert(Table::Posts, "p1", json!({"title": "a"}));
        assert_eq!(store.get(Table::Posts, "p1"), Some(json!({"title": "a"})));

        assert!(store.delete(Table::Posts, "p1"));
        assert!(!store.delete(Table::Posts, "p1"));
        assert_eq!(store.get(Table::Posts, "p1"), None);
    }

    #[test]
    fn scan_returns_key_order() {
        let store = LocalStore::new();
        store.upsert(Table::Restaurants, "b", json!(2));
        store.upsert(Table::Restaurants, "a", json!(1));

        let rows = store.scan(Table::Restaurants);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].0, "a");
        assert_eq!(rows[1].0, "b");
    }

    #[test]
    fn watch_row_replays_then_follows() {
        let store = LocalStore::new();
        store.upsert(Table::Posts, "p1", json!(1));

        let sub = store.watch_row(Table::Posts, "p1");
        assert_eq!(sub.recv().unwrap(), Some(json!(1)));

        store.upsert(Table::Posts, "p1", json!(2));
        assert_eq!(sub.recv().unwrap(), Some(json!(2)));

        store.delete(Table::Posts, "p1");
        assert_eq!(sub.recv().unwrap(), None);
    }

    #[test]
    fn edge_lifecycle() {
        let store = LocalStore::new();
        assert!(!store.has_edge(EdgeTable::Follows, "u1", "u2"));

        store.put_edge(EdgeTable::Follows, "u1", "u2", json!({"ts": 0}));
        store.put_edge(EdgeTable::Follows, "u1", "u3", json!({"ts": 1}));
        store.put_edge(EdgeTable::Follows, "u9", "u2", json!({"ts": 2}));

        assert!(store.has_edge(EdgeTable::Follows, "u1", "u2"));
        assert_eq!(store.edges_from(EdgeTable::Follows, "u1"), vec!["u2", "u3"]);
        assert_eq!(store.edges_to(EdgeTable::Follows, "u2"), vec!["u1", "u9"]);

        assert!(store.delete_edge(EdgeTable::Follows, "u1", "u2"));
        assert!(!store.has_edge(EdgeTable::Follows, "u1", "u2"));
    }

    #[test]
    fn rapid_writes_observed_in_call_order() {
        let store = LocalStore::new();
        let sub = store.watch_row(Table::Posts, "p1");
        assert_eq!(sub.recv().unwrap(), None);

        for i in 0..10 {
            store.upsert(Table::Posts, "p1", json!(i));
        }
        for i in 0..10 {
            assert_eq!(sub.recv().unwrap(), Some(json!(i)));
        }
    }

    #[test]
    fn racing_writers_deliver_final_value_last() {
        let store = Arc::new(LocalStore::new());
        let sub = store.watch_row(Table::Posts, "p1");
        assert_eq!(sub.recv().unwrap(), None);

        let mut handles = Vec::new();
        for t in 0..2 {
            let store = Arc::clone(&store);
            handles.push(thread::spawn(move || {
                for i in 0..50 {
                    store.upsert(Table::Posts, "p1", json!(t * 1000 + i));
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        // The last delivered value is the value the map holds.
        let mut last = None;
        while let Some(value) = sub.try_recv() {
            last = value;
        }
        assert_eq!(last, store.get(Table::Posts, "p1"));
    }

    #[test]
    fn concurrent_writers_do_not_lose_rows() {
        let store = Arc::new(LocalStore::new());
        let mut handles = Vec::new();
        for t in 0..4 {
            let store = Arc::clone(&store);
            handles.push(thread::spawn(move || {
                for i in 0..25 {
                    let key = format!("p{}-{}", t, i);
                    store.upsert(Table::Posts, &key, json!(i));
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(store.scan(Table::Posts).len(), 100);
    }
}
