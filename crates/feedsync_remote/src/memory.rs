//! In-memory remote store for tests and local development.

use parking_lot::RwLock;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

use crate::document::{apply_field_op, Document, FieldOp, Fields};
use crate::error::{RemoteError, RemoteResult};
use crate::store::{Collection, DocRef, RemoteStore};
use crate::txn::{RemoteTransaction, TxnWrite};

/// An in-memory implementation of [`RemoteStore`].
///
/// Suitable for:
/// - Unit and integration tests
/// - Local development without a backend
///
/// Documents carry store-wide monotonically increasing versions, so a
/// delete-then-recreate cannot satisfy a stale transaction read.
///
/// # Fault Injection
///
/// - [`set_offline`](Self::set_offline) makes every operation fail with
///   `Unavailable` until cleared, for offline scenarios.
/// - [`fail_next_commits`](Self::fail_next_commits) makes the next `n`
///   transaction commits fail with `Conflict`, for retry scenarios.
///
/// # Cascade Triggers
///
/// Deleting a review simulates the server-side trigger contract:
/// child comments are deleted, the review id (and the deleted comment
/// ids) are removed from every user's liked arrays, and the author's
/// `postCount` is decremented with a floor of zero. Counter triggers
/// for like/comment creation are not simulated; the client-side
/// transaction engine performs those writes itself and the backstop
/// must stay idempotent with it.
pub struct MemoryRemoteStore {
    /// Collection -> id -> document.
    collections: RwLock<HashMap<Collection, BTreeMap<String, Document>>>,
    /// Store-wide version counter.
    write_seq: AtomicU64,
    /// When set, every operation fails with `Unavailable`.
    offline: AtomicBool,
    /// Number of upcoming commits to fail with `Conflict`.
    fail_commits: AtomicU32,
}

impl MemoryRemoteStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
            write_seq: AtomicU64::new(0),
            offline: AtomicBool::new(false),
            fail_commits: AtomicU32::new(0),
        }
    }

    /// Simulates losing (or regaining) connectivity.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Makes the next `n` transaction commits fail with `Conflict`.
    pub fn fail_next_commits(&self, n: u32) {
        self.fail_commits.store(n, Ordering::SeqCst);
    }

    /// Returns the number of documents in a collection.
    pub fn len(&self, collection: Collection) -> usize {
        self.collections
            .read()
            .get(&collection)
            .map_or(0, BTreeMap::len)
    }

    /// Returns true if the collection holds no documents.
    pub fn is_empty(&self, collection: Collection) -> bool {
        self.len(collection) == 0
    }

    fn check_online(&self) -> RemoteResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            Err(RemoteError::unavailable("store is offline"))
        } else {
            Ok(())
        }
    }

    fn next_version(&self) -> u64 {
        self.write_seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Applies one buffered write under the collections write lock.
    fn apply_write(
        &self,
        collections: &mut HashMap<Collection, BTreeMap<String, Document>>,
        write: &TxnWrite,
    ) {
        match write {
            TxnWrite::Set { doc, fields } => {
                let version = self.next_version();
                collections.entry(doc.collection).or_default().insert(
                    doc.id.clone(),
                    Document {
                        fields: fields.clone(),
                        version,
                    },
                );
            }
            TxnWrite::Update { doc, ops } => {
                let version = self.next_version();
                let entry = collections
                    .entry(doc.collection)
                    .or_default()
                    .entry(doc.id.clone())
                    .or_insert_with(|| Document {
                        fields: Fields::new(),
                        version,
                    });
                for (field, op) in ops {
                    apply_field_op(&mut entry.fields, field, op);
                }
                entry.version = version;
            }
            TxnWrite::Delete { doc } => {
                let removed = collections
                    .entry(doc.collection)
                    .or_default()
                    .remove(&doc.id);
                if doc.collection == Collection::Reviews {
                    if let Some(review) = removed {
                        self.cascade_review_delete(collections, &doc.id, &review);
                    }
                }
            }
        }
    }

    /// Server-side trigger simulation for review deletion.
    fn cascade_review_delete(
        &self,
        collections: &mut HashMap<Collection, BTreeMap<String, Document>>,
        review_id: &str,
        review: &Document,
    ) {
        // Delete child comments.
        let comment_ids: Vec<String> = collections
            .entry(Collection::Comments)
            .or_default()
            .iter()
            .filter(|(_, d)| d.str_field("reviewId") == review_id)
            .map(|(id, _)| id.clone())
            .collect();
        for id in &comment_ids {
            collections.entry(Collection::Comments).or_default().remove(id);
        }
        tracing::debug!(
            review_id,
            comments = comment_ids.len(),
            "cascading review delete"
        );

        // Remove like-edge memberships referencing the deleted subtree.
        let author_id = review.str_field("userId").to_string();
        let user_ids: Vec<String> = collections
            .entry(Collection::Users)
            .or_default()
            .keys()
            .cloned()
            .collect();
        for user_id in user_ids {
            let version = self.next_version();
            if let Some(user) = collections
                .entry(Collection::Users)
                .or_default()
                .get_mut(&user_id)
            {
                apply_field_op(
                    &mut user.fields,
                    "likedPostIds",
                    &FieldOp::ArrayRemove(Value::from(review_id)),
                );
                for comment_id in &comment_ids {
                    apply_field_op(
                        &mut user.fields,
                        "likedCommentIds",
                        &FieldOp::ArrayRemove(Value::from(comment_id.as_str())),
                    );
                }
                if user_id == author_id {
                    apply_field_op(&mut user.fields, "postCount", &FieldOp::ClampedIncrement(-1));
                }
                user.version = version;
            }
        }
    }
}

impl Default for MemoryRemoteStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RemoteStore for MemoryRemoteStore {
    fn get(&self, doc: &DocRef) -> RemoteResult<Option<Document>> {
        self.check_online()?;
        Ok(self
            .collections
            .read()
            .get(&doc.collection)
            .and_then(|m| m.get(&doc.id))
            .cloned())
    }

    fn set(&self, doc: &DocRef, fields: Fields) -> RemoteResult<()> {
        self.check_online()?;
        let mut collections = self.collections.write();
        self.apply_write(
            &mut collections,
            &TxnWrite::Set {
                doc: doc.clone(),
                fields,
            },
        );
        Ok(())
    }

    fn update(&self, doc: &DocRef, ops: &[(String, FieldOp)]) -> RemoteResult<()> {
        self.check_online()?;
        let mut collections = self.collections.write();
        let exists = collections
            .get(&doc.collection)
            .is_some_and(|m| m.contains_key(&doc.id));
        if !exists {
            return Err(RemoteError::not_found(doc.collection.name(), &doc.id));
        }
        self.apply_write(
            &mut collections,
            &TxnWrite::Update {
                doc: doc.clone(),
                ops: ops.to_vec(),
            },
        );
        Ok(())
    }

    fn delete(&self, doc: &DocRef) -> RemoteResult<()> {
        self.check_online()?;
        let mut collections = self.collections.write();
        self.apply_write(&mut collections, &TxnWrite::Delete { doc: doc.clone() });
        Ok(())
    }

    fn add(&self, collection: Collection, mut fields: Fields) -> RemoteResult<String> {
        self.check_online()?;
        let id = uuid::Uuid::new_v4().simple().to_string();
        fields.insert("id".to_string(), Value::from(id.clone()));
        let doc = DocRef::new(collection, id.clone());
        let mut collections = self.collections.write();
        self.apply_write(&mut collections, &TxnWrite::Set { doc, fields });
        Ok(id)
    }

    fn query_prefix(
        &self,
        collection: Collection,
        field: &str,
        prefix: &str,
        limit: usize,
    ) -> RemoteResult<Vec<(String, Document)>> {
        self.check_online()?;
        Ok(self
            .collections
            .read()
            .get(&collection)
            .map(|m| {
                m.iter()
                    .filter(|(_, d)| d.str_field(field).starts_with(prefix))
                    .take(limit)
                    .map(|(id, d)| (id.clone(), d.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    fn begin(&self) -> RemoteResult<Box<dyn RemoteTransaction + '_>> {
        self.check_online()?;
        Ok(Box::new(MemoryTransaction {
            store: self,
            reads: Vec::new(),
            writes: Vec::new(),
        }))
    }
}

/// A transaction over [`MemoryRemoteStore`].
struct MemoryTransaction<'a> {
    store: &'a MemoryRemoteStore,
    /// `(doc, observed_version)`; 0 means the document was absent.
    reads: Vec<(DocRef, u64)>,
    writes: Vec<TxnWrite>,
}

impl RemoteTransaction for MemoryTransaction<'_> {
    fn read(&mut self, doc: &DocRef) -> RemoteResult<Option<Document>> {
        self.store.check_online()?;
        let found = self
            .store
            .collections
            .read()
            .get(&doc.collection)
            .and_then(|m| m.get(&doc.id))
            .cloned();
        let version = found.as_ref().map_or(0, |d| d.version);
        self.reads.push((doc.clone(), version));
        Ok(found)
    }

    fn set(&mut self, doc: &DocRef, fields: Fields) {
        self.writes.push(TxnWrite::Set {
            doc: doc.clone(),
            fields,
        });
    }

    fn update(&mut self, doc: &DocRef, ops: Vec<(String, FieldOp)>) {
        self.writes.push(TxnWrite::Update {
            doc: doc.clone(),
            ops,
        });
    }

    fn delete(&mut self, doc: &DocRef) {
        self.writes.push(TxnWrite::Delete { doc: doc.clone() });
    }

    fn commit(self: Box<Self>) -> RemoteResult<()> {
        self.store.check_online()?;

        // Injected conflicts take effect before validation.
        let pending = self.store.fail_commits.load(Ordering::SeqCst);
        if pending > 0
            && self
                .store
                .fail_commits
                .compare_exchange(pending, pending - 1, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
        {
            let (doc, _) = self
                .reads
                .first()
                .cloned()
                .unwrap_or((DocRef::new(Collection::Reviews, "?"), 0));
            return Err(RemoteError::conflict(doc.collection.name(), doc.id));
        }

        let mut collections = self.store.collections.write();

        // Validate the read set under the write lock.
        for (doc, observed) in &self.reads {
            let current = collections
                .get(&doc.collection)
                .and_then(|m| m.get(&doc.id))
                .map_or(0, |d| d.version);
            if current != *observed {
                return Err(RemoteError::conflict(doc.collection.name(), &doc.id));
            }
        }

        for write in &self.writes {
            self.store.apply_write(&mut collections, write);
        }
        Ok(())
    }
}
