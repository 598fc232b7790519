//! The remote store seam.

use crate::document::{Document, FieldOp, Fields};
use crate::error::RemoteResult;
use crate::txn::RemoteTransaction;

/// Top-level collections of the remote document store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    /// User documents, including liked-id arrays and counters.
    Users,
    /// Review (post) documents.
    Reviews,
    /// Comment documents.
    Comments,
    /// Follow edge documents, keyed `{followerId}_{followingId}`.
    Follows,
    /// Canonical restaurant documents.
    Restaurants,
}

impl Collection {
    /// Returns the collection name.
    pub fn name(&self) -> &'static str {
        match self {
            Collection::Users => "users",
            Collection::Reviews => "reviews",
            Collection::Comments => "comments",
            Collection::Follows => "follows",
            Collection::Restaurants => "restaurants",
        }
    }
}

/// A reference to one document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocRef {
    /// Collection the document lives in.
    pub collection: Collection,
    /// Document id.
    pub id: String,
}

impl DocRef {
    /// Creates a document reference.
    pub fn new(collection: Collection, id: impl Into<String>) -> Self {
        Self {
            collection,
            id: id.into(),
        }
    }
}

/// The remote document store.
///
/// This trait abstracts the authoritative store, allowing substitution
/// with [`MemoryRemoteStore`](crate::MemoryRemoteStore) in tests. All
/// methods are blocking from the caller's point of view; callers that
/// must not stall a UI context dispatch to a background worker.
///
/// Single-document operations (`set`, `update`, `delete`) are atomic on
/// their own. Multi-document atomicity goes through [`Self::begin`].
pub trait RemoteStore: Send + Sync {
    /// Fetches a document. `Ok(None)` means the document does not exist.
    fn get(&self, doc: &DocRef) -> RemoteResult<Option<Document>>;

    /// Creates or replaces a document.
    fn set(&self, doc: &DocRef, fields: Fields) -> RemoteResult<()>;

    /// Applies field operations atomically to an existing document.
    ///
    /// Fails with `NotFound` if the document does not exist.
    fn update(&self, doc: &DocRef, ops: &[(String, FieldOp)]) -> RemoteResult<()>;

    /// Deletes a document. Deleting a missing document is a no-op.
    fn delete(&self, doc: &DocRef) -> RemoteResult<()>;

    /// Creates a document with a server-assigned id and returns the id.
    ///
    /// The assigned id is also written into the document's `id` field,
    /// so fetched documents decode without out-of-band key plumbing.
    fn add(&self, collection: Collection, fields: Fields) -> RemoteResult<String>;

    /// Case-sensitive lexicographic prefix query on a string field.
    ///
    /// The native range query is case-sensitive; case-insensitive search
    /// is approximated above this seam by issuing several case variants.
    fn query_prefix(
        &self,
        collection: Collection,
        field: &str,
        prefix: &str,
        limit: usize,
    ) -> RemoteResult<Vec<(String, Document)>>;

    /// Begins a read-check-write transaction.
    ///
    /// The transaction records the version of every document it reads
    /// and fails at commit with `Conflict` if any was changed by a
    /// concurrent commit. Retrying on conflict is the caller's job.
    fn begin(&self) -> RemoteResult<Box<dyn RemoteTransaction + '_>>;
}
