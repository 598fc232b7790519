//! Read-check-write transactions.

use crate::document::{Document, FieldOp, Fields};
use crate::error::RemoteResult;
use crate::store::DocRef;

/// A buffered read-check-write transaction.
///
/// Reads record `(document, observed version)`; writes are buffered and
/// applied atomically at [`Self::commit`], which validates that every
/// read document is still at its observed version. A missing document
/// reads as `None` and is validated as "still missing" at commit.
///
/// Transactions are single-shot: on `Conflict` the caller re-begins and
/// re-runs the whole read-modify-write sequence.
pub trait RemoteTransaction {
    /// Reads a document and records its version in the read set.
    fn read(&mut self, doc: &DocRef) -> RemoteResult<Option<Document>>;

    /// Buffers a create-or-replace write.
    fn set(&mut self, doc: &DocRef, fields: Fields);

    /// Buffers field operations against a document.
    ///
    /// The document is created empty first if it does not exist at
    /// commit time.
    fn update(&mut self, doc: &DocRef, ops: Vec<(String, FieldOp)>);

    /// Buffers a delete.
    fn delete(&mut self, doc: &DocRef);

    /// Validates the read set and applies all buffered writes.
    fn commit(self: Box<Self>) -> RemoteResult<()>;
}

/// A buffered write inside a transaction.
#[derive(Debug, Clone)]
pub(crate) enum TxnWrite {
    /// Create-or-replace.
    Set {
        /// Target document.
        doc: DocRef,
        /// Replacement fields.
        fields: Fields,
    },
    /// Field operations.
    Update {
        /// Target document.
        doc: DocRef,
        /// Operations to apply in order.
        ops: Vec<(String, FieldOp)>,
    },
    /// Delete.
    Delete {
        /// Target document.
        doc: DocRef,
    },
}
