//! Counter transaction engine.
//!
//! Keeps an aggregate counter and its justifying edge document
//! consistent under concurrent writers: the counter read, the clamp,
//! the edge mutation and the counter write all happen inside one
//! remote read-check-write transaction. Commit conflicts are retried
//! with backoff up to the policy's attempt budget; exhaustion surfaces
//! as [`SyncError::TransactionConflict`].

use feedsync_remote::{DocRef, FieldOp, Fields, RemoteError, RemoteStore};
use serde_json::Value;
use std::sync::Arc;
use std::thread;

use crate::error::{SyncError, SyncResult};
use crate::retry::RetryPolicy;

/// The edge half of a counter delta.
#[derive(Debug, Clone)]
pub enum EdgeMutation {
    /// Create an edge document (e.g. a comment, a follow edge).
    CreateDoc {
        /// Target document.
        doc: DocRef,
        /// Document fields.
        fields: Fields,
    },
    /// Delete an edge document.
    DeleteDoc {
        /// Target document.
        doc: DocRef,
    },
    /// Add a member to an array field (e.g. `likedPostIds`).
    AddMember {
        /// Document holding the array.
        doc: DocRef,
        /// Array field name.
        field: String,
        /// Member value.
        value: Value,
    },
    /// Remove a member from an array field.
    RemoveMember {
        /// Document holding the array.
        doc: DocRef,
        /// Array field name.
        field: String,
        /// Member value.
        value: Value,
    },
}

/// Engine applying counter deltas transactionally.
pub struct CounterTxnEngine {
    remote: Arc<dyn RemoteStore>,
    retry: RetryPolicy,
}

impl CounterTxnEngine {
    /// Creates an engine over the given remote store.
    pub fn new(remote: Arc<dyn RemoteStore>, retry: RetryPolicy) -> Self {
        Self { remote, retry }
    }

    /// Atomically applies `delta` to `counter_field` on `aggregate` and
    /// the given edge mutation, returning the new counter value.
    ///
    /// The counter reads as 0 when the field (or the whole aggregate
    /// document) is absent, and the new value is clamped at zero so a
    /// duplicate decrement cannot drive it negative.
    pub fn apply_delta(
        &self,
        aggregate: &DocRef,
        counter_field: &str,
        delta: i64,
        edge: &EdgeMutation,
    ) -> SyncResult<i64> {
        let mut attempt: u32 = 0;
        loop {
            match self.try_once(aggregate, counter_field, delta, edge) {
                Ok(new_value) => return Ok(new_value),
                Err(RemoteError::Conflict { .. }) => {
                    attempt += 1;
                    if attempt >= self.retry.max_attempts {
                        return Err(SyncError::conflict(attempt));
                    }
                    tracing::debug!(
                        collection = aggregate.collection.name(),
                        id = %aggregate.id,
                        field = counter_field,
                        attempt,
                        "counter transaction conflict, retrying"
                    );
                    thread::sleep(self.retry.delay_for_attempt(attempt));
                }
                Err(other) => return Err(other.into()),
            }
        }
    }

    /// One read-clamp-write attempt.
    fn try_once(
        &self,
        aggregate: &DocRef,
        counter_field: &str,
        delta: i64,
        edge: &EdgeMutation,
    ) -> Result<i64, RemoteError> {
        let mut txn = self.remote.begin()?;

        let current = txn
            .read(aggregate)?
            .map_or(0, |doc| doc.i64_field(counter_field));
        let new_value = (current + delta).max(0);

        match edge {
            EdgeMutation::CreateDoc { doc, fields } => txn.set(doc, fields.clone()),
            EdgeMutation::DeleteDoc { doc } => txn.delete(doc),
            EdgeMutation::AddMember { doc, field, value } => txn.update(
                doc,
                vec![(field.clone(), FieldOp::ArrayUnion(value.clone()))],
            ),
            EdgeMutation::RemoveMember { doc, field, value } => txn.update(
                doc,
                vec![(field.clone(), FieldOp::ArrayRemove(value.clone()))],
            ),
        }

        txn.update(
            aggregate,
            vec![(
                counter_field.to_string(),
                FieldOp::Set(Value::from(new_value)),
            )],
        );
        txn.commit()?;
        Ok(new_value)
    }
}
