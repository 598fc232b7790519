//! Typed access over the value-level table set.

use serde_json::Value;
use std::marker::PhantomData;
use std::sync::mpsc::RecvTimeoutError;
use std::sync::Arc;
use std::time::Duration;

use crate::error::StoreResult;
use crate::tables::{LocalStore, Table};
use crate::watch::RowSubscription;

/// Encoding seam between an entity type and its stored document form.
///
/// Implementations are explicit and statically typed; the store never
/// inspects entity fields itself. Round-trip tests per entity live with
/// the entity definitions.
pub trait RowCodec: Sized {
    /// Returns the primary key of this row.
    fn row_key(&self) -> String;

    /// Encodes the entity into its stored document.
    fn encode(&self) -> StoreResult<Value>;

    /// Decodes an entity from its stored document.
    fn decode(value: &Value) -> StoreResult<Self>;
}

/// A typed view over one row table.
///
/// `TypedTable<T>` mirrors the store API but speaks entities instead of
/// JSON values. Decode failures are surfaced, not swallowed, so a
/// corrupted cache row is visible to the caller.
///
/// # Example
///
/// ```rust,ignore
/// let posts: TypedTable<Post> = TypedTable::new(Arc::clone(&store), Table::Posts);
/// posts.upsert(&post)?;
/// let found = posts.get(&post.id)?;
/// ```
pub struct TypedTable<T: RowCodec> {
    store: Arc<LocalStore>,
    table: Table,
    _marker: PhantomData<T>,
}

impl<T: RowCodec> TypedTable<T> {
    /// Creates a typed view over `table`.
    pub fn new(store: Arc<LocalStore>, table: Table) -> Self {
        Self {
            store,
            table,
            _marker: PhantomData,
        }
    }

    /// Returns the underlying table.
    pub fn table(&self) -> Table {
        self.table
    }

    /// Inserts or replaces an entity.
    pub fn upsert(&self, entity: &T) -> StoreResult<()> {
        let value = entity.encode()?;
        self.store.upsert(self.table, &entity.row_key(), value);
        Ok(())
    }

    /// Gets an entity by primary key.
    pub fn get(&self, key: &str) -> StoreResult<Option<T>> {
        match self.store.get(self.table, key) {
            Some(value) => Ok(Some(T::decode(&value)?)),
            None => Ok(None),
        }
    }

    /// Deletes an entity by primary key. Returns true if a row existed.
    pub fn delete(&self, key: &str) -> bool {
        self.store.delete(self.table, key)
    }

    /// Scans and decodes all rows, skipping none.
    pub fn scan(&self) -> StoreResult<Vec<T>> {
        self.store
            .scan(self.table)
            .iter()
            .map(|(_, value)| T::decode(value))
            .collect()
    }

    /// Subscribes to a single entity with replay-latest semantics.
    pub fn watch(&self, key: &str) -> TypedSubscription<T> {
        TypedSubscription {
            inner: self.store.watch_row(self.table, key),
            _marker: PhantomData,
        }
    }
}

/// A typed live query over a single entity.
pub struct TypedSubscription<T: RowCodec> {
    inner: RowSubscription,
    _marker: PhantomData<T>,
}

impl<T: RowCodec> TypedSubscription<T> {
    /// Blocks until the next value is available.
    ///
    /// Returns `None` when the store has been dropped. The inner
    /// `Option` is the row state (`None` = row absent).
    pub fn recv(&self) -> Option<StoreResult<Option<T>>> {
        self.inner.recv().map(|value| match value {
            Some(v) => T::decode(&v).map(Some),
            None => Ok(None),
        })
    }

    /// Blocks until the next value is available or the timeout elapses.
    pub fn recv_timeout(
        &self,
        timeout: Duration,
    ) -> Result<StoreResult<Option<T>>, RecvTimeoutError> {
        self.inner.recv_timeout(timeout).map(|value| match value {
            Some(v) => T::decode(&v).map(Some),
            None => Ok(None),
        })
    }
}
