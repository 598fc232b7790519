//! Live-query subscriptions over the local table set.
//!
//! Subscriptions are the only push channel out of the store. The store
//! emits while still holding the table write lock, so delivery order
//! matches commit order even across racing writers, and every event
//! carries a monotonically increasing sequence number so downstream
//! consumers can detect gaps. Dropping a receiver cancels the
//! subscription; the hub prunes disconnected senders on the next
//! emission.

use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

use crate::tables::Table;

/// Type of change applied to a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// Row was inserted (no previous version existed).
    Insert,
    /// Row was updated (previous version existed).
    Update,
    /// Row was deleted.
    Delete,
}

/// A change event delivered to table-level watchers.
#[derive(Debug, Clone, PartialEq)]
pub struct TableEvent {
    /// Sequence number of the change.
    pub sequence: u64,
    /// Table the change occurred in.
    pub table: Table,
    /// Primary key of the affected row.
    pub key: String,
    /// Type of change.
    pub kind: ChangeKind,
}

/// A live query over a single row.
///
/// The first received value is the replay of the latest known state at
/// subscribe time (`None` if the row did not exist). Every subsequent
/// value reflects a committed change to the watched key.
pub struct RowSubscription {
    rx: Receiver<Option<Value>>,
}

impl RowSubscription {
    /// Blocks until the next value is available.
    ///
    /// Returns `None` when the store has been dropped.
    pub fn recv(&self) -> Option<Option<Value>> {
        self.rx.recv().ok()
    }

    /// Blocks until the next value is available or the timeout elapses.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Option<Value>, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }

    /// Returns the next value if one is already queued.
    pub fn try_recv(&self) -> Option<Option<Value>> {
        self.rx.try_recv().ok()
    }
}

/// A live query over a whole table.
pub struct TableSubscription {
    rx: Receiver<TableEvent>,
}

impl TableSubscription {
    /// Blocks until the next event is available.
    ///
    /// Returns `None` when the store has been dropped.
    pub fn recv(&self) -> Option<TableEvent> {
        self.rx.recv().ok()
    }

    /// Blocks until the next event is available or the timeout elapses.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<TableEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }

    /// Returns the next event if one is already queued.
    pub fn try_recv(&self) -> Option<TableEvent> {
        self.rx.try_recv().ok()
    }
}

/// Subscriber registry shared by all tables of one store.
pub(crate) struct WatchHub {
    /// Per-row watchers.
    rows: RwLock<HashMap<(Table, String), Vec<Sender<Option<Value>>>>>,
    /// Per-table watchers.
    tables: RwLock<HashMap<Table, Vec<Sender<TableEvent>>>>,
    /// Next change sequence number.
    sequence: AtomicU64,
}

impl WatchHub {
    pub(crate) fn new() -> Self {
        Self {
            rows: RwLock::new(HashMap::new()),
            tables: RwLock::new(HashMap::new()),
            sequence: AtomicU64::new(0),
        }
    }

    /// Registers a row watcher and immediately replays `current`.
    pub(crate) fn watch_row(
        &self,
        table: Table,
        key: &str,
        current: Option<Value>,
    ) -> RowSubscription {
        let (tx, rx) = mpsc::channel();
        // Replay before registration so the snapshot is always first.
        let _ = tx.send(current);
        self.rows
            .write()
            .entry((table, key.to_string()))
            .or_default()
            .push(tx);
        RowSubscription { rx }
    }

    /// Registers a table watcher.
    pub(crate) fn watch_table(&self, table: Table) -> TableSubscription {
        let (tx, rx) = mpsc::channel();
        self.tables.write().entry(table).or_default().push(tx);
        TableSubscription { rx }
    }

    /// Emits a committed change to all matching watchers.
    pub(crate) fn emit(&self, table: Table, key: &str, kind: ChangeKind, value: Option<Value>) {
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;

        {
            let mut rows = self.rows.write();
            if let Some(watchers) = rows.get_mut(&(table, key.to_string())) {
                watchers.retain(|tx| tx.send(value.clone()).is_ok());
                if watchers.is_empty() {
                    rows.remove(&(table, key.to_string()));
                }
            }
        }

        let event = TableEvent {
            sequence,
            table,
            key: key.to_string(),
            kind,
        };
        let mut tables = self.tables.write();
        if let Some(watchers) = tables.get_mut(&table) {
            watchers.retain(|tx| tx.send(event.clone()).is_ok());
        }
    }

    /// Returns the number of registered row watchers.
    #[cfg(test)]
    pub(crate) fn row_watcher_count(&self) -> usize {
        self.rows.read().values().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn replay_then_change() {
        let hub = WatchHub::new();
        let sub = hub.watch_row(Table::Posts, "p1", Some(json!(1)));

        assert_eq!(sub.recv().unwrap(), Some(json!(1)));

        hub.emit(Table::Posts, "p1", ChangeKind::Update, Some(json!(2)));
        assert_eq!(sub.recv().unwrap(), Some(json!(2)));
    }

    #[test]
    fn replay_none_for_missing_row() {
        let hub = WatchHub::new();
        let sub = hub.watch_row(Table::Posts, "absent", None);
        assert_eq!(sub.recv().unwrap(), None);
    }

    #[test]
    fn table_events_carry_sequence_in_order() {
        let hub = WatchHub::new();
        let sub = hub.watch_table(Table::Comments);

        hub.emit(Table::Comments, "c1", ChangeKind::Insert, Some(json!({})));
        hub.emit(Table::Comments, "c1", ChangeKind::Delete, None);

        let first = sub.recv().unwrap();
        let second = sub.recv().unwrap();
        assert_eq!(first.kind, ChangeKind::Insert);
        assert_eq!(second.kind, ChangeKind::Delete);
        assert!(second.sequence > first.sequence);
    }

    #[test]
    fn dropped_subscriber_is_pruned() {
        let hub = WatchHub::new();
        let sub = hub.watch_row(Table::Posts, "p1", None);
        assert_eq!(hub.row_watcher_count(), 1);

        drop(sub);
        hub.emit(Table::Posts, "p1", ChangeKind::Update, Some(json!(1)));
        assert_eq!(hub.row_watcher_count(), 0);
    }

    #[test]
    fn watchers_on_other_keys_do_not_fire() {
        let hub = WatchHub::new();
        let sub = hub.watch_row(Table::Posts, "p1", None);
        assert_eq!(sub.recv().unwrap(), None);

        hub.emit(Table::Posts, "p2", ChangeKind::Insert, Some(json!(1)));
        assert!(sub.try_recv().is_none());
    }
}
