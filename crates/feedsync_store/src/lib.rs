//! # feedsync Store
//!
//! In-process local cache with live queries.
//!
//! This crate provides the local half of the feedsync core: a small,
//! thread-safe table set that backs every read the UI ever performs.
//! Reads are synchronous and never touch the network; absence of a row
//! surfaces as `None`, never as an error.
//!
//! ## Design Principles
//!
//! - Tables are **opaque JSON document stores** keyed by primary id;
//!   entity typing lives in [`TypedTable`], not in the store itself
//! - Edge tables encode many-to-many relationships as composite keys
//! - Live queries replay the latest known value on subscribe, then
//!   re-emit on every change to the watched key
//! - Same-row writes serialize under the table write lock, so repeated
//!   rapid mutations are observed in call order
//!
//! ## Example
//!
//! ```rust
//! use feedsync_store::{LocalStore, Table};
//! use serde_json::json;
//!
//! let store = LocalStore::new();
//! let sub = store.watch_row(Table::Posts, "p1");
//! store.upsert(Table::Posts, "p1", json!({"title": "hello"}));
//! assert!(sub.recv().unwrap().is_none()); // replay: nothing yet at subscribe
//! assert!(sub.recv().unwrap().is_some()); // the upsert
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod tables;
mod typed;
mod watch;

pub use error::{StoreError, StoreResult};
pub use tables::{EdgeTable, LocalStore, Table};
pub use typed::{RowCodec, TypedSubscription, TypedTable};
pub use watch::{ChangeKind, RowSubscription, TableEvent, TableSubscription};
