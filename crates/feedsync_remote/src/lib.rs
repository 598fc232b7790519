//! # feedsync Remote
//!
//! Remote document store abstraction for feedsync.
//!
//! The remote store is the authoritative side of the sync pair: a
//! multi-tenant document database organized into top-level collections,
//! with per-document atomic read-check-write transactions and
//! field-level operations (increment, array-union, array-remove).
//!
//! This crate defines the seam ([`RemoteStore`], [`RemoteTransaction`])
//! and ships [`MemoryRemoteStore`], a versioned in-memory implementation
//! used by tests and local development. The fake validates optimistic
//! read versions at commit time and simulates the server-side cascade
//! triggers that fire when a review document is deleted.
//!
//! Production deployments substitute a network-backed implementation of
//! the same traits; nothing above this crate knows the difference.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod document;
mod error;
mod memory;
mod store;
mod txn;

pub use document::{apply_field_op, Document, FieldOp, Fields};
pub use error::{RemoteError, RemoteResult};
pub use memory::MemoryRemoteStore;
pub use store::{Collection, DocRef, RemoteStore};
pub use txn::RemoteTransaction;
