//! # feedsync Core
//!
//! Offline-tolerant sync repositories for a social content application.
//!
//! This crate is the data-synchronization core sitting between a UI and
//! two stores: the in-process [`LocalStore`](feedsync_store::LocalStore)
//! that backs every read, and a remote document store behind the
//! [`RemoteStore`](feedsync_remote::RemoteStore) seam that holds the
//! authoritative truth.
//!
//! The contract, uniform across entity repositories:
//!
//! - **observe**: subscribe to the local cache; never touches the
//!   network; replays the latest known value on subscribe
//! - **mutate**: apply the local effect synchronously (optimistic),
//!   then the remote effect best-effort; toggle-style mutations keep
//!   the local state even when the remote write fails
//! - **refresh**: pull remote truth on demand and upsert it locally,
//!   which re-triggers observers
//!
//! Aggregate counters (`likeCount`, `commentCount`, follower counts)
//! are kept consistent with their justifying edge documents by the
//! [`CounterTxnEngine`], which retries read-clamp-write transactions
//! under optimistic concurrency.
//!
//! The optimistic, no-rollback policy means local and remote state can
//! drift while offline; every repository exposes `force_resync` as the
//! manual recovery path.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod counter;
mod dedup;
mod error;
pub mod model;
pub mod repo;
mod retry;
mod search;
mod worker;

pub use counter::{CounterTxnEngine, EdgeMutation};
pub use dedup::{normalize, DedupMatcher};
pub use error::{SyncError, SyncResult};
pub use repo::Repositories;
pub use retry::RetryPolicy;
pub use search::{SearchCoordinator, SearchFilter};
pub use worker::RemoteWriteWorker;
