//! fanout-state — publishing routing tables into the shared store.
//!
//! # Store layout
//!
//! | Key  | Field                     | Value                         |
//! |------|---------------------------|-------------------------------|
//! | `b:` | backend id                | JSON backend config           |
//! | `n:` | proxy id                  | JSON proxy config             |
//! | `m:` | stream name / `_default_` | JSON array of backend ids     |
//!
//! The [`Publisher`] replaces each namespace wholesale through a
//! [`TableWriter`]. The store is reached through the [`KvStore`] trait:
//! [`RedisStore`] for the shared Redis the proxies poll, [`SnapshotStore`]
//! for redb files and in-memory tests.

pub mod codec;
pub mod error;
pub mod publisher;
pub mod reader;
pub mod redis;
pub mod resp;
pub mod snapshot;
pub mod store;
pub mod tables;
pub mod writer;

pub use error::{
    CodecError, CodecResult, PublishError, PublishResult, ReadError, ReadResult, StoreError,
    StoreResult,
};
pub use publisher::{PublishReport, Publisher};
pub use redis::{ConnectionOptions, RedisStore};
pub use snapshot::SnapshotStore;
pub use store::KvStore;
pub use writer::{TableWriter, WriteMode};
