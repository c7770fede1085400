//! Key-value store seam used by the table writer.
//!
//! A namespace is one hash: an outer key holding many field/value pairs.
//! Implementations: [`RedisStore`](crate::redis::RedisStore) for the shared
//! store the proxies read, [`SnapshotStore`](crate::snapshot::SnapshotStore)
//! for local redb files and tests.

use std::collections::BTreeMap;

use crate::error::StoreResult;

pub trait KvStore {
    /// Remove `key` together with every field under it. Missing keys are not an error.
    fn delete(&mut self, key: &str) -> StoreResult<()>;

    /// Set one field, creating the hash if needed.
    fn hset(&mut self, key: &str, field: &str, value: &[u8]) -> StoreResult<()>;

    /// All fields of the hash, empty when the key does not exist.
    fn hgetall(&mut self, key: &str) -> StoreResult<BTreeMap<String, Vec<u8>>>;

    /// Delete `key` and write `fields` as a single atomic operation.
    fn replace_hash(&mut self, key: &str, fields: &[(String, Vec<u8>)]) -> StoreResult<()>;
}
