//! SnapshotStore — redb-backed hashes for staging and tests.
//!
//! Publishing into a snapshot file produces the same namespace layout the
//! proxies read from Redis, without touching the shared store. Every
//! [`KvStore`] call is its own write transaction, so the sequential publish
//! keeps the same per-operation granularity it has against Redis; the
//! atomic replace is a single transaction.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableDatabase, ReadableTable};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::store::KvStore;
use crate::tables::HASHES;

/// Convert any `Display` error into a `StoreError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StoreError::$variant(e.to_string())
    };
}

type HashTable<'txn> = redb::Table<'txn, (&'static str, &'static str), &'static [u8]>;

#[derive(Clone)]
pub struct SnapshotStore {
    db: Arc<Database>,
}

impl SnapshotStore {
    /// Open (or create) a snapshot file at the given path.
    pub fn open(path: &Path) -> StoreResult<Self> {
        let db = Database::create(path).map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!(?path, "snapshot store opened");
        Ok(store)
    }

    /// Create an ephemeral in-memory store (for testing).
    pub fn open_in_memory() -> StoreResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!("in-memory snapshot store opened");
        Ok(store)
    }

    fn ensure_tables(&self) -> StoreResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        // Opening a table in a write transaction creates it if absent.
        txn.open_table(HASHES).map_err(map_err!(Table))?;
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    /// Outer keys that currently hold at least one field.
    pub fn keys(&self) -> StoreResult<Vec<String>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(HASHES).map_err(map_err!(Table))?;
        let mut keys: Vec<String> = Vec::new();
        for entry in table.iter().map_err(map_err!(Read))? {
            let (key, _) = entry.map_err(map_err!(Read))?;
            let (hash, _) = key.value();
            if keys.last().map(String::as_str) != Some(hash) {
                keys.push(hash.to_string());
            }
        }
        Ok(keys)
    }

    fn write<T>(&self, apply: impl FnOnce(&mut HashTable<'_>) -> StoreResult<T>) -> StoreResult<T> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let result = {
            let mut table = txn.open_table(HASHES).map_err(map_err!(Table))?;
            apply(&mut table)?
        };
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(result)
    }
}

fn fields_of(
    table: &impl ReadableTable<(&'static str, &'static str), &'static [u8]>,
    key: &str,
) -> StoreResult<BTreeMap<String, Vec<u8>>> {
    let mut fields = BTreeMap::new();
    for entry in table.iter().map_err(map_err!(Read))? {
        let (k, v) = entry.map_err(map_err!(Read))?;
        let (hash, field) = k.value();
        if hash == key {
            fields.insert(field.to_string(), v.value().to_vec());
        }
    }
    Ok(fields)
}

fn remove_hash(table: &mut HashTable<'_>, key: &str) -> StoreResult<usize> {
    let fields = fields_of(&*table, key)?;
    for field in fields.keys() {
        table
            .remove((key, field.as_str()))
            .map_err(map_err!(Write))?;
    }
    Ok(fields.len())
}

impl KvStore for SnapshotStore {
    fn delete(&mut self, key: &str) -> StoreResult<()> {
        let removed = self.write(|table| remove_hash(table, key))?;
        debug!(%key, removed, "hash deleted");
        Ok(())
    }

    fn hset(&mut self, key: &str, field: &str, value: &[u8]) -> StoreResult<()> {
        self.write(|table| {
            table.insert((key, field), value).map_err(map_err!(Write))?;
            Ok(())
        })
    }

    fn hgetall(&mut self, key: &str) -> StoreResult<BTreeMap<String, Vec<u8>>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(HASHES).map_err(map_err!(Table))?;
        fields_of(&table, key)
    }

    fn replace_hash(&mut self, key: &str, fields: &[(String, Vec<u8>)]) -> StoreResult<()> {
        self.write(|table| {
            remove_hash(table, key)?;
            for (field, value) in fields {
                table
                    .insert((key, field.as_str()), value.as_slice())
                    .map_err(map_err!(Write))?;
            }
            Ok(())
        })?;
        debug!(%key, fields = fields.len(), "hash replaced atomically");
        Ok(())
    }
}
