//! Full-replace publish of one table into its namespace.

use fanout_core::{ConfigTable, TableEntry};
use tracing::debug;

use crate::codec;
use crate::error::{PublishError, PublishResult};
use crate::store::KvStore;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WriteMode {
    /// `DEL` then one `HSET` per entry. Readers can observe the namespace
    /// empty or partially written while this runs.
    #[default]
    Sequential,
    /// Delete and all writes in one store transaction.
    Atomic,
}

pub struct TableWriter<'a, S: KvStore + ?Sized> {
    store: &'a mut S,
    mode: WriteMode,
}

impl<'a, S: KvStore + ?Sized> TableWriter<'a, S> {
    pub fn new(store: &'a mut S, mode: WriteMode) -> Self {
        Self { store, mode }
    }

    pub fn mode(&self) -> WriteMode {
        self.mode
    }

    /// Replace the namespace of `E` with exactly the entries of `table`.
    ///
    /// Entries are encoded before the store is touched, so an encoding
    /// failure leaves the namespace as it was. Returns the number of
    /// fields written.
    pub fn publish<E: TableEntry>(&mut self, table: &ConfigTable<E>) -> PublishResult<usize> {
        let namespace = E::NAMESPACE;
        let key = namespace.key();
        let fields = codec::encode_table(table)?;

        match self.mode {
            WriteMode::Sequential => {
                self.store
                    .delete(key)
                    .map_err(|source| PublishError::Clear { namespace, source })?;
                debug!(%namespace, "namespace cleared");
                for (field, value) in &fields {
                    self.store
                        .hset(key, field, value)
                        .map_err(|source| PublishError::Write {
                            namespace,
                            field: field.clone(),
                            source,
                        })?;
                    debug!(%namespace, %field, bytes = value.len(), "field written");
                }
            }
            WriteMode::Atomic => {
                self.store
                    .replace_hash(key, &fields)
                    .map_err(|source| PublishError::Replace { namespace, source })?;
            }
        }

        Ok(fields.len())
    }
}
