//! redb table definitions for snapshot files.
//!
//! Hashes are flattened into one table keyed by `(namespace, field)`, so a
//! namespace is every row sharing the first key component.

use redb::TableDefinition;

/// Hash fields keyed by `(outer key, field)`, values stored as written.
pub const HASHES: TableDefinition<(&str, &str), &[u8]> = TableDefinition::new("hashes");
