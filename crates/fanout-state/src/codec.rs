//! Hash field values: one JSON document per table entry.
//!
//! The entry key is the field name and never appears in the value, so
//! [`decode`] takes it back as a separate argument.

use fanout_core::{ConfigTable, TableEntry};

use crate::error::{CodecError, CodecResult};

pub fn encode<E: TableEntry>(entry: &E) -> CodecResult<Vec<u8>> {
    serde_json::to_vec(entry).map_err(|source| CodecError::Encode {
        namespace: E::NAMESPACE,
        key: entry.key().to_string(),
        source,
    })
}

pub fn decode<E: TableEntry>(key: &str, value: &[u8]) -> CodecResult<E> {
    let mut entry: E = serde_json::from_slice(value).map_err(|source| CodecError::Decode {
        namespace: E::NAMESPACE,
        key: key.to_string(),
        source,
    })?;
    entry.set_key(key.to_string());
    Ok(entry)
}

/// Encode every entry of a table as `(field, value)` pairs in key order.
pub fn encode_table<E: TableEntry>(table: &ConfigTable<E>) -> CodecResult<Vec<(String, Vec<u8>)>> {
    table
        .iter()
        .map(|entry| Ok((entry.key().to_string(), encode(entry)?)))
        .collect()
}
