//! Read published namespaces back into a bundle, the way a proxy loads them.

use fanout_core::{ConfigBundle, ConfigTable, TableEntry};

use crate::codec;
use crate::error::{ReadError, ReadResult};
use crate::store::KvStore;

pub fn load_table<E, S>(store: &mut S) -> ReadResult<ConfigTable<E>>
where
    E: TableEntry,
    S: KvStore + ?Sized,
{
    let namespace = E::NAMESPACE;
    let fields = store
        .hgetall(namespace.key())
        .map_err(|source| ReadError::Store { namespace, source })?;

    let mut table = ConfigTable::new();
    for (field, value) in fields {
        table.insert(codec::decode::<E>(&field, &value)?)?;
    }
    Ok(table)
}

pub fn load_bundle<S: KvStore + ?Sized>(store: &mut S) -> ReadResult<ConfigBundle> {
    Ok(ConfigBundle {
        backends: load_table(store)?,
        proxies: load_table(store)?,
        routes: load_table(store)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::SnapshotStore;
    use fanout_core::*;

    #[test]
    fn empty_store_loads_empty_bundle() {
        let mut store = SnapshotStore::open_in_memory().unwrap();
        assert!(load_bundle(&mut store).unwrap().is_empty());
    }

    #[test]
    fn decodes_values_written_by_other_publishers() {
        let mut store = SnapshotStore::open_in_memory().unwrap();
        store
            .hset(
                "b:",
                "node1",
                br#"{"url":"http://10.100.2.180:8086","db":"citibike","zone":"local","interval":1000,"timeout":10000,"timeoutQuery":600000,"maxRowLimit":10000,"checkInterval":1000,"rewriteInterval":10000}"#,
            )
            .unwrap();
        store.hset("m:", "_default_", br#"["node1"]"#).unwrap();

        let bundle = load_bundle(&mut store).unwrap();
        let node1 = bundle.backends.get("node1").unwrap();
        assert_eq!(node1.database, "citibike");
        assert!(!node1.write_only);
        assert_eq!(bundle.routes.resolve("cpu").unwrap().backend_ids, ["node1"]);
    }

    #[test]
    fn bad_value_is_a_decode_error() {
        let mut store = SnapshotStore::open_in_memory().unwrap();
        store.hset("n:", "p1", b"{").unwrap();

        let err = load_bundle(&mut store).unwrap_err();
        assert!(matches!(
            err,
            ReadError::Decode(ref e) if e.namespace() == Namespace::Proxies
        ));
    }
}
