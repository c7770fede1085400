//! Publisher behaviour against the in-memory snapshot store.
//!
//! Covers the full-replace contract: idempotent re-publish, stale field
//! removal, namespace isolation, abort-on-failure ordering, and reading the
//! result back the way a proxy would.

use std::collections::BTreeMap;

use fanout_core::*;
use fanout_state::*;

fn scenario_bundle() -> ConfigBundle {
    ConfigBundle {
        backends: BackendTable::try_from_entries([
            BackendConfig::new("A", "http://url1"),
            BackendConfig::new("B", "http://url2"),
        ])
        .unwrap(),
        proxies: ProxyTable::try_from_entries([ProxyConfig::new("P1", ":8087")]).unwrap(),
        routes: RouteTable::try_from_entries([
            RouteEntry::new("temp", ["B"]),
            RouteEntry::new(DEFAULT_ROUTE, ["A", "B"]),
        ])
        .unwrap(),
    }
}

fn field_names(store: &mut SnapshotStore, key: &str) -> Vec<String> {
    store.hgetall(key).unwrap().into_keys().collect()
}

fn dump(store: &mut SnapshotStore) -> Vec<BTreeMap<String, Vec<u8>>> {
    Namespace::PUBLISH_ORDER
        .iter()
        .map(|ns| store.hgetall(ns.key()).unwrap())
        .collect()
}

/// Wraps a store and fails the n-th mutating call.
struct FailingStore {
    inner: SnapshotStore,
    fail_at: usize,
    calls: usize,
    log: Vec<String>,
}

impl FailingStore {
    fn new(inner: SnapshotStore, fail_at: usize) -> Self {
        Self {
            inner,
            fail_at,
            calls: 0,
            log: Vec::new(),
        }
    }

    fn tick(&mut self, op: String) -> StoreResult<()> {
        self.calls += 1;
        if self.calls == self.fail_at {
            return Err(StoreError::Closed);
        }
        self.log.push(op);
        Ok(())
    }
}

impl KvStore for FailingStore {
    fn delete(&mut self, key: &str) -> StoreResult<()> {
        self.tick(format!("DEL {key}"))?;
        self.inner.delete(key)
    }

    fn hset(&mut self, key: &str, field: &str, value: &[u8]) -> StoreResult<()> {
        self.tick(format!("HSET {key} {field}"))?;
        self.inner.hset(key, field, value)
    }

    fn hgetall(&mut self, key: &str) -> StoreResult<BTreeMap<String, Vec<u8>>> {
        self.inner.hgetall(key)
    }

    fn replace_hash(&mut self, key: &str, fields: &[(String, Vec<u8>)]) -> StoreResult<()> {
        self.tick(format!("REPLACE {key}"))?;
        self.inner.replace_hash(key, fields)
    }
}

#[test]
fn scenario_publish_then_clear() {
    let mut store = SnapshotStore::open_in_memory().unwrap();

    Publisher::new(&mut store).publish(&scenario_bundle()).unwrap();

    assert_eq!(field_names(&mut store, "b:"), ["A", "B"]);
    assert_eq!(field_names(&mut store, "m:"), ["_default_", "temp"]);
    assert_eq!(field_names(&mut store, "n:"), ["P1"]);

    let backends = store.hgetall("b:").unwrap();
    let a = BackendConfig::new("A", "http://url1");
    assert_eq!(backends["A"], codec::encode(&a).unwrap());

    Publisher::new(&mut store)
        .publish(&ConfigBundle::default())
        .unwrap();

    for namespace in Namespace::PUBLISH_ORDER {
        assert!(store.hgetall(namespace.key()).unwrap().is_empty());
    }
    assert!(store.keys().unwrap().is_empty());
}

#[test]
fn republish_is_idempotent() {
    let mut store = SnapshotStore::open_in_memory().unwrap();
    let bundle = scenario_bundle();

    Publisher::new(&mut store).publish(&bundle).unwrap();
    let once = dump(&mut store);
    Publisher::new(&mut store).publish(&bundle).unwrap();

    assert_eq!(dump(&mut store), once);
}

#[test]
fn stale_ids_disappear_in_every_namespace() {
    let mut store = SnapshotStore::open_in_memory().unwrap();
    store.hset("b:", "gone", b"{}").unwrap();
    store.hset("n:", "gone", b"{}").unwrap();
    store.hset("m:", "gone", b"[]").unwrap();

    Publisher::new(&mut store).publish(&scenario_bundle()).unwrap();

    for namespace in Namespace::PUBLISH_ORDER {
        assert!(!store.hgetall(namespace.key()).unwrap().contains_key("gone"));
    }
}

#[test]
fn unrelated_keys_survive() {
    let mut store = SnapshotStore::open_in_memory().unwrap();
    store.hset("stats:", "p1", b"42").unwrap();

    Publisher::new(&mut store).publish(&scenario_bundle()).unwrap();

    assert_eq!(store.hgetall("stats:").unwrap()["p1"], b"42");
}

#[test]
fn atomic_mode_produces_the_same_state() {
    let bundle = scenario_bundle();

    let mut sequential = SnapshotStore::open_in_memory().unwrap();
    Publisher::with_mode(&mut sequential, WriteMode::Sequential)
        .publish(&bundle)
        .unwrap();

    let mut atomic = SnapshotStore::open_in_memory().unwrap();
    Publisher::with_mode(&mut atomic, WriteMode::Atomic)
        .publish(&bundle)
        .unwrap();

    assert_eq!(dump(&mut sequential), dump(&mut atomic));
}

#[test]
fn tables_are_written_in_fixed_order() {
    let mut store = FailingStore::new(SnapshotStore::open_in_memory().unwrap(), 0);

    Publisher::new(&mut store).publish(&scenario_bundle()).unwrap();

    assert_eq!(
        store.log,
        [
            "DEL b:",
            "HSET b: A",
            "HSET b: B",
            "DEL n:",
            "HSET n: P1",
            "DEL m:",
            "HSET m: _default_",
            "HSET m: temp",
        ]
    );
}

#[test]
fn failed_write_aborts_remaining_tables() {
    let mut inner = SnapshotStore::open_in_memory().unwrap();
    inner.hset("m:", "old", b"[\"A\"]").unwrap();
    // DEL b:, HSET b: A, HSET b: B, DEL n:, then HSET n: P1 fails.
    let mut store = FailingStore::new(inner, 5);

    let err = Publisher::new(&mut store)
        .publish(&scenario_bundle())
        .unwrap_err();

    assert_eq!(err.namespace(), Namespace::Proxies);
    assert!(matches!(err, PublishError::Write { ref field, .. } if field == "P1"));

    let mut inner = store.inner;
    assert_eq!(field_names(&mut inner, "b:"), ["A", "B"]);
    assert!(inner.hgetall("n:").unwrap().is_empty());
    assert_eq!(field_names(&mut inner, "m:"), ["old"]);
}

#[test]
fn failed_delete_leaves_table_untouched() {
    let mut inner = SnapshotStore::open_in_memory().unwrap();
    inner.hset("b:", "old", b"{}").unwrap();
    let mut store = FailingStore::new(inner, 1);

    let err = Publisher::new(&mut store)
        .publish(&scenario_bundle())
        .unwrap_err();

    assert!(matches!(
        err,
        PublishError::Clear {
            namespace: Namespace::Backends,
            ..
        }
    ));
    assert!(store.log.is_empty());
    assert_eq!(field_names(&mut store.inner, "b:"), ["old"]);
}

#[test]
fn failed_atomic_replace_names_namespace() {
    let mut store = FailingStore::new(SnapshotStore::open_in_memory().unwrap(), 3);

    let err = Publisher::with_mode(&mut store, WriteMode::Atomic)
        .publish(&scenario_bundle())
        .unwrap_err();

    assert!(matches!(
        err,
        PublishError::Replace {
            namespace: Namespace::Routes,
            ..
        }
    ));
    assert_eq!(store.log, ["REPLACE b:", "REPLACE n:"]);
}

#[test]
fn rerun_after_failure_recovers() {
    let mut store = FailingStore::new(SnapshotStore::open_in_memory().unwrap(), 2);
    assert!(Publisher::new(&mut store).publish(&scenario_bundle()).is_err());

    let mut inner = store.inner;
    Publisher::new(&mut inner).publish(&scenario_bundle()).unwrap();
    assert_eq!(reader::load_bundle(&mut inner).unwrap(), scenario_bundle());
}

#[test]
fn published_bundle_reads_back_identically() {
    let mut store = SnapshotStore::open_in_memory().unwrap();
    let mut bundle = scenario_bundle();
    let mut tuned = BackendConfig::new("C", "http://url3");
    tuned.zone = "remote".into();
    tuned.write_only = true;
    tuned.max_batch_rows = 1;
    bundle.backends.insert(tuned).unwrap();

    Publisher::new(&mut store).publish(&bundle).unwrap();

    assert_eq!(reader::load_bundle(&mut store).unwrap(), bundle);
}

#[test]
fn consumer_resolves_routes_after_publish() {
    let mut store = SnapshotStore::open_in_memory().unwrap();
    Publisher::new(&mut store).publish(&scenario_bundle()).unwrap();

    let loaded = reader::load_bundle(&mut store).unwrap();
    assert_eq!(loaded.routes.resolve("temp").unwrap().backend_ids, ["B"]);
    assert_eq!(
        loaded.routes.resolve("humidity").unwrap().backend_ids,
        ["A", "B"]
    );
}

#[test]
fn snapshot_file_holds_published_tables() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("staged.redb");

    {
        let mut store = SnapshotStore::open(&path).unwrap();
        Publisher::new(&mut store).publish(&scenario_bundle()).unwrap();
    }

    let mut store = SnapshotStore::open(&path).unwrap();
    assert_eq!(store.keys().unwrap(), ["b:", "m:", "n:"]);
    assert_eq!(reader::load_bundle(&mut store).unwrap(), scenario_bundle());
}
