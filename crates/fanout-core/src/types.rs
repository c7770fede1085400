//! Routing configuration model shared across fanout crates.
//!
//! Three tables make up a [`ConfigBundle`]: backends, proxies, and routes.
//! Each entry type serializes to the JSON shape the consuming proxy reads
//! from its hash field. The entry key (backend id, proxy id, stream name) is
//! never part of the value; it is the hash field name.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, CoreResult};

/// Route key that catches every stream without a more specific entry.
pub const DEFAULT_ROUTE: &str = "_default_";

/// Store namespace holding one table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    Backends,
    Proxies,
    Routes,
}

impl Namespace {
    /// Order in which a full publish writes the tables.
    pub const PUBLISH_ORDER: [Namespace; 3] =
        [Namespace::Backends, Namespace::Proxies, Namespace::Routes];

    /// Outer key of the hash in the shared store.
    pub fn key(&self) -> &'static str {
        match self {
            Namespace::Backends => "b:",
            Namespace::Proxies => "n:",
            Namespace::Routes => "m:",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Namespace::Backends => "backends",
            Namespace::Proxies => "proxies",
            Namespace::Routes => "routes",
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.label(), self.key())
    }
}

/// An entry stored as one hash field under its table's namespace.
pub trait TableEntry: Serialize + DeserializeOwned + Clone {
    const NAMESPACE: Namespace;

    /// Hash field name for this entry.
    fn key(&self) -> &str;

    /// Restore the key after decoding a value read from its field.
    fn set_key(&mut self, key: String);
}

// ── Backends ────────────────────────────────────────────────────────

/// A storage endpoint the proxy writes to and queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(skip)]
    pub id: String,
    pub url: String,
    #[serde(rename = "db", default)]
    pub database: String,
    #[serde(default)]
    pub zone: String,
    /// Batching delay in milliseconds.
    #[serde(rename = "interval", default = "defaults::write_interval")]
    pub write_interval: u64,
    #[serde(rename = "timeout", default = "defaults::write_timeout")]
    pub write_timeout: u64,
    #[serde(rename = "timeoutQuery", default = "defaults::query_timeout")]
    pub query_timeout: u64,
    /// Buffered row count that forces a flush.
    #[serde(rename = "maxRowLimit", default = "defaults::max_batch_rows")]
    pub max_batch_rows: u64,
    #[serde(rename = "checkInterval", default = "defaults::health_check_interval")]
    pub health_check_interval: u64,
    /// Retry cadence for writes buffered while the backend was down.
    #[serde(rename = "rewriteInterval", default = "defaults::rewrite_interval")]
    pub rewrite_interval: u64,
    #[serde(rename = "writeOnly", with = "flag", default)]
    pub write_only: bool,
}

impl BackendConfig {
    /// Backend with every tuning knob at the proxy's default.
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            database: String::new(),
            zone: String::new(),
            write_interval: defaults::write_interval(),
            write_timeout: defaults::write_timeout(),
            query_timeout: defaults::query_timeout(),
            max_batch_rows: defaults::max_batch_rows(),
            health_check_interval: defaults::health_check_interval(),
            rewrite_interval: defaults::rewrite_interval(),
            write_only: false,
        }
    }
}

impl TableEntry for BackendConfig {
    const NAMESPACE: Namespace = Namespace::Backends;

    fn key(&self) -> &str {
        &self.id
    }

    fn set_key(&mut self, key: String) {
        self.id = key;
    }
}

// ── Proxies ─────────────────────────────────────────────────────────

/// A front-end listener definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyConfig {
    #[serde(skip)]
    pub id: String,
    #[serde(rename = "listenAddr")]
    pub listen_addr: String,
    #[serde(rename = "db", default)]
    pub database: String,
    #[serde(default)]
    pub zone: String,
    /// Statistics collection period in seconds.
    #[serde(rename = "interval", default = "defaults::stats_interval")]
    pub stats_interval: u64,
    #[serde(rename = "idleTimeout", default = "defaults::idle_timeout")]
    pub idle_timeout: u64,
    #[serde(rename = "writeTracing", with = "flag", default)]
    pub log_writes: bool,
    #[serde(rename = "queryTracing", with = "flag", default)]
    pub log_queries: bool,
}

impl ProxyConfig {
    pub fn new(id: impl Into<String>, listen_addr: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            listen_addr: listen_addr.into(),
            database: String::new(),
            zone: String::new(),
            stats_interval: defaults::stats_interval(),
            idle_timeout: defaults::idle_timeout(),
            log_writes: false,
            log_queries: false,
        }
    }
}

impl TableEntry for ProxyConfig {
    const NAMESPACE: Namespace = Namespace::Proxies;

    fn key(&self) -> &str {
        &self.id
    }

    fn set_key(&mut self, key: String) {
        self.id = key;
    }
}

// ── Routes ──────────────────────────────────────────────────────────

/// Fan-out list for one stream name. Stored as a bare JSON array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RouteEntry {
    #[serde(skip)]
    pub stream_name: String,
    pub backend_ids: Vec<String>,
}

impl RouteEntry {
    pub fn new<I, S>(stream_name: impl Into<String>, backend_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            stream_name: stream_name.into(),
            backend_ids: backend_ids.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_default(&self) -> bool {
        self.stream_name == DEFAULT_ROUTE
    }
}

impl TableEntry for RouteEntry {
    const NAMESPACE: Namespace = Namespace::Routes;

    fn key(&self) -> &str {
        &self.stream_name
    }

    fn set_key(&mut self, key: String) {
        self.stream_name = key;
    }
}

// ── Tables ──────────────────────────────────────────────────────────

/// Key-ordered set of entries with unique keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigTable<E> {
    entries: BTreeMap<String, E>,
}

impl<E> Default for ConfigTable<E> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<E: TableEntry> ConfigTable<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table, rejecting the first repeated key.
    pub fn try_from_entries(entries: impl IntoIterator<Item = E>) -> CoreResult<Self> {
        let mut table = Self::new();
        for entry in entries {
            table.insert(entry)?;
        }
        Ok(table)
    }

    pub fn insert(&mut self, entry: E) -> CoreResult<()> {
        let key = entry.key().to_string();
        if self.entries.contains_key(&key) {
            return Err(ConfigError::DuplicateKey {
                namespace: E::NAMESPACE,
                key,
            });
        }
        self.entries.insert(key, entry);
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&E> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = &E> {
        self.entries.values()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

pub type BackendTable = ConfigTable<BackendConfig>;
pub type ProxyTable = ConfigTable<ProxyConfig>;
pub type RouteTable = ConfigTable<RouteEntry>;

impl RouteTable {
    /// Find the route a consuming proxy would apply to `stream`.
    ///
    /// Lookup order: exact key, then the longest key that prefixes the
    /// stream name, then [`DEFAULT_ROUTE`].
    pub fn resolve(&self, stream: &str) -> Option<&RouteEntry> {
        if let Some(entry) = self.entries.get(stream) {
            return Some(entry);
        }
        self.entries
            .iter()
            .filter(|(key, _)| key.as_str() != DEFAULT_ROUTE && stream.starts_with(key.as_str()))
            .max_by_key(|(key, _)| key.len())
            .map(|(_, entry)| entry)
            .or_else(|| self.default_route())
    }

    pub fn default_route(&self) -> Option<&RouteEntry> {
        self.entries.get(DEFAULT_ROUTE)
    }
}

/// The three tables published together.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigBundle {
    pub backends: BackendTable,
    pub proxies: ProxyTable,
    pub routes: RouteTable,
}

impl ConfigBundle {
    pub fn is_empty(&self) -> bool {
        self.backends.is_empty() && self.proxies.is_empty() && self.routes.is_empty()
    }

    /// Entry count for the table stored under `namespace`.
    pub fn table_len(&self, namespace: Namespace) -> usize {
        match namespace {
            Namespace::Backends => self.backends.len(),
            Namespace::Proxies => self.proxies.len(),
            Namespace::Routes => self.routes.len(),
        }
    }
}

/// Defaults the consuming proxy applies to absent fields.
pub mod defaults {
    pub fn write_interval() -> u64 {
        1_000
    }

    pub fn write_timeout() -> u64 {
        10_000
    }

    pub fn query_timeout() -> u64 {
        600_000
    }

    pub fn max_batch_rows() -> u64 {
        10_000
    }

    pub fn health_check_interval() -> u64 {
        1_000
    }

    pub fn rewrite_interval() -> u64 {
        10_000
    }

    pub fn stats_interval() -> u64 {
        10
    }

    pub fn idle_timeout() -> u64 {
        10
    }
}

/// Booleans travel as the integers `0` and `1`.
mod flag {
    use serde::de::{Error, Unexpected};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(u8::from(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        match u64::deserialize(deserializer)? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(D::Error::invalid_value(
                Unexpected::Unsigned(other),
                &"0 or 1",
            )),
        }
    }
}
