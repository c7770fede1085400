//! fanout.toml configuration document.
//!
//! The document is the operator-facing source of the three tables. Field
//! names are snake_case and every tuning knob is optional; omitted knobs get
//! the same defaults the consuming proxy applies.
//!
//! ```toml
//! [backends.node1]
//! url = "http://10.0.0.1:8086"
//! database = "metrics"
//!
//! [proxies.p1]
//! listen_addr = ":8087"
//!
//! [routes]
//! cpu = ["node1"]
//! _default_ = ["node1"]
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, CoreResult};
use crate::types::*;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FanoutConfig {
    #[serde(default)]
    pub backends: BTreeMap<String, BackendSection>,
    #[serde(default)]
    pub proxies: BTreeMap<String, ProxySection>,
    #[serde(default)]
    pub routes: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BackendSection {
    pub url: String,
    #[serde(default)]
    pub database: String,
    #[serde(default)]
    pub zone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub write_interval: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub write_timeout: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_timeout: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_batch_rows: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health_check_interval: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rewrite_interval: Option<u64>,
    #[serde(default)]
    pub write_only: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProxySection {
    pub listen_addr: String,
    #[serde(default)]
    pub database: String,
    #[serde(default)]
    pub zone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats_interval: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idle_timeout: Option<u64>,
    #[serde(default)]
    pub log_writes: bool,
    #[serde(default)]
    pub log_queries: bool,
}

impl FanoutConfig {
    /// Load a document, picking the format from the file extension
    /// (`.json` is JSON, anything else is TOML).
    pub fn from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_str(&content),
            _ => Self::from_toml_str(&content),
        }
    }

    pub fn from_toml_str(content: &str) -> CoreResult<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_json_str(content: &str) -> CoreResult<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Resolve defaults and assemble the immutable bundle.
    pub fn into_bundle(self) -> CoreResult<ConfigBundle> {
        let backends = BackendTable::try_from_entries(
            self.backends
                .into_iter()
                .map(|(id, section)| section.into_backend(id)),
        )?;
        let proxies = ProxyTable::try_from_entries(
            self.proxies
                .into_iter()
                .map(|(id, section)| section.into_proxy(id)),
        )?;
        let routes = RouteTable::try_from_entries(
            self.routes
                .into_iter()
                .map(|(stream, backend_ids)| RouteEntry::new(stream, backend_ids)),
        )?;
        Ok(ConfigBundle {
            backends,
            proxies,
            routes,
        })
    }
}

impl BackendSection {
    fn into_backend(self, id: String) -> BackendConfig {
        BackendConfig {
            id,
            url: self.url,
            database: self.database,
            zone: self.zone,
            write_interval: self.write_interval.unwrap_or_else(defaults::write_interval),
            write_timeout: self.write_timeout.unwrap_or_else(defaults::write_timeout),
            query_timeout: self.query_timeout.unwrap_or_else(defaults::query_timeout),
            max_batch_rows: self.max_batch_rows.unwrap_or_else(defaults::max_batch_rows),
            health_check_interval: self
                .health_check_interval
                .unwrap_or_else(defaults::health_check_interval),
            rewrite_interval: self
                .rewrite_interval
                .unwrap_or_else(defaults::rewrite_interval),
            write_only: self.write_only,
        }
    }
}

impl ProxySection {
    fn into_proxy(self, id: String) -> ProxyConfig {
        ProxyConfig {
            id,
            listen_addr: self.listen_addr,
            database: self.database,
            zone: self.zone,
            stats_interval: self.stats_interval.unwrap_or_else(defaults::stats_interval),
            idle_timeout: self.idle_timeout.unwrap_or_else(defaults::idle_timeout),
            log_writes: self.log_writes,
            log_queries: self.log_queries,
        }
    }
}
