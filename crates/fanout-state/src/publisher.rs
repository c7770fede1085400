//! Publisher — writes a whole bundle, one table at a time.
//!
//! Tables go out in [`Namespace::PUBLISH_ORDER`]: backends, proxies, routes.
//! There is no cross-table transaction. The first failing table stops the
//! run; tables already written stay written.

use fanout_core::{ConfigBundle, Namespace};
use tracing::info;

use crate::error::PublishResult;
use crate::store::KvStore;
use crate::writer::{TableWriter, WriteMode};

/// Entry counts per namespace, in publish order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishReport {
    pub tables: Vec<(Namespace, usize)>,
}

impl PublishReport {
    pub fn count(&self, namespace: Namespace) -> Option<usize> {
        self.tables
            .iter()
            .find(|(ns, _)| *ns == namespace)
            .map(|(_, count)| *count)
    }

    pub fn total(&self) -> usize {
        self.tables.iter().map(|(_, count)| count).sum()
    }
}

pub struct Publisher<'a, S: KvStore + ?Sized> {
    writer: TableWriter<'a, S>,
}

impl<'a, S: KvStore + ?Sized> Publisher<'a, S> {
    pub fn new(store: &'a mut S) -> Self {
        Self::with_mode(store, WriteMode::default())
    }

    pub fn with_mode(store: &'a mut S, mode: WriteMode) -> Self {
        Self {
            writer: TableWriter::new(store, mode),
        }
    }

    /// Replace all three namespaces with the contents of `bundle`.
    pub fn publish(&mut self, bundle: &ConfigBundle) -> PublishResult<PublishReport> {
        let mut report = PublishReport::default();
        for namespace in Namespace::PUBLISH_ORDER {
            let written = match namespace {
                Namespace::Backends => self.writer.publish(&bundle.backends)?,
                Namespace::Proxies => self.writer.publish(&bundle.proxies)?,
                Namespace::Routes => self.writer.publish(&bundle.routes)?,
            };
            info!(%namespace, entries = written, mode = ?self.writer.mode(), "table published");
            report.tables.push((namespace, written));
        }
        Ok(report)
    }
}
