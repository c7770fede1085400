use std::fmt;
use std::path::PathBuf;

use anyhow::{Context, bail};
use fanout_core::ConfigBundle;
use fanout_state::{
    ConnectionOptions, KvStore, PublishReport, Publisher, RedisStore, SnapshotStore, WriteMode,
    reader,
};
use tracing::info;

/// Where the tables are published.
#[derive(Debug, Clone)]
pub enum Target {
    Redis(ConnectionOptions),
    Snapshot(PathBuf),
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Redis(options) => write!(f, "redis://{}/{}", options.addr(), options.db),
            Target::Snapshot(path) => write!(f, "snapshot {}", path.display()),
        }
    }
}

pub fn publish(
    bundle: &ConfigBundle,
    target: &Target,
    mode: WriteMode,
    verify: bool,
) -> anyhow::Result<PublishReport> {
    match target {
        Target::Redis(options) => {
            let mut store = RedisStore::connect(options)
                .with_context(|| format!("failed to connect to {target}"))?;
            run(&mut store, bundle, mode, verify)
        }
        Target::Snapshot(path) => {
            let mut store = SnapshotStore::open(path)
                .with_context(|| format!("failed to open {target}"))?;
            run(&mut store, bundle, mode, verify)
        }
    }
}

fn run<S: KvStore + ?Sized>(
    store: &mut S,
    bundle: &ConfigBundle,
    mode: WriteMode,
    verify: bool,
) -> anyhow::Result<PublishReport> {
    let report = Publisher::with_mode(store, mode)
        .publish(bundle)
        .context("publish aborted")?;
    info!(entries = report.total(), "publish complete");

    if verify {
        let published = reader::load_bundle(store).context("failed to read tables back")?;
        if &published != bundle {
            bail!("published tables differ from the configuration");
        }
        info!("read-back matches");
    }
    Ok(report)
}
