use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use fanout_state::{ConnectionOptions, WriteMode};
use tracing::info;

mod commands;

use commands::publish::Target;

/// Publish backend, proxy and route tables for the write-splitting proxy.
///
/// Each table replaces its namespace wholesale (`b:`, `n:`, `m:`), in that
/// order. Without --config the built-in tables are published.
#[derive(Parser, Debug)]
#[command(name = "fanoutctl", about, version)]
struct Cli {
    /// Redis host
    #[arg(short = 'H', long, default_value = "localhost")]
    host: String,
    /// Redis port
    #[arg(short, long, default_value_t = 6379)]
    port: u16,
    /// Redis database index
    #[arg(short, long, default_value_t = 0)]
    db: u32,
    /// Redis password (empty: no AUTH)
    #[arg(short = 'P', long)]
    password: Option<String>,

    /// Configuration document (TOML, or JSON with a .json extension)
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Print the encoded tables as JSON instead of publishing
    #[arg(long)]
    dry_run: bool,
    /// Replace each namespace inside a single transaction
    #[arg(long)]
    atomic: bool,
    /// Publish into a local redb file instead of Redis
    #[arg(long, value_name = "PATH")]
    snapshot: Option<PathBuf>,
    /// Read every namespace back after publishing and compare
    #[arg(long)]
    verify: bool,
    /// Publish even if routes reference unknown backends
    #[arg(long)]
    skip_validation: bool,
    /// Log every store operation
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn mode(&self) -> WriteMode {
        if self.atomic {
            WriteMode::Atomic
        } else {
            WriteMode::Sequential
        }
    }

    fn target(&self) -> Target {
        match &self.snapshot {
            Some(path) => Target::Snapshot(path.clone()),
            None => Target::Redis(ConnectionOptions {
                host: self.host.clone(),
                port: self.port,
                db: self.db,
                password: self.password.clone(),
            }),
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let directive = if cli.verbose {
        "fanout=debug"
    } else {
        "fanout=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(directive.parse()?),
        )
        .init();

    let bundle = commands::load_bundle(cli.config.as_deref())?;
    if cli.skip_validation {
        info!("validation skipped");
    } else {
        fanout_core::validate(&bundle).context("configuration rejected")?;
    }

    if cli.dry_run {
        return commands::plan::print(&bundle);
    }

    let target = cli.target();
    let report = commands::publish::publish(&bundle, &target, cli.mode(), cli.verify)?;
    println!("✓ Published {} entries to {target}", report.total());
    for (namespace, count) in &report.tables {
        println!("  {namespace}: {count}");
    }
    Ok(())
}
