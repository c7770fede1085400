//! fanout-core — configuration model for the write-splitting proxy.
//!
//! Holds the three table types (backends, proxies, routes), the
//! `fanout.toml` document they are loaded from, and the optional
//! cross-table validation pass.

pub mod config;
pub mod error;
pub mod types;
pub mod validate;

pub use config::FanoutConfig;
pub use error::{ConfigError, CoreResult};
pub use types::*;
pub use validate::{Issue, ValidationError, validate};
