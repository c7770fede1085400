//! Cross-table checks run before anything is written.
//!
//! The publisher itself never validates; callers opt in by running
//! [`validate`] first. Every problem is collected so the operator sees the
//! whole list in one pass.

use std::collections::HashSet;
use std::fmt;

use thiserror::Error;
use tracing::warn;

use crate::types::{ConfigBundle, Namespace};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Issue {
    /// A route names a backend that is not in the backend table.
    UnknownBackend { stream: String, backend: String },
    /// A route with no backends drops every point it matches.
    EmptyRoute { stream: String },
    /// An empty key would match every stream by prefix or be unreadable as an id.
    EmptyKey { namespace: Namespace },
    MissingUrl { backend: String },
    MissingListenAddr { proxy: String },
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Issue::UnknownBackend { stream, backend } => {
                write!(f, "route {stream:?} references unknown backend {backend:?}")
            }
            Issue::EmptyRoute { stream } => write!(f, "route {stream:?} has no backends"),
            Issue::EmptyKey { namespace } => write!(f, "{namespace} contains an empty key"),
            Issue::MissingUrl { backend } => write!(f, "backend {backend:?} has no url"),
            Issue::MissingListenAddr { proxy } => {
                write!(f, "proxy {proxy:?} has no listen address")
            }
        }
    }
}

/// All issues found in a bundle.
#[derive(Debug, Error)]
#[error("{} configuration issue(s): {}", .issues.len(), join_issues(.issues))]
pub struct ValidationError {
    pub issues: Vec<Issue>,
}

fn join_issues(issues: &[Issue]) -> String {
    issues
        .iter()
        .map(Issue::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Check route references and required fields across the three tables.
pub fn validate(bundle: &ConfigBundle) -> Result<(), ValidationError> {
    let mut issues = Vec::new();

    for namespace in Namespace::PUBLISH_ORDER {
        let has_empty = match namespace {
            Namespace::Backends => bundle.backends.contains_key(""),
            Namespace::Proxies => bundle.proxies.contains_key(""),
            Namespace::Routes => bundle.routes.contains_key(""),
        };
        if has_empty {
            issues.push(Issue::EmptyKey { namespace });
        }
    }

    for backend in bundle.backends.iter() {
        if backend.url.trim().is_empty() {
            issues.push(Issue::MissingUrl {
                backend: backend.id.clone(),
            });
        }
    }

    for proxy in bundle.proxies.iter() {
        if proxy.listen_addr.trim().is_empty() {
            issues.push(Issue::MissingListenAddr {
                proxy: proxy.id.clone(),
            });
        }
    }

    for route in bundle.routes.iter() {
        if route.backend_ids.is_empty() {
            issues.push(Issue::EmptyRoute {
                stream: route.stream_name.clone(),
            });
        }
        let mut seen = HashSet::new();
        for backend in &route.backend_ids {
            if !seen.insert(backend.as_str()) {
                warn!(stream = %route.stream_name, %backend, "backend listed twice in route");
                continue;
            }
            if !bundle.backends.contains_key(backend) {
                issues.push(Issue::UnknownBackend {
                    stream: route.stream_name.clone(),
                    backend: backend.clone(),
                });
            }
        }
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(ValidationError { issues })
    }
}
