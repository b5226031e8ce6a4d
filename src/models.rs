//! Core data model for the load balancing engine

use serde::{Deserialize, Serialize};

/// A candidate proxy server, identified by its URL.
///
/// Proxies are created online and live for the lifetime of the registry;
/// only their liveness state changes afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proxy {
    /// Proxy URL, the unique identity of the proxy
    pub url: String,
    /// Whether the proxy is currently considered reachable
    pub online: bool,
}

impl Proxy {
    /// Create a new proxy in the online state
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            online: true,
        }
    }
}

impl std::fmt::Display for Proxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({})",
            self.url,
            if self.online { "online" } else { "offline" }
        )
    }
}
