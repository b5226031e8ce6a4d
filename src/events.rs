//! Structured engine events
//!
//! Every observable state transition (proxy added, marked offline/online,
//! selection made) is published to an injectable [`EventSink`] so the
//! surrounding download subsystem can wire its own logging or metrics.

use serde::Serialize;
use tracing::debug;

/// A state transition inside the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProxyEvent {
    /// A new proxy was registered
    ProxyAdded { url: String, total: usize },
    /// A proxy was quarantined after an observed failure
    ProxyOffline { url: String, online: usize },
    /// A proxy was restored to service
    ProxyOnline { url: String, online: usize },
    /// A proxy was selected for a resource key
    ProxySelected { key: String, url: String },
}

/// Sink for engine events
///
/// Implementations must be cheap and non-blocking; events are published
/// from the request path.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: ProxyEvent);
}

/// Default sink that forwards events to `tracing`
pub struct TracingSink;

impl EventSink for TracingSink {
    fn publish(&self, event: ProxyEvent) {
        match event {
            ProxyEvent::ProxyAdded { url, total } => {
                debug!(%url, total, "proxy added");
            }
            ProxyEvent::ProxyOffline { url, online } => {
                debug!(%url, online, "proxy marked offline");
            }
            ProxyEvent::ProxyOnline { url, online } => {
                debug!(%url, online, "proxy marked online");
            }
            ProxyEvent::ProxySelected { key, url } => {
                debug!(%key, %url, "proxy selected");
            }
        }
    }
}
