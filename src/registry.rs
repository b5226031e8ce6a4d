//! Proxy registry
//!
//! Owns the set of known proxies and their liveness state. This is the only
//! shared mutable state in the engine; a single lock makes every operation
//! atomic so snapshots never observe a half-applied mutation.
//!
//! All operations are total: re-adding a known URL and flipping the state of
//! an unknown URL are silent no-ops. The routing path stays available no
//! matter what callers report.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::events::{EventSink, ProxyEvent, TracingSink};
use crate::models::Proxy;

/// Registry of known proxies and their liveness state
///
/// Insertion order is preserved; it is part of the engine's deterministic
/// behavior (listing output and ranking tie-breaks observe it).
pub struct ProxyRegistry {
    proxies: RwLock<Vec<Proxy>>,
    events: Arc<dyn EventSink>,
}

impl ProxyRegistry {
    /// Create an empty registry publishing events to `tracing`
    pub fn new() -> Self {
        Self::with_event_sink(Arc::new(TracingSink))
    }

    /// Create an empty registry with a custom event sink
    pub fn with_event_sink(events: Arc<dyn EventSink>) -> Self {
        Self {
            proxies: RwLock::new(Vec::new()),
            events,
        }
    }

    /// Register a proxy, initially online
    ///
    /// Idempotent: re-adding an existing URL changes nothing. Returns
    /// whether an insert actually happened.
    pub fn add(&self, url: &str) -> bool {
        let total = {
            let mut proxies = self.proxies.write();
            if proxies.iter().any(|p| p.url == url) {
                return false;
            }
            proxies.push(Proxy::new(url));
            proxies.len()
        };

        self.events.publish(ProxyEvent::ProxyAdded {
            url: url.to_string(),
            total,
        });
        true
    }

    /// Mark a proxy offline; unknown URLs are ignored
    ///
    /// Returns whether the state actually changed.
    pub fn set_offline(&self, url: &str) -> bool {
        self.transition(url, false)
    }

    /// Mark a proxy online; unknown URLs are ignored
    ///
    /// Returns whether the state actually changed.
    pub fn set_online(&self, url: &str) -> bool {
        self.transition(url, true)
    }

    fn transition(&self, url: &str, online: bool) -> bool {
        let online_count = {
            let mut proxies = self.proxies.write();
            match proxies.iter_mut().find(|p| p.url == url) {
                Some(proxy) if proxy.online != online => {
                    proxy.online = online;
                    proxies.iter().filter(|p| p.online).count()
                }
                _ => return false,
            }
        };

        let event = if online {
            ProxyEvent::ProxyOnline {
                url: url.to_string(),
                online: online_count,
            }
        } else {
            ProxyEvent::ProxyOffline {
                url: url.to_string(),
                online: online_count,
            }
        };
        self.events.publish(event);
        true
    }

    /// Number of proxies currently online
    pub fn online_count(&self) -> usize {
        self.proxies.read().iter().filter(|p| p.online).count()
    }

    /// Total number of known proxies
    pub fn len(&self) -> usize {
        self.proxies.read().len()
    }

    /// Whether the registry holds no proxies
    pub fn is_empty(&self) -> bool {
        self.proxies.read().is_empty()
    }

    /// Consistent, insertion-ordered copy of the current proxy set
    pub fn snapshot(&self) -> Vec<Proxy> {
        self.proxies.read().clone()
    }
}

impl Default for ProxyRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::test_support::CollectingSink;

    #[test]
    fn test_add_is_idempotent() {
        let registry = ProxyRegistry::new();

        assert!(registry.add("http://p1.example:3128"));
        assert!(!registry.add("http://p1.example:3128"));

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.online_count(), 1);
    }

    #[test]
    fn test_snapshot_preserves_insertion_order() {
        let registry = ProxyRegistry::new();
        registry.add("http://p2.example:3128");
        registry.add("http://p1.example:3128");
        registry.add("http://p3.example:3128");

        let urls: Vec<String> = registry.snapshot().into_iter().map(|p| p.url).collect();
        assert_eq!(
            urls,
            vec![
                "http://p2.example:3128",
                "http://p1.example:3128",
                "http://p3.example:3128",
            ]
        );
    }

    #[test]
    fn test_offline_online_round_trip() {
        let registry = ProxyRegistry::new();
        registry.add("http://p1.example:3128");
        registry.add("http://p2.example:3128");
        assert_eq!(registry.online_count(), 2);

        assert!(registry.set_offline("http://p1.example:3128"));
        assert_eq!(registry.online_count(), 1);

        // Already offline: no transition.
        assert!(!registry.set_offline("http://p1.example:3128"));
        assert_eq!(registry.online_count(), 1);

        assert!(registry.set_online("http://p1.example:3128"));
        assert_eq!(registry.online_count(), 2);
    }

    #[test]
    fn test_unknown_url_is_ignored() {
        let registry = ProxyRegistry::new();
        registry.add("http://p1.example:3128");

        assert!(!registry.set_offline("http://nope.example:3128"));
        assert!(!registry.set_online("http://nope.example:3128"));
        assert_eq!(registry.online_count(), 1);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_events_published_on_real_transitions_only() {
        let sink = CollectingSink::shared();
        let registry = ProxyRegistry::with_event_sink(sink.clone());

        registry.add("http://p1.example:3128");
        registry.add("http://p1.example:3128"); // duplicate, no event
        registry.set_offline("http://p1.example:3128");
        registry.set_offline("http://p1.example:3128"); // no change, no event
        registry.set_online("http://p1.example:3128");
        registry.set_online("http://nope.example:3128"); // unknown, no event

        let events = sink.events();
        assert_eq!(events.len(), 3);
        assert_eq!(
            events[0],
            ProxyEvent::ProxyAdded {
                url: "http://p1.example:3128".to_string(),
                total: 1,
            }
        );
        assert_eq!(
            events[1],
            ProxyEvent::ProxyOffline {
                url: "http://p1.example:3128".to_string(),
                online: 0,
            }
        );
        assert_eq!(
            events[2],
            ProxyEvent::ProxyOnline {
                url: "http://p1.example:3128".to_string(),
                online: 1,
            }
        );
    }

    #[test]
    fn test_empty_registry() {
        let registry = ProxyRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.online_count(), 0);
        assert!(registry.snapshot().is_empty());
    }
}
