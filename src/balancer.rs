//! Selection facade
//!
//! [`ShardBalancer`] is the request-path API consumed by the download
//! pipeline: proxy registration, deterministic per-key selection with
//! failover past a failed proxy, and lifecycle control of the background
//! health probe loop. It owns its registry and probe-loop handle for its
//! full lifetime.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::{Result, ShardError};
use crate::events::{EventSink, ProxyEvent, TracingSink};
use crate::health::{HealthProbe, Probe, ProbeConfig, Prober};
use crate::models::Proxy;
use crate::registry::ProxyRegistry;
use crate::router::{Router, ShardRouter};

/// Handle to a running probe loop
struct ProbeHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// Consistent-hash proxy load balancer with automatic health recovery
pub struct ShardBalancer {
    registry: Arc<ProxyRegistry>,
    router: ShardRouter,
    events: Arc<dyn EventSink>,
    prober: Arc<dyn Probe>,
    config: ProbeConfig,
    probe_loop: Mutex<Option<ProbeHandle>>,
}

impl ShardBalancer {
    /// Create a balancer publishing events to `tracing`
    pub fn new(prober: Arc<dyn Probe>, config: ProbeConfig) -> Self {
        Self::with_event_sink(prober, config, Arc::new(TracingSink))
    }

    /// Create a balancer with a custom event sink
    pub fn with_event_sink(
        prober: Arc<dyn Probe>,
        config: ProbeConfig,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            registry: Arc::new(ProxyRegistry::with_event_sink(events.clone())),
            router: ShardRouter::new(),
            events,
            prober,
            config,
            probe_loop: Mutex::new(None),
        }
    }

    /// Register a candidate proxy; re-adding a known URL is a no-op
    pub fn add_proxy(&self, url: &str) {
        self.add(url);
    }

    fn add(&self, url: &str) -> bool {
        let added = self.registry.add(url);
        if added {
            debug!(%url, total = self.registry.len(), "added proxy");
        }
        added
    }

    /// Select the proxy to use for `key`, advancing past a failed proxy
    ///
    /// When `current` is given it is quarantined unconditionally (the probe
    /// loop restores it once healthy) and the proxy ranked directly after it
    /// is returned, wrapping around. Without `current` the top-ranked proxy
    /// is returned, regardless of its liveness: a genuinely dead first
    /// choice fails fast and is quarantined on the caller's next attempt.
    pub fn select_next(&self, key: &str, current: Option<&str>, offset: usize) -> Result<String> {
        if let Some(current) = current {
            if self.registry.set_offline(current) {
                debug!(
                    %current,
                    online = self.registry.online_count(),
                    "quarantined failed proxy; it will be polled and returned to service automatically"
                );
            }
        }

        let ranked = self.router.rank(key, offset, &self.registry.snapshot());
        if ranked.is_empty() {
            return Err(ShardError::NoProxiesAvailable);
        }

        let idx = match current.and_then(|cur| ranked.iter().position(|url| url == cur)) {
            // Advance to the next candidate after the failed proxy.
            Some(i) => (i + 1) % ranked.len(),
            // First attempt, or the failed proxy vanished from the set.
            None => 0,
        };
        let url = ranked[idx].clone();

        self.events.publish(ProxyEvent::ProxySelected {
            key: key.to_string(),
            url: url.clone(),
        });
        debug!(%key, offset, %url, rank = idx, "selected proxy");

        Ok(url)
    }

    /// Number of proxies currently online
    pub fn online_count(&self) -> usize {
        self.registry.online_count()
    }

    /// URLs of all known proxies, in registration order
    pub fn list_proxies(&self) -> Vec<String> {
        self.registry.snapshot().into_iter().map(|p| p.url).collect()
    }

    /// Full proxy set snapshot including liveness state
    pub fn snapshot(&self) -> Vec<Proxy> {
        self.registry.snapshot()
    }

    /// Deterministic preference order for `key` at offset 0, for diagnostics
    pub fn preferred_order(&self, key: &str) -> Vec<String> {
        self.rank(key, 0)
    }
}

impl Router for ShardBalancer {
    fn rank(&self, key: &str, offset: usize) -> Vec<String> {
        self.router.rank(key, offset, &self.registry.snapshot())
    }
}

#[async_trait]
impl Prober for ShardBalancer {
    async fn start(&self) {
        let mut guard = self.probe_loop.lock().await;
        if guard.is_some() {
            debug!("health probe loop already running");
            return;
        }

        let (shutdown, rx) = watch::channel(false);
        let probe = HealthProbe::new(
            self.registry.clone(),
            self.prober.clone(),
            self.config.clone(),
        );
        let task = tokio::spawn(async move { probe.run(rx).await });

        *guard = Some(ProbeHandle { shutdown, task });
    }

    async fn stop(&self) {
        let mut guard = self.probe_loop.lock().await;
        let Some(handle) = guard.take() else {
            debug!("health probe loop not running");
            return;
        };

        let _ = handle.shutdown.send(true);
        if let Err(e) = handle.task.await {
            warn!("health probe task ended abnormally: {}", e);
        }
    }
}
