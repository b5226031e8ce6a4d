//! Health probing for quarantined proxies
//!
//! A background loop periodically re-tests offline proxies and returns them
//! to service once a probe succeeds. The actual reachability check is an
//! external collaborator supplied through the [`Probe`] trait; this module
//! only owns scheduling, bounded concurrency, timeouts and backoff.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tokio::sync::watch;
use tokio::time::{interval, timeout, Instant};
use tracing::{debug, info, instrument, warn};

use futures::StreamExt;

use crate::registry::ProxyRegistry;

/// Reachability check for a single proxy, supplied by the download subsystem
///
/// Implementations report plain success/failure; anything that can go wrong
/// inside a probe must surface as `false`, never as a panic.
#[async_trait]
pub trait Probe: Send + Sync {
    async fn probe(&self, url: &str) -> bool;
}

/// Capability for controlling the background health loop
#[async_trait]
pub trait Prober {
    /// Spawn the probe loop; a no-op if it is already running
    async fn start(&self);

    /// Request termination and wait until the loop has fully exited;
    /// a no-op if it is not running
    async fn stop(&self);
}

/// Health probe loop configuration
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// Interval between probe rounds
    pub interval: Duration,
    /// Timeout for each individual probe
    pub timeout: Duration,
    /// Maximum number of concurrent probes per round
    pub workers: usize,
    /// Delay after the first failed probe of a proxy; doubles per failure
    pub backoff_base: Duration,
    /// Upper bound on the per-proxy backoff delay
    pub backoff_cap: Duration,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            timeout: Duration::from_secs(10),
            workers: 8,
            backoff_base: Duration::from_secs(5),
            backoff_cap: Duration::from_secs(300),
        }
    }
}

/// Per-proxy backoff bookkeeping, local to the loop task
struct BackoffState {
    failures: u32,
    next_eligible: Instant,
}

/// Background loop that restores offline proxies
pub struct HealthProbe {
    registry: Arc<ProxyRegistry>,
    prober: Arc<dyn Probe>,
    config: ProbeConfig,
}

impl HealthProbe {
    pub fn new(registry: Arc<ProxyRegistry>, prober: Arc<dyn Probe>, config: ProbeConfig) -> Self {
        Self {
            registry,
            prober,
            config,
        }
    }

    /// Run the probe loop (call in a spawned task)
    #[instrument(skip(self, shutdown))]
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            "Starting health probe loop with {}s interval",
            self.config.interval.as_secs()
        );

        let mut ticker = interval(self.config.interval);

        let mut backoff: HashMap<String, BackoffState> = HashMap::new();

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    // Fresh jitter each round so many engine instances
                    // probing the same proxies do not align their rounds.
                    let jitter_ms = self.config.interval.as_millis() as u64 / 10;
                    if jitter_ms > 0 {
                        let jitter =
                            Duration::from_millis(rand::thread_rng().gen_range(0..=jitter_ms));
                        tokio::time::sleep(jitter).await;
                    }
                    self.probe_round(&mut backoff).await;
                }
                changed = shutdown.changed() => {
                    // A closed channel means the owning handle was dropped
                    // without an explicit stop; exit rather than spin.
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Health probe loop shutting down");
                        break;
                    }
                }
            }
        }
    }

    /// Probe every offline proxy whose backoff deadline has passed
    async fn probe_round(&self, backoff: &mut HashMap<String, BackoffState>) {
        let now = Instant::now();

        let offline: Vec<String> = self
            .registry
            .snapshot()
            .into_iter()
            .filter(|p| !p.online)
            .map(|p| p.url)
            .collect();

        // Drop bookkeeping for proxies that recovered by other means.
        backoff.retain(|url, _| offline.contains(url));

        let due: Vec<String> = offline
            .into_iter()
            .filter(|url| {
                backoff
                    .get(url)
                    .map_or(true, |state| state.next_eligible <= now)
            })
            .collect();

        if due.is_empty() {
            return;
        }

        debug!("Probing {} offline proxies", due.len());

        let probe_timeout = self.config.timeout;
        let results = futures::stream::iter(due)
            .map(|url| {
                let prober = self.prober.clone();
                async move {
                    let healthy = match timeout(probe_timeout, prober.probe(&url)).await {
                        Ok(healthy) => healthy,
                        Err(_) => {
                            warn!(%url, "probe timed out");
                            false
                        }
                    };
                    (url, healthy)
                }
            })
            .buffer_unordered(self.config.workers.max(1))
            .collect::<Vec<(String, bool)>>()
            .await;

        for (url, healthy) in results {
            if healthy {
                self.registry.set_online(&url);
                backoff.remove(&url);
            } else {
                let state = backoff.entry(url.clone()).or_insert(BackoffState {
                    failures: 0,
                    next_eligible: now,
                });
                state.failures = state.failures.saturating_add(1);

                let exponent = (state.failures - 1).min(16);
                let delay = self
                    .config
                    .backoff_base
                    .saturating_mul(1u32 << exponent)
                    .min(self.config.backoff_cap);
                state.next_eligible = now + delay;

                debug!(
                    %url,
                    failures = state.failures,
                    delay_secs = delay.as_secs(),
                    "probe failed, proxy stays offline"
                );
            }
        }
    }
}
