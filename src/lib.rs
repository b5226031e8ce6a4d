//! Shardlb - Consistent-hash proxy load balancing engine
//!
//! Given a set of candidate proxy servers and a requested resource path,
//! shardlb deterministically picks a preferred proxy for that path, tracks
//! proxy liveness in the background, and reroutes traffic away from proxies
//! that are currently unreachable.
//!
//! ## Features
//!
//! - Rendezvous-hash proxy ranking: stable per key, minimal reshuffling when
//!   the proxy set changes
//! - Automatic quarantine of failed proxies and failover to the next ranked
//!   candidate, wrapping around
//! - Background health probe loop with bounded concurrency, per-probe
//!   timeouts and exponential backoff
//! - Injectable reachability probe and structured event sink; the engine
//!   owns no network transport
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use shardlb::{Probe, ProbeConfig, Prober, ShardBalancer};
//!
//! struct ConnectProbe;
//!
//! #[async_trait::async_trait]
//! impl Probe for ConnectProbe {
//!     async fn probe(&self, _url: &str) -> bool {
//!         // Reachability check supplied by the download subsystem.
//!         true
//!     }
//! }
//!
//! # #[tokio::main] async fn main() -> shardlb::Result<()> {
//! let balancer = ShardBalancer::new(Arc::new(ConnectProbe), ProbeConfig::default());
//! balancer.add_proxy("http://p1.example:3128");
//! balancer.add_proxy("http://p2.example:3128");
//! balancer.start().await;
//!
//! let proxy = balancer.select_next("/repo/data/chunk", None, 0)?;
//! // ... request via `proxy` fails:
//! let fallback = balancer.select_next("/repo/data/chunk", Some(&proxy), 0)?;
//!
//! balancer.stop().await;
//! # Ok(()) }
//! ```

pub mod balancer;
pub mod config;
pub mod error;
pub mod events;
pub mod health;
pub mod models;
pub mod registry;
pub mod router;

pub use balancer::ShardBalancer;
pub use config::Config;
pub use error::{Result, ShardError};
pub use events::{EventSink, ProxyEvent, TracingSink};
pub use health::{HealthProbe, Probe, ProbeConfig, Prober};
pub use models::Proxy;
pub use registry::ProxyRegistry;
pub use router::{Router, ShardRouter};
