//! Deterministic path-aware proxy ranking
//!
//! Rendezvous (highest-random-weight) hashing: each proxy is scored against
//! the resource key and the full ranking is the score order. Adding or
//! removing one proxy only perturbs the keys whose top score involved that
//! proxy, which is the consistent-hashing property we need — most keys keep
//! their preferred proxy when the set changes.
//!
//! Ranking is a pure function of `(key, offset, proxy set)`. Liveness is
//! deliberately ignored here; filtering (or not) is the caller's concern,
//! which keeps the ranking testable independent of time-varying health
//! state.

use crate::models::Proxy;

/// Capability for producing a ranked proxy preference list
pub trait Router {
    /// Ranked proxy URLs for a resource key, best first
    fn rank(&self, key: &str, offset: usize) -> Vec<String>;
}

/// Stateless rendezvous-hash ranking over a proxy set snapshot
#[derive(Debug, Clone, Copy, Default)]
pub struct ShardRouter;

impl ShardRouter {
    pub fn new() -> Self {
        Self
    }

    /// Rank all proxies in `snapshot` for `key`, best first
    ///
    /// The same `(key, offset, snapshot contents)` always yields the same
    /// ranking, across calls and across process restarts. `offset` rotates
    /// the ranking left, so `rank(key, n)[0] == rank(key, 0)[n % len]`.
    /// An empty snapshot yields an empty list.
    pub fn rank(&self, key: &str, offset: usize, snapshot: &[Proxy]) -> Vec<String> {
        let mut scored: Vec<(u64, &str)> = snapshot
            .iter()
            .map(|p| (score(key, &p.url), p.url.as_str()))
            .collect();

        // Highest score wins; ties (identical URLs cannot occur, but equal
        // scores can in principle) break on URL ordering for stability.
        scored.sort_unstable_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(b.1)));

        let mut ranked: Vec<String> = scored.into_iter().map(|(_, url)| url.to_string()).collect();
        if !ranked.is_empty() {
            let shift = offset % ranked.len();
            ranked.rotate_left(shift);
        }
        ranked
    }
}

/// Score a proxy for a key: blake3(url ++ 0x00 ++ key) truncated to u64.
///
/// The 0x00 separator keeps distinct (url, key) pairs from colliding by
/// concatenation. blake3 is stable across platforms and restarts, unlike
/// std's per-process-seeded hasher.
fn score(key: &str, url: &str) -> u64 {
    let mut hasher = blake3::Hasher::new();
    hasher.update(url.as_bytes());
    hasher.update(&[0u8]);
    hasher.update(key.as_bytes());
    let hash = hasher.finalize();
    let bytes: [u8; 8] = hash.as_bytes()[..8].try_into().expect("8 bytes");
    u64::from_le_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proxy_set(n: usize) -> Vec<Proxy> {
        (0..n)
            .map(|i| Proxy::new(format!("http://p{}.example:3128", i)))
            .collect()
    }

    #[test]
    fn test_rank_is_deterministic() {
        let router = ShardRouter::new();
        let proxies = proxy_set(5);

        for key in ["/data/a", "/data/b", "/deep/nested/path.bin"] {
            let first = router.rank(key, 0, &proxies);
            for _ in 0..10 {
                assert_eq!(router.rank(key, 0, &proxies), first);
            }
        }
    }

    #[test]
    fn test_rank_is_a_full_permutation() {
        let router = ShardRouter::new();
        let proxies = proxy_set(7);

        for i in 0..100 {
            let ranked = router.rank(&format!("/key/{}", i), 0, &proxies);
            assert_eq!(ranked.len(), proxies.len());

            let mut unique = ranked.clone();
            unique.sort();
            unique.dedup();
            assert_eq!(unique.len(), proxies.len(), "duplicates for key {}", i);
        }
    }

    #[test]
    fn test_liveness_does_not_affect_ranking() {
        let router = ShardRouter::new();
        let mut proxies = proxy_set(4);
        let before = router.rank("/data/a", 0, &proxies);

        proxies[0].online = false;
        proxies[2].online = false;
        assert_eq!(router.rank("/data/a", 0, &proxies), before);
    }

    #[test]
    fn test_offset_rotates_ranking() {
        let router = ShardRouter::new();
        let proxies = proxy_set(4);

        let base = router.rank("/data/a", 0, &proxies);
        for offset in 0..10 {
            let rotated = router.rank("/data/a", offset, &proxies);
            assert_eq!(rotated[0], base[offset % base.len()]);
            assert_eq!(rotated.len(), base.len());
        }
    }

    #[test]
    fn test_empty_set_yields_empty_ranking() {
        let router = ShardRouter::new();
        assert!(router.rank("/data/a", 0, &[]).is_empty());
        assert!(router.rank("/data/a", 3, &[]).is_empty());
    }

    #[test]
    fn test_rank_zero_roughly_uniform() {
        let router = ShardRouter::new();
        let proxies = proxy_set(4);
        let total = 10_000;

        let mut counts = vec![0usize; proxies.len()];
        for i in 0..total {
            let ranked = router.rank(&format!("/key/{}", i), 0, &proxies);
            let idx = proxies.iter().position(|p| p.url == ranked[0]).unwrap();
            counts[idx] += 1;
        }

        // Each proxy should own roughly a quarter of the keys.
        for (idx, &count) in counts.iter().enumerate() {
            let share = count as f64 / total as f64;
            assert!(
                (0.15..=0.35).contains(&share),
                "proxy {} owns {:.2} of keys",
                idx,
                share
            );
        }
    }

    #[test]
    fn test_add_proxy_low_perturbation() {
        let router = ShardRouter::new();
        let proxies = proxy_set(4);
        let total = 10_000;

        let keys: Vec<String> = (0..total).map(|i| format!("/key/{}", i)).collect();
        let before: Vec<String> = keys
            .iter()
            .map(|k| router.rank(k, 0, &proxies)[0].clone())
            .collect();

        let mut grown = proxies.clone();
        grown.push(Proxy::new("http://p4.example:3128"));

        let after: Vec<String> = keys
            .iter()
            .map(|k| router.rank(k, 0, &grown)[0].clone())
            .collect();

        let moved = before.iter().zip(after.iter()).filter(|(b, a)| b != a).count();

        // ~1/5 of keys should move to the new proxy; allow generous slack.
        let move_ratio = moved as f64 / total as f64;
        assert!(
            (0.1..=0.35).contains(&move_ratio),
            "too many or too few keys moved: {}/{} ({:.2})",
            moved,
            total,
            move_ratio
        );

        // Every key that moved must have moved to the new proxy.
        for (i, (b, a)) in before.iter().zip(after.iter()).enumerate() {
            if b != a {
                assert_eq!(a, "http://p4.example:3128", "key {} moved sideways", i);
            }
        }
    }

    #[test]
    fn test_remove_proxy_only_its_keys_move() {
        let router = ShardRouter::new();
        let proxies = proxy_set(4);
        let removed = proxies[1].url.clone();
        let total = 10_000;

        let keys: Vec<String> = (0..total).map(|i| format!("/key/{}", i)).collect();
        let before: Vec<String> = keys
            .iter()
            .map(|k| router.rank(k, 0, &proxies)[0].clone())
            .collect();

        let shrunk: Vec<Proxy> = proxies.iter().filter(|p| p.url != removed).cloned().collect();
        let after: Vec<String> = keys
            .iter()
            .map(|k| router.rank(k, 0, &shrunk)[0].clone())
            .collect();

        for (i, (b, a)) in before.iter().zip(after.iter()).enumerate() {
            if *b != removed {
                assert_eq!(b, a, "key {} moved although its proxy stayed", i);
            }
        }
    }

    #[test]
    fn test_ranking_independent_of_insertion_order() {
        let router = ShardRouter::new();
        let proxies = proxy_set(5);
        let mut reversed = proxies.clone();
        reversed.reverse();

        for i in 0..50 {
            let key = format!("/key/{}", i);
            assert_eq!(
                router.rank(&key, 0, &proxies),
                router.rank(&key, 0, &reversed),
                "ranking depends on snapshot order for key {}",
                key
            );
        }
    }
}
