use dashmap::DashMap;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Probability that a `check` call also sweeps stale clients.
const CLEANUP_PROBABILITY: f64 = 0.01;

/// Result of a rate-limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed { remaining: u32 },
    /// Seconds until the oldest request in the window expires (at least 1).
    Limited { retry_after: u64 },
}

impl RateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateDecision::Allowed { .. })
    }
}

/// In-memory sliding-window limiter keyed by client identifier.
///
/// Each client keeps the timestamps of its accepted requests inside the
/// current window. Rejected requests are not recorded, so a client that keeps
/// hammering does not extend its own lockout. State is per process.
pub struct SlidingWindowLimiter {
    clients: DashMap<String, VecDeque<Instant>>,
}

impl SlidingWindowLimiter {
    pub fn new() -> Self {
        Self {
            clients: DashMap::new(),
        }
    }

    pub fn check(&self, key: &str, max_requests: u32, window: Duration) -> RateDecision {
        let now = Instant::now();
        if rand::random::<f64>() < CLEANUP_PROBABILITY {
            let purged = self.purge_stale(window, now);
            if purged > 0 {
                tracing::debug!(purged, "rate limiter swept stale clients");
            }
        }
        self.check_at(key, max_requests, window, now)
    }

    /// Same as [`check`](Self::check) with an explicit clock and no sweep.
    pub fn check_at(
        &self,
        key: &str,
        max_requests: u32,
        window: Duration,
        now: Instant,
    ) -> RateDecision {
        // The entry guard holds the shard lock, so prune + count + push is
        // atomic per key.
        let mut entry = self.clients.entry(key.to_string()).or_default();
        let stamps = entry.value_mut();

        while let Some(&oldest) = stamps.front() {
            if now.saturating_duration_since(oldest) >= window {
                stamps.pop_front();
            } else {
                break;
            }
        }

        let used = stamps.len() as u32;
        if used >= max_requests {
            let retry_after = stamps
                .front()
                .map(|&oldest| window.saturating_sub(now.saturating_duration_since(oldest)))
                .unwrap_or(window);
            let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
            return RateDecision::Limited {
                retry_after: secs.max(1),
            };
        }

        stamps.push_back(now);
        RateDecision::Allowed {
            remaining: max_requests - used - 1,
        }
    }

    /// Drop clients whose newest request is older than `window`.
    /// Returns the number of clients removed.
    pub fn purge_stale(&self, window: Duration, now: Instant) -> usize {
        let before = self.clients.len();
        self.clients.retain(|_, stamps| {
            stamps
                .back()
                .is_some_and(|&newest| now.saturating_duration_since(newest) < window)
        });
        before - self.clients.len()
    }

    /// Number of clients currently tracked.
    pub fn tracked_clients(&self) -> usize {
        self.clients.len()
    }
}

impl Default for SlidingWindowLimiter {
    fn default() -> Self {
        Self::new()
    }
}
