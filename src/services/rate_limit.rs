use dashmap::DashMap;
use std::time::{Duration, Instant};

const PRUNE_THRESHOLD: usize = 10_000;

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    failures: u32,
}

/// Fixed-window counter of failed attempts per key.
struct AttemptLimiter {
    windows: DashMap<String, Window>,
    max_attempts: u32,
    window: Duration,
}

impl AttemptLimiter {
    pub fn new(max_attempts: u32, window: Duration) -> Self {
        Self {
            windows: DashMap::new(),
            max_attempts,
            window,
        }
    }

    /// True once `max_attempts` failures landed inside the current window.
    pub fn is_blocked(&self, key: &str) -> bool {
        let now = Instant::now();
        match self.windows.get(key) {
            Some(w) => now.duration_since(w.started) < self.window && w.failures >= self.max_attempts,
            None => false,
        }
    }

    pub fn record_failure(&self, key: &str) {
        let now = Instant::now();
        if self.windows.len() > PRUNE_THRESHOLD {
            self.prune(now);
        }

        let mut entry = self.windows.entry(key.to_string()).or_insert(Window {
            started: now,
            failures: 0,
        });
        if now.duration_since(entry.started) >= self.window {
            *entry = Window {
                started: now,
                failures: 0,
            };
        }
        entry.failures += 1;
    }

    pub fn reset(&self, key: &str) {
        self.windows.remove(key);
    }

    fn prune(&self, now: Instant) {
        self.windows
            .retain(|_, w| now.duration_since(w.started) < self.window);
    }
}

/// Failed paste-password attempts, counted per client and per paste.
///
/// The per-paste budget is shared by every client, so rotating addresses
/// cannot walk the memorable-password space faster than it allows.
pub struct VerifyThrottle {
    per_client: AttemptLimiter,
    per_paste: AttemptLimiter,
}

impl VerifyThrottle {
    pub fn new(per_client: u32, per_paste: u32, window: Duration) -> Self {
        Self {
            per_client: AttemptLimiter::new(per_client, window),
            per_paste: AttemptLimiter::new(per_paste, window),
        }
    }

    fn client_key(client: &str, paste_id: &str) -> String {
        format!("{}:{}", client, paste_id)
    }

    pub fn is_blocked(&self, client: &str, paste_id: &str) -> bool {
        self.per_paste.is_blocked(paste_id)
            || self.per_client.is_blocked(&Self::client_key(client, paste_id))
    }

    pub fn record_failure(&self, client: &str, paste_id: &str) {
        self.per_client
            .record_failure(&Self::client_key(client, paste_id));
        self.per_paste.record_failure(paste_id);
    }

    /// Clears the client's own counter. The per-paste budget keeps running.
    pub fn record_success(&self, client: &str, paste_id: &str) {
        self.per_client.reset(&Self::client_key(client, paste_id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blocks_after_max_failures() {
        let limiter = AttemptLimiter::new(3, Duration::from_secs(60));
        for _ in 0..2 {
            limiter.record_failure("k");
        }
        assert!(!limiter.is_blocked("k"));
        limiter.record_failure("k");
        assert!(limiter.is_blocked("k"));
        assert!(!limiter.is_blocked("other"));
    }

    #[test]
    fn test_reset_clears_key() {
        let limiter = AttemptLimiter::new(1, Duration::from_secs(60));
        limiter.record_failure("k");
        assert!(limiter.is_blocked("k"));
        limiter.reset("k");
        assert!(!limiter.is_blocked("k"));
    }

    #[test]
    fn test_window_rolls_over() {
        let limiter = AttemptLimiter::new(1, Duration::from_millis(30));
        limiter.record_failure("k");
        assert!(limiter.is_blocked("k"));
        std::thread::sleep(Duration::from_millis(50));
        assert!(!limiter.is_blocked("k"));
        limiter.record_failure("k");
        assert!(limiter.is_blocked("k"));
    }

    #[test]
    fn test_paste_budget_is_shared_across_clients() {
        let throttle = VerifyThrottle::new(3, 5, Duration::from_secs(60));
        for i in 0..5 {
            let client = format!("10.0.0.{}", i);
            assert!(!throttle.is_blocked(&client, "p1"));
            throttle.record_failure(&client, "p1");
        }
        assert!(throttle.is_blocked("10.0.0.99", "p1"));
        assert!(!throttle.is_blocked("10.0.0.99", "p2"));
    }

    #[test]
    fn test_success_clears_only_the_client_counter() {
        let throttle = VerifyThrottle::new(2, 3, Duration::from_secs(60));
        throttle.record_failure("a", "p1");
        throttle.record_failure("a", "p1");
        assert!(throttle.is_blocked("a", "p1"));
        assert!(!throttle.is_blocked("b", "p1"));

        throttle.record_success("a", "p1");
        assert!(!throttle.is_blocked("a", "p1"));

        throttle.record_failure("b", "p1");
        assert!(throttle.is_blocked("a", "p1"));
    }
}
