// Outbound pacing for the Perspective API.
//
// Perspective's free tier allows 1 QPS. Each call waits until at least
// `interval` has passed since the previous one. This throttles our own calls
// to Google; inbound requests to the service are never rejected here.

use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};

/// Enforces a minimum interval between outbound calls.
#[derive(Clone)]
pub struct RateLimiter {
    inner: Arc<Mutex<RateLimiterInner>>,
}

struct RateLimiterInner {
    /// Minimum time between calls
    interval: Duration,
    /// When the last call was allowed through
    last_request: Option<Instant>,
}

impl RateLimiter {
    /// Create a limiter that allows `requests_per_second` calls per second.
    pub fn new(requests_per_second: f64) -> Self {
        let interval = Duration::from_secs_f64(1.0 / requests_per_second);
        Self {
            inner: Arc::new(Mutex::new(RateLimiterInner {
                interval,
                last_request: None,
            })),
        }
    }

    /// Wait until a call is allowed, then return.
    ///
    /// A caller only claims a slot once it actually goes through. Waiters
    /// sleep without holding the lock and re-check when they wake, so a
    /// waiter that is dropped mid-sleep (request timed out) leaves nothing
    /// behind for later callers to wait on.
    pub async fn acquire(&self) {
        loop {
            let wake_at = {
                let mut inner = self.inner.lock().await;
                let now = Instant::now();
                match inner.last_request {
                    Some(last) if now.duration_since(last) < inner.interval => {
                        last + inner.interval
                    }
                    _ => {
                        inner.last_request = Some(now);
                        return;
                    }
                }
            };

            tokio::time::sleep_until(wake_at).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rate_limiter_allows_first_request_immediately() {
        let limiter = RateLimiter::new(1.0);
        let start = Instant::now();
        limiter.acquire().await;
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_rate_limiter_delays_second_request() {
        let limiter = RateLimiter::new(2.0); // 500ms between requests
        limiter.acquire().await;
        let start = Instant::now();
        limiter.acquire().await;
        let elapsed = start.elapsed();
        assert!(
            elapsed >= Duration::from_millis(400),
            "Expected ~500ms delay, got {:?}",
            elapsed
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_callers_are_spaced_out() {
        let limiter = RateLimiter::new(10.0); // 100ms between requests
        let start = Instant::now();

        let handles: Vec<_> = (0..3)
            .map(|_| {
                let limiter = limiter.clone();
                tokio::spawn(async move {
                    limiter.acquire().await;
                    Instant::now()
                })
            })
            .collect();

        let mut finished = Vec::new();
        for handle in handles {
            finished.push(handle.await.unwrap());
        }
        finished.sort();

        assert!(finished[2].duration_since(start) >= Duration::from_millis(200));
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_waiters_do_not_delay_later_callers() {
        let limiter = RateLimiter::new(1.0);

        let waiters: Vec<_> = (0..100)
            .map(|_| {
                let limiter = limiter.clone();
                tokio::spawn(async move {
                    tokio::time::timeout(Duration::from_secs(2), limiter.acquire())
                        .await
                        .is_ok()
                })
            })
            .collect();

        let mut got_through = 0;
        for waiter in waiters {
            if waiter.await.unwrap() {
                got_through += 1;
            }
        }
        assert!(got_through <= 3, "{got_through} callers beat the 1 QPS limit");

        tokio::time::sleep(Duration::from_secs(10)).await;

        let start = Instant::now();
        limiter.acquire().await;
        assert!(
            start.elapsed() < Duration::from_millis(10),
            "fresh caller waited {:?} after the burst",
            start.elapsed()
        );
    }
}
