//! Request pacing for the page fetcher.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::time::{sleep, Duration};

/// Limits throughput to a fixed number of requests per second.
///
/// A single-permit [`Semaphore`] serializes callers and each holder keeps
/// the permit for one interval, so concurrent fetches still go out one
/// interval apart.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    semaphore: Arc<Semaphore>,
    interval: Duration,
}

impl RateLimiter {
    /// Allow at most `requests_per_second` requests per second; zero
    /// disables pacing.
    pub fn new(requests_per_second: u32) -> Self {
        let interval = if requests_per_second == 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(1000 / u64::from(requests_per_second))
        };
        Self {
            semaphore: Arc::new(Semaphore::new(1)),
            interval,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Wait for a request slot, then hold it for one interval.
    pub async fn acquire(&self) {
        // Only a closed semaphore fails to acquire; this one is never closed.
        if let Ok(_permit) = self.semaphore.acquire().await {
            sleep(self.interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    #[test]
    fn test_interval_from_rate() {
        assert_eq!(RateLimiter::new(1).interval(), Duration::from_secs(1));
        assert_eq!(RateLimiter::new(4).interval(), Duration::from_millis(250));
        assert_eq!(RateLimiter::new(0).interval(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_acquire_spaces_requests() {
        let limiter = RateLimiter::new(20);
        let start = Instant::now();

        limiter.acquire().await;
        limiter.acquire().await;
        limiter.acquire().await;

        assert!(start.elapsed() >= Duration::from_millis(150));
    }
}
