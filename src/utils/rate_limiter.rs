use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{Instant, sleep_until};
use tracing::debug;

/// RateLimiter spaces calls to an external API so that no more than
/// `max_per_second` of them start within any one-second window.
///
/// Callers are served one at a time: the lock is held while waiting for the
/// next free slot, so concurrent callers queue instead of bursting.
pub struct RateLimiter {
    // Minimum gap between two consecutive call starts
    interval: Duration,

    // Earliest instant the next call may start
    next_slot: Mutex<Option<Instant>>,

    // Number of permits handed out so far
    issued: AtomicU64,
}

impl RateLimiter {
    pub fn per_second(max_per_second: u32) -> Self {
        let max_per_second = max_per_second.max(1);
        Self {
            interval: Duration::from_secs(1) / max_per_second,
            next_slot: Mutex::new(None),
            issued: AtomicU64::new(0),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Wait for the next free slot. Returns once the caller may issue its request.
    pub async fn acquire(&self) {
        let mut next_slot = self.next_slot.lock().await;

        if let Some(slot) = *next_slot {
            if slot > Instant::now() {
                debug!("Rate limit reached, waiting {:?}", slot - Instant::now());
                sleep_until(slot).await;
            }
        }

        *next_slot = Some(Instant::now() + self.interval);
        self.issued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn issued(&self) -> u64 {
        self.issued.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_rate_limiter_spacing() {
        let limiter = RateLimiter::per_second(5);
        assert_eq!(limiter.interval(), Duration::from_millis(200));

        let start = Instant::now();
        for _ in 0..11 {
            limiter.acquire().await;
        }

        // First call is immediate, the other ten each wait one interval
        assert!(start.elapsed() >= Duration::from_secs(2));
        assert_eq!(limiter.issued(), 11);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limiter_concurrent_callers_queue() {
        let limiter = Arc::new(RateLimiter::per_second(5));
        let start = Instant::now();

        let tasks: Vec<_> = (0..6)
            .map(|_| {
                let limiter = limiter.clone();
                tokio::spawn(async move {
                    limiter.acquire().await;
                    Instant::now()
                })
            })
            .collect();

        let mut starts = Vec::new();
        for task in tasks {
            starts.push(task.await.unwrap());
        }
        starts.sort();

        for pair in starts.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_millis(200));
        }
        assert!(start.elapsed() >= Duration::from_secs(1));
    }

    #[test]
    fn test_zero_rate_is_clamped() {
        let limiter = RateLimiter::per_second(0);
        assert_eq!(limiter.interval(), Duration::from_secs(1));
    }
}
