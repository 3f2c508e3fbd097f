use std::collections::VecDeque;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// Sliding-window limiter shared by every outbound metadata call
///
/// Callers queue on a single lock, so two concurrent acquisitions can never
/// both read the same stale window. A caller that finds the window full keeps
/// the lock while it sleeps until the oldest timestamp ages out.
pub struct RateLimiter {
    max_requests: usize,
    time_window: Duration,
    requests: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    pub fn new(max_requests: usize, time_window: Duration) -> Self {
        Self {
            max_requests: max_requests.max(1),
            time_window,
            requests: Mutex::new(VecDeque::with_capacity(max_requests)),
        }
    }

    /// Waits until fewer than `max_requests` acquisitions fall inside the
    /// trailing window, then records a new one
    pub async fn acquire(&self) {
        let mut requests = self.requests.lock().await;

        loop {
            let now = Instant::now();
            while let Some(&oldest) = requests.front() {
                if now.duration_since(oldest) >= self.time_window {
                    requests.pop_front();
                } else {
                    break;
                }
            }

            if requests.len() < self.max_requests {
                requests.push_back(now);
                return;
            }

            if let Some(&oldest) = requests.front() {
                let wait = self.time_window.saturating_sub(now.duration_since(oldest));
                tracing::debug!(
                    wait_ms = wait.as_millis() as u64,
                    in_window = requests.len(),
                    "Rate limit reached, waiting for a free slot"
                );
                tokio::time::sleep(wait).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn assert_window_respected(mut stamps: Vec<Instant>, max_requests: usize, window: Duration) {
        stamps.sort();
        for pair in stamps.windows(max_requests + 1) {
            let span = pair[max_requests].duration_since(pair[0]);
            assert!(
                span >= window,
                "{} acquisitions within {:?}",
                max_requests + 1,
                span
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_admits_burst_up_to_limit_without_waiting() {
        let limiter = RateLimiter::new(3, Duration::from_secs(1));
        let start = Instant::now();

        for _ in 0..3 {
            limiter.acquire().await;
        }

        assert_eq!(Instant::now(), start);
    }

    #[tokio::test(start_paused = true)]
    async fn test_blocks_when_window_is_full() {
        let limiter = RateLimiter::new(2, Duration::from_secs(1));
        let start = Instant::now();

        limiter.acquire().await;
        limiter.acquire().await;
        limiter.acquire().await;

        assert!(Instant::now().duration_since(start) >= Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sequential_calls_never_exceed_window() {
        let limiter = RateLimiter::new(3, Duration::from_millis(500));
        let mut stamps = Vec::new();

        for i in 0..20 {
            limiter.acquire().await;
            stamps.push(Instant::now());
            if i % 7 == 0 {
                tokio::time::sleep(Duration::from_millis(120)).await;
            }
        }

        assert_window_respected(stamps, 3, Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_callers_share_one_window() {
        let limiter = Arc::new(RateLimiter::new(4, Duration::from_secs(1)));

        let tasks: Vec<_> = (0..25)
            .map(|_| {
                let limiter = limiter.clone();
                tokio::spawn(async move {
                    limiter.acquire().await;
                    Instant::now()
                })
            })
            .collect();

        let mut stamps = Vec::new();
        for task in tasks {
            stamps.push(task.await.unwrap());
        }

        assert_eq!(stamps.len(), 25);
        assert_window_respected(stamps, 4, Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_limit_is_treated_as_one() {
        let limiter = RateLimiter::new(0, Duration::from_millis(100));
        let start = Instant::now();

        limiter.acquire().await;
        limiter.acquire().await;

        assert!(Instant::now().duration_since(start) >= Duration::from_millis(100));
    }
}
