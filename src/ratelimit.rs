use governor::{DefaultDirectRateLimiter, Quota, RateLimiter as GovernorRateLimiter};
use std::time::Duration;

/// Politeness delay between two banks. The first call passes immediately,
/// every later one waits until `period` has elapsed since the previous one.
pub struct RateLimiter {
    between_banks: Option<DefaultDirectRateLimiter>,
}

impl RateLimiter {
    pub fn new(period: Duration) -> Self {
        // A zero period means no pause at all.
        let between_banks = Quota::with_period(period).map(GovernorRateLimiter::direct);
        RateLimiter { between_banks }
    }

    pub async fn wait_until_ready(&self) {
        if let Some(limiter) = &self.between_banks {
            limiter.until_ready().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;

    #[tokio::test]
    async fn second_call_waits_for_period() {
        let limiter = RateLimiter::new(Duration::from_millis(50));
        let start = Instant::now();
        limiter.wait_until_ready().await;
        limiter.wait_until_ready().await;
        assert!(start.elapsed() >= Duration::from_millis(40));
    }

    #[tokio::test]
    async fn zero_period_never_waits() {
        let limiter = RateLimiter::new(Duration::ZERO);
        let start = Instant::now();
        for _ in 0..5 {
            limiter.wait_until_ready().await;
        }
        assert!(start.elapsed() < Duration::from_millis(50));
    }
}
