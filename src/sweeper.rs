use std::sync::Arc;
use std::time::Instant;
use tokio::time::{Duration, interval};

use crate::metrics::LIMITER_KEYS;
use crate::rate_limit::RateLimiterStore;

// Periodic prune of ended windows, on top of the high-water prune
// `check` already does.
pub async fn limiter_sweeper(limiter: Arc<RateLimiterStore>, every: Duration) {
    let mut interval = interval(every);
    // first tick fires immediately
    interval.tick().await;

    tracing::info!(interval = ?every, "limiter sweeper started");

    loop {
        interval.tick().await;
        let removed = limiter.prune(Instant::now());
        LIMITER_KEYS.set(limiter.len() as f64);
        if removed > 0 {
            tracing::debug!(
                removed,
                remaining = limiter.len(),
                scans = limiter.prune_runs(),
                "pruned expired limiter windows"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rate_limit::RateRule;

    #[tokio::test]
    async fn sweeper_clears_ended_windows() {
        let limiter = Arc::new(RateLimiterStore::new(10_000));
        limiter.check("k", RateRule::new(10, 1));
        assert_eq!(limiter.len(), 1);

        let task = tokio::spawn(limiter_sweeper(Arc::clone(&limiter), Duration::from_millis(20)));
        tokio::time::sleep(Duration::from_millis(150)).await;

        assert!(limiter.is_empty());
        task.abort();
    }
}
