use dashmap::DashMap;
use serde::Deserialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("window_ms and max must both be positive (got window_ms={window_ms}, max={max})")]
pub struct InvalidRateRule {
    pub window_ms: u64,
    pub max: u32,
}

#[derive(Deserialize)]
struct RawRateRule {
    window_ms: u64,
    max: u32,
}

impl TryFrom<RawRateRule> for RateRule {
    type Error = InvalidRateRule;

    fn try_from(raw: RawRateRule) -> Result<Self, Self::Error> {
        RateRule::try_new(raw.window_ms, raw.max)
    }
}

// How many requests a key may make per window. Both parts are non-zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawRateRule")]
pub struct RateRule {
    window_ms: u64,
    max: u32,
}

impl RateRule {
    pub const fn try_new(window_ms: u64, max: u32) -> Result<Self, InvalidRateRule> {
        if window_ms == 0 || max == 0 {
            return Err(InvalidRateRule { window_ms, max });
        }
        Ok(Self { window_ms, max })
    }

    /// Panics on a zero window or zero max; use [`RateRule::try_new`] for
    /// values that come from outside.
    pub const fn new(window_ms: u64, max: u32) -> Self {
        match Self::try_new(window_ms, max) {
            Ok(rule) => rule,
            Err(_) => panic!("rate rule needs a positive window and max"),
        }
    }

    pub const fn window_ms(&self) -> u64 {
        self.window_ms
    }

    pub const fn max(&self) -> u32 {
        self.max
    }

    pub const fn per_minute(max: u32) -> Self {
        Self::new(60_000, max)
    }

    pub const fn per_hour(max: u32) -> Self {
        Self::new(3_600_000, max)
    }

    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }
}

// One fixed window per key. The window is anchored at the first request
// seen for the key, not at a wall-clock boundary.
#[derive(Debug, Clone)]
pub struct RateWindow {
    pub window_start: Instant,
    pub window: Duration,
    pub count: u32,
}

impl RateWindow {
    fn fresh(now: Instant, window: Duration) -> Self {
        Self {
            window_start: now,
            window,
            count: 1,
        }
    }

    pub fn ends_at(&self) -> Instant {
        self.window_start + self.window
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.ends_at()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    Limited { retry_after_secs: u64 },
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed)
    }
}

/// In-process fixed-window limiter keyed by caller-built strings.
///
/// Each key owns a single [`RateWindow`]. The increment and the comparison
/// against `max` happen while the key's map entry is locked, so concurrent
/// callers cannot both slip past the boundary.
///
/// Pruning is amortized: after a prune the next one waits until the table
/// doubles past what survived (never below `high_water`), so a table full
/// of live windows is not rescanned on every call.
pub struct RateLimiterStore {
    windows: DashMap<String, RateWindow>,
    high_water: usize,
    prune_above: AtomicUsize,
    prune_runs: AtomicUsize,
}

impl RateLimiterStore {
    pub fn new(high_water: usize) -> Self {
        Self {
            windows: DashMap::new(),
            high_water,
            prune_above: AtomicUsize::new(high_water),
            prune_runs: AtomicUsize::new(0),
        }
    }

    pub fn check(&self, key: &str, rule: RateRule) -> Decision {
        self.check_at(key, rule, Instant::now())
    }

    pub fn check_at(&self, key: &str, rule: RateRule, now: Instant) -> Decision {
        let window = rule.window();

        // entry guard must drop before len()/prune touch the other shards
        let decision = {
            let mut entry = self
                .windows
                .entry(key.to_string())
                .or_insert_with(|| RateWindow {
                    window_start: now,
                    window,
                    count: 0,
                });

            if entry.count == 0 || entry.is_expired(now) {
                *entry = RateWindow::fresh(now, window);
                Decision::Allowed
            } else {
                // the request that trips the limit still counts
                entry.count = entry.count.saturating_add(1);
                if entry.count <= rule.max {
                    Decision::Allowed
                } else {
                    Decision::Limited {
                        retry_after_secs: retry_after_secs(entry.ends_at(), now),
                    }
                }
            }
        };

        if self.windows.len() > self.prune_above.load(Ordering::Relaxed) {
            self.prune(now);
        }

        decision
    }

    // Drops every window that has already ended. Returns how many went.
    pub fn prune(&self, now: Instant) -> usize {
        let before = self.windows.len();
        self.windows.retain(|_, w| !w.is_expired(now));
        let after = self.windows.len();
        self.prune_runs.fetch_add(1, Ordering::Relaxed);
        self.prune_above
            .store(self.high_water.max(after.saturating_mul(2)), Ordering::Relaxed);
        before.saturating_sub(after)
    }

    pub fn reset(&self) {
        self.windows.clear();
        self.prune_above.store(self.high_water, Ordering::Relaxed);
    }

    // Full scans run so far, sweeps included
    pub fn prune_runs(&self) -> usize {
        self.prune_runs.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}

// Whole seconds until `ends_at`, rounded up, never below 1.
fn retry_after_secs(ends_at: Instant, now: Instant) -> u64 {
    let remaining = ends_at.saturating_duration_since(now);
    let secs = remaining.as_millis().div_ceil(1000) as u64;
    secs.max(1)
}
