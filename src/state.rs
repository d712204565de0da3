use std::sync::Arc;

use crate::config::GateConfig;
use crate::rate_limit::RateLimiterStore;
use crate::store::ContentStore;

// app's shared state
pub struct AppState {
    pub config: GateConfig,
    pub limiter: Arc<RateLimiterStore>,
    pub content: ContentStore,
}

impl AppState {
    pub fn new(config: GateConfig) -> Self {
        let limiter = Arc::new(RateLimiterStore::new(config.prune_high_water));
        Self {
            config,
            limiter,
            content: ContentStore::default(),
        }
    }
}
