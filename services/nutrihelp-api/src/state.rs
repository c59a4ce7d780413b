use sqlx::PgPool;

use crate::config::Config;
use crate::middleware::rate_limit::RateLimiter;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub limiter: RateLimiter,
}

impl AppState {
    pub fn new(pool: PgPool, config: Config) -> Self {
        let limiter = RateLimiter::new(
            config.rate_limit_max_requests,
            std::time::Duration::from_secs(config.rate_limit_window_secs),
        );

        Self {
            pool,
            config,
            limiter,
        }
    }
}
