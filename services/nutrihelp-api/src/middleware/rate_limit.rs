use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::warn;

use crate::errors::ApiError;
use crate::state::AppState;

pub const RATE_LIMIT_MESSAGE: &str = "Too many requests, please try again later.";

/// Fixed-window request counter keyed by client address
#[derive(Clone, Debug)]
pub struct RateLimiter {
    entries: Arc<RwLock<HashMap<String, (u32, Instant)>>>,
    max_requests: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            max_requests,
            window,
        }
    }

    /// Count one request for `client` and fail once the window is exhausted
    pub async fn check(&self, client: &str) -> Result<(), ApiError> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;

        // Clean up old entries (older than window)
        entries.retain(|_, (_, started)| now.duration_since(*started) < self.window);

        let entry = entries.entry(client.to_string()).or_insert((0, now));

        // If the window has expired, reset the counter
        if now.duration_since(entry.1) >= self.window {
            *entry = (0, now);
        }

        entry.0 += 1;

        if entry.0 > self.max_requests {
            warn!(
                client = %client,
                limit = self.max_requests,
                window_secs = self.window.as_secs(),
                "Rate limit exceeded"
            );
            return Err(ApiError::too_many_requests(RATE_LIMIT_MESSAGE));
        }

        Ok(())
    }
}

/// Client address from proxy headers
pub fn client_key(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .or_else(|| headers.get("x-real-ip").and_then(|v| v.to_str().ok()))
        .unwrap_or("unknown")
        .to_string()
}

/// Rate limiting middleware
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let client = client_key(req.headers());
    state.limiter.check(&client).await?;

    Ok(next.run(req).await)
}
