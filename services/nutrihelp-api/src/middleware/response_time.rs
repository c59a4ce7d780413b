use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::state::AppState;

/// Times every request and warns about the slow ones
pub async fn response_time_middleware(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    let threshold = Duration::from_millis(state.config.slow_request_ms);
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(req).await;

    let elapsed = started.elapsed();
    if is_slow(elapsed, threshold) {
        warn!(
            method = %method,
            path = %path,
            status = response.status().as_u16(),
            response_time_ms = elapsed.as_millis() as u64,
            "Slow request detected"
        );
    } else {
        debug!(
            method = %method,
            path = %path,
            status = response.status().as_u16(),
            response_time_ms = elapsed.as_millis() as u64,
            "Request completed"
        );
    }

    response
}

fn is_slow(elapsed: Duration, threshold: Duration) -> bool {
    elapsed > threshold
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(4999, false)]
    #[case(5000, false)]
    #[case(5001, true)]
    fn slow_means_strictly_above_threshold(#[case] elapsed_ms: u64, #[case] slow: bool) {
        let threshold = Duration::from_millis(5000);
        assert_eq!(is_slow(Duration::from_millis(elapsed_ms), threshold), slow);
    }
}
