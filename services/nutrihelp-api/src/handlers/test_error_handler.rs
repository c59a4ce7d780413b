use axum::Json;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

use crate::errors::ApiError;
use crate::extract::ApiJson;

#[derive(Debug, Deserialize)]
pub struct TriggerRequest {
    pub simulate: Option<String>,
}

/// Deliberately fail, to exercise the error handler.
///
/// `throw` panics inside the handler, `next` returns a fault right away, and
/// anything else returns a fault after a short delay.
pub async fn trigger_error(
    request: Option<ApiJson<TriggerRequest>>,
) -> Result<Json<Value>, ApiError> {
    let simulate = request
        .and_then(|ApiJson(r)| r.simulate)
        .unwrap_or_else(|| "basic".to_string());

    match simulate.as_str() {
        "throw" => panic!("Simulated synchronous error"),
        "next" => Err(ApiError::message("Simulated forwarded error")),
        _ => {
            tokio::time::sleep(Duration::from_millis(10)).await;
            Err(ApiError::message("Simulated delayed error"))
        }
    }
}
