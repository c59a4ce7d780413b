use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::errors::ApiError;
use crate::extract::ApiJson;
use crate::services::VerificationService;
use crate::state::AppState;
use crate::validators::{SendCodeRequest, ValidateFields, VerifyCodeRequest};

/// Generate an SMS code for the user's registered phone
pub async fn send_sms_code(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<SendCodeRequest>,
) -> Result<Json<Value>, ApiError> {
    request.validate_fields()?;

    let issued = VerificationService::send_sms_code(&state.pool, &state.config, &request.email).await?;

    let mut body = json!({
        "success": true,
        "message": "Verification code generated",
        "phone": issued.phone,
        "expires_at": issued.expires_at,
    });
    if !state.config.environment.is_production() {
        body["debug_code"] = json!(issued.code);
    }

    Ok(Json(body))
}

/// Confirm a previously sent SMS code
pub async fn verify_sms_code(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<VerifyCodeRequest>,
) -> Result<Json<Value>, ApiError> {
    request.validate_fields()?;

    VerificationService::confirm_sms_code(&state.pool, &request.email, &request.code).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Code verified"
    })))
}
