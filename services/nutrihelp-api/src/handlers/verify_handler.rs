use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::errors::ApiError;
use crate::extract::{ApiJson, ApiPath};
use crate::services::VerificationService;
use crate::state::AppState;
use crate::validators::{SendCodeRequest, ValidateFields};

/// Issue and send an email verification link
pub async fn send_verification_email(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<SendCodeRequest>,
) -> Result<Json<Value>, ApiError> {
    request.validate_fields()?;

    let issued =
        VerificationService::send_email_link(&state.pool, &state.config, &request.email).await?;

    let mut body = json!({
        "success": true,
        "message": "Verification email sent",
        "expires_at": issued.expires_at,
    });
    // The link only leaves the server outside production
    if !state.config.environment.is_production() {
        body["verify_url"] = json!(issued.verify_url);
    }

    Ok(Json(body))
}

/// Follow a verification link
pub async fn verify_email(
    State(state): State<AppState>,
    ApiPath(token): ApiPath<String>,
) -> Result<Json<Value>, ApiError> {
    let email = VerificationService::confirm_email_token(&state.pool, &token).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Email verified",
        "email": email
    })))
}
