use axum::{
    http::{HeaderValue, Method},
    middleware,
    routing::{get, post, put},
    Router,
};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::errors::ErrorPolicy;
use crate::handlers::{
    create_service, delete_service, health_check, list_services, list_services_page,
    send_sms_code, send_verification_email, trigger_error, update_service, verify_email,
    verify_sms_code,
};
use crate::middleware::{
    capture_route_params, error_handler, rate_limit_middleware, recover_panic,
    response_time_middleware, route_not_found,
};
use crate::state::AppState;

/// Create the main application router with all routes
pub fn create_router(state: AppState) -> Router {
    let policy = ErrorPolicy::for_environment(state.config.environment);

    let api = Router::new()
        // Health check
        .route("/health", get(health_check))
        // Home service contents
        .route("/home/services", get(list_services).post(create_service))
        .route("/home/services/page", get(list_services_page))
        .route("/home/services/:id", put(update_service).delete(delete_service))
        // Email verification
        .route("/verify/send-email", post(send_verification_email))
        .route("/verify-email/:token", get(verify_email))
        // SMS codes
        .route("/sms/send-sms-code", post(send_sms_code))
        .route("/sms/verify-sms-code", post(verify_sms_code))
        // Diagnostics
        .route("/system/test-error/trigger", post(trigger_error))
        // Faults raised by handlers, including panics
        .route_layer(CatchPanicLayer::custom(recover_panic))
        .route_layer(middleware::from_fn(capture_route_params));

    Router::new()
        .nest("/api", api)
        .fallback(route_not_found)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        // Error handler wraps everything that can fail
        .layer(middleware::from_fn_with_state(policy, error_handler))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            response_time_middleware,
        ))
        .layer(cors_layer(&state.config.frontend_origin))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origin: &str) -> CorsLayer {
    let origin = match HeaderValue::from_str(origin) {
        Ok(value) => AllowOrigin::exact(value),
        Err(_) => {
            tracing::warn!("Invalid FRONTEND_ORIGIN {:?}, CORS disabled", origin);
            AllowOrigin::list(Vec::<HeaderValue>::new())
        }
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::AUTHORIZATION,
        ])
}
