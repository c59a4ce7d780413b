use axum::{
    extract::{Query, RawPathParams, Request, State},
    http::{header, Method, Uri},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use std::any::Any;
use std::collections::BTreeMap;
use tracing::error;

use crate::errors::{ApiError, ErrorBody, ErrorPolicy, DEFAULT_MESSAGE};

/// Route parameters of the matched route, carried out of the router on the
/// response so the error handler can log them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteParams(pub BTreeMap<String, String>);

/// Where a fault happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub method: Method,
    pub path: String,
    pub query: BTreeMap<String, String>,
    pub params: BTreeMap<String, String>,
}

impl RequestContext {
    pub fn from_parts(method: Method, uri: &Uri) -> Self {
        let query = Query::<BTreeMap<String, String>>::try_from_uri(uri)
            .map(|Query(q)| q)
            .unwrap_or_default();

        Self {
            method,
            path: uri.path().to_string(),
            query,
            params: BTreeMap::new(),
        }
    }
}

/// Terminal stage for failed requests.
///
/// Successful responses pass through untouched. A response carrying an
/// [`ApiError`] in its extensions is replaced by the normalized error
/// response, after one log entry is written. Error statuses produced
/// without one (axum's own 405, for instance) are treated the same way.
pub async fn error_handler(State(policy): State<ErrorPolicy>, req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let uri = req.uri().clone();

    let mut response = next.run(req).await;

    let fault = match response.extensions_mut().remove::<ApiError>() {
        Some(fault) => fault,
        None if is_error_status(&response) => bare_status_fault(&response),
        None => return response,
    };

    let mut context = RequestContext::from_parts(method, &uri);
    if let Some(RouteParams(params)) = response.extensions_mut().remove::<RouteParams>() {
        context.params = params;
    }

    let mut normalized = handle_fault(fault, &context, policy);
    if let Some(allow) = response.headers().get(header::ALLOW) {
        normalized.headers_mut().insert(header::ALLOW, allow.clone());
    }

    normalized
}

fn is_error_status(response: &Response) -> bool {
    let status = response.status();
    status.is_client_error() || status.is_server_error()
}

/// Fault standing in for an error response that carried none
fn bare_status_fault(response: &Response) -> ApiError {
    let status = response.status();
    ApiError::with_status(
        status.as_u16(),
        status.canonical_reason().unwrap_or(DEFAULT_MESSAGE),
    )
}

/// Log a fault and turn it into the response sent to the client
pub fn handle_fault(fault: ApiError, context: &RequestContext, policy: ErrorPolicy) -> Response {
    let resolved = fault.resolve();

    error!(
        status = resolved.status.as_u16(),
        stack = %resolved.stack,
        path = %context.path,
        method = %context.method,
        params = ?context.params,
        query = ?context.query,
        "Error: {}",
        resolved.message
    );

    let body = ErrorBody::build(&resolved, policy);
    (resolved.status, Json(body)).into_response()
}

/// Route-level middleware recording the matched route's parameters on
/// failed responses
pub async fn capture_route_params(
    params: Option<RawPathParams>,
    req: Request,
    next: Next,
) -> Response {
    let mut response = next.run(req).await;

    if response.extensions().get::<ApiError>().is_some() {
        let params = params
            .map(|p| {
                p.iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect()
            })
            .unwrap_or_default();
        response.extensions_mut().insert(RouteParams(params));
    }

    response
}

/// Panic handler for `CatchPanicLayer`: a panicking handler becomes a
/// plain 500 fault
pub fn recover_panic(payload: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic payload".to_string()
    };

    ApiError::message(detail.clone())
        .with_stack(format!("panic: {}", detail))
        .into_response()
}

/// Fallback for unmatched routes
pub async fn route_not_found() -> ApiError {
    ApiError::not_found("Route not found")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        extract::Path,
        http::{Request as HttpRequest, StatusCode},
        middleware,
        routing::get,
        Router,
    };
    use http_body_util::BodyExt;
    use rstest::rstest;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tower::ServiceExt;
    use tower_http::catch_panic::CatchPanicLayer;
    use tracing_subscriber::layer::{Context, SubscriberExt};
    use tracing_subscriber::Layer;

    const HANDLER_TARGET: &str = "nutrihelp_api::middleware::error_handler";

    /// Counts events emitted by the error handler
    #[derive(Clone, Default)]
    struct FaultLogCounter(Arc<AtomicUsize>);

    impl<S: tracing::Subscriber> Layer<S> for FaultLogCounter {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
            if event.metadata().target() == HANDLER_TARGET {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    async fn not_found() -> Result<Json<Value>, ApiError> {
        Err(ApiError::not_found("Not found"))
    }

    async fn bare_fault() -> Result<Json<Value>, ApiError> {
        Err(ApiError::new())
    }

    async fn teapot(Path(id): Path<String>) -> Result<Json<Value>, ApiError> {
        Err(ApiError::with_status(418, format!("teapot {}", id)))
    }

    async fn panics() -> Json<Value> {
        panic!("kaboom")
    }

    async fn ok() -> Json<Value> {
        Json(json!({ "ok": true }))
    }

    async fn bare_status() -> StatusCode {
        StatusCode::SERVICE_UNAVAILABLE
    }

    fn app(policy: ErrorPolicy) -> Router {
        let routes = Router::new()
            .route("/missing", get(not_found))
            .route("/bare", get(bare_fault))
            .route("/teapot/:id", get(teapot))
            .route("/panic", get(panics))
            .route("/ok", get(ok))
            .route("/unavailable", get(bare_status))
            .route_layer(CatchPanicLayer::custom(recover_panic))
            .route_layer(middleware::from_fn(capture_route_params));

        routes
            .fallback(route_not_found)
            .layer(middleware::from_fn_with_state(policy, error_handler))
    }

    async fn call(app: Router, uri: &str) -> (StatusCode, Value) {
        call_with(app, Method::GET, uri).await
    }

    async fn call_with(app: Router, method: Method, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(
                HttpRequest::builder()
                    .method(method)
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let status = response.status();
        assert!(response.extensions().get::<ApiError>().is_none());
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[rstest]
    #[tokio::test]
    async fn not_found_fault_in_production() {
        let (status, body) = call(app(ErrorPolicy::production()), "/missing").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({ "success": false, "message": "Not found" }));
    }

    #[rstest]
    #[tokio::test]
    async fn bare_fault_in_development_has_defaults_and_stack() {
        let (status, body) = call(app(ErrorPolicy::development()), "/bare").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Internal Server Error");
        assert!(body["stack"].as_str().unwrap().contains("Internal Server Error"));
    }

    #[rstest]
    #[case("/missing")]
    #[case("/bare")]
    #[case("/teapot/1")]
    #[case("/panic")]
    #[case("/nowhere")]
    #[tokio::test]
    async fn production_never_exposes_stack(#[case] uri: &str) {
        let (_, body) = call(app(ErrorPolicy::production()), uri).await;

        assert_eq!(body["success"], false);
        assert!(body.get("stack").is_none());
    }

    #[rstest]
    #[tokio::test]
    async fn explicit_status_is_used() {
        let (status, body) = call(app(ErrorPolicy::production()), "/teapot/7").await;

        assert_eq!(status.as_u16(), 418);
        assert_eq!(body["message"], "teapot 7");
    }

    #[rstest]
    #[tokio::test]
    async fn panic_becomes_500_fault() {
        let (status, body) = call(app(ErrorPolicy::development()), "/panic").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "kaboom");
        assert_eq!(body["stack"], "panic: kaboom");
    }

    #[rstest]
    #[tokio::test]
    async fn unmatched_route_is_normalized() {
        let (status, body) = call(app(ErrorPolicy::production()), "/nowhere").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({ "success": false, "message": "Route not found" }));
    }

    #[rstest]
    #[tokio::test]
    async fn wrong_method_is_normalized_and_keeps_allow() {
        let response = app(ErrorPolicy::production())
            .oneshot(
                HttpRequest::builder()
                    .method(Method::POST)
                    .uri("/ok")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert!(response.headers().contains_key(header::ALLOW));
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body, json!({ "success": false, "message": "Method Not Allowed" }));
    }

    #[rstest]
    #[tokio::test]
    async fn bare_error_status_is_normalized() {
        let (status, body) = call(app(ErrorPolicy::development()), "/unavailable").await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Service Unavailable");
        assert!(body["stack"].is_string());
    }

    #[rstest]
    #[tokio::test]
    async fn success_passes_through_without_logging() {
        let counter = FaultLogCounter::default();
        let subscriber = tracing_subscriber::registry().with(counter.clone());
        let _guard = tracing::subscriber::set_default(subscriber);

        let (status, body) = call(app(ErrorPolicy::production()), "/ok").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "ok": true }));
        assert_eq!(counter.0.load(Ordering::SeqCst), 0);
    }

    #[rstest]
    #[case(Method::GET, "/missing")]
    #[case(Method::GET, "/teapot/3")]
    #[case(Method::GET, "/panic")]
    #[case(Method::GET, "/unavailable")]
    #[case(Method::DELETE, "/ok")]
    #[tokio::test]
    async fn each_fault_is_logged_exactly_once(#[case] method: Method, #[case] uri: &str) {
        let counter = FaultLogCounter::default();
        let subscriber = tracing_subscriber::registry().with(counter.clone());
        let _guard = tracing::subscriber::set_default(subscriber);

        call_with(app(ErrorPolicy::production()), method, uri).await;

        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
    }

    #[rstest]
    #[tokio::test]
    async fn route_params_reach_the_handler_context() {
        let response = Router::new()
            .route("/teapot/:id", get(teapot))
            .route_layer(middleware::from_fn(capture_route_params))
            .oneshot(HttpRequest::builder().uri("/teapot/42").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let params = response.extensions().get::<RouteParams>().expect("params recorded");
        assert_eq!(params.0.get("id").map(String::as_str), Some("42"));
    }

    #[rstest]
    fn context_parses_query() {
        let uri: Uri = "/api/home/services/page?page=2&limit=5".parse().unwrap();
        let context = RequestContext::from_parts(Method::GET, &uri);

        assert_eq!(context.path, "/api/home/services/page");
        assert_eq!(context.query.get("page").map(String::as_str), Some("2"));
        assert_eq!(context.query.get("limit").map(String::as_str), Some("5"));
        assert!(context.params.is_empty());
    }

    #[rstest]
    fn handle_fault_builds_response_from_fault() {
        let uri: Uri = "/x".parse().unwrap();
        let context = RequestContext::from_parts(Method::POST, &uri);
        let response = handle_fault(ApiError::conflict("dup"), &context, ErrorPolicy::production());

        assert_eq!(response.status(), StatusCode::CONFLICT);
    }
}
