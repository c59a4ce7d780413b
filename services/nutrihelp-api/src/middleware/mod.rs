pub mod error_handler;
pub mod rate_limit;
pub mod response_time;

pub use error_handler::{capture_route_params, error_handler, recover_panic, route_not_found};
pub use rate_limit::{rate_limit_middleware, RateLimiter};
pub use response_time::response_time_middleware;
