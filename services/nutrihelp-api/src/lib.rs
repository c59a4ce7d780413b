pub mod config;
pub mod domain;
pub mod errors;
pub mod extract;
pub mod repo;
pub mod services;
pub mod handlers;
pub mod routes;
pub mod middleware;
pub mod state;
pub mod validators;

pub use config::{Config, Environment};
pub use errors::{ApiError, ErrorPolicy};
pub use state::AppState;
