use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::fmt;
use std::panic::Location;
use validator::ValidationErrors;

use super::response::ErrorBody;

/// Message used when a fault does not carry one of its own.
pub const DEFAULT_MESSAGE: &str = "Internal Server Error";

/// A request fault.
///
/// Every field is optional: the error handler fills in defaults when the
/// fault reaches it, so a bare `ApiError::new()` is still a valid fault.
/// The construction site is recorded and used as the diagnostic trace when
/// no explicit one was attached.
#[derive(Debug, Clone)]
pub struct ApiError {
    status: Option<u16>,
    message: Option<String>,
    stack: Option<String>,
    origin: &'static Location<'static>,
}

/// A fault after defaults have been applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFault {
    pub status: StatusCode,
    pub message: String,
    pub stack: String,
}

impl ApiError {
    /// Fault with no status, message or trace set.
    #[track_caller]
    pub fn new() -> Self {
        Self {
            status: None,
            message: None,
            stack: None,
            origin: Location::caller(),
        }
    }

    #[track_caller]
    pub fn with_status(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: Some(message.into()),
            stack: None,
            origin: Location::caller(),
        }
    }

    /// Fault with a message and no status; resolves to 500.
    #[track_caller]
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::new()
        }
    }

    #[track_caller]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::with_status(400, message)
    }

    #[track_caller]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::with_status(404, message)
    }

    #[track_caller]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::with_status(409, message)
    }

    #[track_caller]
    pub fn gone(message: impl Into<String>) -> Self {
        Self::with_status(410, message)
    }

    #[track_caller]
    pub fn too_many_requests(message: impl Into<String>) -> Self {
        Self::with_status(429, message)
    }

    #[track_caller]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::with_status(500, message)
    }

    /// Attach an explicit diagnostic trace, replacing the construction site.
    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }

    pub fn status_code(&self) -> Option<u16> {
        self.status
    }

    pub fn message_text(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Apply defaults: out-of-range or missing status becomes 500, an empty
    /// or missing message becomes [`DEFAULT_MESSAGE`].
    pub fn resolve(&self) -> ResolvedFault {
        let status = self
            .status
            .filter(|code| (100..=599).contains(code))
            .and_then(|code| StatusCode::from_u16(code).ok())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let message = self
            .message
            .as_deref()
            .filter(|m| !m.is_empty())
            .unwrap_or(DEFAULT_MESSAGE)
            .to_string();

        let stack = match &self.stack {
            Some(stack) => stack.clone(),
            None => format!("ApiError: {}\n    at {}", message, self.origin),
        };

        ResolvedFault {
            status,
            message,
            stack,
        }
    }
}

impl Default for ApiError {
    #[track_caller]
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let resolved = self.resolve();
        write!(f, "[{}] {}", resolved.status.as_u16(), resolved.message)
    }
}

impl std::error::Error for ApiError {}

/// Renders a production-safe body and carries the fault itself in the
/// response extensions, where the error handler picks it up.
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let resolved = self.resolve();
        let mut response = (resolved.status, Json(ErrorBody::redacted(&resolved))).into_response();
        response.extensions_mut().insert(self);
        response
    }
}

impl From<sqlx::Error> for ApiError {
    #[track_caller]
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ApiError::not_found("Resource not found"),
            other => ApiError::internal("Database operation failed")
                .with_stack(format!("sqlx::Error: {:?}", other)),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    #[track_caller]
    fn from(err: anyhow::Error) -> Self {
        ApiError::internal(err.to_string()).with_stack(format!("{:?}", err))
    }
}

impl From<ValidationErrors> for ApiError {
    #[track_caller]
    fn from(errors: ValidationErrors) -> Self {
        ApiError::from_validation(errors, &[])
    }
}

impl ApiError {
    /// 400 fault joining every field message with `"; "`.
    ///
    /// Fields listed in `order` come first, in that order; the rest follow
    /// by name.
    #[track_caller]
    pub fn from_validation(errors: ValidationErrors, order: &[&str]) -> Self {
        let mut fields: Vec<(usize, String, String)> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                let field = field.to_string();
                let rank = order
                    .iter()
                    .position(|name| *name == field)
                    .unwrap_or(order.len());
                errs.iter().map(move |e| {
                    let message = e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("{} is invalid", field));
                    (rank, field.clone(), message)
                })
            })
            .collect();
        fields.sort();

        let message = fields
            .into_iter()
            .map(|(_, _, message)| message)
            .collect::<Vec<_>>()
            .join("; ");

        ApiError::validation(message)
    }
}

impl From<JsonRejection> for ApiError {
    #[track_caller]
    fn from(rejection: JsonRejection) -> Self {
        ApiError::with_status(rejection.status().as_u16(), rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    #[track_caller]
    fn from(rejection: PathRejection) -> Self {
        ApiError::with_status(rejection.status().as_u16(), rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    #[track_caller]
    fn from(rejection: QueryRejection) -> Self {
        ApiError::with_status(rejection.status().as_u16(), rejection.body_text())
    }
}
