//! Request bodies and query strings, with their validation rules.

use serde::Deserialize;
use validator::Validate;

use crate::domain::ServiceContentInput;
use crate::errors::ApiError;

/// Validation whose failure messages are reported in declaration order.
pub trait ValidateFields: Validate {
    /// Field names in declaration order
    const FIELDS: &'static [&'static str];

    #[track_caller]
    fn validate_fields(&self) -> Result<(), ApiError> {
        match self.validate() {
            Ok(()) => Ok(()),
            Err(errors) => Err(ApiError::from_validation(errors, Self::FIELDS)),
        }
    }
}

/// Body of the endpoints that send a code or link to an address.
#[derive(Debug, Deserialize, Validate)]
pub struct SendCodeRequest {
    #[validate(email(message = "Valid email is required"))]
    pub email: String,
}

/// Body of the SMS code confirmation endpoint.
#[derive(Debug, Deserialize, Validate)]
pub struct VerifyCodeRequest {
    #[validate(email(message = "Valid email is required"))]
    pub email: String,
    #[validate(length(equal = 6, message = "6-digit code required"))]
    pub code: String,
}

impl ValidateFields for SendCodeRequest {
    const FIELDS: &'static [&'static str] = &["email"];
}

impl ValidateFields for VerifyCodeRequest {
    const FIELDS: &'static [&'static str] = &["email", "code"];
}

impl ValidateFields for ServiceContentRequest {
    const FIELDS: &'static [&'static str] = &["title", "description", "image"];
}

impl ValidateFields for PaginationParams {
    const FIELDS: &'static [&'static str] = &["page", "limit"];
}

#[derive(Debug, Deserialize, Validate)]
pub struct ServiceContentRequest {
    #[validate(length(min = 1, max = 120, message = "Title must be 1-120 characters"))]
    pub title: String,
    #[validate(length(min = 1, max = 2000, message = "Description must be 1-2000 characters"))]
    pub description: String,
    #[validate(url(message = "Image must be a valid URL"))]
    pub image: Option<String>,
}

impl ServiceContentRequest {
    pub fn into_input(self) -> ServiceContentInput {
        ServiceContentInput {
            title: self.title.trim().to_string(),
            description: self.description.trim().to_string(),
            image: self.image.filter(|s| !s.trim().is_empty()),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct PaginationParams {
    #[validate(range(min = 1, max = 1000000, message = "page must be between 1 and 1000000"))]
    pub page: Option<i64>,
    #[validate(range(min = 1, max = 100, message = "limit must be between 1 and 100"))]
    pub limit: Option<i64>,
}

impl PaginationParams {
    pub const DEFAULT_LIMIT: i64 = 10;

    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1)
    }

    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(Self::DEFAULT_LIMIT)
    }

    pub fn offset(&self) -> i64 {
        (self.page() - 1).saturating_mul(self.limit())
    }
}
