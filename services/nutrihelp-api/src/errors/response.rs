use serde::Serialize;

use super::api_error::ResolvedFault;
use crate::config::Environment;

/// Decides how much of a fault leaves the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorPolicy {
    pub expose_stack: bool,
}

impl ErrorPolicy {
    pub fn production() -> Self {
        Self {
            expose_stack: false,
        }
    }

    pub fn development() -> Self {
        Self { expose_stack: true }
    }

    pub fn for_environment(environment: Environment) -> Self {
        match environment {
            Environment::Production => Self::production(),
            Environment::Development => Self::development(),
        }
    }
}

/// JSON body of every failed request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

impl ErrorBody {
    pub fn build(fault: &ResolvedFault, policy: ErrorPolicy) -> Self {
        let mut body = Self {
            success: false,
            message: fault.message.clone(),
            stack: Some(fault.stack.clone()),
        };
        if !policy.expose_stack {
            body.stack = None;
        }
        body
    }

    pub fn redacted(fault: &ResolvedFault) -> Self {
        Self::build(fault, ErrorPolicy::production())
    }
}
