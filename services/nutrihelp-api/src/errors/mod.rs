pub mod api_error;
pub mod response;

pub use api_error::{ApiError, ResolvedFault, DEFAULT_MESSAGE};
pub use response::{ErrorBody, ErrorPolicy};
