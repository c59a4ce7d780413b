pub mod health;
pub mod service_handler;
pub mod sms_handler;
pub mod test_error_handler;
pub mod verify_handler;

pub use health::*;
pub use service_handler::*;
pub use sms_handler::*;
pub use test_error_handler::*;
pub use verify_handler::*;
