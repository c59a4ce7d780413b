pub mod service_content;
pub mod verification;

pub use service_content::*;
pub use verification::*;
