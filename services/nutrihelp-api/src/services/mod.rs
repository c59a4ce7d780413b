pub mod scheduler;
pub mod verification_service;

pub use scheduler::start_background_tasks;
pub use verification_service::VerificationService;
