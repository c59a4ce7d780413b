pub mod service_repo;
pub mod verification_repo;

pub use service_repo::ServiceRepo;
pub use verification_repo::VerificationRepo;
