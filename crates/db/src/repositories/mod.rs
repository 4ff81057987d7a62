//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` as the first argument.

pub mod diagnosis_job_repo;
pub mod diagnosis_repo;
pub mod user_repo;

pub use diagnosis_job_repo::DiagnosisJobRepo;
pub use diagnosis_repo::DiagnosisRepo;
pub use user_repo::UserRepo;
