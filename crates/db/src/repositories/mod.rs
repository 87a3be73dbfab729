//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` (or any Postgres executor) as the first argument.

pub mod generated_output_repo;
pub mod generation_job_repo;
pub mod prompt_repo;
pub mod usage_log_repo;

pub use generated_output_repo::GeneratedOutputRepo;
pub use generation_job_repo::GenerationJobRepo;
pub use prompt_repo::PromptRepo;
pub use usage_log_repo::UsageLogRepo;
