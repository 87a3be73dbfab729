//! Row models and input DTOs.

pub mod generated_output;
pub mod generation_job;
pub mod prompt;
pub mod status;
pub mod usage_log;
