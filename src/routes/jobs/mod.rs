pub mod job_handlers;
pub mod job_models;
