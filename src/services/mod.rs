// src/services/mod.rs

pub mod job_client;
pub mod job_registry;
pub mod profile_lookup;
pub mod session_store;
