// src/models/mod.rs

pub mod check_result;
pub mod job;
pub mod session;
