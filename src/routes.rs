pub mod admin;
pub mod jobs;
#[allow(clippy::module_inception)]
pub mod routes;
