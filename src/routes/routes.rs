use actix_web::web;

use super::admin::admin_handlers;
use super::jobs::job_handlers;

pub fn jobs_configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api-jobs")
            .route("", web::get().to(job_handlers::jobs_get))
            .route("/", web::get().to(job_handlers::jobs_get))
            .route("/create", web::post().to(job_handlers::create_job))
            .route("/upload", web::post().to(job_handlers::upload_job))
            .route("/status/{token}", web::get().to(job_handlers::job_status))
            .route("/stop/{token}", web::post().to(job_handlers::stop_job))
            .route("/export/{token}", web::get().to(job_handlers::export_job))
    );
}

pub fn admin_configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/admin")
            .route("/purge-finished-jobs", web::post().to(admin_handlers::purge_finished_jobs))
    );
}
