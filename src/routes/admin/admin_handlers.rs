use actix_web::{web, HttpResponse, Responder};
use log::info;
use super::admin_models::AdminDefaultResponse;
use crate::routes::jobs::job_handlers::Jobs;

pub async fn purge_finished_jobs(
    jobs: web::Data<Jobs>,
) -> impl Responder {
    // Drop completed and stopped jobs, running ones stay
    let removed = jobs.purge_finished();
    info!("Purged {} finished jobs", removed);

    HttpResponse::Ok().json(AdminDefaultResponse {
        success: true,
        message: format!("Removed {} finished jobs", removed),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delay::DelayRange;
    use crate::routes::routes::admin_configure;
    use crate::services::job_registry::JobRegistry;
    use crate::services::profile_lookup::MockProfileApi;
    use actix_web::{test, App};
    use std::time::Duration;

    #[actix_web::test]
    async fn purges_only_finished_jobs() {
        let jobs = web::Data::new(JobRegistry::new(MockProfileApi::deterministic()));
        let finished = jobs.create(vec!["a".into()], DelayRange::new(1, 1).unwrap());
        let running = jobs.create(vec!["a".into(), "b".into()], DelayRange::new(60, 60).unwrap());
        actix_web::rt::time::sleep(Duration::from_millis(50)).await;

        let app = test::init_service(App::new().app_data(jobs.clone()).configure(admin_configure)).await;
        let req = test::TestRequest::post().uri("/admin/purge-finished-jobs").to_request();
        let body: AdminDefaultResponse = test::call_and_read_body_json(&app, req).await;

        assert!(body.success);
        assert_eq!(body.message, "Removed 1 finished jobs");
        assert!(jobs.status(&finished).is_none());
        assert!(jobs.status(&running).is_some());
    }
}
