use actix_web::{http::header, web, HttpResponse, Responder};
use log::{error, info};
use super::job_models::{CreateJobRequest, CreateJobResponse, JobDefaultResponse, UploadJobQuery};
use crate::config::Config;
use crate::delay::DelayRange;
use crate::export::{export_csv, todays_file_name};
use crate::services::job_registry::JobRegistry;
use crate::services::profile_lookup::MockProfileApi;
use crate::usernames::parse_usernames;

pub type Jobs = JobRegistry<MockProfileApi>;

fn not_found(token: &str) -> HttpResponse {
    info!("Job not found: {}", token);
    HttpResponse::NotFound().json(JobDefaultResponse {
        success: false,
        message: format!("Job {} not found", token),
    })
}

fn start_job(
    jobs: &Jobs,
    config: &Config,
    usernames: Vec<String>,
    min_delay: Option<u64>,
    max_delay: Option<u64>,
) -> HttpResponse {
    if usernames.is_empty() {
        return HttpResponse::BadRequest().json(CreateJobResponse {
            success: false,
            message: "No usernames loaded. Please select a file.".into(),
            token: None,
        });
    }

    let delays = match DelayRange::new(
        min_delay.unwrap_or(config.min_delay),
        max_delay.unwrap_or(config.max_delay),
    ) {
        Ok(delays) => delays,
        Err(e) => {
            return HttpResponse::BadRequest().json(CreateJobResponse {
                success: false,
                message: e.to_string(),
                token: None,
            })
        }
    };

    let total = usernames.len();
    let token = jobs.create(usernames, delays);
    HttpResponse::Ok().json(CreateJobResponse {
        success: true,
        message: format!("Started checking {} usernames", total),
        token: Some(token),
    })
}

// Default handler for the jobs root
pub async fn jobs_get() -> impl Responder {
    HttpResponse::Ok().body("Hello, this is the post date checker job endpoint.")
}

// Create a job from a JSON list of usernames
pub async fn create_job(
    jobs: web::Data<Jobs>,
    config: web::Data<Config>,
    request: web::Json<CreateJobRequest>,
) -> impl Responder {
    let request = request.into_inner();
    info!("Received request to check {} usernames", request.usernames.len());
    start_job(&jobs, &config, request.usernames, request.min_delay, request.max_delay)
}

// Create a job from an uploaded text file
pub async fn upload_job(
    jobs: web::Data<Jobs>,
    config: web::Data<Config>,
    query: web::Query<UploadJobQuery>,
    body: String,
) -> impl Responder {
    let usernames = parse_usernames(&body);
    info!(
        "Received upload {} with {} usernames",
        query.file_name.as_deref().unwrap_or("<unnamed>"),
        usernames.len()
    );
    start_job(&jobs, &config, usernames, query.min_delay, query.max_delay)
}

// Current snapshot of a job
pub async fn job_status(jobs: web::Data<Jobs>, token: web::Path<String>) -> impl Responder {
    match jobs.status(&token) {
        Some(snapshot) => HttpResponse::Ok().json(snapshot),
        None => not_found(&token),
    }
}

// Ask a job to stop after its current delay
pub async fn stop_job(jobs: web::Data<Jobs>, token: web::Path<String>) -> impl Responder {
    if !jobs.stop(&token) {
        return not_found(&token);
    }
    HttpResponse::Ok().json(JobDefaultResponse {
        success: true,
        message: "Process stopped by user.".into(),
    })
}

// Results so far as a CSV download
pub async fn export_job(jobs: web::Data<Jobs>, token: web::Path<String>) -> impl Responder {
    let snapshot = match jobs.status(&token) {
        Some(snapshot) => snapshot,
        None => return not_found(&token),
    };

    match export_csv(&snapshot.results) {
        Ok(csv) => {
            let file_name = todays_file_name();
            HttpResponse::Ok()
                .content_type("text/csv; charset=utf-8")
                .insert_header((
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", file_name),
                ))
                .body(csv)
        }
        Err(e) => {
            error!("Export of job {} failed: {}", token, e);
            HttpResponse::BadRequest().json(JobDefaultResponse {
                success: false,
                message: e.to_string(),
            })
        }
    }
}
