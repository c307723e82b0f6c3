use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use log::{info, warn};
use reqwest::StatusCode;

use crate::error::ClientError;
use crate::models::check_result::CheckResult;
use crate::models::job::{JobSnapshot, JobStatus};
use crate::routes::jobs::job_models::{CreateJobRequest, CreateJobResponse};

#[async_trait]
pub trait JobRunner: Send + Sync {
    async fn create(&self, request: &CreateJobRequest) -> Result<String, ClientError>;
    async fn status(&self, token: &str) -> Result<JobSnapshot, ClientError>;
    async fn stop(&self, token: &str) -> Result<(), ClientError>;
}

#[derive(Debug, Clone)]
pub struct HttpJobRunner {
    client: reqwest::Client,
    base_url: String,
}

impl HttpJobRunner {
    pub fn new(base_url: &str) -> Self {
        HttpJobRunner {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api-jobs{}", self.base_url, path)
    }
}

async fn rejected(response: reqwest::Response) -> ClientError {
    let status = response.status().as_u16();
    let message = response.text().await.unwrap_or_default();
    ClientError::Rejected { status, message }
}

#[async_trait]
impl JobRunner for HttpJobRunner {
    async fn create(&self, request: &CreateJobRequest) -> Result<String, ClientError> {
        let response = self.client.post(self.url("/create")).json(request).send().await?;
        if !response.status().is_success() {
            return Err(rejected(response).await);
        }
        let body: CreateJobResponse = response.json().await?;
        body.token.ok_or(ClientError::Rejected { status: 200, message: body.message })
    }

    async fn status(&self, token: &str) -> Result<JobSnapshot, ClientError> {
        let response = self.client.get(self.url(&format!("/status/{}", token))).send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => Err(ClientError::UnknownJob(token.to_string())),
            status if status.is_success() => Ok(response.json().await?),
            _ => Err(rejected(response).await),
        }
    }

    async fn stop(&self, token: &str) -> Result<(), ClientError> {
        let response = self.client.post(self.url(&format!("/stop/{}", token))).send().await?;
        if !response.status().is_success() {
            return Err(rejected(response).await);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct JobWatch {
    pub token: String,
    pub status: JobStatus,
    pub results: Vec<CheckResult>,
    pub total: usize,
}

const STOP_CHECK: Duration = Duration::from_millis(100);

// Sleeps for `interval`, returning early with `false` once `active` is cleared.
async fn wait_while_active(interval: Duration, active: &AtomicBool) -> bool {
    let mut waited = Duration::ZERO;
    while waited < interval {
        if !active.load(Ordering::SeqCst) {
            return false;
        }
        let tick = (interval - waited).min(STOP_CHECK);
        tokio::time::sleep(tick).await;
        waited += tick;
    }
    active.load(Ordering::SeqCst)
}

/// Creates a job and polls it every `interval` until it is finished.
/// Clearing `active` sends a best-effort stop and ends the watch with a
/// local `stopped` status. A failed status fetch ends the watch.
pub async fn watch_job<J, F>(
    runner: &J,
    request: CreateJobRequest,
    interval: Duration,
    active: &AtomicBool,
    mut on_update: F,
) -> Result<JobWatch, ClientError>
where
    J: JobRunner + ?Sized,
    F: FnMut(&JobWatch) + Send,
{
    let total = request.usernames.len();
    let token = runner.create(&request).await?;
    info!("Job {} created for {} usernames", token, total);

    let mut watch = JobWatch { token, status: JobStatus::Pending, results: Vec::new(), total };
    loop {
        if !wait_while_active(interval, active).await {
            if let Err(e) = runner.stop(&watch.token).await {
                warn!("Stop request for job {} failed: {}", watch.token, e);
            }
            watch.status = JobStatus::Stopped;
            on_update(&watch);
            return Ok(watch);
        }

        let snapshot = runner.status(&watch.token).await?;
        watch.status = snapshot.status;
        watch.results = snapshot.results;
        watch.total = snapshot.total;
        on_update(&watch);

        if watch.status.is_finished() {
            return Ok(watch);
        }
    }
}
