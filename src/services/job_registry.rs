use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use log::{error, info};
use rand::rngs::StdRng;
use rand::SeedableRng;
use uuid::Uuid;

use crate::checker::{Checker, CheckerEvent, RunOutcome};
use crate::delay::DelayRange;
use crate::models::job::{JobSnapshot, JobStatus};
use crate::models::session::CheckerState;
use crate::services::profile_lookup::ProfileLookup;
use crate::services::session_store::NullSessionStore;

struct JobEntry {
    snapshot: JobSnapshot,
    active: Arc<AtomicBool>,
}

pub struct JobRegistry<L> {
    lookup: Arc<L>,
    jobs: Arc<Mutex<HashMap<String, JobEntry>>>,
}

fn lock(jobs: &Mutex<HashMap<String, JobEntry>>) -> MutexGuard<'_, HashMap<String, JobEntry>> {
    // A poisoned map still holds valid snapshots.
    jobs.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn update(jobs: &Mutex<HashMap<String, JobEntry>>, token: &str, apply: impl FnOnce(&mut JobSnapshot)) {
    if let Some(entry) = lock(jobs).get_mut(token) {
        apply(&mut entry.snapshot);
    }
}

impl<L> JobRegistry<L>
where
    L: ProfileLookup + 'static,
{
    pub fn new(lookup: L) -> Self {
        JobRegistry { lookup: Arc::new(lookup), jobs: Arc::new(Mutex::new(HashMap::new())) }
    }

    // Must be called from within a tokio runtime.
    pub fn create(&self, usernames: Vec<String>, delays: DelayRange) -> String {
        let token = Uuid::new_v4().to_string();
        let active = Arc::new(AtomicBool::new(true));
        let total = usernames.len();

        lock(&self.jobs).insert(
            token.clone(),
            JobEntry {
                snapshot: JobSnapshot { status: JobStatus::Pending, results: Vec::new(), total },
                active: Arc::clone(&active),
            },
        );
        info!("Created job {} for {} usernames", token, total);

        let lookup = Arc::clone(&self.lookup);
        let jobs = Arc::clone(&self.jobs);
        let job_token = token.clone();
        tokio::spawn(async move {
            let mut state = CheckerState::new(usernames, delays.min(), delays.max(), &job_token);
            let mut rng = StdRng::from_rng(&mut rand::rng());
            update(&jobs, &job_token, |snapshot| snapshot.status = JobStatus::InProgress);

            let checker = Checker::new(lookup.as_ref(), &NullSessionStore, false);
            let outcome = checker
                .run(&mut state, &active, &mut rng, |event| {
                    if let CheckerEvent::Checked { state, .. } = event {
                        update(&jobs, &job_token, |snapshot| snapshot.results = state.results.clone());
                    }
                })
                .await;

            let status = match outcome {
                Ok(RunOutcome::Completed) => JobStatus::Completed,
                Ok(RunOutcome::Stopped) => JobStatus::Stopped,
                Err(e) => {
                    error!("Job {} failed: {}", job_token, e);
                    JobStatus::Stopped
                }
            };
            info!("Job {} finished as {:?} with {} results", job_token, status, state.results.len());
            update(&jobs, &job_token, |snapshot| {
                snapshot.results = state.results;
                snapshot.status = status;
            });
        });

        token
    }

    pub fn status(&self, token: &str) -> Option<JobSnapshot> {
        lock(&self.jobs).get(token).map(|entry| entry.snapshot.clone())
    }

    // The loop notices at its next check, after the current delay.
    pub fn stop(&self, token: &str) -> bool {
        match lock(&self.jobs).get(token) {
            Some(entry) => {
                entry.active.store(false, Ordering::SeqCst);
                info!("Stop requested for job {}", token);
                true
            }
            None => false,
        }
    }

    pub fn purge_finished(&self) -> usize {
        let mut jobs = lock(&self.jobs);
        let before = jobs.len();
        jobs.retain(|_, entry| !entry.snapshot.status.is_finished());
        before - jobs.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::check_result::CheckResult;
    use crate::services::profile_lookup::MockProfileApi;
    use std::time::Duration;

    async fn wait_until_finished(registry: &JobRegistry<MockProfileApi>, token: &str) -> JobSnapshot {
        loop {
            let snapshot = registry.status(token).unwrap();
            if snapshot.status.is_finished() {
                return snapshot;
            }
            tokio::time::sleep(Duration::from_millis(250)).await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn job_runs_to_completion() {
        let registry = JobRegistry::new(MockProfileApi::deterministic());
        let usernames = vec!["notfound_a".to_string(), "private_b".to_string(), "c".to_string()];
        let token = registry.create(usernames, DelayRange::new(1, 2).unwrap());

        let snapshot = registry.status(&token).unwrap();
        assert_eq!(snapshot.total, 3);
        assert!(!snapshot.status.is_finished());

        let done = wait_until_finished(&registry, &token).await;
        assert_eq!(done.status, JobStatus::Completed);
        assert_eq!(done.results.len(), 3);
        assert_eq!(done.results[0], CheckResult::failed("notfound_a", "Error: User not found".into()));
        assert_eq!(done.results[1].post_date, "No posts found or private account.");
        assert!(!done.results[2].error);
    }

    #[tokio::test(start_paused = true)]
    async fn results_grow_monotonically_and_stop_is_cooperative() {
        let registry = JobRegistry::new(MockProfileApi::deterministic());
        let usernames: Vec<String> = (0..10).map(|i| format!("user{i}")).collect();
        let token = registry.create(usernames, DelayRange::new(5, 5).unwrap());

        let mut seen = 0;
        while seen < 2 {
            tokio::time::sleep(Duration::from_secs(1)).await;
            let snapshot = registry.status(&token).unwrap();
            assert!(snapshot.results.len() >= seen);
            seen = snapshot.results.len();
        }

        assert!(registry.stop(&token));
        let done = wait_until_finished(&registry, &token).await;
        assert_eq!(done.status, JobStatus::Stopped);
        assert!(done.results.len() < 10);
        assert!(done.results.len() >= seen);
    }

    #[tokio::test]
    async fn unknown_tokens_are_reported() {
        let registry = JobRegistry::new(MockProfileApi::deterministic());
        assert!(registry.status("missing").is_none());
        assert!(!registry.stop("missing"));
    }

    #[tokio::test(start_paused = true)]
    async fn purge_only_removes_finished_jobs() {
        let registry = JobRegistry::new(MockProfileApi::deterministic());
        let short = registry.create(vec!["a".into()], DelayRange::new(1, 1).unwrap());
        let long = registry.create((0..50).map(|i| format!("u{i}")).collect(), DelayRange::new(10, 10).unwrap());

        wait_until_finished(&registry, &short).await;
        assert_eq!(registry.purge_finished(), 1);
        assert!(registry.status(&short).is_none());
        assert!(registry.status(&long).is_some());
    }
}
