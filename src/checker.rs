use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::DateTime;
use log::{info, warn};
use rand::Rng;
use serde::Deserialize;
use serde_json::Value;

use crate::delay::DelayRange;
use crate::error::{CheckerError, SessionStoreError};
use crate::models::check_result::CheckResult;
use crate::models::session::CheckerState;
use crate::services::profile_lookup::{LookupError, ProfileLookup, NOT_FOUND, RATE_LIMITED};
use crate::services::session_store::SessionStore;

pub const NO_POSTS: &str = "No posts found or private account.";
pub const INVALID_FORMAT: &str = "Error: Invalid response format";

const EDGES_POINTER: &str = "/data/user/edge_owner_to_timeline_media/edges";

#[derive(Deserialize)]
struct Edge {
    node: Node,
}

#[derive(Deserialize)]
struct Node {
    taken_at_timestamp: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StepReport {
    pub result: CheckResult,
    pub notice: Option<String>,
    pub next_delay: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Checked(StepReport),
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    Stopped,
}

#[derive(Debug)]
pub enum CheckerEvent<'a> {
    Checking { username: &'a str, position: usize, total: usize },
    Checked { state: &'a CheckerState, report: &'a StepReport },
}

// A missing item list counts as empty.
fn latest_timestamp(payload: &Value) -> Result<Option<i64>, serde_json::Error> {
    let edges = match payload.pointer(EDGES_POINTER) {
        None | Some(Value::Null) => return Ok(None),
        Some(edges) => Vec::<Edge>::deserialize(edges)?,
    };
    Ok(edges.iter().map(|edge| edge.node.taken_at_timestamp).max())
}

pub fn derive_result(
    username: &str,
    outcome: Result<Value, LookupError>,
    next_delay: Duration,
) -> (CheckResult, Option<String>) {
    let payload = match outcome {
        Ok(payload) => payload,
        Err(err) => {
            let notice = match err.code {
                RATE_LIMITED => format!("Rate limited. Pausing for {}s...", next_delay.as_secs()),
                NOT_FOUND => format!("User '{}' not found. Continuing...", username),
                _ => format!("API Error for '{}'. Continuing after delay.", username),
            };
            return (CheckResult::failed(username, format!("Error: {}", err.message)), Some(notice));
        }
    };

    let invalid = || {
        (
            CheckResult::failed(username, INVALID_FORMAT.to_string()),
            Some(format!("Invalid data received for '{}'. Continuing...", username)),
        )
    };

    match latest_timestamp(&payload) {
        Ok(Some(ts)) => match DateTime::from_timestamp(ts, 0) {
            Some(taken_at) => (CheckResult::dated(username, taken_at.format("%Y-%m-%d").to_string()), None),
            None => invalid(),
        },
        Ok(None) => (CheckResult::dated(username, NO_POSTS.to_string()), None),
        Err(_) => invalid(),
    }
}

/// Performs exactly one lookup for the username at `current_index`, records
/// its result and advances the index. Never sleeps: the returned report
/// carries the delay the caller should wait before stepping again.
pub async fn step<L, R>(state: &mut CheckerState, lookup: &L, rng: &mut R) -> Result<Step, CheckerError>
where
    L: ProfileLookup + ?Sized,
    R: Rng + Send,
{
    if state.is_complete() {
        return Ok(Step::Finished);
    }
    let delays = DelayRange::new(state.min_delay, state.max_delay)?;
    let next_delay = delays.sample(rng);

    let username = state.usernames[state.current_index].clone();
    let outcome = lookup.lookup(&username).await;
    let (result, notice) = derive_result(&username, outcome, next_delay);

    state.results.push(result.clone());
    state.current_index += 1;

    Ok(Step::Checked(StepReport { result, notice, next_delay }))
}

pub struct Checker<'a, L: ?Sized, S: ?Sized> {
    lookup: &'a L,
    store: &'a S,
    persist: bool,
}

impl<'a, L, S> Checker<'a, L, S>
where
    L: ProfileLookup + ?Sized,
    S: SessionStore + ?Sized,
{
    pub fn new(lookup: &'a L, store: &'a S, persist: bool) -> Self {
        Checker { lookup, store, persist }
    }

    pub async fn run<R, F>(
        &self,
        state: &mut CheckerState,
        active: &AtomicBool,
        rng: &mut R,
        mut observe: F,
    ) -> Result<RunOutcome, CheckerError>
    where
        R: Rng + Send,
        F: FnMut(CheckerEvent<'_>) + Send,
    {
        loop {
            if !active.load(Ordering::SeqCst) {
                info!("Checker stopped at {}/{}", state.current_index, state.total());
                self.clear_session().await;
                return Ok(RunOutcome::Stopped);
            }
            if let Some(username) = state.usernames.get(state.current_index) {
                observe(CheckerEvent::Checking {
                    username: username.as_str(),
                    position: state.current_index + 1,
                    total: state.total(),
                });
            }

            let report = match step(state, self.lookup, rng).await? {
                Step::Checked(report) => report,
                Step::Finished => break,
            };

            if self.persist {
                if let Err(e) = self.store.save(state).await {
                    warn!("Failed to persist session: {}", e);
                }
            }
            observe(CheckerEvent::Checked { state: &*state, report: &report });

            if state.is_complete() {
                break;
            }
            tokio::time::sleep(report.next_delay).await;
        }

        info!("Finished checking {} profiles", state.total());
        self.clear_session().await;
        Ok(RunOutcome::Completed)
    }

    async fn clear_session(&self) {
        if let Err(e) = self.store.clear().await {
            warn!("Failed to clear session: {}", e);
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoadedFile {
    pub file_name: String,
    pub usernames: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Start {
    Resumed(CheckerState),
    Fresh(CheckerState),
}

impl Start {
    pub fn into_state(self) -> CheckerState {
        match self {
            Start::Resumed(state) | Start::Fresh(state) => state,
        }
    }
}

pub fn describe_session(state: &CheckerState) -> String {
    format!(
        "Previous session found with {} usernames. File: {}. Processed {}. Resuming.",
        state.total(),
        state.file_name,
        state.current_index
    )
}

fn is_consistent(state: &CheckerState) -> bool {
    state.current_index <= state.usernames.len()
        && state.results.len() == state.current_index
        && DelayRange::new(state.min_delay, state.max_delay).is_ok()
}

// Corrupt or inconsistent sessions are cleared.
async fn resumable_session<S>(store: &S) -> Option<CheckerState>
where
    S: SessionStore + ?Sized,
{
    let stored = match store.load().await {
        Ok(stored) => stored,
        Err(SessionStoreError::Corrupt(e)) => {
            warn!("Discarding corrupt session: {}", e);
            if let Err(e) = store.clear().await {
                warn!("Failed to clear session: {}", e);
            }
            return None;
        }
        Err(e) => {
            warn!("Failed to load session: {}", e);
            return None;
        }
    };

    match stored {
        Some(state) if !is_consistent(&state) => {
            warn!("Discarding inconsistent session for {}", state.file_name);
            if let Err(e) = store.clear().await {
                warn!("Failed to clear session: {}", e);
            }
            None
        }
        Some(state) if !state.usernames.is_empty() => Some(state),
        _ => None,
    }
}

/// Decides where a run begins. A stored session is resumed only when no new
/// file was loaded or the loaded file has the same name; otherwise the
/// loaded list starts from scratch and the stale session is dropped.
pub async fn prepare<S>(
    store: &S,
    resume: bool,
    loaded: Option<LoadedFile>,
    delays: DelayRange,
) -> Result<Start, CheckerError>
where
    S: SessionStore + ?Sized,
{
    if resume {
        if let Some(session) = resumable_session(store).await {
            let same_file = loaded
                .as_ref()
                .map_or(true, |file| file.file_name == session.file_name);
            if same_file {
                info!("{}", describe_session(&session));
                return Ok(Start::Resumed(session));
            }
            info!(
                "Ignoring stored session for {} because {} was loaded",
                session.file_name,
                loaded.as_ref().map_or("", |file| file.file_name.as_str())
            );
        }
    }

    match loaded {
        Some(file) if !file.usernames.is_empty() => {
            store.clear().await?;
            Ok(Start::Fresh(CheckerState::new(
                file.usernames,
                delays.min(),
                delays.max(),
                &file.file_name,
            )))
        }
        _ => Err(CheckerError::NoUsernames),
    }
}
