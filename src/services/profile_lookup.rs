use std::ops::RangeInclusive;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use log::debug;
use rand::Rng;
use serde_json::{json, Value};
use thiserror::Error;

pub const NOT_FOUND: u16 = 404;
pub const RATE_LIMITED: u16 = 429;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} (code {code})")]
pub struct LookupError {
    pub code: u16,
    pub message: String,
}

impl LookupError {
    pub fn new(code: u16, message: &str) -> Self {
        LookupError { code, message: message.to_string() }
    }
}

#[async_trait]
pub trait ProfileLookup: Send + Sync {
    async fn lookup(&self, username: &str) -> Result<Value, LookupError>;
}

/// Simulated profile API. Usernames with a `notfound_`, `ratelimit_` or
/// `private_` prefix always produce that outcome; anything else succeeds
/// unless random failures are enabled.
#[derive(Debug, Clone)]
pub struct MockProfileApi {
    latency_ms: RangeInclusive<u64>,
    random_failures: bool,
}

const TWO_YEARS_SECS: i64 = 2 * 365 * 24 * 60 * 60;
const THIRTY_DAYS_SECS: i64 = 86_400 * 30;

enum Outcome {
    NotFound,
    RateLimited,
    Empty,
    Posted(i64),
}

impl MockProfileApi {
    pub fn new(latency_ms: RangeInclusive<u64>, random_failures: bool) -> Self {
        MockProfileApi { latency_ms, random_failures }
    }

    #[cfg(test)]
    pub fn deterministic() -> Self {
        MockProfileApi::new(0..=0, false)
    }

    fn pick_outcome<R: Rng>(&self, username: &str, rng: &mut R) -> Outcome {
        let roll: f64 = if self.random_failures { rng.random() } else { 1.0 };

        if username.starts_with("notfound_") || roll < 0.10 {
            Outcome::NotFound
        } else if username.starts_with("ratelimit_") || roll < 0.15 {
            Outcome::RateLimited
        } else if username.starts_with("private_") || roll < 0.25 {
            Outcome::Empty
        } else {
            let age = (rng.random::<f64>() * TWO_YEARS_SECS as f64) as i64;
            Outcome::Posted(Utc::now().timestamp() - age)
        }
    }
}

pub fn timeline_payload(timestamps: &[i64]) -> Value {
    let edges: Vec<Value> = timestamps
        .iter()
        .map(|ts| json!({ "node": { "taken_at_timestamp": ts } }))
        .collect();
    json!({ "data": { "user": { "edge_owner_to_timeline_media": { "edges": edges } } } })
}

#[async_trait]
impl ProfileLookup for MockProfileApi {
    async fn lookup(&self, username: &str) -> Result<Value, LookupError> {
        let (latency, outcome) = {
            let mut rng = rand::rng();
            let latency = rng.random_range(self.latency_ms.clone());
            (latency, self.pick_outcome(username, &mut rng))
        };
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }
        debug!("Mock lookup for {} answered after {}ms", username, latency);

        match outcome {
            Outcome::NotFound => Err(LookupError::new(NOT_FOUND, "User not found")),
            Outcome::RateLimited => Err(LookupError::new(RATE_LIMITED, "Rate limit, please wait")),
            Outcome::Empty => Ok(timeline_payload(&[])),
            Outcome::Posted(ts) => Ok(timeline_payload(&[ts, ts - THIRTY_DAYS_SECS])),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn prefixes_force_outcomes() {
        let api = MockProfileApi::deterministic();

        let err = api.lookup("notfound_bob").await.unwrap_err();
        assert_eq!(err.code, NOT_FOUND);
        assert_eq!(err.message, "User not found");

        let err = api.lookup("ratelimit_bob").await.unwrap_err();
        assert_eq!(err.code, RATE_LIMITED);

        let payload = api.lookup("private_bob").await.unwrap();
        let edges = payload.pointer("/data/user/edge_owner_to_timeline_media/edges").unwrap();
        assert_eq!(edges.as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn regular_names_get_two_posts_within_two_years() {
        let api = MockProfileApi::deterministic();
        let payload = api.lookup("alice").await.unwrap();
        let edges = payload
            .pointer("/data/user/edge_owner_to_timeline_media/edges")
            .and_then(Value::as_array)
            .unwrap();
        assert_eq!(edges.len(), 2);

        let newest = edges[0]["node"]["taken_at_timestamp"].as_i64().unwrap();
        let older = edges[1]["node"]["taken_at_timestamp"].as_i64().unwrap();
        assert_eq!(newest - older, THIRTY_DAYS_SECS);
        let now = Utc::now().timestamp();
        assert!(newest <= now && newest >= now - TWO_YEARS_SECS - 5);
    }

    #[tokio::test(start_paused = true)]
    async fn latency_is_simulated() {
        let api = MockProfileApi::new(1500..=1500, false);
        let started = tokio::time::Instant::now();
        api.lookup("alice").await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(1500));
    }
}
