use std::env;
use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::time::Duration;

use log::warn;

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_address: String,
    pub database_url: Option<String>,
    pub session_file: PathBuf,
    pub session_key: String,
    pub min_delay: u64,
    pub max_delay: u64,
    pub poll_interval: Duration,
    pub mock_latency_ms: RangeInclusive<u64>,
    pub mock_random_failures: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            bind_address: "0.0.0.0:8080".to_string(),
            database_url: None,
            session_file: PathBuf::from(".checker_session.json"),
            session_key: "default".to_string(),
            min_delay: 5,
            max_delay: 7,
            poll_interval: Duration::from_millis(2000),
            mock_latency_ms: 500..=2500,
            mock_random_failures: true,
        }
    }
}

// `min-max` or a single number of milliseconds
fn parse_latency(raw: &str) -> Option<RangeInclusive<u64>> {
    let (low, high) = match raw.split_once('-') {
        Some((low, high)) => (low.trim().parse().ok()?, high.trim().parse().ok()?),
        None => {
            let fixed = raw.trim().parse().ok()?;
            (fixed, fixed)
        }
    };
    (low <= high).then_some(low..=high)
}

impl Config {
    pub fn from_env() -> Self {
        Config::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Config::default();
        let latency = match var("MOCK_LATENCY_MS") {
            Some(raw) => parse_latency(&raw).unwrap_or_else(|| {
                warn!("Ignoring invalid MOCK_LATENCY_MS={}", raw);
                defaults.mock_latency_ms.clone()
            }),
            None => defaults.mock_latency_ms.clone(),
        };
        let number = |name: &str, default: u64| match var(name) {
            Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                warn!("Ignoring invalid {}={}", name, raw);
                default
            }),
            None => default,
        };

        Config {
            bind_address: var("BIND_ADDRESS").unwrap_or(defaults.bind_address),
            database_url: var("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            session_file: var("SESSION_FILE").map(PathBuf::from).unwrap_or(defaults.session_file),
            session_key: var("SESSION_KEY").unwrap_or(defaults.session_key),
            min_delay: number("MIN_DELAY", defaults.min_delay),
            max_delay: number("MAX_DELAY", defaults.max_delay),
            poll_interval: Duration::from_millis(number("POLL_INTERVAL_MS", 2000)),
            mock_latency_ms: latency,
            mock_random_failures: match var("MOCK_RANDOM_FAILURES") {
                Some(raw) => !matches!(raw.trim().to_ascii_lowercase().as_str(), "0" | "false" | "no" | "off"),
                None => defaults.mock_random_failures,
            },
        }
    }
}
