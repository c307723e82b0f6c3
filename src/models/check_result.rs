use serde::{Deserialize, Serialize};

/// One row of output: the latest post date (or a message) for a username.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    pub username: String,
    pub post_date: String,
    pub error: bool,
}

impl CheckResult {
    pub fn dated(username: &str, post_date: String) -> Self {
        CheckResult { username: username.to_string(), post_date, error: false }
    }

    pub fn failed(username: &str, message: String) -> Self {
        CheckResult { username: username.to_string(), post_date: message, error: true }
    }
}
