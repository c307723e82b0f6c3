use serde::{Deserialize, Serialize};
use super::check_result::CheckResult;

/// Full state of a checker run. This is also the persisted session format,
/// so field names stay camelCase on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckerState {
    pub usernames: Vec<String>,
    pub results: Vec<CheckResult>,
    pub current_index: usize,
    pub min_delay: u64,
    pub max_delay: u64,
    pub file_name: String,
}

impl CheckerState {
    pub fn new(usernames: Vec<String>, min_delay: u64, max_delay: u64, file_name: &str) -> Self {
        CheckerState {
            usernames,
            results: Vec::new(),
            current_index: 0,
            min_delay,
            max_delay,
            file_name: file_name.to_string(),
        }
    }

    pub fn total(&self) -> usize {
        self.usernames.len()
    }

    pub fn is_complete(&self) -> bool {
        self.current_index >= self.usernames.len()
    }
}
