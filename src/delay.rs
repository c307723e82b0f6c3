use std::time::Duration;

use rand::Rng;

use crate::error::CheckerError;

/// Inclusive bounds, in whole seconds, for the pause between two lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayRange {
    min: u64,
    max: u64,
}

impl DelayRange {
    // Bounds below one second are raised to one.
    pub fn new(min: u64, max: u64) -> Result<Self, CheckerError> {
        let (min, max) = (min.max(1), max.max(1));
        if min > max {
            return Err(CheckerError::InvalidDelayRange);
        }
        Ok(DelayRange { min, max })
    }

    pub fn min(&self) -> u64 {
        self.min
    }

    pub fn max(&self) -> u64 {
        self.max
    }

    pub fn sample<R: Rng>(&self, rng: &mut R) -> Duration {
        Duration::from_secs(rng.random_range(self.min..=self.max))
    }

    pub fn average_secs(&self) -> f64 {
        (self.min as f64 + self.max as f64) / 2.0
    }
}
