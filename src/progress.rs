use std::time::Duration;

use crate::delay::DelayRange;

/// Rough per-lookup latency of the profile API, added to the average delay.
pub const LOOKUP_LATENCY_SECS: f64 = 1.5;

pub fn percent(current: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        current as f64 / total as f64 * 100.0
    }
}

// Saturates instead of panicking when the bounds are absurdly large.
pub fn estimate_remaining(remaining: usize, delays: DelayRange) -> Duration {
    let secs = remaining as f64 * (delays.average_secs() + LOOKUP_LATENCY_SECS);
    Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
}

pub fn format_eta(remaining: Duration) -> String {
    let secs = remaining.as_secs();
    format!("ETA: {}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
}

pub fn counter(current: usize, total: usize) -> String {
    format!("{} / {} ({:.0}%)", current, total, percent(current, total))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_handles_empty_lists() {
        assert_eq!(percent(0, 0), 0.0);
        assert_eq!(percent(1, 4), 25.0);
    }

    #[test]
    fn eta_uses_average_delay_plus_latency() {
        let delays = DelayRange::new(5, 7).unwrap();
        // 600 * (6 + 1.5) = 4500s
        let eta = estimate_remaining(600, delays);
        assert_eq!(eta.as_secs(), 4500);
        assert_eq!(format_eta(eta), "ETA: 1h 15m 0s");
    }

    #[test]
    fn eta_saturates_for_huge_delays() {
        let delays = DelayRange::new(u64::MAX, u64::MAX).unwrap();
        assert_eq!(estimate_remaining(3, delays), Duration::MAX);
        assert_eq!(estimate_remaining(0, delays), Duration::ZERO);
        assert!(format_eta(Duration::MAX).starts_with("ETA: "));
    }

    #[test]
    fn counter_rounds_percentage() {
        assert_eq!(counter(1, 3), "1 / 3 (33%)");
    }
}
