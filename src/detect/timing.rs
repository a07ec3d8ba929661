//! Timing checks
//!
//! Automation shows up in the clock long before it shows up in content:
//! inter-request intervals with near-zero variance, or sustained rates no
//! human produces. Both checks read only the history snapshot; both may
//! fire on the same request.

use crate::config::RuleBook;
use crate::request::HistoryEntry;

use super::{Evidence, Findings};

/// Intervals considered for the coefficient-of-variation check.
pub const CV_WINDOW: usize = 10;

/// Minimum intervals before the CV check is meaningful.
const MIN_INTERVALS: usize = 5;

/// Length of the sustained-rate bucket, in seconds.
const RATE_WINDOW_SECS: f64 = 60.0;

pub(crate) fn check(history: &[HistoryEntry], now: f64, rules: &RuleBook, findings: &mut Findings) {
    if let Some((cv, mean, samples)) = coefficient_of_variation(history) {
        if cv <= rules.consistent_timing.threshold {
            findings.add(
                "consistent_timing",
                Evidence::Timing {
                    coefficient_of_variation: cv,
                    mean_interval: mean,
                    samples,
                },
                rules.consistent_timing.risk_score,
            );
        }
    }

    let rate = sustained_rate(history, now);
    if rate >= rules.burst_activity.threshold {
        findings.add(
            "burst_activity",
            Evidence::Burst {
                requests_per_second: rate,
            },
            rules.burst_activity.risk_score,
        );
    }
}

/// Coefficient of variation over the last [`CV_WINDOW`] intervals.
/// Returns `(cv, mean_interval, samples)`, or None below the sample floor.
pub fn coefficient_of_variation(history: &[HistoryEntry]) -> Option<(f64, f64, usize)> {
    let intervals: Vec<f64> = history
        .windows(2)
        .map(|pair| pair[1].timestamp - pair[0].timestamp)
        .collect();
    let tail = if intervals.len() > CV_WINDOW {
        &intervals[intervals.len() - CV_WINDOW..]
    } else {
        &intervals[..]
    };
    if tail.len() < MIN_INTERVALS {
        return None;
    }

    let mean = tail.iter().sum::<f64>() / tail.len() as f64;
    if mean <= 0.0 {
        // Zero-interval replay; treat as perfectly regular
        return Some((0.0, 0.0, tail.len()));
    }
    let variance = tail.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / tail.len() as f64;
    Some((variance.sqrt() / mean, mean, tail.len()))
}

/// Requests per second over the trailing 60 s bucket.
///
/// The denominator is the observed span inside the bucket (floored at one
/// second), not the bucket length: the history window is count-capped, so a
/// fast client fills it in far less than a minute and dividing by 60 would
/// hide exactly the bursts this check exists for.
pub fn sustained_rate(history: &[HistoryEntry], now: f64) -> f64 {
    rate_over(history, now, RATE_WINDOW_SECS)
}

/// Requests per second over an arbitrary trailing bucket.
pub fn rate_over(history: &[HistoryEntry], now: f64, bucket_secs: f64) -> f64 {
    let mut count = 0usize;
    let mut oldest = now;
    for entry in history.iter().rev() {
        if now - entry.timestamp > bucket_secs {
            break;
        }
        count += 1;
        oldest = entry.timestamp;
    }
    if count == 0 {
        return 0.0;
    }
    let span = (now - oldest).max(1.0);
    count as f64 / span
}
