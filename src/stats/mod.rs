//! Latency, jitter and rounding helpers for measurement results

use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};

/// Average latency and smoothed jitter of a ping series, in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatencySummary {
    pub latency_ms: f64,
    pub jitter_ms: f64,
    /// Samples that contributed after warm-up discarding
    pub samples: usize,
}

/// Summarise a series of round-trip samples.
///
/// With `discard_first` set the first sample is dropped when more than one
/// was taken, since it carries connection setup cost.
pub fn latency_summary(samples: &[f64], discard_first: bool) -> Result<LatencySummary> {
    if samples.is_empty() {
        return Err(AppError::measurement("No latency samples collected"));
    }

    let used = if discard_first && samples.len() > 1 {
        &samples[1..]
    } else {
        samples
    };

    Ok(LatencySummary {
        latency_ms: mean(used),
        jitter_ms: smoothed_jitter(used),
        samples: used.len(),
    })
}

/// Arithmetic mean, 0.0 for an empty slice
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Exponentially smoothed jitter.
///
/// Instant jitter is the absolute difference between consecutive samples.
/// The difference between the first two samples only seeds the sequence;
/// from the third sample on, a falling value is blended 0.7/0.3 and a rising
/// value 0.2/0.8 (new/old).
pub fn smoothed_jitter(samples: &[f64]) -> f64 {
    let mut jitter = 0.0;
    for (idx, window) in samples.windows(2).enumerate() {
        let instant = (window[0] - window[1]).abs();
        // window index 0 compares samples 0 and 1
        if idx == 0 {
            continue;
        }
        if jitter > instant {
            jitter = jitter * 0.7 + instant * 0.3;
        } else {
            jitter = instant * 0.2 + jitter * 0.8;
        }
    }
    jitter
}

/// Round to `places` decimal places, half away from zero
pub fn round_to(value: f64, places: u32) -> f64 {
    let factor = 10f64.powi(places as i32);
    (value * factor).round() / factor
}

/// Round to the two decimals used in every reported figure
pub fn round2(value: f64) -> f64 {
    round_to(value, 2)
}
