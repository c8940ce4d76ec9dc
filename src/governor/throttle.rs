//! Pro-rata admission math
//!
//! The window's budget is treated as depleting linearly from `limit` at the
//! start of the window to zero at `reset`. A call is admitted while the real
//! remaining count stays at or above half of that ideal line (and never
//! below one).

use std::time::Duration;

use chrono::{DateTime, Utc};

use super::models::RateRecord;

/// Fraction of the ideal remaining count that must be kept in reserve
pub const THRESHOLD_FACTOR: f64 = 0.5;

/// Outcome of an admission check
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Admission {
    Admit,
    Wait(Duration),
}

/// Ideal remaining count at `now`
pub fn ideal_remaining(record: &RateRecord, now: DateTime<Utc>) -> f64 {
    if record.time_window == 0 {
        return 0.0;
    }
    let to_reset = seconds_until(record.reset, now);
    to_reset * record.limit as f64 / record.time_window as f64
}

/// Minimum remaining count required to admit a call
pub fn threshold(record: &RateRecord, now: DateTime<Utc>) -> f64 {
    (ideal_remaining(record, now) * THRESHOLD_FACTOR).max(1.0)
}

/// Decide whether a call may proceed now, or how long to wait before asking again
pub fn admission(record: &RateRecord, now: DateTime<Utc>) -> Admission {
    let threshold = threshold(record, now);
    let remaining = record.remaining as f64;

    if remaining >= threshold.ceil() {
        return Admission::Admit;
    }

    let wait_secs = if record.remaining == 0 || record.limit == 0 {
        seconds_until(record.reset, now)
    } else {
        (threshold - remaining) * record.time_window as f64 / record.limit as f64
    };

    Admission::Wait(Duration::from_secs_f64(wait_secs.max(0.0)))
}

fn seconds_until(instant: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let millis = (instant - now).num_milliseconds().max(0);
    millis as f64 / 1000.0
}
