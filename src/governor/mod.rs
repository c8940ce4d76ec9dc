//! Call-rate governor
//!
//! Tracks eBay's per-application call budgets and, when throttling is on,
//! spreads calls over each rate window instead of spending the budget up
//! front.
//!
//! One governor exists per application credential. All state sits behind a
//! single mutex; the throttled path releases it before sleeping and takes it
//! again on wake, so concurrent waiters simply race after each sleep.

mod models;
mod throttle;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::error::{Error, ErrorCode, Result};

pub use models::{
    base_path_for, compound_key, ApiRateLimit, Rate, RateLimitResource, RateLimitsResponse,
    RateRecord,
};
pub use throttle::{admission, threshold, Admission, THRESHOLD_FACTOR};

/// Periodic refresh interval, in seconds
pub const REFRESH_INTERVAL_SECS: i64 = 15 * 60;

/// Shortest sleep between admission checks
const MIN_WAIT: Duration = Duration::from_millis(10);

#[derive(Default)]
struct GovernorState {
    records: HashMap<String, RateRecord>,
    refresh_due_at: Option<DateTime<Utc>>,
}

impl GovernorState {
    /// Find the record for the first key that matches
    fn lookup_mut(&mut self, base_path: &str, resource_keys: &[&str]) -> Option<&mut RateRecord> {
        let key = resource_keys
            .iter()
            .map(|resource| compound_key(base_path, resource))
            .find(|key| self.records.contains_key(key))?;
        self.records.get_mut(&key)
    }
}

/// Per-application rate governor
pub struct RateGovernor {
    state: Mutex<GovernorState>,
    clock: Arc<dyn Clock>,
}

impl RateGovernor {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        RateGovernor {
            state: Mutex::new(GovernorState::default()),
            clock,
        }
    }

    /// Replace the cache with freshly fetched records
    ///
    /// The next refresh falls due at the earlier of the periodic interval and
    /// the soonest future reset.
    pub fn refresh(&self, records: Vec<RateRecord>) {
        let now = self.clock.now();
        let periodic = now + chrono::Duration::seconds(REFRESH_INTERVAL_SECS);
        let earliest_reset = records.iter().map(|r| r.reset).filter(|reset| *reset > now).min();
        let due = match earliest_reset {
            Some(reset) => reset.min(periodic),
            None => periodic,
        };

        let rebuilt: HashMap<String, RateRecord> =
            records.into_iter().map(|record| (record.key(), record)).collect();

        let mut state = self.state.lock();
        info!(records = rebuilt.len(), refresh_due_at = %due, "Rate limits refreshed");
        state.records = rebuilt;
        state.refresh_due_at = Some(due);
    }

    /// True when the cache is empty or its refresh instant has passed
    pub fn need_refresh(&self) -> bool {
        let now = self.clock.now();
        let state = self.state.lock();
        if state.records.is_empty() {
            return true;
        }
        match state.refresh_due_at {
            Some(due) => due <= now,
            None => true,
        }
    }

    /// When the next refresh is due, if the cache has been filled
    pub fn refresh_due_at(&self) -> Option<DateTime<Utc>> {
        self.state.lock().refresh_due_at
    }

    /// Take one call from the matching record without blocking
    ///
    /// Keys are tried in order; a total miss is a no-op because eBay does not
    /// publish limits for every resource.
    pub fn decrement(&self, base_path: &str, resource_keys: &[&str]) {
        let now = self.clock.now();
        let mut state = self.state.lock();
        match state.lookup_mut(base_path, resource_keys) {
            Some(record) => {
                record.roll_window(now);
                record.take();
                debug!(
                    resource = %record.resource_name,
                    remaining = record.remaining,
                    "Rate budget decremented"
                );
            }
            None => debug!(base_path, keys = ?resource_keys, "No rate limit published"),
        }
    }

    /// Take one call, waiting first if the record is below its pro-rata threshold
    ///
    /// `timeout` of `None` waits indefinitely. Running out of budget fails with
    /// [`ErrorCode::ThrottleTimeout`] and leaves the record untouched.
    pub async fn decrement_throttled(
        &self,
        base_path: &str,
        resource_keys: &[&str],
        timeout: Option<Duration>,
    ) -> Result<()> {
        let deadline = timeout.map(|t| tokio::time::Instant::now() + t);

        loop {
            let wait = {
                let now = self.clock.now();
                let mut state = self.state.lock();
                let Some(record) = state.lookup_mut(base_path, resource_keys) else {
                    debug!(base_path, keys = ?resource_keys, "No rate limit published");
                    return Ok(());
                };
                record.roll_window(now);

                match admission(record, now) {
                    Admission::Admit => {
                        record.take();
                        debug!(
                            resource = %record.resource_name,
                            remaining = record.remaining,
                            "Rate budget decremented"
                        );
                        return Ok(());
                    }
                    Admission::Wait(wait) => wait.max(MIN_WAIT),
                }
            };

            let wait = match deadline {
                None => wait,
                Some(deadline) => {
                    let left = deadline.saturating_duration_since(tokio::time::Instant::now());
                    if left.is_zero() {
                        return Err(Error::new(ErrorCode::ThrottleTimeout).with_detail(format!(
                            "{} {}",
                            base_path,
                            resource_keys.join(",")
                        )));
                    }
                    wait.min(left)
                }
            };

            warn!(base_path, wait_ms = wait.as_millis() as u64, "Throttling eBay call");
            tokio::time::sleep(wait).await;
        }
    }

    /// Copy of the record a call with these keys would use
    pub fn record(&self, base_path: &str, resource_keys: &[&str]) -> Option<RateRecord> {
        self.state.lock().lookup_mut(base_path, resource_keys).map(|r| r.clone())
    }

    /// All cached records, sorted by key
    pub fn records(&self) -> Vec<RateRecord> {
        let state = self.state.lock();
        let mut records: Vec<RateRecord> = state.records.values().cloned().collect();
        records.sort_by(|a, b| a.key().cmp(&b.key()));
        records
    }
}

impl Default for RateGovernor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::Duration as ChronoDuration;

    const BASE: &str = "/buy/browse/v1";

    /// Wall clock that follows tokio's (possibly paused) timer
    struct TokioClock {
        start_utc: DateTime<Utc>,
        start: tokio::time::Instant,
    }

    impl TokioClock {
        fn new(start_utc: DateTime<Utc>) -> Self {
            Self {
                start_utc,
                start: tokio::time::Instant::now(),
            }
        }
    }

    impl Clock for TokioClock {
        fn now(&self) -> DateTime<Utc> {
            let elapsed = tokio::time::Instant::now() - self.start;
            self.start_utc + ChronoDuration::from_std(elapsed).unwrap()
        }
    }

    fn record(limit: u64, remaining: u64, reset: DateTime<Utc>, window: u64) -> RateRecord {
        RateRecord::new("buy", "Browse", "v1", "buy.browse", limit, remaining, reset, window)
    }

    fn governor_at(now: DateTime<Utc>) -> (RateGovernor, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(now));
        (RateGovernor::with_clock(clock.clone()), clock)
    }

    #[test]
    fn test_empty_cache_needs_refresh() {
        let governor = RateGovernor::new();
        assert!(governor.need_refresh());
    }

    #[test]
    fn test_refresh_then_need_refresh_is_false() {
        let now = Utc::now();
        let (governor, _) = governor_at(now);
        governor.refresh(vec![record(5000, 5000, now + ChronoDuration::hours(10), 86400)]);

        assert!(!governor.need_refresh());
    }

    #[test]
    fn test_refresh_due_at_periodic_or_earliest_reset() {
        let now = Utc::now();
        let (governor, clock) = governor_at(now);

        let records = vec![
            RateRecord::new("buy", "Browse", "v1", "a", 10, 10, now + ChronoDuration::minutes(10), 3600),
            RateRecord::new("buy", "Browse", "v1", "b", 10, 10, now + ChronoDuration::minutes(30), 3600),
            RateRecord::new("buy", "Browse", "v1", "c", 10, 10, now + ChronoDuration::hours(2), 3600),
        ];
        governor.refresh(records);
        assert_eq!(governor.refresh_due_at(), Some(now + ChronoDuration::minutes(10)));

        governor.refresh(vec![record(10, 10, now + ChronoDuration::hours(2), 86400)]);
        assert_eq!(governor.refresh_due_at(), Some(now + ChronoDuration::minutes(15)));

        clock.advance(ChronoDuration::minutes(16));
        assert!(governor.need_refresh());
    }

    #[test]
    fn test_refresh_is_idempotent() {
        let now = Utc::now();
        let (governor, _) = governor_at(now);
        let records = vec![record(5000, 4000, now + ChronoDuration::hours(1), 86400)];

        governor.refresh(records.clone());
        let first = (governor.records(), governor.refresh_due_at());
        governor.refresh(records);
        let second = (governor.records(), governor.refresh_due_at());

        assert_eq!(first, second);
    }

    #[test]
    fn test_two_decrements() {
        let now = Utc::now();
        let (governor, _) = governor_at(now);
        governor.refresh(vec![record(5000, 1, now + ChronoDuration::hours(1), 86400)]);

        governor.decrement(BASE, &["buy.browse"]);
        governor.decrement(BASE, &["buy.browse"]);

        assert_eq!(governor.record(BASE, &["buy.browse"]).unwrap().remaining, 0);
    }

    #[test]
    fn test_decrement_falls_back_to_module_key() {
        let now = Utc::now();
        let (governor, _) = governor_at(now);
        governor.refresh(vec![RateRecord::new(
            "buy",
            "Browse",
            "v1",
            "buy.browse.item",
            100,
            100,
            now + ChronoDuration::hours(1),
            86400,
        )]);

        governor.decrement(BASE, &["buy.browse", "buy.browse.item"]);

        assert_eq!(governor.record(BASE, &["buy.browse.item"]).unwrap().remaining, 99);
    }

    #[test]
    fn test_decrement_unknown_resource_is_noop() {
        let now = Utc::now();
        let (governor, _) = governor_at(now);
        governor.refresh(vec![record(100, 100, now + ChronoDuration::hours(1), 86400)]);
        let before = governor.records();

        governor.decrement("/sell/inventory/v1", &["sell.inventory"]);

        assert_eq!(governor.records(), before);
    }

    #[tokio::test]
    async fn test_throttled_admits_full_budget() {
        let now = Utc::now();
        let (governor, _) = governor_at(now);
        governor.refresh(vec![record(5000, 5000, now + ChronoDuration::seconds(86400), 86400)]);

        governor
            .decrement_throttled(BASE, &["buy.browse"], Some(Duration::ZERO))
            .await
            .unwrap();

        assert_eq!(governor.record(BASE, &["buy.browse"]).unwrap().remaining, 4999);
    }

    #[tokio::test]
    async fn test_throttled_admits_near_reset() {
        let now = Utc::now();
        let (governor, _) = governor_at(now);
        governor.refresh(vec![record(5000, 10, now + ChronoDuration::seconds(60), 86400)]);

        governor
            .decrement_throttled(BASE, &["buy.browse"], Some(Duration::ZERO))
            .await
            .unwrap();

        assert_eq!(governor.record(BASE, &["buy.browse"]).unwrap().remaining, 9);
    }

    #[tokio::test]
    async fn test_throttled_zero_timeout_below_threshold_fails() {
        let now = Utc::now();
        let (governor, _) = governor_at(now);
        governor.refresh(vec![record(5000, 100, now + ChronoDuration::seconds(43200), 86400)]);

        let err = governor
            .decrement_throttled(BASE, &["buy.browse"], Some(Duration::ZERO))
            .await
            .unwrap_err();

        assert_eq!(err.number(), 12002);
        assert_eq!(governor.record(BASE, &["buy.browse"]).unwrap().remaining, 100);
    }

    #[tokio::test(start_paused = true)]
    async fn test_throttled_exhausted_times_out() {
        let now = Utc::now();
        let (governor, _) = governor_at(now);
        governor.refresh(vec![record(5000, 0, now + ChronoDuration::seconds(5), 86400)]);

        let started = tokio::time::Instant::now();
        let err = governor
            .decrement_throttled(BASE, &["buy.browse"], Some(Duration::from_secs(2)))
            .await
            .unwrap_err();

        assert!(err.is_throttle_timeout());
        assert_eq!(started.elapsed(), Duration::from_secs(2));
        assert_eq!(governor.record(BASE, &["buy.browse"]).unwrap().remaining, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_throttled_waits_for_reset_then_admits() {
        let now = Utc::now();
        let governor = RateGovernor::with_clock(Arc::new(TokioClock::new(now)));
        governor.refresh(vec![record(60, 0, now + ChronoDuration::seconds(3), 60)]);

        let started = tokio::time::Instant::now();
        governor
            .decrement_throttled(BASE, &["buy.browse"], None)
            .await
            .unwrap();

        assert!(started.elapsed() >= Duration::from_secs(3));
        assert!(started.elapsed() < Duration::from_secs(4));
        assert_eq!(governor.record(BASE, &["buy.browse"]).unwrap().remaining, 59);
    }

    #[tokio::test(start_paused = true)]
    async fn test_waiter_does_not_block_other_callers() {
        let now = Utc::now();
        let clock = Arc::new(TokioClock::new(now));
        let governor = Arc::new(RateGovernor::with_clock(clock.clone()));
        governor.refresh(vec![record(60, 0, now + ChronoDuration::seconds(5), 60)]);

        let waiter = {
            let governor = governor.clone();
            tokio::spawn(async move { governor.decrement_throttled(BASE, &["buy.browse"], None).await })
        };
        tokio::time::sleep(Duration::from_secs(1)).await;

        let later = clock.now();
        governor.refresh(vec![record(60, 60, later + ChronoDuration::seconds(60), 60)]);
        governor.decrement(BASE, &["buy.browse"]);
        assert!(!governor.need_refresh());
        assert!(!waiter.is_finished());

        waiter.await.unwrap().unwrap();
        assert_eq!(governor.record(BASE, &["buy.browse"]).unwrap().remaining, 58);
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_credit_admits_one_waiter() {
        let now = Utc::now();
        let clock = Arc::new(TokioClock::new(now));
        let governor = Arc::new(RateGovernor::with_clock(clock.clone()));
        let reset = now + ChronoDuration::seconds(1800);
        governor.refresh(vec![record(1, 0, reset, 3600)]);

        let spawn_waiter = |governor: Arc<RateGovernor>| {
            tokio::spawn(async move {
                governor
                    .decrement_throttled(BASE, &["buy.browse"], Some(Duration::from_secs(10)))
                    .await
            })
        };
        let first = spawn_waiter(governor.clone());
        let second = spawn_waiter(governor.clone());
        tokio::time::sleep(Duration::from_secs(1)).await;

        governor.refresh(vec![record(1, 1, reset, 3600)]);

        let results = [first.await.unwrap(), second.await.unwrap()];
        let admitted = results.iter().filter(|r| r.is_ok()).count();
        let timed_out = results
            .iter()
            .filter(|r| matches!(r, Err(e) if e.is_throttle_timeout()))
            .count();
        assert_eq!((admitted, timed_out), (1, 1));
        assert_eq!(governor.record(BASE, &["buy.browse"]).unwrap().remaining, 0);
    }

    #[tokio::test]
    async fn test_throttled_miss_is_noop() {
        let governor = RateGovernor::new();
        governor
            .decrement_throttled(BASE, &["buy.browse"], Some(Duration::ZERO))
            .await
            .unwrap();
        assert!(governor.records().is_empty());
    }
}
